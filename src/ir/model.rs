//! The canonical dataset model.
//!
//! Every codec converts into and out of [`Dataset`]. Field names follow the
//! canonical JSON layout (camelCase on the wire).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ids::{AnnotationId, CategoryId, ImageId, LicenseId};
use crate::geometry::{segmentation_area_and_bbox, BBox, Polygon};

/// A complete labeled dataset: the hub all conversions go through.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub info: DatasetInfo,

    #[serde(default)]
    pub licenses: Vec<License>,

    #[serde(default)]
    pub images: Vec<Image>,

    #[serde(default)]
    pub annotations: Vec<Annotation>,

    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Dataset {
    pub fn image(&self, id: ImageId) -> Option<&Image> {
        self.images.iter().find(|image| image.id == id)
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    /// Annotations grouped by image id, each group in dataset order.
    ///
    /// Grouping is by id equality, so it holds for any image order.
    pub fn annotations_by_image(&self) -> HashMap<ImageId, Vec<&Annotation>> {
        let mut groups: HashMap<ImageId, Vec<&Annotation>> = HashMap::new();
        for ann in &self.annotations {
            groups.entry(ann.image_id).or_default().push(ann);
        }
        groups
    }
}

/// Dataset-level metadata, attached once per conversion.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetInfo {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub contributor: String,
    #[serde(default)]
    pub url: String,
    /// RFC 3339 timestamp in UTC.
    #[serde(default)]
    pub date_created: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub id: LicenseId,
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl License {
    pub fn new(id: impl Into<LicenseId>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
        }
    }
}

/// One source image. Width and height are those of the source raster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: ImageId,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Capture timestamp, free-form (usually ISO 8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_id: Option<LicenseId>,
}

impl Image {
    pub fn new(
        id: impl Into<ImageId>,
        file_name: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            width,
            height,
            source_url: None,
            captured_at: None,
            license_id: None,
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_captured_at(mut self, timestamp: impl Into<String>) -> Self {
        self.captured_at = Some(timestamp.into());
        self
    }

    pub fn with_license(mut self, license_id: impl Into<LicenseId>) -> Self {
        self.license_id = Some(license_id.into());
        self
    }
}

/// A class label. `supercategory` is the name itself unless set otherwise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(rename = "superCategory")]
    pub supercategory: String,
}

impl Category {
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            supercategory: name.clone(),
            name,
        }
    }

    pub fn with_supercategory(mut self, supercategory: impl Into<String>) -> Self {
        self.supercategory = supercategory.into();
        self
    }
}

/// One labeled region.
///
/// `area` and `bbox` are derived from `segmentation` by
/// [`Annotation::from_segmentation`]; they are stored so the canonical JSON
/// is self-contained, but no codec ever authors them by hand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    pub image_id: ImageId,
    pub category_id: CategoryId,
    pub segmentation: Vec<Polygon>,
    pub area: f64,
    pub bbox: BBox,
    #[serde(default, with = "crowd_flag")]
    pub is_crowd: bool,
}

impl Annotation {
    /// Build an annotation, measuring area and bbox from its polygons.
    pub fn from_segmentation(
        id: impl Into<AnnotationId>,
        image_id: impl Into<ImageId>,
        category_id: impl Into<CategoryId>,
        segmentation: Vec<Polygon>,
    ) -> Self {
        let (area, bbox) = segmentation_area_and_bbox(&segmentation);
        Self {
            id: id.into(),
            image_id: image_id.into(),
            category_id: category_id.into(),
            segmentation,
            area,
            bbox,
            is_crowd: false,
        }
    }
}

/// `isCrowd` is written as `0`/`1`; booleans are accepted on read.
mod crowd_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(u64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(match Flag::deserialize(deserializer)? {
            Flag::Bool(b) => b,
            Flag::Int(n) => n != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotation_measures_its_segmentation() {
        let ann = Annotation::from_segmentation(
            0u64,
            0u64,
            1u64,
            vec![Polygon::rectangle(10.0, 10.0, 10.0, 10.0)],
        );
        assert_eq!(ann.area, 100.0);
        assert_eq!(ann.bbox, BBox::new(10.0, 10.0, 10.0, 10.0));
        assert!(!ann.is_crowd);
    }

    #[test]
    fn category_supercategory_defaults_to_name() {
        let cat = Category::new(1u64, "leaf");
        assert_eq!(cat.supercategory, "leaf");
        assert_eq!(cat.with_supercategory("plant").supercategory, "plant");
    }

    #[test]
    fn annotation_json_uses_camel_case_keys() {
        let ann = Annotation::from_segmentation(
            3u64,
            0u64,
            2u64,
            vec![Polygon::rectangle(0.0, 0.0, 2.0, 2.0)],
        );
        let value = serde_json::to_value(&ann).unwrap();
        assert_eq!(value["imageId"], 0);
        assert_eq!(value["categoryId"], 2);
        assert_eq!(value["isCrowd"], 0);
        assert_eq!(value["bbox"], serde_json::json!([0.0, 0.0, 2.0, 2.0]));
        assert_eq!(
            value["segmentation"],
            serde_json::json!([[0.0, 0.0, 2.0, 0.0, 2.0, 2.0, 0.0, 2.0]])
        );
    }

    #[test]
    fn is_crowd_accepts_bool_or_int() {
        let json = r#"{"id":0,"imageId":0,"categoryId":1,"segmentation":[],"area":0,"bbox":[0,0,0,0],"isCrowd":true}"#;
        let ann: Annotation = serde_json::from_str(json).unwrap();
        assert!(ann.is_crowd);
    }

    #[test]
    fn annotations_group_by_image_id() {
        let dataset = Dataset {
            images: vec![Image::new(0u64, "a.png", 4, 4), Image::new(1u64, "b.png", 4, 4)],
            annotations: vec![
                Annotation::from_segmentation(0u64, 1u64, 1u64, vec![]),
                Annotation::from_segmentation(1u64, 0u64, 1u64, vec![]),
                Annotation::from_segmentation(2u64, 1u64, 1u64, vec![]),
            ],
            ..Default::default()
        };
        let groups = dataset.annotations_by_image();
        let ids: Vec<_> = groups[&ImageId(1)].iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![AnnotationId(0), AnnotationId(2)]);
        assert_eq!(groups[&ImageId(0)].len(), 1);
        assert_eq!(dataset.image(ImageId(1)).map(|i| i.file_name.as_str()), Some("b.png"));
    }
}
