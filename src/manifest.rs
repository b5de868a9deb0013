//! JSON manifests that describe a batch of source images on disk.
//!
//! Paths inside a manifest are resolved relative to the manifest file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::category::LabelDictionary;
use crate::codec::{ArtifactSink, MaskSource, PolygonImage};
use crate::error::PolymaskError;
use crate::ir::{Dataset, ImageId};

pub const MASK_MANIFEST_NAME: &str = "manifest.json";

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, PolymaskError> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| PolymaskError::JsonParse {
        path: path.to_path_buf(),
        source,
    })
}

fn base_dir(manifest: &Path) -> &Path {
    manifest.parent().unwrap_or_else(|| Path::new("."))
}

/// Read a polygon manifest: a list of images with their records.
pub fn read_polygon_manifest(path: &Path) -> Result<Vec<PolygonImage>, PolymaskError> {
    let images: Vec<PolygonImage> = read_json(path)?;
    debug!("Loaded {} polygon image(s) from {}", images.len(), path.display());
    Ok(images)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskManifest {
    pub dictionary: LabelDictionary,
    /// Category names in id order. When present, import assigns ids in
    /// this order instead of by first appearance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    pub images: Vec<MaskEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskEntry {
    pub file_name: String,
    /// Source image, read only for its dimensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub mask: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Read a mask manifest and decode every mask it lists.
///
/// Source dimensions come from `width`/`height` when both are given, then
/// from the `image` file header, and finally from the mask itself.
pub fn read_mask_manifest(path: &Path) -> Result<Vec<MaskSource>, PolymaskError> {
    let manifest: MaskManifest = read_json(path)?;
    let base = base_dir(path);
    let dictionary = manifest
        .dictionary
        .with_category_order(manifest.categories);

    manifest
        .images
        .iter()
        .map(|entry| {
            let source_size = match (entry.width, entry.height, &entry.image) {
                (Some(w), Some(h), _) => Some((w, h)),
                (_, _, Some(image)) => Some(read_image_dimensions(&base.join(image))?),
                _ => None,
            };
            MaskSource::read(
                entry.file_name.as_str(),
                source_size,
                &base.join(&entry.mask),
                dictionary.clone(),
            )
        })
        .collect()
}

fn read_image_dimensions(path: &Path) -> Result<(u32, u32), PolymaskError> {
    let size = imagesize::size(path).map_err(|source| PolymaskError::ImageSize {
        path: path.to_path_buf(),
        source,
    })?;
    let fits = |n: usize| u32::try_from(n).ok();
    match (fits(size.width), fits(size.height)) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(PolymaskError::validation(
            "image",
            path.display().to_string(),
            format!("{}x{} does not fit in u32", size.width, size.height),
        )),
    }
}

/// Write `manifest.json` next to exported masks so the directory can be
/// read back with [`read_mask_manifest`].
pub fn write_mask_manifest(
    sink: &ArtifactSink,
    dictionary: &LabelDictionary,
    dataset: &Dataset,
    artifacts: &BTreeMap<ImageId, PathBuf>,
) -> Result<PathBuf, PolymaskError> {
    let images = dataset
        .images
        .iter()
        .filter_map(|image| {
            let mask = artifacts.get(&image.id)?.file_name()?.to_string_lossy();
            Some(MaskEntry {
                file_name: image.file_name.clone(),
                image: None,
                mask: mask.into_owned(),
                width: Some(image.width),
                height: Some(image.height),
            })
        })
        .collect();
    let manifest = MaskManifest {
        dictionary: dictionary.clone(),
        categories: dictionary.category_order().to_vec(),
        images,
    };

    let target = sink.dir().join(MASK_MANIFEST_NAME);
    sink.write_atomic(MASK_MANIFEST_NAME, |w| {
        serde_json::to_writer_pretty(w, &manifest).map_err(|source| PolymaskError::JsonWrite {
            path: target.clone(),
            source,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{LabelRaster, LabelValue};
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn polygon_manifest_accepts_text_and_object_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(
            &path,
            r#"[{"fileName": "a.jpg", "width": 10, "height": 8,
                 "annotations": ["{\"type\": \"Annotation\"}", {"type": "Annotation"}]}]"#,
        )
        .unwrap();

        let images = read_polygon_manifest(&path).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].records.len(), 2);
        assert!(images[0].source_url.is_none());
    }

    #[test]
    fn mask_manifest_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("masks")).unwrap();
        let mut mask = GrayImage::new(6, 4);
        mask.put_pixel(1, 1, Luma([3]));
        mask.save(dir.path().join("masks/a.png")).unwrap();
        RgbImage::from_pixel(6, 4, Rgb([9, 9, 9]))
            .save(dir.path().join("a.png"))
            .unwrap();

        let path = dir.path().join("manifest.json");
        std::fs::write(
            &path,
            r#"{"dictionary": {"seed": 3},
                "images": [{"fileName": "a.png", "image": "a.png", "mask": "masks/a.png"}]}"#,
        )
        .unwrap();

        let sources = read_mask_manifest(&path).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!((sources[0].source_width, sources[0].source_height), (6, 4));
        assert!(matches!(sources[0].label, LabelRaster::Index(_)));
        assert_eq!(sources[0].dictionary.name_for(LabelValue::Index(3)), Some("seed"));
    }

    #[test]
    fn category_order_travels_with_the_dictionary() {
        let dir = tempfile::tempdir().unwrap();
        GrayImage::new(2, 2).save(dir.path().join("m.png")).unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(
            &path,
            r#"{"dictionary": {"leaf": 1, "stem": 2}, "categories": ["stem", "leaf"],
                "images": [{"fileName": "a.png", "mask": "m.png"}]}"#,
        )
        .unwrap();

        let sources = read_mask_manifest(&path).unwrap();
        assert_eq!(sources[0].dictionary.category_order(), ["stem", "leaf"]);
    }

    #[test]
    fn missing_source_image_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(
            &path,
            r#"{"dictionary": {}, "images": [{"fileName": "x", "image": "nope.png", "mask": "m.png"}]}"#,
        )
        .unwrap();
        let err = read_mask_manifest(&path).unwrap_err();
        assert!(err.to_string().contains("nope.png"));
    }
}
