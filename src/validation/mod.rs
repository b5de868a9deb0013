//! Canonical dataset validation.
//!
//! Two layers: [`check_schema`] is the hard gate run before any export
//! (required top-level lists present), and [`validate_dataset`] produces a
//! full [`ValidationReport`] of referential, structural and geometric
//! issues. Per-format input contracts live with each codec's `validate`.

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::{HashMap, HashSet};

use crate::error::PolymaskError;
use crate::geometry::{area_and_bbox, segmentation_area_and_bbox, BBox, Polygon};
use crate::ir::{Annotation, AnnotationId, CategoryId, Dataset, ImageId};

/// Stored area/bbox may differ from the measured ones by this much, which
/// covers two-decimal rounding at the JSON boundary.
const MEASURE_TOLERANCE: f64 = 0.01;

/// Geometry may overhang the image edge by this much.
const BOUNDS_TOLERANCE: f64 = 0.5;

#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// Treat warnings as errors.
    pub strict: bool,
}

/// Require non-empty `images`, `annotations` and `categories`.
///
/// # Errors
/// Returns [`PolymaskError::Schema`] naming the first missing list.
pub fn check_schema(dataset: &Dataset) -> Result<(), PolymaskError> {
    if dataset.images.is_empty() {
        return Err(PolymaskError::Schema { field: "images" });
    }
    if dataset.annotations.is_empty() {
        return Err(PolymaskError::Schema {
            field: "annotations",
        });
    }
    if dataset.categories.is_empty() {
        return Err(PolymaskError::Schema {
            field: "categories",
        });
    }
    Ok(())
}

/// Validate a canonical dataset and report every issue found.
pub fn validate_dataset(dataset: &Dataset, _opts: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::new();

    let image_dims: HashMap<ImageId, (u32, u32)> = dataset
        .images
        .iter()
        .map(|i| (i.id, (i.width, i.height)))
        .collect();
    let category_ids: HashSet<CategoryId> = dataset.categories.iter().map(|c| c.id).collect();

    validate_images(dataset, &mut report);
    validate_categories(dataset, &mut report);
    validate_annotations(dataset, &image_dims, &category_ids, &mut report);

    report
}

/// Turn a report into a hard failure when it has errors (or warnings under
/// `strict`).
pub fn ensure_valid(report: ValidationReport, strict: bool) -> Result<(), PolymaskError> {
    let error_count = report.error_count();
    let warning_count = report.warning_count();
    if error_count > 0 || (strict && warning_count > 0) {
        return Err(PolymaskError::CanonicalInvalid {
            error_count,
            warning_count,
            report,
        });
    }
    Ok(())
}

fn validate_images(dataset: &Dataset, report: &mut ValidationReport) {
    let mut seen: HashMap<ImageId, usize> = HashMap::new();

    for (idx, image) in dataset.images.iter().enumerate() {
        let context = IssueContext::Image {
            id: image.id.as_u64(),
        };

        if let Some(first) = seen.insert(image.id, idx) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateImageId,
                format!("duplicate image id {} (first at index {first})", image.id),
                context.clone(),
            ));
        }
        if image.width == 0 || image.height == 0 {
            report.add(ValidationIssue::error(
                IssueCode::InvalidImageDimensions,
                format!("dimensions {}x{} must be positive", image.width, image.height),
                context.clone(),
            ));
        }
        if image.file_name.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyFileName,
                "empty file name",
                context,
            ));
        }
    }
}

fn validate_categories(dataset: &Dataset, report: &mut ValidationReport) {
    let mut seen: HashMap<CategoryId, usize> = HashMap::new();

    for (idx, category) in dataset.categories.iter().enumerate() {
        let context = IssueContext::Category {
            id: category.id.as_u64(),
        };

        if let Some(first) = seen.insert(category.id, idx) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateCategoryId,
                format!("duplicate category id {} (first at index {first})", category.id),
                context.clone(),
            ));
        }
        if category.name.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyCategoryName,
                "empty category name",
                context,
            ));
        }
    }

    let contiguous = dataset
        .categories
        .iter()
        .enumerate()
        .all(|(idx, c)| c.id.as_u64() == idx as u64 + 1);
    if !contiguous {
        report.add(ValidationIssue::warning(
            IssueCode::NonContiguousCategoryIds,
            "category ids are not 1..=n in list order",
            IssueContext::Dataset,
        ));
    }
}

fn validate_annotations(
    dataset: &Dataset,
    image_dims: &HashMap<ImageId, (u32, u32)>,
    category_ids: &HashSet<CategoryId>,
    report: &mut ValidationReport,
) {
    let mut seen: HashMap<AnnotationId, usize> = HashMap::new();

    for (idx, ann) in dataset.annotations.iter().enumerate() {
        let context = IssueContext::Annotation {
            id: ann.id.as_u64(),
        };

        if let Some(first) = seen.insert(ann.id, idx) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateAnnotationId,
                format!("duplicate annotation id {} (first at index {first})", ann.id),
                context.clone(),
            ));
        }
        if !image_dims.contains_key(&ann.image_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingImageRef,
                format!("references non-existent image {}", ann.image_id),
                context.clone(),
            ));
        }
        if !category_ids.contains(&ann.category_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingCategoryRef,
                format!("references non-existent category {}", ann.category_id),
                context.clone(),
            ));
        }

        if validate_polygons(ann, &context, report) {
            validate_measurements(ann, image_dims.get(&ann.image_id).copied(), &context, report);
        }
    }
}

/// Shape checks. Returns false if the geometry is too broken to measure.
fn validate_polygons(ann: &Annotation, context: &IssueContext, report: &mut ValidationReport) -> bool {
    if ann.segmentation.is_empty() {
        report.add(ValidationIssue::error(
            IssueCode::EmptySegmentation,
            "annotation has no polygons",
            context.clone(),
        ));
        return false;
    }

    let mut measurable = true;
    for (k, polygon) in ann.segmentation.iter().enumerate() {
        if polygon.len() < Polygon::MIN_POINTS {
            report.add(ValidationIssue::error(
                IssueCode::PolygonTooFewPoints,
                format!(
                    "polygon {k} has {} point(s), at least {} required",
                    polygon.len(),
                    Polygon::MIN_POINTS
                ),
                context.clone(),
            ));
            measurable = false;
        } else if !polygon.is_finite() {
            report.add(ValidationIssue::error(
                IssueCode::PolygonNotFinite,
                format!("polygon {k} has non-finite coordinates"),
                context.clone(),
            ));
            measurable = false;
        } else if area_and_bbox(polygon).0 == 0.0 {
            report.add(ValidationIssue::warning(
                IssueCode::ZeroArea,
                format!("polygon {k} encloses zero area"),
                context.clone(),
            ));
        }
    }
    measurable
}

fn validate_measurements(
    ann: &Annotation,
    dims: Option<(u32, u32)>,
    context: &IssueContext,
    report: &mut ValidationReport,
) {
    let (area, bbox) = segmentation_area_and_bbox(&ann.segmentation);

    if (ann.area - area).abs() > MEASURE_TOLERANCE {
        report.add(ValidationIssue::warning(
            IssueCode::AreaMismatch,
            format!("stored area {:.2} but segmentation measures {:.2}", ann.area, area),
            context.clone(),
        ));
    }
    if !bbox_close(&ann.bbox, &bbox) {
        let [x, y, w, h] = bbox.rounded().to_xywh();
        report.add(ValidationIssue::warning(
            IssueCode::BBoxMismatch,
            format!("stored bbox {:?} but segmentation measures [{x}, {y}, {w}, {h}]", ann.bbox.to_xywh()),
            context.clone(),
        ));
    }

    if let Some((width, height)) = dims {
        let (w, h) = (f64::from(width), f64::from(height));
        if bbox.x < -BOUNDS_TOLERANCE
            || bbox.y < -BOUNDS_TOLERANCE
            || bbox.max_x() > w + BOUNDS_TOLERANCE
            || bbox.max_y() > h + BOUNDS_TOLERANCE
        {
            report.add(ValidationIssue::error(
                IssueCode::OutOfBounds,
                format!(
                    "geometry ({:.1}, {:.1}, {:.1}, {:.1}) extends outside image (0, 0, {width}, {height})",
                    bbox.x,
                    bbox.y,
                    bbox.max_x(),
                    bbox.max_y()
                ),
                context.clone(),
            ));
        }
    }
}

fn bbox_close(a: &BBox, b: &BBox) -> bool {
    a.to_xywh()
        .iter()
        .zip(b.to_xywh())
        .all(|(p, q)| (p - q).abs() <= MEASURE_TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::ir::{Category, Image};

    fn valid_dataset() -> Dataset {
        Dataset {
            images: vec![Image::new(0u64, "image.png", 64, 48)],
            categories: vec![Category::new(1u64, "leaf")],
            annotations: vec![Annotation::from_segmentation(
                0u64,
                0u64,
                1u64,
                vec![Polygon::rectangle(10.0, 10.0, 10.0, 10.0)],
            )],
            ..Default::default()
        }
    }

    fn codes(report: &ValidationReport) -> Vec<IssueCode> {
        report.issues.iter().map(|i| i.code).collect()
    }

    #[test]
    fn valid_dataset_is_clean() {
        let report = validate_dataset(&valid_dataset(), &ValidateOptions::default());
        assert!(report.is_clean(), "unexpected issues: {:?}", report.issues);
        assert!(check_schema(&valid_dataset()).is_ok());
    }

    #[test]
    fn schema_check_names_missing_list() {
        let mut dataset = valid_dataset();
        dataset.categories.clear();
        let err = check_schema(&dataset).unwrap_err();
        assert!(matches!(err, PolymaskError::Schema { field: "categories" }));
    }

    #[test]
    fn dangling_references_are_errors() {
        let mut dataset = valid_dataset();
        dataset.annotations.push(Annotation::from_segmentation(
            1u64,
            9u64,
            7u64,
            vec![Polygon::rectangle(0.0, 0.0, 1.0, 1.0)],
        ));
        let report = validate_dataset(&dataset, &ValidateOptions::default());
        assert_eq!(report.error_count(), 2);
        assert!(report.has(IssueCode::MissingImageRef));
        assert!(report.has(IssueCode::MissingCategoryRef));
    }

    #[test]
    fn duplicate_ids_are_errors() {
        let mut dataset = valid_dataset();
        dataset.images.push(Image::new(0u64, "dup.png", 64, 48));
        dataset.categories.push(Category::new(1u64, "stem"));
        let report = validate_dataset(&dataset, &ValidateOptions::default());
        assert!(report.has(IssueCode::DuplicateImageId));
        assert!(report.has(IssueCode::DuplicateCategoryId));
    }

    #[test]
    fn short_polygon_is_an_error_and_skips_measuring() {
        let mut dataset = valid_dataset();
        dataset.annotations[0].segmentation =
            vec![Polygon::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)])];
        let report = validate_dataset(&dataset, &ValidateOptions::default());
        assert_eq!(codes(&report), vec![IssueCode::PolygonTooFewPoints]);
    }

    #[test]
    fn stale_measurements_are_warnings() {
        let mut dataset = valid_dataset();
        dataset.annotations[0].area = 42.0;
        dataset.annotations[0].bbox = BBox::new(0.0, 0.0, 1.0, 1.0);
        let report = validate_dataset(&dataset, &ValidateOptions::default());
        assert!(report.is_ok());
        assert_eq!(report.warning_count(), 2);
        assert!(report.has(IssueCode::AreaMismatch));
        assert!(report.has(IssueCode::BBoxMismatch));
        assert!(ensure_valid(report, true).is_err());
    }

    #[test]
    fn out_of_bounds_geometry_is_an_error() {
        let mut dataset = valid_dataset();
        dataset.annotations[0] = Annotation::from_segmentation(
            0u64,
            0u64,
            1u64,
            vec![Polygon::rectangle(60.0, 40.0, 10.0, 10.0)],
        );
        let report = validate_dataset(&dataset, &ValidateOptions::default());
        assert!(report.has(IssueCode::OutOfBounds));
    }

    #[test]
    fn zero_area_polygon_is_a_warning() {
        let mut dataset = valid_dataset();
        dataset.annotations[0] = Annotation::from_segmentation(
            0u64,
            0u64,
            1u64,
            vec![Polygon::from_flat(&[0.0, 0.0, 5.0, 5.0, 10.0, 10.0]).unwrap()],
        );
        let report = validate_dataset(&dataset, &ValidateOptions::default());
        assert!(report.is_ok());
        assert!(report.has(IssueCode::ZeroArea));
    }

    #[test]
    fn sparse_category_ids_are_flagged() {
        let mut dataset = valid_dataset();
        dataset.categories[0].id = CategoryId(5);
        dataset.annotations[0].category_id = CategoryId(5);
        let report = validate_dataset(&dataset, &ValidateOptions::default());
        assert_eq!(codes(&report), vec![IssueCode::NonContiguousCategoryIds]);
    }
}
