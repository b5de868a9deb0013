//! Conversion entry points.
//!
//! Both directions validate first and abort without output on a
//! structural failure: a rejected input, or a canonical dataset missing a
//! required list. Per-item problems (a dangling reference, unusable
//! geometry, a failed write) skip that item and land in the returned
//! [`ConversionReport`].

pub mod report;

pub use report::{
    ConversionCounts, ConversionIssue, ConversionIssueCode, ConversionReport, ConversionSeverity,
};

use std::collections::HashSet;
use std::path::Path;

use log::{error, info, warn};

use crate::codec::{
    build_pool, ArtifactSink, Codec, ConvertContext, ConvertOptions, ExportOptions, ExportResult,
    SourceInput,
};
use crate::config::MetadataConfig;
use crate::error::PolymaskError;
use crate::ir::Dataset;
use crate::validation::{check_schema, validate_dataset, ValidateOptions};

/// A canonical dataset produced from an external format.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub dataset: Dataset,
    pub report: ConversionReport,
}

/// Convert `input` into a canonical dataset with `metadata` attached.
///
/// # Errors
/// [`PolymaskError::Validation`] if `input` does not match the codec's
/// format; in that case nothing is converted.
pub fn convert_to_canonical(
    codec: &dyn Codec,
    input: SourceInput,
    metadata: &MetadataConfig,
    options: &ConvertOptions,
) -> Result<Conversion, PolymaskError> {
    if let Err(err) = codec.validate(&input) {
        error!("Rejected {} input: {err}", codec.id());
        return Err(err);
    }

    let pool = build_pool(options.workers)?;
    let ctx = ConvertContext {
        options,
        pool: &pool,
    };
    let output = codec.to_canonical(input, &ctx)?;

    let mut dataset = output.dataset;
    dataset.info = metadata.dataset_info(chrono::Utc::now());
    if let Some(license) = metadata.license() {
        for image in &mut dataset.images {
            image.license_id = Some(license.id);
        }
        dataset.licenses = vec![license];
    }

    let report = output.report;
    info!(
        "Converted {} to canonical: {} image(s), {} annotation(s), {} categor{}; {} skipped, {} warning(s)",
        codec.id(),
        dataset.images.len(),
        dataset.annotations.len(),
        dataset.categories.len(),
        if dataset.categories.len() == 1 { "y" } else { "ies" },
        report.skipped_count(),
        report.warning_count(),
    );
    Ok(Conversion { dataset, report })
}

/// Write one artifact per image of `dataset` into `output_dir`.
///
/// # Errors
/// [`PolymaskError::Schema`] before anything is written. Annotations with
/// dangling references or unusable polygons are skipped and reported;
/// per-image write failures are returned in [`ExportResult::failures`].
pub fn convert_from_canonical(
    codec: &dyn Codec,
    dataset: &Dataset,
    output_dir: &Path,
    options: &ExportOptions,
) -> Result<ExportResult, PolymaskError> {
    if let Err(err) = check_schema(dataset) {
        error!("Refusing to export: {err}");
        return Err(err);
    }
    let validation = validate_dataset(dataset, &ValidateOptions::default());
    if !validation.is_ok() {
        warn!(
            "Canonical dataset has {} validation error(s); affected annotations will be skipped",
            validation.error_count()
        );
    }

    let sink = ArtifactSink::create(output_dir)?;
    let mut result = codec.from_canonical(dataset, &sink, options)?;
    note_orphan_annotations(dataset, &mut result.report);
    note_unused_categories(dataset, &mut result.report);

    info!(
        "Wrote {} {} artifact(s) to {}; {} failed, {} skipped",
        result.artifacts.len(),
        codec.id(),
        output_dir.display(),
        result.failures.len(),
        result.report.skipped_count(),
    );
    Ok(result)
}

/// Annotations whose image does not exist are never reached by a codec.
fn note_orphan_annotations(dataset: &Dataset, report: &mut ConversionReport) {
    let images: HashSet<_> = dataset.images.iter().map(|i| i.id).collect();
    for ann in dataset
        .annotations
        .iter()
        .filter(|a| !images.contains(&a.image_id))
    {
        let err = PolymaskError::reference(
            format!("annotation {}", ann.id),
            format!("unknown image {}", ann.image_id),
        );
        warn!("Skipping {err}");
        report.add(ConversionIssue::skipped_for(&err, format!("annotation {}", ann.id)));
    }
}

/// Categories no annotation refers to leave no trace in per-image output.
fn note_unused_categories(dataset: &Dataset, report: &mut ConversionReport) {
    let used: HashSet<_> = dataset.annotations.iter().map(|a| a.category_id).collect();
    for category in dataset.categories.iter().filter(|c| !used.contains(&c.id)) {
        report.add(ConversionIssue::info(
            ConversionIssueCode::UnusedCategory,
            format!("category '{}' has no annotations", category.name),
            format!("category {}", category.id),
        ));
    }
}
