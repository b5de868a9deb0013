use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationReport;

/// The main error type for polymask operations.
#[derive(Debug, Error)]
pub enum PolymaskError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Input does not match the structural contract of its declared format.
    #[error("Input is not valid {format}: field '{field}': {message}")]
    Validation {
        format: &'static str,
        field: String,
        message: String,
    },

    /// A canonical dataset is missing a required top-level key.
    #[error("Canonical dataset is missing required '{field}'")]
    Schema { field: &'static str },

    /// Degenerate polygon (odd coordinate count, too few points, zero traced area).
    #[error("Geometry error in {context}: {message}")]
    Geometry { context: String, message: String },

    /// Dangling image/category id or a mask value absent from the label dictionary.
    #[error("Reference error in {context}: {message}")]
    Reference { context: String, message: String },

    #[error("Failed to parse JSON from {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write JSON to {path}: {source}")]
    JsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageSize {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Canonical dataset failed validation with {error_count} error(s) and {warning_count} warning(s)")]
    CanonicalInvalid {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Some images of an export could not be written.
    #[error("{failed} of {total} artifact(s) could not be written")]
    ExportIncomplete { failed: usize, total: usize },
}

impl PolymaskError {
    /// Shorthand for a [`PolymaskError::Validation`].
    pub fn validation(
        format: &'static str,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation {
            format,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`PolymaskError::Geometry`].
    pub fn geometry(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Geometry {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`PolymaskError::Reference`].
    pub fn reference(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Reference {
            context: context.into(),
            message: message.into(),
        }
    }
}
