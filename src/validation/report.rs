//! Validation report types.
//!
//! A report can be printed for the terminal, serialized to JSON, or
//! inspected by code through its stable [`IssueCode`]s.

use serde::Serialize;
use std::fmt;

/// Every issue found while validating one canonical dataset.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ValidationReport {
    /// All issues, in the order they were found.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Adds an issue to the report.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Number of issues with [`Severity::Error`].
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    /// Number of issues with [`Severity::Warning`].
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// No errors (warnings allowed).
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// No issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// True if any issue carries `code`.
    pub fn has(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(f, "Validation passed: no issues found");
        }

        writeln!(
            f,
            "Validation completed with {} error(s) and {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        writeln!(f)?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

/// A single validation issue (error or warning).
#[derive(Clone, Debug, Serialize)]
pub struct ValidationIssue {
    /// How serious the issue is.
    pub severity: Severity,

    /// A stable code for the issue type.
    pub code: IssueCode,

    /// A human-readable description of the issue.
    pub message: String,

    /// The dataset element the issue was found on.
    pub context: IssueContext,
}

impl ValidationIssue {
    /// Creates an error.
    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            context,
        }
    }

    /// Creates a warning.
    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            context,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.code, self.context, self.message
        )
    }
}

/// The severity of a validation issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Suspicious data that still converts.
    Warning,
    /// Invalid data; the affected item cannot be converted as is.
    Error,
}

/// Stable issue codes for filtering and JSON output.
///
/// The snake_case names are part of the JSON report schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// Two images share an id.
    DuplicateImageId,
    /// Two annotations share an id.
    DuplicateAnnotationId,
    /// Two categories share an id.
    DuplicateCategoryId,

    /// Annotation references an image id that does not exist.
    MissingImageRef,
    /// Annotation references a category id that does not exist.
    MissingCategoryRef,

    /// Image width or height is zero.
    InvalidImageDimensions,
    /// Image has an empty file name.
    EmptyFileName,

    /// Category has an empty name.
    EmptyCategoryName,
    /// Category ids are not `1..=n` in order.
    NonContiguousCategoryIds,

    /// Annotation has no polygons.
    EmptySegmentation,
    /// Polygon with fewer than three points.
    PolygonTooFewPoints,
    /// NaN or infinite coordinate.
    PolygonNotFinite,
    /// Polygon encloses zero area.
    ZeroArea,
    /// Stored `area` differs from the area measured from `segmentation`.
    AreaMismatch,
    /// Stored `bbox` differs from the box measured from `segmentation`.
    BBoxMismatch,
    /// Geometry extends outside the image.
    OutOfBounds,
}

/// Where an issue was found.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueContext {
    /// The dataset as a whole.
    Dataset,
    /// A specific image, by id.
    Image { id: u64 },
    /// A specific annotation, by id.
    Annotation { id: u64 },
    /// A specific category, by id.
    Category { id: u64 },
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Dataset => write!(f, "dataset"),
            IssueContext::Image { id } => write!(f, "image {}", id),
            IssueContext::Annotation { id } => write!(f, "annotation {}", id),
            IssueContext::Category { id } => write!(f, "category {}", id),
        }
    }
}
