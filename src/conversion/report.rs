//! Per-conversion reports: counts in and out, plus every item that was
//! skipped, flagged or decided by policy.
//!
//! Mirrors [`crate::validation::ValidationReport`]: stable codes for
//! programmatic use, `Display` for the terminal, `Serialize` for JSON.

use serde::Serialize;
use std::fmt;

use crate::error::PolymaskError;

/// What happened during one conversion call.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ConversionReport {
    /// Source format id.
    pub from: String,
    /// Target format id.
    pub to: String,
    pub input: ConversionCounts,
    pub output: ConversionCounts,
    pub issues: Vec<ConversionIssue>,
}

impl ConversionReport {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            ..Default::default()
        }
    }

    pub fn add(&mut self, issue: ConversionIssue) {
        self.issues.push(issue);
    }

    /// Append every issue of `other`, keeping its order.
    pub fn extend(&mut self, other: impl IntoIterator<Item = ConversionIssue>) {
        self.issues.extend(other);
    }

    fn count(&self, severity: ConversionSeverity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Items that were dropped from the output.
    pub fn skipped_count(&self) -> usize {
        self.count(ConversionSeverity::Skipped)
    }

    pub fn warning_count(&self) -> usize {
        self.count(ConversionSeverity::Warning)
    }

    pub fn info_count(&self) -> usize {
        self.count(ConversionSeverity::Info)
    }

    /// True if any input item did not make it into the output.
    pub fn is_lossy(&self) -> bool {
        self.skipped_count() > 0
    }

    pub fn issues_with(&self, code: ConversionIssueCode) -> impl Iterator<Item = &ConversionIssue> {
        self.issues.iter().filter(move |i| i.code == code)
    }
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} -> {}", self.from, self.to)?;
        writeln!(f, "  input: {}", self.input)?;
        writeln!(f, "  output: {}", self.output)?;

        for (severity, title) in [
            (ConversionSeverity::Skipped, "Skipped"),
            (ConversionSeverity::Warning, "Warnings"),
            (ConversionSeverity::Info, "Notes"),
        ] {
            let count = self.count(severity);
            if count == 0 {
                continue;
            }
            writeln!(f)?;
            writeln!(f, "{title} ({count}):")?;
            for issue in self.issues.iter().filter(|i| i.severity == severity) {
                writeln!(f, "  - {issue}")?;
            }
        }
        Ok(())
    }
}

/// Counts of dataset elements on one side of a conversion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConversionCounts {
    pub images: usize,
    pub categories: usize,
    pub annotations: usize,
}

impl fmt::Display for ConversionCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} images, {} categories, {} annotations",
            self.images, self.categories, self.annotations
        )
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ConversionIssue {
    pub severity: ConversionSeverity,
    pub code: ConversionIssueCode,
    pub message: String,
    /// Which input item, e.g. `image 'a.png' record 3`.
    pub context: String,
}

impl ConversionIssue {
    pub fn new(
        severity: ConversionSeverity,
        code: ConversionIssueCode,
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            context: context.into(),
        }
    }

    pub fn skipped(
        code: ConversionIssueCode,
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::new(ConversionSeverity::Skipped, code, message, context)
    }

    pub fn warning(
        code: ConversionIssueCode,
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::new(ConversionSeverity::Warning, code, message, context)
    }

    pub fn info(
        code: ConversionIssueCode,
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::new(ConversionSeverity::Info, code, message, context)
    }

    /// Record a per-item error as a skipped item.
    ///
    /// Geometry and reference errors keep their own code; anything else is
    /// filed as an artifact write failure.
    pub fn skipped_for(err: &PolymaskError, context: impl Into<String>) -> Self {
        let (code, message) = match err {
            PolymaskError::Geometry { message, .. } => {
                (ConversionIssueCode::GeometryError, message.clone())
            }
            PolymaskError::Reference { message, .. } => {
                (ConversionIssueCode::ReferenceError, message.clone())
            }
            other => (ConversionIssueCode::ArtifactWriteFailed, other.to_string()),
        };
        Self::skipped(code, message, context)
    }
}

impl fmt::Display for ConversionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} in {}: {}", self.code, self.context, self.message)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionSeverity {
    /// The item was left out of the output.
    Skipped,
    /// The item was kept but looks suspicious.
    Warning,
    /// A policy note.
    Info,
}

/// Stable issue codes. Part of the JSON report schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionIssueCode {
    /// Odd coordinate count or fewer than three points.
    GeometryError,
    /// Unknown category id, or a mask value missing from the dictionary.
    ReferenceError,
    /// Polygon encloses no area; kept.
    ZeroArea,
    /// An enclosed hole was traced; it is not subtracted from the area.
    HoleNotSubtracted,
    /// Same-valued regions of one image were merged into one annotation.
    RegionsMerged,
    /// A category has no annotations in the output.
    UnusedCategory,
    /// Writing one image's artifact failed; siblings were unaffected.
    ArtifactWriteFailed,
    /// The image was not processed because the call was cancelled.
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_is_not_lossy() {
        let report = ConversionReport::new("polygon", "canonical");
        assert!(!report.is_lossy());
        assert_eq!(report.warning_count(), 0);
    }

    #[test]
    fn skipped_items_make_report_lossy() {
        let mut report = ConversionReport::new("polygon", "canonical");
        report.add(ConversionIssue::warning(
            ConversionIssueCode::ZeroArea,
            "zero area",
            "image 'a.png' record 0",
        ));
        assert!(!report.is_lossy());

        let err = PolymaskError::geometry("record 1", "odd coordinate count 5");
        report.add(ConversionIssue::skipped_for(&err, "image 'a.png' record 1"));
        assert!(report.is_lossy());
        assert_eq!(report.issues_with(ConversionIssueCode::GeometryError).count(), 1);
    }

    #[test]
    fn report_serializes_with_snake_case_codes() {
        let mut report = ConversionReport::new("canonical", "mask");
        report.input = ConversionCounts {
            images: 2,
            categories: 1,
            annotations: 3,
        };
        report.add(ConversionIssue::skipped(
            ConversionIssueCode::ArtifactWriteFailed,
            "disk full",
            "image 1",
        ));
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"from\":\"canonical\""));
        assert!(json.contains("\"severity\":\"skipped\""));
        assert!(json.contains("\"code\":\"artifact_write_failed\""));
    }

    #[test]
    fn display_groups_by_severity() {
        let mut report = ConversionReport::new("mask", "canonical");
        report.add(ConversionIssue::info(
            ConversionIssueCode::RegionsMerged,
            "2 regions of value 3 merged",
            "image 'm.png'",
        ));
        let text = report.to_string();
        assert!(text.contains("Notes (1):"));
        assert!(!text.contains("Skipped"));
    }
}
