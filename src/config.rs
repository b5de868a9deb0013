//! Caller-supplied dataset metadata.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PolymaskError;
use crate::ir::{DatasetInfo, License};

/// License attached to every image of a converted dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseConfig {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// Metadata written into the `info` and `licenses` blocks of a canonical
/// dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataConfig {
    pub version: String,
    pub description: String,
    pub contributor: String,
    pub url: String,
    /// Defaults to the current year.
    pub year: Option<i32>,
    pub license: Option<LicenseConfig>,
}

impl MetadataConfig {
    /// Read a metadata file.
    pub fn load(path: &Path) -> Result<Self, PolymaskError> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| PolymaskError::JsonParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build the `info` block, stamped with `now`.
    pub fn dataset_info(&self, now: chrono::DateTime<chrono::Utc>) -> DatasetInfo {
        use chrono::Datelike;

        DatasetInfo {
            year: Some(self.year.unwrap_or_else(|| now.year())),
            version: self.version.clone(),
            description: self.description.clone(),
            contributor: self.contributor.clone(),
            url: self.url.clone(),
            date_created: now.to_rfc3339(),
        }
    }

    /// The configured license as license id 1, if any.
    pub fn license(&self) -> Option<License> {
        self.license
            .as_ref()
            .map(|l| License::new(1u64, l.name.as_str(), l.url.as_str()))
    }
}
