//! Canonical JSON reader and writer.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use super::model::Dataset;
use crate::error::PolymaskError;

/// Reads a canonical dataset from a JSON file.
///
/// Missing `images`/`annotations`/`categories` keys read as empty lists;
/// the schema check before export turns that into an error.
pub fn read_canonical_json(path: &Path) -> Result<Dataset, PolymaskError> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| PolymaskError::JsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a canonical dataset to a JSON file (pretty-printed).
pub fn write_canonical_json(path: &Path, dataset: &Dataset) -> Result<(), PolymaskError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, dataset).map_err(|source| {
        PolymaskError::JsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })?;
    writer.flush()?;
    Ok(())
}

/// Parses a canonical dataset from a JSON string.
pub fn from_json_str(json: &str) -> Result<Dataset, serde_json::Error> {
    serde_json::from_str(json)
}

/// Serializes a canonical dataset to a pretty JSON string.
pub fn to_json_string(dataset: &Dataset) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;
    use crate::ir::{Annotation, Category, DatasetInfo, Image};

    fn sample_dataset() -> Dataset {
        Dataset {
            info: DatasetInfo {
                year: Some(2024),
                version: "1.0".into(),
                description: "leaves".into(),
                ..Default::default()
            },
            licenses: vec![],
            images: vec![Image::new(0u64, "leaf_01.jpg", 640, 480).with_source_url("http://x/leaf_01.jpg")],
            categories: vec![Category::new(1u64, "leaf"), Category::new(2u64, "stem")],
            annotations: vec![Annotation::from_segmentation(
                0u64,
                0u64,
                2u64,
                vec![Polygon::rectangle(1.5, 2.25, 10.0, 4.0)],
            )],
        }
    }

    #[test]
    fn json_keys_are_camel_case() {
        let json = to_json_string(&sample_dataset()).unwrap();
        for key in ["\"fileName\"", "\"sourceUrl\"", "\"dateCreated\"", "\"superCategory\"", "\"categoryId\""] {
            assert!(json.contains(key), "missing {key} in {json}");
        }
        assert!(!json.contains("capturedAt"));
    }

    #[test]
    fn file_roundtrip_keeps_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.json");
        let original = sample_dataset();
        write_canonical_json(&path, &original).unwrap();
        let restored = read_canonical_json(&path).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn parse_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = read_canonical_json(&path).unwrap_err();
        assert!(matches!(err, PolymaskError::JsonParse { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn missing_lists_read_as_empty() {
        let dataset = from_json_str(r#"{"info": {"version": "2"}}"#).unwrap();
        assert!(dataset.images.is_empty());
        assert_eq!(dataset.info.version, "2");
    }
}
