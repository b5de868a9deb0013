//! Atomic per-image artifact output.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::PolymaskError;
use crate::ir::Image;

/// An output directory that artifacts are written into.
///
/// Each artifact goes to a temp file in the same directory and is renamed
/// into place only after it was written completely, so a failing image
/// never leaves a partial file behind.
#[derive(Debug, Clone)]
pub struct ArtifactSink {
    dir: PathBuf,
}

impl ArtifactSink {
    /// Open (and create if needed) `dir`. Safe to call on an existing
    /// directory.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, PolymaskError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `name` atomically through `write` and return its final path.
    pub fn write_atomic<F>(&self, name: &str, write: F) -> Result<PathBuf, PolymaskError>
    where
        F: FnOnce(&mut dyn Write) -> Result<(), PolymaskError>,
    {
        let path = self.dir.join(name);
        let mut tmp = tempfile::Builder::new()
            .prefix(".polymask-")
            .suffix(".part")
            .tempfile_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            write(&mut writer)?;
            writer.flush()?;
        }
        tmp.persist(&path).map_err(|err| PolymaskError::Io(err.error))?;
        Ok(path)
    }
}

/// `{imageId}_{fileName}{suffix}` with the file name made filesystem-safe.
pub fn artifact_name(image: &Image, suffix: &str) -> String {
    format!(
        "{}_{}{}",
        image.id,
        sanitize_filename::sanitize(&image.file_name),
        suffix
    )
}
