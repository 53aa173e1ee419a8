//! Timestamped result files on disk

use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::render::AnnotatedFrame;
use crate::{DamageResult, Result, ScanError};

use super::controls::ResultSink;

/// Writes `result_YYYY_MM_DD_HH_MM_SS.jpg` plus a JSON sidecar per commit
///
/// Commits landing in the same second get a `_1`, `_2`, ... suffix.
#[derive(Debug, Clone)]
pub struct FileResultSink {
    directory: PathBuf,
    written: Vec<PathBuf>,
}

impl FileResultSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            written: Vec::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Image paths written so far
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// First unused image path for this result's timestamp
    fn image_path(&self, result: &DamageResult) -> PathBuf {
        let stem = format!("result_{}", result.timestamp.format("%Y_%m_%d_%H_%M_%S"));
        let mut candidate = self.directory.join(format!("{}.jpg", stem));
        let mut n = 1;
        while candidate.exists() {
            candidate = self.directory.join(format!("{}_{}.jpg", stem, n));
            n += 1;
        }
        candidate
    }
}

impl ResultSink for FileResultSink {
    fn save(&mut self, frame: &AnnotatedFrame, result: &DamageResult) -> Result<()> {
        std::fs::create_dir_all(&self.directory).map_err(|e| {
            ScanError::persistence(
                format!("Failed to create {}", self.directory.display()),
                e,
            )
        })?;

        let image_path = self.image_path(result);
        frame
            .image
            .save_with_format(&image_path, ImageFormat::Jpeg)
            .map_err(|e| {
                ScanError::persistence(format!("Failed to write {}", image_path.display()), e)
            })?;

        let json_path = image_path.with_extension("json");
        let json = serde_json::to_string_pretty(result)
            .map_err(|e| ScanError::persistence("Failed to serialize result", e))?;
        std::fs::write(&json_path, json).map_err(|e| {
            ScanError::persistence(format!("Failed to write {}", json_path.display()), e)
        })?;

        info!(path = %image_path.display(), "saved result");
        self.written.push(image_path);
        Ok(())
    }
}
