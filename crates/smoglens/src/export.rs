//! Capture export
//!
//! Writes captured frames to disk as `<prefix>-<unix-millis>.jpg`. Captures
//! landing in the same millisecond get a `-<n>` counter before the extension.

use crate::config::CaptureConfig;
use smoglens_render::CapturedFrame;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to create capture directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write capture {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub struct CaptureExporter {
    directory: PathBuf,
    prefix: String,
}

impl CaptureExporter {
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
        }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(&config.directory, &config.prefix)
    }

    /// File name a frame will be saved under
    pub fn file_name(&self, frame: &CapturedFrame) -> String {
        format!("{}-{}.jpg", self.prefix, frame.timestamp_millis())
    }

    /// First path for `frame` not already taken in the capture directory
    fn free_path(&self, frame: &CapturedFrame) -> PathBuf {
        let path = self.directory.join(self.file_name(frame));
        if !path.exists() {
            return path;
        }
        let millis = frame.timestamp_millis();
        (1u32..)
            .map(|n| self.directory.join(format!("{}-{}-{}.jpg", self.prefix, millis, n)))
            .find(|candidate| !candidate.exists())
            .unwrap_or(path)
    }

    /// Write `frame` and return the path it was saved to
    pub fn export(&self, frame: &CapturedFrame) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(&self.directory).map_err(|source| ExportError::CreateDir {
            path: self.directory.clone(),
            source,
        })?;

        let path = self.free_path(frame);
        std::fs::write(&path, &frame.jpeg).map_err(|source| ExportError::Write {
            path: path.clone(),
            source,
        })?;

        info!("Saved capture to {} ({} bytes)", path.display(), frame.jpeg.len());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use smoglens_render::encode_jpeg;
    use std::time::{Duration, UNIX_EPOCH};

    fn frame() -> CapturedFrame {
        let pixels = RgbaImage::from_pixel(8, 4, Rgba([120, 130, 110, 255]));
        encode_jpeg(&pixels, 95).unwrap()
    }

    #[test]
    fn test_file_name() {
        let mut frame = frame();
        frame.captured_at = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        let exporter = CaptureExporter::new("out", "smog-capture");
        assert_eq!(exporter.file_name(&frame), "smog-capture-1700000000123.jpg");
    }

    #[test]
    fn test_export_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("captures");
        let exporter = CaptureExporter::new(&target, "haze");

        let frame = frame();
        let path = exporter.export(&frame).unwrap();
        assert!(path.starts_with(&target));
        assert_eq!(std::fs::read(&path).unwrap(), frame.jpeg);

        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
    }

    #[test]
    fn test_same_millisecond_captures_kept_apart() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CaptureExporter::new(dir.path(), "haze");

        let mut frame = frame();
        frame.captured_at = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        let first = exporter.export(&frame).unwrap();
        let second = exporter.export(&frame).unwrap();
        let third = exporter.export(&frame).unwrap();

        assert_eq!(first.file_name().unwrap(), "haze-1700000000123.jpg");
        assert_eq!(second.file_name().unwrap(), "haze-1700000000123-1.jpg");
        assert_eq!(third.file_name().unwrap(), "haze-1700000000123-2.jpg");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[test]
    fn test_export_into_file_fails() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let exporter = CaptureExporter::new(file.path(), "haze");
        assert!(matches!(exporter.export(&frame()), Err(ExportError::CreateDir { .. })));
    }
}
