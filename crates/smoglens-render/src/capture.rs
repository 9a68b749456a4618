//! Still capture
//!
//! Readback pixels are JPEG-encoded for the export collaborator. A short
//! black flash follows each capture as feedback.

use crate::target::RenderError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;
use tracing::debug;

/// JPEG quality for captures (0-100)
pub const CAPTURE_QUALITY: u8 = 95;

/// How long the capture flash stays on screen
pub const FLASH_DURATION: Duration = Duration::from_millis(150);

/// Errors from taking a capture
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Camera is not active")]
    NotReady,

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Image encoding error: {0}")]
    Encode(String),
}

/// An encoded still frame
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// JPEG bytes
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: SystemTime,
}

impl CapturedFrame {
    /// Milliseconds since the Unix epoch, for file naming
    pub fn timestamp_millis(&self) -> u128 {
        self.captured_at
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default()
    }
}

/// Encode RGBA pixels as JPEG. Alpha is dropped.
pub fn encode_jpeg(pixels: &RgbaImage, quality: u8) -> Result<CapturedFrame, CaptureError> {
    let start = Instant::now();
    let rgb = DynamicImage::ImageRgba8(pixels.clone()).to_rgb8();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;

    debug!(
        "Encoded {}x{} capture ({} bytes) in {:?}",
        pixels.width(),
        pixels.height(),
        jpeg.len(),
        start.elapsed()
    );

    Ok(CapturedFrame {
        jpeg,
        width: pixels.width(),
        height: pixels.height(),
        captured_at: SystemTime::now(),
    })
}

/// Capture feedback flash
#[derive(Debug, Default, Clone, Copy)]
pub struct Flash {
    until: Option<Instant>,
}

impl Flash {
    pub fn trigger(&mut self, now: Instant) {
        self.until = Some(now + FLASH_DURATION);
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.until.is_some_and(|until| now < until)
    }
}
