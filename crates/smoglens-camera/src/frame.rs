//! Decoded video frames

use image::RgbaImage;
use std::sync::Arc;

/// One RGBA video frame. Cheap to clone.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Increases with every new frame from the same stream
    pub seq: u64,
    pub image: Arc<RgbaImage>,
}

impl VideoFrame {
    pub fn new(seq: u64, image: RgbaImage) -> Self {
        Self {
            seq,
            image: Arc::new(image),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Raw RGBA bytes, row-major
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }
}
