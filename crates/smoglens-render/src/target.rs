//! Composite targets

use crate::gpu::GpuError;
use crate::HazeUniforms;
use image::RgbaImage;
use smoglens_camera::VideoFrame;
use thiserror::Error;

/// Rendering errors
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error("Render target already released")]
    Released,

    #[error("Readback failed: {0}")]
    Readback(String),
}

/// Something the haze composite can be drawn into.
///
/// The target keeps the last uploaded video frame as its texture, so
/// `video` is only `Some` when a newer frame has arrived.
pub trait CompositeTarget {
    /// Current viewport size in pixels
    fn viewport(&self) -> (u32, u32);

    fn resize(&mut self, width: u32, height: u32);

    /// Draw one frame. While `flash` is set the displayed frame is solid
    /// black, but [`CompositeTarget::read_back`] still sees the haze composite.
    fn draw(
        &mut self,
        uniforms: &HazeUniforms,
        video: Option<&VideoFrame>,
        flash: bool,
    ) -> Result<(), RenderError>;

    /// Read back the haze composite for the current uniforms
    fn read_back(&mut self) -> Result<RgbaImage, RenderError>;

    /// Free all resources. Must not fail; later calls are no-ops.
    fn release(&mut self);
}
