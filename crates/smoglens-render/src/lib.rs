//! SmogLens Render - Haze compositing
//!
//! Composites a live video texture with an animated procedural haze
//! whose strength and tint follow the current AQI reading. The same
//! uniforms drive either the wgpu pipeline or a CPU pixel loop.

mod capture;
mod compositor;
mod frame_loop;
mod gpu;
mod haze;
mod software;
mod target;
mod uniforms;
mod view;

pub use capture::{encode_jpeg, CaptureError, CapturedFrame, Flash, CAPTURE_QUALITY, FLASH_DURATION};
pub use compositor::GpuCompositor;
pub use frame_loop::{FrameLoop, FrameTick};
pub use gpu::{GpuContext, GpuError, GpuOptions, MIN_TEXTURE_DIMENSION};
pub use haze::{fbm, haze_density, height_gradient, layered_noise, shade, value_noise, MAX_DENSITY};
pub use software::SoftwareCompositor;
pub use target::{CompositeTarget, RenderError};
pub use uniforms::HazeUniforms;
pub use view::{FrameReport, SmogView, ViewState};
