//! GPU setup for a window
//!
//! Picks an adapter that can present to the window the haze is drawn in
//! and opens a device whose texture limit fits both the camera frames and
//! the window itself.

use smoglens_camera::CameraRequest;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use wgpu::{
    Adapter, Device, DeviceDescriptor, Features, Instance, InstanceDescriptor, Limits,
    PowerPreference, Queue, RequestAdapterOptions, Surface,
};
use winit::window::Window;

/// Smallest 2D texture limit requested from the device
pub const MIN_TEXTURE_DIMENSION: u32 = 2048;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("No GPU adapter can present to this window")]
    NoAdapter,

    #[error("Failed to create device: {0}")]
    DeviceCreation(String),

    #[error("Surface error: {0}")]
    Surface(String),

    /// Surface was reconfigured; the frame should be skipped
    #[error("Surface lost or outdated")]
    SurfaceLost,

    #[error("Video frame {width}x{height} exceeds the {limit}px texture limit")]
    FrameTooLarge { width: u32, height: u32, limit: u32 },
}

/// How the window GPU is chosen and presented
#[derive(Debug, Clone)]
pub struct GpuOptions {
    /// Prefer the integrated GPU
    pub low_power: bool,
    /// Present once per display refresh
    pub vsync: bool,
    /// Largest video frame the haze pass must sample
    pub video_size: (u32, u32),
}

impl GpuOptions {
    /// Options sized for the frames `request` asks the camera for
    pub fn for_camera(request: &CameraRequest) -> Self {
        Self {
            low_power: true,
            vsync: true,
            video_size: (request.width, request.height),
        }
    }

    /// Texture edge the device has to support for the video and a
    /// `window` sized surface
    pub fn texture_dimension(&self, window: (u32, u32)) -> u32 {
        let (vw, vh) = self.video_size;
        vw.max(vh).max(window.0).max(window.1).max(MIN_TEXTURE_DIMENSION)
    }
}

/// Adapter, device and queue behind a window surface
pub struct GpuContext {
    pub adapter: Adapter,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
    /// Largest texture edge the device accepts
    pub max_texture_dimension: u32,
}

impl GpuContext {
    /// Create the window surface and a device able to present to it
    pub async fn for_window(
        window: Arc<Window>,
        options: &GpuOptions,
    ) -> Result<(Self, Surface<'static>), GpuError> {
        let size = window.inner_size();
        info!("Initializing GPU for window (low_power: {})", options.low_power);

        let instance = Instance::new(&InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| GpuError::Surface(e.to_string()))?;

        let power_preference = if options.low_power {
            PowerPreference::LowPower
        } else {
            PowerPreference::HighPerformance
        };
        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        info!("GPU adapter: {} ({:?})", adapter_info.name, adapter_info.backend);
        debug!("GPU driver: {} (vendor: {})", adapter_info.driver, adapter_info.vendor);

        let wanted = options.texture_dimension((size.width, size.height));
        let supported = adapter.limits().max_texture_dimension_2d;
        let max_texture_dimension = clamp_texture_dimension(wanted, supported);
        if max_texture_dimension < wanted {
            warn!(
                "Adapter caps textures at {}px, {}px requested",
                supported, wanted
            );
        }

        let limits = Limits {
            max_texture_dimension_2d: max_texture_dimension,
            ..Limits::downlevel_webgl2_defaults()
        };
        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("SmogLens GPU Device"),
                    required_features: Features::empty(),
                    required_limits: limits,
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                },
                None,
            )
            .await
            .map_err(|e| GpuError::DeviceCreation(e.to_string()))?;

        device.on_uncaptured_error(Box::new(|error| {
            warn!("wgpu error: {}", error);
        }));
        debug!("Texture limit {}px", max_texture_dimension);

        let gpu = Self {
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
            max_texture_dimension,
        };
        Ok((gpu, surface))
    }

    /// Reject video frames the device cannot hold as a texture
    pub fn check_frame(&self, width: u32, height: u32) -> Result<(), GpuError> {
        check_frame(width, height, self.max_texture_dimension)
    }
}

fn clamp_texture_dimension(wanted: u32, supported: u32) -> u32 {
    wanted.min(supported)
}

fn check_frame(width: u32, height: u32, limit: u32) -> Result<(), GpuError> {
    if width > limit || height > limit {
        return Err(GpuError::FrameTooLarge { width, height, limit });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use smoglens_camera::Facing;

    #[test]
    fn test_options_follow_camera_request() {
        let request = CameraRequest {
            facing: Facing::Environment,
            width: 3840,
            height: 2160,
        };
        let options = GpuOptions::for_camera(&request);
        assert_eq!(options.video_size, (3840, 2160));
        assert_eq!(options.texture_dimension((1280, 720)), 3840);
    }

    #[test]
    fn test_texture_dimension_covers_window_and_floor() {
        let options = GpuOptions::for_camera(&CameraRequest::default());
        assert_eq!(options.texture_dimension((800, 600)), MIN_TEXTURE_DIMENSION);
        assert_eq!(options.texture_dimension((5120, 1440)), 5120);
    }

    #[test]
    fn test_texture_dimension_clamped_to_adapter() {
        assert_eq!(clamp_texture_dimension(3840, 8192), 3840);
        assert_eq!(clamp_texture_dimension(16384, 8192), 8192);
    }

    #[test]
    fn test_oversized_frames_rejected() {
        assert!(check_frame(1280, 720, 2048).is_ok());
        assert!(check_frame(2048, 2048, 2048).is_ok());
        assert!(matches!(
            check_frame(3840, 2160, 2048),
            Err(GpuError::FrameTooLarge { width: 3840, height: 2160, limit: 2048 })
        ));
    }
}
