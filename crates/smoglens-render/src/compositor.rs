//! GPU compositor
//!
//! One full-viewport quad, one video texture and one haze pipeline,
//! presented straight to the window surface. AQI changes only touch the
//! uniform buffer; the video texture is reallocated only when the incoming
//! frame size changes.

use crate::gpu::{GpuContext, GpuError, GpuOptions};
use crate::{CompositeTarget, HazeUniforms, RenderError};
use image::RgbaImage;
use smoglens_camera::VideoFrame;
use std::sync::Arc;
use tracing::{debug, info};
use wgpu::{
    BindGroup, BindGroupLayout, Buffer, CommandEncoder, Device, Queue, RenderPipeline, Sampler,
    Surface, SurfaceConfiguration, SurfaceTexture, Texture, TextureFormat, TextureView,
};
use winit::window::Window;

const VIDEO_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

struct VideoTexture {
    texture: Texture,
    view: TextureView,
    size: (u32, u32),
}

impl VideoTexture {
    fn new(device: &Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Video Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: VIDEO_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            size: (width, height),
        }
    }

    fn upload(&self, queue: &Queue, frame: &VideoFrame) {
        let (width, height) = self.size;
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            frame.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }
}

/// GPU-side resources of the haze pass
struct HazeResources {
    pipeline: RenderPipeline,
    bind_group_layout: BindGroupLayout,
    bind_group: BindGroup,
    uniform_buffer: Buffer,
    sampler: Sampler,
    video: VideoTexture,
}

impl HazeResources {
    fn new(device: &Device, queue: &Queue, format: TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Haze Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/haze.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Haze Uniforms"),
            size: std::mem::size_of::<HazeUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&uniform_buffer, 0, bytemuck::bytes_of(&HazeUniforms::clear()));

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Video Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Haze Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Haze Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Haze Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // Until the camera delivers, sample a single black texel
        let video = VideoTexture::new(device, 1, 1);
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &video.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[0, 0, 0, 255],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );

        let bind_group = Self::bind(device, &bind_group_layout, &uniform_buffer, &video.view, &sampler);

        Self {
            pipeline,
            bind_group_layout,
            bind_group,
            uniform_buffer,
            sampler,
            video,
        }
    }

    fn bind(
        device: &Device,
        layout: &BindGroupLayout,
        uniforms: &Buffer,
        video: &TextureView,
        sampler: &Sampler,
    ) -> BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Haze Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(video),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    fn upload_video(&mut self, device: &Device, queue: &Queue, frame: &VideoFrame) {
        let size = frame.dimensions();
        if size != self.video.size {
            debug!("Video texture resized to {}x{}", size.0, size.1);
            self.video.texture.destroy();
            self.video = VideoTexture::new(device, size.0, size.1);
            self.bind_group = Self::bind(
                device,
                &self.bind_group_layout,
                &self.uniform_buffer,
                &self.video.view,
                &self.sampler,
            );
        }
        self.video.upload(queue, frame);
    }

    fn encode(&self, encoder: &mut CommandEncoder, target: &TextureView, draw_quad: bool) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Haze Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if draw_quad {
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.draw(0..6, 0..1);
        }
    }

    fn destroy(self) {
        self.video.texture.destroy();
        self.uniform_buffer.destroy();
    }
}

/// Clamp a requested surface size to what the device can configure
fn surface_size(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    (width.clamp(1, max_dimension), height.clamp(1, max_dimension))
}

/// Window surface the composite is presented on
struct WindowSurface {
    surface: Surface<'static>,
    config: SurfaceConfiguration,
    max_dimension: u32,
}

impl WindowSurface {
    fn new(gpu: &GpuContext, surface: Surface<'static>, size: (u32, u32), vsync: bool) -> Result<Self, GpuError> {
        let caps = surface.get_capabilities(&gpu.adapter);

        // Shader math runs on encoded values, matching the video bytes
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| GpuError::Surface("no supported surface formats".into()))?;

        let (width, height) = surface_size(size.0, size.1, gpu.max_texture_dimension);
        let config = SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            desired_maximum_frame_latency: 2,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&gpu.device, &config);
        debug!("Surface {}x{} {:?}", width, height, format);

        Ok(Self {
            surface,
            config,
            max_dimension: gpu.max_texture_dimension,
        })
    }

    fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn format(&self) -> TextureFormat {
        self.config.format
    }

    fn resize(&mut self, device: &Device, width: u32, height: u32) {
        let size = surface_size(width, height, self.max_dimension);
        if size == self.size() {
            return;
        }
        (self.config.width, self.config.height) = size;
        self.surface.configure(device, &self.config);
        debug!("Surface resized to {}x{}", size.0, size.1);
    }

    fn acquire(&self, device: &Device) -> Result<SurfaceTexture, GpuError> {
        match self.surface.get_current_texture() {
            Ok(output) => Ok(output),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(device, &self.config);
                Err(GpuError::SurfaceLost)
            }
            Err(e) => Err(GpuError::Surface(e.to_string())),
        }
    }
}

/// Haze compositor presenting to a window
pub struct GpuCompositor {
    gpu: GpuContext,
    surface: Option<WindowSurface>,
    resources: Option<HazeResources>,
}

impl GpuCompositor {
    /// Set up the GPU, the window surface and the haze pipeline
    pub async fn for_window(window: Arc<Window>, options: GpuOptions) -> Result<Self, GpuError> {
        let size = window.inner_size();
        let (gpu, surface) = GpuContext::for_window(window, &options).await?;
        let surface = WindowSurface::new(&gpu, surface, (size.width, size.height), options.vsync)?;
        let resources = HazeResources::new(&gpu.device, &gpu.queue, surface.format());

        let (width, height) = surface.size();
        info!("Haze compositor ready ({}x{}, {:?})", width, height, surface.format());

        Ok(Self {
            gpu,
            surface: Some(surface),
            resources: Some(resources),
        })
    }

    /// Name of the adapter in use
    pub fn adapter_name(&self) -> String {
        self.gpu.adapter.get_info().name
    }

    fn parts(&self) -> Result<(&WindowSurface, &HazeResources), RenderError> {
        match (&self.surface, &self.resources) {
            (Some(surface), Some(resources)) => Ok((surface, resources)),
            _ => Err(RenderError::Released),
        }
    }

    /// Render the composite into an offscreen texture and copy it out
    fn render_offscreen(&self) -> Result<RgbaImage, RenderError> {
        let (surface, resources) = self.parts()?;
        let (width, height) = surface.size();
        let format = surface.format();
        let device = &self.gpu.device;

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Capture Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let unpadded = 4 * width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Capture Readback"),
            size: (padded * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Capture Encoder"),
        });
        resources.encode(&mut encoder, &view, true);
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = crossbeam_channel::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|e| RenderError::Readback(e.to_string()))?
            .map_err(|e| RenderError::Readback(e.to_string()))?;

        let swap_rb = matches!(format, TextureFormat::Bgra8Unorm | TextureFormat::Bgra8UnormSrgb);
        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks_exact(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        buffer.unmap();
        buffer.destroy();
        texture.destroy();

        if swap_rb {
            pixels.chunks_exact_mut(4).for_each(|px| px.swap(0, 2));
        }

        RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| RenderError::Readback("pixel buffer size mismatch".into()))
    }
}

impl CompositeTarget for GpuCompositor {
    fn viewport(&self) -> (u32, u32) {
        self.surface.as_ref().map(|s| s.size()).unwrap_or((0, 0))
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Some(surface) = &mut self.surface {
            surface.resize(&self.gpu.device, width, height);
        }
    }

    fn draw(
        &mut self,
        uniforms: &HazeUniforms,
        video: Option<&VideoFrame>,
        flash: bool,
    ) -> Result<(), RenderError> {
        let resources = self.resources.as_mut().ok_or(RenderError::Released)?;

        self.gpu.queue.write_buffer(&resources.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
        if let Some(frame) = video {
            let (width, height) = frame.dimensions();
            self.gpu.check_frame(width, height)?;
            resources.upload_video(&self.gpu.device, &self.gpu.queue, frame);
        }

        let (surface, resources) = self.parts()?;
        let output = surface.acquire(&self.gpu.device)?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });
        resources.encode(&mut encoder, &view, !flash);
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn read_back(&mut self) -> Result<RgbaImage, RenderError> {
        self.render_offscreen()
    }

    fn release(&mut self) {
        let had_resources = self.resources.is_some();
        if let Some(resources) = self.resources.take() {
            resources.destroy();
        }
        self.surface = None;
        if had_resources {
            info!("Haze compositor released");
        }
    }
}

impl Drop for GpuCompositor {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_size_clamped() {
        assert_eq!(surface_size(1280, 720, 2048), (1280, 720));
        assert_eq!(surface_size(0, 0, 2048), (1, 1));
        assert_eq!(surface_size(5120, 1440, 4096), (4096, 1440));
    }
}
