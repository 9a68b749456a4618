//! Software compositor
//!
//! Runs the haze shader as a CPU pixel loop into an in-memory RGBA
//! composite. Used for headless snapshots and wherever no GPU is
//! available.
//!
//! The capture flash only changes what is displayed; the composite is
//! shaded every frame and is what [`CompositeTarget::read_back`] returns.

use crate::haze::{haze_density, shade};
use crate::{CompositeTarget, HazeUniforms, RenderError};
use glam::{Vec2, Vec3};
use image::{Rgba, RgbaImage};
use smoglens_camera::VideoFrame;
use tracing::debug;

pub struct SoftwareCompositor {
    composite: Option<RgbaImage>,
    flashing: bool,
    texture: Option<VideoFrame>,
    width: u32,
    height: u32,
}

impl SoftwareCompositor {
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            composite: Some(RgbaImage::new(width, height)),
            flashing: false,
            texture: None,
            width,
            height,
        }
    }

    /// The bound video texture, if any frame was uploaded
    pub fn texture(&self) -> Option<&VideoFrame> {
        self.texture.as_ref()
    }

    /// Last haze composite, `None` once released
    pub fn composite(&self) -> Option<&RgbaImage> {
        self.composite.as_ref()
    }

    /// The last frame was drawn with the flash showing
    pub fn is_flashing(&self) -> bool {
        self.flashing
    }

    /// What the last frame put on screen
    pub fn displayed(&self) -> Option<RgbaImage> {
        let composite = self.composite.as_ref()?;
        if self.flashing {
            let (w, h) = composite.dimensions();
            Some(RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255])))
        } else {
            Some(composite.clone())
        }
    }

    fn texel(image: &RgbaImage, x: u32, y: u32) -> Vec3 {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        Vec3::new(r as f32, g as f32, b as f32) / 255.0
    }

    /// Bilinear sample with clamp-to-edge; `st` is top-left origin
    fn sample(image: &RgbaImage, st: Vec2) -> Vec3 {
        let (w, h) = image.dimensions();
        let x = (st.x * w as f32 - 0.5).clamp(0.0, (w - 1) as f32);
        let y = (st.y * h as f32 - 0.5).clamp(0.0, (h - 1) as f32);

        let (x0, y0) = (x.floor() as u32, y.floor() as u32);
        let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
        let (fx, fy) = (x - x0 as f32, y - y0 as f32);

        let top = Self::texel(image, x0, y0).lerp(Self::texel(image, x1, y0), fx);
        let bottom = Self::texel(image, x0, y1).lerp(Self::texel(image, x1, y1), fx);
        top.lerp(bottom, fy)
    }

    fn to_pixel(color: Vec3) -> Rgba<u8> {
        let c = (color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
        Rgba([c.x as u8, c.y as u8, c.z as u8, 255])
    }
}

impl CompositeTarget for SoftwareCompositor {
    fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        if self.composite.is_some() {
            self.composite = Some(RgbaImage::new(width, height));
        }
        debug!("Software compositor resized to {}x{}", width, height);
    }

    fn draw(
        &mut self,
        uniforms: &HazeUniforms,
        video: Option<&VideoFrame>,
        flash: bool,
    ) -> Result<(), RenderError> {
        let composite = self.composite.as_mut().ok_or(RenderError::Released)?;

        if let Some(frame) = video {
            self.texture = Some(frame.clone());
        }
        self.flashing = flash;

        let tint = Vec3::from_array(uniforms.tint_color);
        let (w, h) = (self.width as f32, self.height as f32);
        let texture = self.texture.as_ref().map(|frame| frame.image.as_ref());

        for (x, y, pixel) in composite.enumerate_pixels_mut() {
            let st = Vec2::new((x as f32 + 0.5) / w, (y as f32 + 0.5) / h);
            let uv = Vec2::new(st.x, 1.0 - st.y);

            let src = texture.map_or(Vec3::ZERO, |image| Self::sample(image, st));
            let density = haze_density(uv, uniforms.time, uniforms.intensity);
            *pixel = Self::to_pixel(shade(src, tint, density));
        }

        Ok(())
    }

    fn read_back(&mut self) -> Result<RgbaImage, RenderError> {
        self.composite.clone().ok_or(RenderError::Released)
    }

    fn release(&mut self) {
        if self.composite.take().is_some() {
            self.texture = None;
            self.flashing = false;
            debug!("Software compositor released");
        }
    }
}
