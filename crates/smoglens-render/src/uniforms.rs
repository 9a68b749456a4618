//! Haze shader uniforms

use bytemuck::{Pod, Zeroable};
use smoglens_model::SmogParams;

/// Uniform block shared by `haze.wgsl` and the CPU reference.
///
/// Layout matches the WGSL struct: three scalars, padding, then a
/// 16-byte aligned `vec3<f32>` tint.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct HazeUniforms {
    /// Seconds since the frame loop started
    pub time: f32,
    /// Haze opacity, unclamped
    pub intensity: f32,
    /// Blur radius in pixels
    pub blur_amount: f32,
    pub _pad0: f32,
    /// Normalized RGB tint
    pub tint_color: [f32; 3],
    pub _pad1: f32,
}

impl HazeUniforms {
    pub fn new(time: f32, params: &SmogParams) -> Self {
        Self {
            time,
            intensity: params.opacity,
            blur_amount: params.blur_radius,
            _pad0: 0.0,
            tint_color: params.tint.to_rgb(),
            _pad1: 0.0,
        }
    }

    /// Uniforms that leave the video untouched
    pub fn clear() -> Self {
        Self::new(0.0, &SmogParams::CLEAR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smoglens_model::derive;

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<HazeUniforms>(), 32);
        assert_eq!(std::mem::offset_of!(HazeUniforms, tint_color), 16);
    }

    #[test]
    fn test_from_params() {
        let params = derive(Some(275), false);
        let u = HazeUniforms::new(1.5, &params);
        assert_eq!(u.time, 1.5);
        assert_eq!(u.intensity, 0.45);
        assert_eq!(u.blur_amount, 3.0);
        assert_eq!(u.tint_color, [185.0 / 255.0, 180.0 / 255.0, 165.0 / 255.0]);
    }
}
