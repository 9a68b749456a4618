//! Smog parameter derivation
//!
//! Maps an AQI reading to the haze strength, blur radius and tint the
//! compositor uses. Called once per rendered frame, so it stays a
//! constant-time pure function.

use crate::Color;

/// Warm grey-beige haze tint; alpha is replaced by the derived opacity
pub const SMOG_TINT: Color = Color::from_rgb8(185, 180, 165, 1.0);

/// Tint returned when haze is forced off
pub const CLEAR_TINT: Color = Color::from_rgb8(200, 200, 180, 0.0);

/// Readings above this saturate the severe tier
const SEVERE_BASE: u32 = 300;
const SEVERE_SPAN: f32 = 400.0;

/// Visual parameters for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmogParams {
    /// Haze strength. Reaches 1.1 in the severe tier, see [`Self::blend_alpha`]
    pub opacity: f32,
    /// Blur radius in pixels
    pub blur_radius: f32,
    /// Tint with alpha equal to `opacity`
    pub tint: Color,
}

impl SmogParams {
    /// No haze at all
    pub const CLEAR: SmogParams = SmogParams {
        opacity: 0.0,
        blur_radius: 0.0,
        tint: CLEAR_TINT,
    };

    fn tinted(opacity: f32, blur_radius: f32) -> Self {
        Self {
            opacity,
            blur_radius,
            tint: SMOG_TINT.with_alpha(opacity),
        }
    }

    /// Opacity clamped to a valid blend alpha
    pub fn blend_alpha(&self) -> f32 {
        self.opacity.clamp(0.0, 1.0)
    }

    pub fn is_clear(&self) -> bool {
        self.opacity == 0.0 && self.blur_radius == 0.0
    }
}

/// Derive haze parameters from a reading and the location override.
///
/// `force_no_haze` wins over any reading. A missing reading renders as
/// AQI 0.
pub fn derive(aqi: Option<u32>, force_no_haze: bool) -> SmogParams {
    if force_no_haze {
        return SmogParams::CLEAR;
    }

    match aqi.unwrap_or(0) {
        0..=50 => SmogParams::tinted(0.0, 0.0),
        51..=100 => SmogParams::tinted(0.05, 0.2),
        101..=200 => SmogParams::tinted(0.3, 1.5),
        201..=300 => SmogParams::tinted(0.45, 3.0),
        severe => {
            let ratio = ((severe - SEVERE_BASE) as f32 / SEVERE_SPAN).min(1.0);
            SmogParams::tinted(1.0 + ratio * 0.1, 8.0 + ratio * 4.0)
        }
    }
}
