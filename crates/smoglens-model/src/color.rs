//! Color utilities

/// RGBA color with normalized channels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Neutral grey used when no reading is available
    pub const NO_DATA: Color = Color::rgb(0.42, 0.45, 0.5);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Build from 8-bit channels and a float alpha, as in `rgba(185, 180, 165, 0.3)`
    pub const fn from_rgb8(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a,
        }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Normalized RGB without alpha
    pub fn to_rgb(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// `#rrggbb` form for display
    pub fn to_hex_string(&self) -> String {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            channel(self.r),
            channel(self.g),
            channel(self.b)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb8_channels() {
        let c = Color::from_rgb8(255, 0, 51, 0.5);
        assert_eq!(c.to_rgb(), [1.0, 0.0, 0.2]);
        assert_eq!(c.a, 0.5);
    }

    #[test]
    fn test_hex_string() {
        assert_eq!(Color::from_rgb8(0x4a, 0xde, 0x80, 1.0).to_hex_string(), "#4ade80");
        assert_eq!(Color::rgb(1.5, -0.2, 0.5).to_hex_string(), "#ff0080");
    }

    #[test]
    fn test_with_alpha_keeps_channels() {
        let c = Color::from_rgb8(185, 180, 165, 1.0).with_alpha(0.3);
        assert_eq!(c.to_rgb(), Color::from_rgb8(185, 180, 165, 0.0).to_rgb());
        assert_eq!(c.a, 0.3);
    }
}
