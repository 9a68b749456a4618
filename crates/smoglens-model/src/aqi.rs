//! AQI category tiers
//!
//! Six tiers with inclusive upper bounds. The first tier whose bound is
//! `>= aqi` wins, so a boundary value belongs to the lower tier.

use crate::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Human-readable AQI category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AqiCategory {
    Good,
    Satisfactory,
    Moderate,
    Poor,
    VeryPoor,
    Severe,
    /// No reading available
    Unknown,
}

impl AqiCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Satisfactory => "Satisfactory",
            Self::Moderate => "Moderate",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
            Self::Severe => "Severe",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the tier table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AqiLevel {
    /// Inclusive upper bound, `None` for the open-ended last tier
    pub max: Option<u32>,
    pub category: AqiCategory,
    pub color: Color,
}

impl AqiLevel {
    const fn new(max: Option<u32>, category: AqiCategory, color: Color) -> Self {
        Self { max, category, color }
    }

    fn contains_upper(&self, aqi: u32) -> bool {
        self.max.is_none_or(|max| aqi <= max)
    }

    pub fn label(&self) -> &'static str {
        self.category.label()
    }
}

/// Tier table, ordered ascending by upper bound
pub const AQI_LEVELS: [AqiLevel; 6] = [
    AqiLevel::new(Some(50), AqiCategory::Good, Color::from_rgb8(0x4a, 0xde, 0x80, 1.0)),
    AqiLevel::new(Some(100), AqiCategory::Satisfactory, Color::from_rgb8(0x84, 0xcc, 0x16, 1.0)),
    AqiLevel::new(Some(200), AqiCategory::Moderate, Color::from_rgb8(0xea, 0xb3, 0x08, 1.0)),
    AqiLevel::new(Some(300), AqiCategory::Poor, Color::from_rgb8(0xf9, 0x73, 0x16, 1.0)),
    AqiLevel::new(Some(400), AqiCategory::VeryPoor, Color::from_rgb8(0xef, 0x44, 0x44, 1.0)),
    AqiLevel::new(None, AqiCategory::Severe, Color::from_rgb8(0x7f, 0x1d, 0x1d, 1.0)),
];

const UNKNOWN_LEVEL: AqiLevel = AqiLevel::new(None, AqiCategory::Unknown, Color::NO_DATA);

/// Classify an AQI value into its display tier
pub fn classify(aqi: u32) -> AqiLevel {
    AQI_LEVELS
        .iter()
        .find(|level| level.contains_upper(aqi))
        .copied()
        .unwrap_or(AQI_LEVELS[AQI_LEVELS.len() - 1])
}

/// Classify a possibly missing reading; absent readings are `Unknown`
pub fn classify_reading(aqi: Option<u32>) -> AqiLevel {
    aqi.map(classify).unwrap_or(UNKNOWN_LEVEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_belong_to_lower_tier() {
        assert_eq!(classify(50).category, AqiCategory::Good);
        assert_eq!(classify(51).category, AqiCategory::Satisfactory);
        assert_eq!(classify(100).category, AqiCategory::Satisfactory);
        assert_eq!(classify(101).category, AqiCategory::Moderate);
        assert_eq!(classify(300).category, AqiCategory::Poor);
        assert_eq!(classify(400).category, AqiCategory::VeryPoor);
        assert_eq!(classify(401).category, AqiCategory::Severe);
    }

    #[test]
    fn test_extremes() {
        assert_eq!(classify(0).category, AqiCategory::Good);
        assert_eq!(classify(100_000).category, AqiCategory::Severe);
        assert_eq!(classify(u32::MAX).category, AqiCategory::Severe);
    }

    #[test]
    fn test_labels_and_colors() {
        let poor = classify(275);
        assert_eq!(poor.label(), "Poor");
        assert_eq!(poor.color.to_hex_string(), "#f97316");
        assert_eq!(classify(350).label(), "Very Poor");
    }

    #[test]
    fn test_missing_reading() {
        let level = classify_reading(None);
        assert_eq!(level.category, AqiCategory::Unknown);
        assert_eq!(level.color, Color::NO_DATA);
        assert_eq!(classify_reading(Some(42)).category, AqiCategory::Good);
    }

    #[test]
    fn test_table_is_ascending() {
        let bounds: Vec<u32> = AQI_LEVELS.iter().filter_map(|l| l.max).collect();
        assert!(bounds.windows(2).all(|w| w[0] < w[1]));
        assert!(AQI_LEVELS[AQI_LEVELS.len() - 1].max.is_none());
    }
}
