//! Legend rows for the AQI tier table

use crate::aqi::{AqiCategory, AQI_LEVELS};
use crate::Color;

/// A displayable legend entry
#[derive(Debug, Clone, PartialEq)]
pub struct LegendRow {
    /// `0 - 50`, `51 - 100`, ... `400+`
    pub range: String,
    pub category: AqiCategory,
    pub color: Color,
    /// The current reading falls in this tier
    pub current: bool,
}

/// Build one row per tier, marking the tier holding `current_aqi`.
pub fn legend_rows(current_aqi: Option<u32>) -> Vec<LegendRow> {
    let mut rows = Vec::with_capacity(AQI_LEVELS.len());
    let mut lower: Option<u32> = None;

    for level in AQI_LEVELS.iter() {
        let range = match (lower, level.max) {
            (None, Some(max)) => format!("0 - {max}"),
            (Some(prev), Some(max)) => format!("{} - {max}", prev + 1),
            (Some(prev), None) => format!("{prev}+"),
            (None, None) => "0+".to_string(),
        };

        let above_lower = lower.is_none_or(|prev| current_aqi.is_some_and(|aqi| aqi > prev));
        let below_upper = current_aqi.is_some_and(|aqi| level.max.is_none_or(|max| aqi <= max));

        rows.push(LegendRow {
            range,
            category: level.category,
            color: level.color,
            current: above_lower && below_upper,
        });

        lower = level.max;
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_text() {
        let rows = legend_rows(None);
        let ranges: Vec<&str> = rows.iter().map(|r| r.range.as_str()).collect();
        assert_eq!(
            ranges,
            ["0 - 50", "51 - 100", "101 - 200", "201 - 300", "301 - 400", "400+"]
        );
    }

    #[test]
    fn test_current_marker() {
        let rows = legend_rows(Some(275));
        let current: Vec<AqiCategory> = rows.iter().filter(|r| r.current).map(|r| r.category).collect();
        assert_eq!(current, [AqiCategory::Poor]);

        let rows = legend_rows(Some(50));
        assert!(rows[0].current);
        assert!(!rows[1].current);

        let rows = legend_rows(Some(9000));
        assert!(rows[5].current);
        assert_eq!(rows.iter().filter(|r| r.current).count(), 1);
    }

    #[test]
    fn test_no_marker_without_reading() {
        assert!(legend_rows(None).iter().all(|r| !r.current));
    }
}
