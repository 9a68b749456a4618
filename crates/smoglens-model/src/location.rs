//! Known locations

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable location identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub String);

impl LocationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A selectable city
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    /// Monitoring station used by the AQI provider
    pub station_id: String,
    /// Render without haze regardless of the reported AQI
    #[serde(default)]
    pub force_no_haze: bool,
}

impl Location {
    pub fn new(id: &str, name: &str, station_id: &str) -> Self {
        Self {
            id: LocationId::new(id),
            name: name.to_string(),
            station_id: station_id.to_string(),
            force_no_haze: false,
        }
    }

    pub fn with_force_no_haze(mut self, force_no_haze: bool) -> Self {
        self.force_no_haze = force_no_haze;
        self
    }

    /// Built-in city list
    pub fn defaults() -> Vec<Location> {
        vec![
            Location::new("delhi", "Delhi", "3715"),
            Location::new("bangalore", "Bangalore", "8190"),
            Location::new("mangalore", "Mangalore", "13719").with_force_no_haze(true),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cities = Location::defaults();
        assert_eq!(cities.len(), 3);
        assert_eq!(cities[0].id.as_str(), "delhi");
        assert!(!cities[1].force_no_haze);
        assert!(cities[2].force_no_haze);
    }

    #[test]
    fn test_force_no_haze_defaults_off() {
        let json = r#"{"id":"pune","name":"Pune","station_id":"1"}"#;
        let loc: Location = serde_json::from_str(json).unwrap();
        assert_eq!(loc.id, LocationId::new("pune"));
        assert!(!loc.force_no_haze);
    }
}
