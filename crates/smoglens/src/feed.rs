//! Keyboard-driven AQI feed
//!
//! Stands in for the air-quality and location collaborators. Each location
//! keeps its own reading; selecting a location publishes its reading and
//! override flag to the shared [`LiveInputs`].

use crate::config::LocationConfig;
use smoglens_model::{classify_reading, legend_rows, AqiCategory, LiveInputs, Location};
use tracing::info;

/// AQI change per nudge
pub const AQI_STEP: u32 = 25;

struct Entry {
    location: Location,
    reading: Option<u32>,
}

pub struct AqiFeed {
    entries: Vec<Entry>,
    selected: usize,
    live: LiveInputs,
}

impl AqiFeed {
    /// `locations` must not be empty
    pub fn new(locations: &[LocationConfig], selected: usize, live: LiveInputs) -> Self {
        let entries = locations
            .iter()
            .map(|entry| Entry {
                location: entry.location.clone(),
                reading: entry.aqi,
            })
            .collect::<Vec<_>>();

        let mut feed = Self {
            selected: selected.min(entries.len().saturating_sub(1)),
            entries,
            live,
        };
        feed.publish();
        feed
    }

    pub fn live(&self) -> &LiveInputs {
        &self.live
    }

    pub fn location(&self) -> Option<&Location> {
        self.entries.get(self.selected).map(|e| &e.location)
    }

    pub fn reading(&self) -> Option<u32> {
        self.entries.get(self.selected).and_then(|e| e.reading)
    }

    pub fn category(&self) -> AqiCategory {
        classify_reading(self.reading()).category
    }

    /// Switch location; out-of-range indices are ignored
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.entries.len() || index == self.selected {
            return false;
        }
        self.selected = index;
        self.publish();
        true
    }

    pub fn select_next(&mut self) -> bool {
        let next = (self.selected + 1) % self.entries.len().max(1);
        self.select(next)
    }

    /// Raise or lower the current reading by `steps` of [`AQI_STEP`].
    /// A missing reading counts as 0.
    pub fn nudge(&mut self, steps: i32) {
        let Some(entry) = self.entries.get_mut(self.selected) else {
            return;
        };
        let current = entry.reading.unwrap_or(0);
        let delta = steps.unsigned_abs().saturating_mul(AQI_STEP);
        entry.reading = Some(if steps >= 0 {
            current.saturating_add(delta)
        } else {
            current.saturating_sub(delta)
        });
        self.publish();
    }

    /// Drop the current reading, as if the station had no data
    pub fn clear_reading(&mut self) {
        if let Some(entry) = self.entries.get_mut(self.selected) {
            entry.reading = None;
        }
        self.publish();
    }

    /// Log the AQI legend with the current band marked
    pub fn log_legend(&self) {
        for row in legend_rows(self.reading()) {
            let marker = if row.current { ">" } else { " " };
            info!("{} {:>9}  {:<12} {}", marker, row.range, row.category.label(), row.color.to_hex_string());
        }
    }

    fn publish(&self) {
        let Some(entry) = self.entries.get(self.selected) else {
            return;
        };
        self.live.set_force_no_haze(entry.location.force_no_haze);
        self.live.set_reading(entry.reading);
        info!(
            "AQI for {}: {} ({})",
            entry.location.name,
            entry.reading.map_or_else(|| "--".to_string(), |aqi| aqi.to_string()),
            classify_reading(entry.reading).category
        );
    }
}
