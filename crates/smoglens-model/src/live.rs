//! Live inputs shared between the AQI feed and the render loop
//!
//! One writer (the feed) and one reader (the frame loop). Both sides only
//! ever need the latest value, so plain relaxed atomics are enough.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Sentinel for "no reading"; outside the `u32` range
const NO_READING: u64 = u64::MAX;

#[derive(Debug)]
struct Inner {
    aqi: AtomicU64,
    force_no_haze: AtomicBool,
}

/// Cloneable handle to the latest AQI reading and override flag
#[derive(Debug, Clone)]
pub struct LiveInputs {
    inner: Arc<Inner>,
}

impl LiveInputs {
    /// Start with no reading and haze enabled
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                aqi: AtomicU64::new(NO_READING),
                force_no_haze: AtomicBool::new(false),
            }),
        }
    }

    pub fn set_reading(&self, aqi: Option<u32>) {
        let raw = aqi.map_or(NO_READING, u64::from);
        self.inner.aqi.store(raw, Ordering::Relaxed);
    }

    pub fn clear_reading(&self) {
        self.set_reading(None);
    }

    pub fn set_force_no_haze(&self, force: bool) {
        self.inner.force_no_haze.store(force, Ordering::Relaxed);
    }

    pub fn reading(&self) -> Option<u32> {
        match self.inner.aqi.load(Ordering::Relaxed) {
            NO_READING => None,
            raw => u32::try_from(raw).ok(),
        }
    }

    pub fn force_no_haze(&self) -> bool {
        self.inner.force_no_haze.load(Ordering::Relaxed)
    }

    /// Read both values for the current frame
    pub fn snapshot(&self) -> (Option<u32>, bool) {
        (self.reading(), self.force_no_haze())
    }
}

impl Default for LiveInputs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_empty() {
        let live = LiveInputs::new();
        assert_eq!(live.snapshot(), (None, false));
    }

    #[test]
    fn test_writes_visible_through_clones() {
        let writer = LiveInputs::new();
        let reader = writer.clone();

        writer.set_reading(Some(275));
        writer.set_force_no_haze(true);
        assert_eq!(reader.snapshot(), (Some(275), true));

        writer.set_reading(Some(u32::MAX));
        assert_eq!(reader.reading(), Some(u32::MAX));

        writer.clear_reading();
        assert_eq!(reader.reading(), None);
    }
}
