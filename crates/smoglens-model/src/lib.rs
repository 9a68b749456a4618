//! SmogLens Model - Air quality to haze parameters
//!
//! Pure data and functions shared by the renderer and the shell:
//! AQI tiers, the smog parameter derivation, legend rows, known
//! locations and the live input cell read by the render loop.

mod aqi;
mod color;
mod legend;
mod live;
mod location;
mod smog;

pub use aqi::{classify, classify_reading, AqiCategory, AqiLevel, AQI_LEVELS};
pub use color::Color;
pub use legend::{legend_rows, LegendRow};
pub use live::LiveInputs;
pub use location::{Location, LocationId};
pub use smog::{derive, SmogParams, CLEAR_TINT, SMOG_TINT};
