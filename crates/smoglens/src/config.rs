//! Application configuration
//!
//! Loaded from the JSON file named by `SMOGLENS_CONFIG`, else
//! `smoglens.json` in the working directory, else built-in defaults.
//! Every field has a default so partial files are accepted.

use serde::{Deserialize, Serialize};
use smoglens_camera::{
    CameraBackend, CameraRequest, Facing, NoCamera, StillImageCamera, SyntheticCamera,
    SyntheticOptions,
};
use smoglens_model::{Location, LocationId};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable holding an explicit config path
pub const CONFIG_ENV: &str = "SMOGLENS_CONFIG";

/// Config file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "smoglens.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("At least one location must be configured")]
    NoLocations,

    #[error("Duplicate location id '{0}'")]
    DuplicateLocation(String),

    #[error("Default location '{0}' is not configured")]
    UnknownDefaultLocation(String),

    #[error("{0} must be non-zero")]
    ZeroSize(&'static str),

    #[error("JPEG quality {0} is outside 1..=100")]
    Quality(u8),

    #[error("Image camera source needs an image_path")]
    MissingImagePath,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    /// Prefer an integrated GPU
    pub low_power: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "SmogLens".into(),
            width: 1280,
            height: 720,
            vsync: true,
            low_power: true,
        }
    }
}

/// Where video frames come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraSource {
    /// Animated test pattern
    #[default]
    Synthetic,
    /// A still image file
    Image,
    /// No device; the view reports an unsupported camera
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub source: CameraSource,
    pub image_path: Option<PathBuf>,
    pub facing: Facing,
    pub width: u32,
    pub height: u32,
    /// Let playback start without a user gesture
    pub autoplay: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let request = CameraRequest::default();
        Self {
            source: CameraSource::Synthetic,
            image_path: None,
            facing: request.facing,
            width: request.width,
            height: request.height,
            autoplay: true,
        }
    }
}

impl CameraConfig {
    pub fn request(&self) -> CameraRequest {
        CameraRequest {
            facing: self.facing,
            width: self.width,
            height: self.height,
        }
    }

    pub fn backend(&self) -> Result<Arc<dyn CameraBackend>, ConfigError> {
        let backend: Arc<dyn CameraBackend> = match self.source {
            CameraSource::Synthetic => Arc::new(SyntheticCamera::new(SyntheticOptions {
                autoplay: self.autoplay,
                ..SyntheticOptions::default()
            })),
            CameraSource::Image => {
                let path = self.image_path.as_ref().ok_or(ConfigError::MissingImagePath)?;
                Arc::new(StillImageCamera::new(path))
            }
            CameraSource::None => Arc::new(NoCamera),
        };
        Ok(backend)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub directory: PathBuf,
    pub prefix: String,
    pub quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("captures"),
            prefix: "smog-capture".into(),
            quality: smoglens_render::CAPTURE_QUALITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Interactive window
    #[default]
    Window,
    /// Render offscreen, capture once and exit
    Headless,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlessConfig {
    /// Frames to render before capturing
    pub frames: u32,
    pub width: u32,
    pub height: u32,
    /// Seconds to wait for the camera
    pub camera_timeout_secs: u64,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            frames: 60,
            width: 640,
            height: 360,
            camera_timeout_secs: 5,
        }
    }
}

/// A location plus the reading the feed starts from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(flatten)]
    pub location: Location,
    #[serde(default)]
    pub aqi: Option<u32>,
}

fn default_locations() -> Vec<LocationConfig> {
    Location::defaults()
        .into_iter()
        .map(|location| {
            let aqi = match location.id.as_str() {
                "delhi" => Some(275),
                "bangalore" => Some(85),
                _ => Some(40),
            };
            LocationConfig { location, aqi }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mode: RunMode,
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub capture: CaptureConfig,
    pub headless: HeadlessConfig,
    pub locations: Vec<LocationConfig>,
    pub default_location: LocationId,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            capture: CaptureConfig::default(),
            headless: HeadlessConfig::default(),
            locations: default_locations(),
            default_location: LocationId::new("delhi"),
        }
    }
}

impl AppConfig {
    /// Resolve and load the configuration, then validate it
    pub fn load() -> Result<Self, ConfigError> {
        let config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                debug!("No config file, using defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.locations.is_empty() {
            return Err(ConfigError::NoLocations);
        }

        let mut seen = HashSet::new();
        for entry in &self.locations {
            if !seen.insert(entry.location.id.as_str()) {
                return Err(ConfigError::DuplicateLocation(entry.location.id.to_string()));
            }
        }
        if !seen.contains(self.default_location.as_str()) {
            return Err(ConfigError::UnknownDefaultLocation(self.default_location.to_string()));
        }

        let sizes = [
            ("window.width", self.window.width),
            ("window.height", self.window.height),
            ("camera.width", self.camera.width),
            ("camera.height", self.camera.height),
            ("headless.width", self.headless.width),
            ("headless.height", self.headless.height),
            ("headless.frames", self.headless.frames),
        ];
        if let Some(&(name, _)) = sizes.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::ZeroSize(name));
        }

        if !(1..=100).contains(&self.capture.quality) {
            return Err(ConfigError::Quality(self.capture.quality));
        }
        if self.camera.source == CameraSource::Image && self.camera.image_path.is_none() {
            return Err(ConfigError::MissingImagePath);
        }
        Ok(())
    }

    /// Index of the default location in `locations`
    pub fn default_location_index(&self) -> usize {
        self.locations
            .iter()
            .position(|entry| entry.location.id == self.default_location)
            .unwrap_or(0)
    }
}
