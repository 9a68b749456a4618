//! Camera backends and streams

use crate::{CameraError, VideoFrame};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which way the camera should face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Rear camera, pointing at the scene
    #[default]
    Environment,
    /// Front camera, pointing at the user
    User,
}

/// Constraints passed to [`CameraBackend::acquire`]. Sizes are hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraRequest {
    pub facing: Facing,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraRequest {
    fn default() -> Self {
        Self {
            facing: Facing::Environment,
            width: 1280,
            height: 720,
        }
    }
}

/// What initiated a playback attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayTrigger {
    /// Started automatically after acquisition
    Autoplay,
    /// Started from an explicit user action
    UserGesture,
}

/// State of a media track on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Live,
    Ended,
}

/// An acquired video stream. Holds the device until [`VideoStream::stop`].
pub trait VideoStream: Send + Sync {
    /// Human-readable device label
    fn label(&self) -> &str;

    /// Start delivering frames. May refuse autoplay with
    /// [`CameraError::PlaybackBlocked`].
    fn play(&self, trigger: PlayTrigger) -> Result<(), CameraError>;

    /// Newest frame, `None` until playback has started
    fn latest_frame(&self) -> Option<VideoFrame>;

    /// Stop all tracks and release the device. Idempotent.
    fn stop(&self);

    fn tracks(&self) -> Vec<TrackState>;
}

/// A source of video streams
pub trait CameraBackend: Send + Sync {
    fn name(&self) -> &str;

    fn acquire(&self, request: &CameraRequest) -> Result<Arc<dyn VideoStream>, CameraError>;
}

/// Backend for environments without any camera capability
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCamera;

impl CameraBackend for NoCamera {
    fn name(&self) -> &str {
        "none"
    }

    fn acquire(&self, _request: &CameraRequest) -> Result<Arc<dyn VideoStream>, CameraError> {
        Err(CameraError::DeviceUnsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request() {
        let request = CameraRequest::default();
        assert_eq!(request.facing, Facing::Environment);
        assert_eq!((request.width, request.height), (1280, 720));
    }

    #[test]
    fn test_no_camera() {
        let result = NoCamera.acquire(&CameraRequest::default());
        assert!(matches!(result, Err(CameraError::DeviceUnsupported)));
    }
}
