//! Camera errors

use thiserror::Error;

/// Why the camera could not deliver video
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("Camera not supported in this environment")]
    DeviceUnsupported,

    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("Error accessing camera: {0}")]
    AcquisitionFailed(String),

    /// Autoplay was refused; a user-initiated start can recover
    #[error("Playback blocked until started manually")]
    PlaybackBlocked,
}

impl CameraError {
    /// Only blocked playback can be recovered without re-acquiring
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PlaybackBlocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable() {
        assert!(CameraError::PlaybackBlocked.is_recoverable());
        assert!(!CameraError::PermissionDenied.is_recoverable());
        assert!(!CameraError::AcquisitionFailed("busy".into()).is_recoverable());
    }

    #[test]
    fn test_messages() {
        let err = CameraError::AcquisitionFailed("device busy".into());
        assert_eq!(err.to_string(), "Error accessing camera: device busy");
    }
}
