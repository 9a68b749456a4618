//! Still-image camera
//!
//! Serves a single decoded image file as a never-changing video feed.

use crate::{CameraBackend, CameraError, CameraRequest, PlayTrigger, TrackState, VideoFrame, VideoStream};
use image::ImageError;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Backend that decodes an image from disk on acquisition
#[derive(Debug, Clone)]
pub struct StillImageCamera {
    path: PathBuf,
}

impl StillImageCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn map_image_error(err: ImageError) -> CameraError {
    match err {
        ImageError::IoError(io) if io.kind() == ErrorKind::PermissionDenied => {
            CameraError::PermissionDenied
        }
        other => CameraError::AcquisitionFailed(other.to_string()),
    }
}

impl CameraBackend for StillImageCamera {
    fn name(&self) -> &str {
        "image"
    }

    fn acquire(&self, _request: &CameraRequest) -> Result<Arc<dyn VideoStream>, CameraError> {
        let image = image::open(&self.path).map_err(map_image_error)?.to_rgba8();
        info!(
            "Still image source {} ({}x{})",
            self.path.display(),
            image.width(),
            image.height()
        );

        Ok(Arc::new(StillStream {
            label: self.path.display().to_string(),
            frame: VideoFrame::new(1, image),
            playing: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }))
    }
}

struct StillStream {
    label: String,
    frame: VideoFrame,
    playing: AtomicBool,
    stopped: AtomicBool,
}

impl VideoStream for StillStream {
    fn label(&self) -> &str {
        &self.label
    }

    fn play(&self, _trigger: PlayTrigger) -> Result<(), CameraError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(CameraError::AcquisitionFailed("stream stopped".into()));
        }
        self.playing.store(true, Ordering::Release);
        Ok(())
    }

    fn latest_frame(&self) -> Option<VideoFrame> {
        let live = self.playing.load(Ordering::Acquire) && !self.stopped.load(Ordering::Acquire);
        live.then(|| self.frame.clone())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.playing.store(false, Ordering::Release);
    }

    fn tracks(&self) -> Vec<TrackState> {
        if self.stopped.load(Ordering::Acquire) {
            vec![TrackState::Ended]
        } else {
            vec![TrackState::Live]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_serves_decoded_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.png");
        RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255])).save(&path).unwrap();

        let stream = StillImageCamera::new(&path).acquire(&CameraRequest::default()).unwrap();
        assert!(stream.latest_frame().is_none());

        stream.play(PlayTrigger::Autoplay).unwrap();
        let frame = stream.latest_frame().unwrap();
        assert_eq!(frame.dimensions(), (4, 3));
        assert_eq!(frame.image.get_pixel(0, 0), &Rgba([10, 20, 30, 255]));

        stream.stop();
        assert_eq!(stream.tracks(), vec![TrackState::Ended]);
    }

    #[test]
    fn test_missing_file() {
        let result = StillImageCamera::new("/nonexistent/scene.png").acquire(&CameraRequest::default());
        assert!(matches!(result, Err(CameraError::AcquisitionFailed(_))));
    }
}
