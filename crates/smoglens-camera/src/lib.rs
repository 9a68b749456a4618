//! SmogLens Camera - Live video sources
//!
//! Abstracts the camera device behind [`CameraBackend`] and
//! [`VideoStream`], and runs acquisition and playback start-up off the
//! render thread through [`CameraSession`].

mod error;
mod frame;
mod session;
mod source;
mod still;
mod synthetic;

pub use error::CameraError;
pub use frame::VideoFrame;
pub use session::{CameraSession, PlaybackState, SessionStatus};
pub use source::{CameraBackend, CameraRequest, Facing, NoCamera, PlayTrigger, TrackState, VideoStream};
pub use still::StillImageCamera;
pub use synthetic::{SyntheticCamera, SyntheticOptions};
