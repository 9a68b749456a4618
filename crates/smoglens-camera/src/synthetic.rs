//! Synthetic test-pattern camera
//!
//! Produces an animated gradient so the compositor can run without a
//! physical device. Options let it refuse permission or autoplay.

use crate::{CameraBackend, CameraError, CameraRequest, PlayTrigger, TrackState, VideoFrame, VideoStream};
use image::{Rgba, RgbaImage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Interval between generated frames (~30 FPS)
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Behaviour switches for the synthetic camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticOptions {
    /// Allow playback to start without a user gesture
    pub autoplay: bool,
    /// Simulate the user declining camera access
    pub deny_permission: bool,
    /// Time each playback start takes, like a slow device warming up
    pub play_delay: Duration,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            autoplay: true,
            deny_permission: false,
            play_delay: Duration::ZERO,
        }
    }
}

/// Backend producing [`SyntheticStream`]s
#[derive(Debug, Clone, Default)]
pub struct SyntheticCamera {
    options: SyntheticOptions,
}

impl SyntheticCamera {
    pub fn new(options: SyntheticOptions) -> Self {
        Self { options }
    }
}

impl CameraBackend for SyntheticCamera {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn acquire(&self, request: &CameraRequest) -> Result<Arc<dyn VideoStream>, CameraError> {
        if self.options.deny_permission {
            return Err(CameraError::PermissionDenied);
        }
        if request.width == 0 || request.height == 0 {
            return Err(CameraError::AcquisitionFailed(format!(
                "invalid resolution {}x{}",
                request.width, request.height
            )));
        }

        info!(
            "Synthetic camera acquired ({}x{}, {:?})",
            request.width, request.height, request.facing
        );
        Ok(Arc::new(SyntheticStream::new(request.width, request.height, self.options)))
    }
}

struct Playback {
    started: Instant,
    last_frame: Option<(Instant, VideoFrame)>,
    seq: u64,
}

/// Animated gradient stream
pub struct SyntheticStream {
    width: u32,
    height: u32,
    autoplay: bool,
    play_delay: Duration,
    stopped: AtomicBool,
    playback: Mutex<Option<Playback>>,
}

impl SyntheticStream {
    fn new(width: u32, height: u32, options: SyntheticOptions) -> Self {
        Self {
            width,
            height,
            autoplay: options.autoplay,
            play_delay: options.play_delay,
            stopped: AtomicBool::new(false),
            playback: Mutex::new(None),
        }
    }

    fn render_pattern(&self, t: f32) -> RgbaImage {
        let (w, h) = (self.width as f32, self.height as f32);
        let shift = (t * 40.0) as u32;
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let u = x as f32 / w;
            let v = y as f32 / h;
            let sky = (1.0 - v) * 200.0;
            let band = ((x + shift) / 80) % 2 == 0;
            let ground = if v > 0.6 { if band { 90.0 } else { 60.0 } } else { 0.0 };
            Rgba([
                (sky * 0.5 + ground + u * 40.0) as u8,
                (sky * 0.7 + ground * 1.2) as u8,
                (sky + ground * 0.5) as u8,
                255,
            ])
        })
    }
}

impl VideoStream for SyntheticStream {
    fn label(&self) -> &str {
        "Synthetic test pattern"
    }

    fn play(&self, trigger: PlayTrigger) -> Result<(), CameraError> {
        if !self.play_delay.is_zero() {
            std::thread::sleep(self.play_delay);
        }
        if self.stopped.load(Ordering::Acquire) {
            return Err(CameraError::AcquisitionFailed("stream stopped".into()));
        }
        if trigger == PlayTrigger::Autoplay && !self.autoplay {
            debug!("Synthetic camera refusing autoplay");
            return Err(CameraError::PlaybackBlocked);
        }

        let mut playback = self.playback.lock().unwrap_or_else(|e| e.into_inner());
        if playback.is_none() {
            *playback = Some(Playback {
                started: Instant::now(),
                last_frame: None,
                seq: 0,
            });
        }
        Ok(())
    }

    fn latest_frame(&self) -> Option<VideoFrame> {
        if self.stopped.load(Ordering::Acquire) {
            return None;
        }

        let mut guard = self.playback.lock().unwrap_or_else(|e| e.into_inner());
        let playback = guard.as_mut()?;
        let now = Instant::now();

        if let Some((at, frame)) = &playback.last_frame {
            if now.duration_since(*at) < FRAME_INTERVAL {
                return Some(frame.clone());
            }
        }

        playback.seq += 1;
        let t = now.duration_since(playback.started).as_secs_f32();
        let frame = VideoFrame::new(playback.seq, self.render_pattern(t));
        playback.last_frame = Some((now, frame.clone()));
        Some(frame)
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            debug!("Synthetic camera tracks stopped");
            let mut playback = self.playback.lock().unwrap_or_else(|e| e.into_inner());
            *playback = None;
        }
    }

    fn tracks(&self) -> Vec<TrackState> {
        if self.stopped.load(Ordering::Acquire) {
            vec![TrackState::Ended]
        } else {
            vec![TrackState::Live]
        }
    }
}
