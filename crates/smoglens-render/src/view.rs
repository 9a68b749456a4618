//! Mounted smog view
//!
//! Ties a camera session, a composite target and the live AQI inputs
//! together for the lifetime of one on-screen view. The host calls
//! [`SmogView::frame`] from its redraw callback and keeps requesting
//! redraws while [`SmogView::wants_frames`] is true.

use crate::capture::{encode_jpeg, CaptureError, CapturedFrame, Flash, CAPTURE_QUALITY};
use crate::{CompositeTarget, FrameLoop, HazeUniforms, RenderError};
use smoglens_camera::{
    CameraBackend, CameraError, CameraRequest, CameraSession, PlaybackState, SessionStatus,
    TrackState,
};
use smoglens_model::{derive, LiveInputs, SmogParams};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Operational state shown by the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    /// Waiting for the camera
    Initializing,
    /// Camera frames are being composited
    Active,
    /// Autoplay was blocked; a manual start is needed
    AwaitingManualStart,
    /// The camera could not be acquired
    Error(CameraError),
    /// Torn down
    Closed,
}

impl ViewState {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Error(CameraError::PermissionDenied))
    }
}

/// What one rendered frame used
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub index: u64,
    pub elapsed_secs: f32,
    pub params: SmogParams,
    /// A new video frame was uploaded this frame
    pub uploaded_video: bool,
}

pub struct SmogView<T: CompositeTarget> {
    target: Option<T>,
    camera: CameraSession,
    live: LiveInputs,
    frame_loop: FrameLoop,
    flash: Flash,
    last_video_seq: Option<u64>,
    jpeg_quality: u8,
}

impl<T: CompositeTarget> SmogView<T> {
    /// Mount a view: bind the target and start acquiring the camera
    pub fn mount(
        target: T,
        backend: Arc<dyn CameraBackend>,
        request: CameraRequest,
        live: LiveInputs,
    ) -> Self {
        let (width, height) = target.viewport();
        info!("Mounting smog view ({}x{})", width, height);

        Self {
            target: Some(target),
            camera: CameraSession::open(backend, request),
            live,
            frame_loop: FrameLoop::new(),
            flash: Flash::default(),
            last_video_seq: None,
            jpeg_quality: CAPTURE_QUALITY,
        }
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn state(&self) -> ViewState {
        match self.camera.status() {
            SessionStatus::Acquiring => ViewState::Initializing,
            SessionStatus::Ready(PlaybackState::NotStarted) => ViewState::Initializing,
            SessionStatus::Ready(PlaybackState::AwaitingGesture) => ViewState::AwaitingManualStart,
            SessionStatus::Ready(PlaybackState::Active) => ViewState::Active,
            SessionStatus::Failed(e) => ViewState::Error(e.clone()),
            SessionStatus::Stopped => ViewState::Closed,
        }
    }

    /// Shared AQI inputs read every frame
    pub fn live(&self) -> &LiveInputs {
        &self.live
    }

    pub fn target(&self) -> Option<&T> {
        self.target.as_ref()
    }

    /// Apply camera outcomes. Returns `true` if the view state changed.
    pub fn update(&mut self, now: Instant) -> bool {
        let changed = self.camera.poll();
        if changed {
            info!("Smog view state: {:?}", self.state());
        }
        if self.camera.has_stream() && !self.frame_loop.is_cancelled() {
            self.frame_loop.start(now);
        }
        changed
    }

    /// Block until acquisition settles or `timeout` passes
    pub fn wait_for_camera(&mut self, timeout: Duration) -> ViewState {
        let deadline = Instant::now() + timeout;
        while self.state() == ViewState::Initializing {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.camera.poll_timeout(remaining);
        }
        self.update(Instant::now());
        self.state()
    }

    /// The host should keep scheduling redraws
    pub fn wants_frames(&self) -> bool {
        self.frame_loop.is_running()
    }

    /// Render one frame if the loop is running
    pub fn frame(&mut self, now: Instant) -> Result<Option<FrameReport>, RenderError> {
        self.update(now);

        let Some(tick) = self.frame_loop.tick(now) else {
            return Ok(None);
        };
        let target = self.target.as_mut().ok_or(RenderError::Released)?;

        let (aqi, force_no_haze) = self.live.snapshot();
        let params = derive(aqi, force_no_haze);
        let uniforms = HazeUniforms::new(tick.elapsed_secs(), &params);

        let video = self
            .camera
            .latest_frame()
            .filter(|frame| self.last_video_seq != Some(frame.seq));
        if let Some(frame) = &video {
            self.last_video_seq = Some(frame.seq);
        }

        target.draw(&uniforms, video.as_ref(), self.flash.is_active(now))?;

        Ok(Some(FrameReport {
            index: tick.index,
            elapsed_secs: tick.elapsed_secs(),
            params,
            uploaded_video: video.is_some(),
        }))
    }

    /// Read back and encode the current frame, then start the flash
    pub fn capture(&mut self, now: Instant) -> Result<CapturedFrame, CaptureError> {
        if self.state() != ViewState::Active {
            return Err(CaptureError::NotReady);
        }
        let target = self.target.as_mut().ok_or(RenderError::Released)?;

        let pixels = target.read_back()?;
        let frame = encode_jpeg(&pixels, self.jpeg_quality)?;
        self.flash.trigger(now);

        info!("Captured {}x{} frame", frame.width, frame.height);
        Ok(frame)
    }

    /// Retry playback after a user action
    pub fn manual_start(&mut self) -> bool {
        self.camera.manual_start()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(target) = &mut self.target {
            target.resize(width, height);
        }
    }

    pub fn tracks(&self) -> Vec<TrackState> {
        self.camera.tracks()
    }

    /// Frames rendered so far
    pub fn frames(&self) -> u64 {
        self.frame_loop.frames()
    }

    /// Stop the loop, free the target and release the camera. Runs once.
    pub fn teardown(&mut self) {
        if self.frame_loop.is_cancelled() && self.target.is_none() {
            return;
        }

        self.frame_loop.cancel();
        match self.target.take() {
            Some(mut target) => target.release(),
            None => debug!("Smog view target already released"),
        }
        self.camera.stop();

        if self.camera.tracks().contains(&TrackState::Live) {
            warn!("Camera tracks still live after teardown");
        }
        info!("Smog view torn down after {} frames", self.frame_loop.frames());
    }
}

impl<T: CompositeTarget> Drop for SmogView<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SoftwareCompositor;
    use smoglens_camera::{NoCamera, SyntheticCamera, SyntheticOptions, VideoStream};
    use std::sync::Mutex;

    const WAIT: Duration = Duration::from_secs(5);

    fn request() -> CameraRequest {
        CameraRequest {
            width: 16,
            height: 9,
            ..CameraRequest::default()
        }
    }

    fn mount(backend: impl CameraBackend + 'static, live: LiveInputs) -> SmogView<SoftwareCompositor> {
        SmogView::mount(SoftwareCompositor::new(16, 9), Arc::new(backend), request(), live)
    }

    fn wait_for(view: &mut SmogView<SoftwareCompositor>, state: ViewState) {
        let deadline = Instant::now() + WAIT;
        while view.state() != state {
            assert!(Instant::now() < deadline, "stuck in {:?}", view.state());
            view.update(Instant::now());
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_active_view_renders_live_reading() {
        let live = LiveInputs::new();
        live.set_reading(Some(275));
        let mut view = mount(SyntheticCamera::default(), live.clone());

        wait_for(&mut view, ViewState::Active);
        let now = Instant::now();
        let report = view.frame(now).unwrap().unwrap();
        assert_eq!(report.index, 0);
        assert_eq!(report.params.opacity, 0.45);
        assert_eq!(report.params.blur_radius, 3.0);
        assert!(report.uploaded_video);

        live.set_reading(Some(450));
        let report = view.frame(now + Duration::from_millis(16)).unwrap().unwrap();
        assert!((report.params.opacity - 1.0375).abs() < 1e-6);
        assert!((report.params.blur_radius - 9.5).abs() < 1e-6);

        live.set_force_no_haze(true);
        live.set_reading(Some(999));
        let report = view.frame(now + Duration::from_millis(32)).unwrap().unwrap();
        assert!(report.params.is_clear());
        assert!(report.elapsed_secs > 0.0);
    }

    #[test]
    fn test_missing_reading_renders_clear() {
        let mut view = mount(SyntheticCamera::default(), LiveInputs::new());
        wait_for(&mut view, ViewState::Active);
        let report = view.frame(Instant::now()).unwrap().unwrap();
        assert!(report.params.is_clear());
    }

    #[test]
    fn test_video_uploaded_only_when_new() {
        let mut view = mount(SyntheticCamera::default(), LiveInputs::new());
        wait_for(&mut view, ViewState::Active);

        let now = Instant::now();
        assert!(view.frame(now).unwrap().unwrap().uploaded_video);
        // Synthetic source only refreshes every 33ms
        assert!(!view.frame(now).unwrap().unwrap().uploaded_video);
    }

    #[test]
    fn test_wait_for_camera() {
        let mut view = mount(SyntheticCamera::default(), LiveInputs::new());
        assert_eq!(view.wait_for_camera(WAIT), ViewState::Active);
        assert!(view.wants_frames());

        let mut view = mount(NoCamera, LiveInputs::new());
        assert_eq!(
            view.wait_for_camera(WAIT),
            ViewState::Error(CameraError::DeviceUnsupported)
        );
        assert!(!view.wants_frames());
    }

    #[test]
    fn test_blocked_playback_keeps_loop_running() {
        let camera = SyntheticCamera::new(SyntheticOptions {
            autoplay: false,
            ..SyntheticOptions::default()
        });
        let mut view = mount(camera, LiveInputs::new());

        wait_for(&mut view, ViewState::AwaitingManualStart);
        let report = view.frame(Instant::now()).unwrap().unwrap();
        assert!(!report.uploaded_video);
        assert!(view.wants_frames());
        assert!(matches!(view.capture(Instant::now()), Err(CaptureError::NotReady)));

        assert!(view.manual_start());
        wait_for(&mut view, ViewState::Active);
        let report = view.frame(Instant::now()).unwrap().unwrap();
        assert!(report.uploaded_video);
        assert_eq!(report.index, 1);
    }

    #[test]
    fn test_acquisition_failure_never_starts_loop() {
        let denied = SyntheticCamera::new(SyntheticOptions {
            deny_permission: true,
            ..SyntheticOptions::default()
        });
        let mut view = mount(denied, LiveInputs::new());
        wait_for(&mut view, ViewState::Error(CameraError::PermissionDenied));
        assert!(view.state().is_permission_denied());
        assert!(view.frame(Instant::now()).unwrap().is_none());
        assert!(!view.wants_frames());

        let mut view = mount(NoCamera, LiveInputs::new());
        wait_for(&mut view, ViewState::Error(CameraError::DeviceUnsupported));
        assert!(!view.state().is_permission_denied());
        assert!(view.frame(Instant::now()).unwrap().is_none());
    }

    #[test]
    fn test_capture_encodes_and_flashes() {
        let live = LiveInputs::new();
        live.set_reading(Some(350));
        let mut view = mount(SyntheticCamera::default(), live);
        wait_for(&mut view, ViewState::Active);

        let now = Instant::now();
        view.frame(now).unwrap();
        let captured = view.capture(now).unwrap();
        assert_eq!((captured.width, captured.height), (16, 9));
        assert_eq!(&captured.jpeg[..2], &[0xFF, 0xD8]);

        view.frame(now + Duration::from_millis(10)).unwrap();
        let flashed = view.target().unwrap().displayed().unwrap();
        assert!(flashed.pixels().all(|p| p.0 == [0, 0, 0, 255]));

        view.frame(now + Duration::from_millis(200)).unwrap();
        let after = view.target().unwrap().displayed().unwrap();
        assert!(after.pixels().any(|p| p.0 != [0, 0, 0, 255]));
    }

    #[test]
    fn test_capture_during_flash_keeps_composite() {
        let live = LiveInputs::new();
        live.set_reading(Some(150));
        let mut view = mount(SyntheticCamera::default(), live);
        wait_for(&mut view, ViewState::Active);

        let brightest = |frame: &CapturedFrame| {
            let decoded = image::load_from_memory(&frame.jpeg).unwrap().to_rgb8();
            decoded.pixels().map(|p| p.0.iter().map(|&c| c as u32).sum::<u32>()).max().unwrap()
        };

        let now = Instant::now();
        view.frame(now).unwrap();
        let first = view.capture(now).unwrap();

        view.frame(now + Duration::from_millis(16)).unwrap();
        assert!(view.target().unwrap().is_flashing());
        let second = view.capture(now + Duration::from_millis(20)).unwrap();

        assert!(brightest(&first) > 100);
        assert!(brightest(&second) > 100);
    }

    #[test]
    fn test_teardown_stops_everything() {
        let mut view = mount(SyntheticCamera::default(), LiveInputs::new());
        wait_for(&mut view, ViewState::Active);

        let now = Instant::now();
        view.frame(now).unwrap();
        assert_eq!(view.tracks(), vec![TrackState::Live]);

        view.teardown();
        view.teardown();
        assert_eq!(view.state(), ViewState::Closed);
        assert_eq!(view.tracks(), vec![TrackState::Ended]);
        assert!(!view.wants_frames());
        assert!(view.target().is_none());

        // the loop stays cancelled even if camera outcomes arrive later
        view.update(now);
        assert!(view.frame(now + Duration::from_millis(16)).unwrap().is_none());
        assert_eq!(view.frames(), 1);
    }

    #[test]
    fn test_teardown_during_acquisition() {
        let mut view = mount(SyntheticCamera::default(), LiveInputs::new());
        view.teardown();
        std::thread::sleep(Duration::from_millis(50));
        view.update(Instant::now());
        assert!(view.frame(Instant::now()).unwrap().is_none());
        assert_eq!(view.state(), ViewState::Closed);
    }

    /// Keeps every stream it hands out so tests can inspect them after drop
    #[derive(Default)]
    struct RecordingCamera {
        inner: SyntheticCamera,
        streams: Mutex<Vec<Arc<dyn VideoStream>>>,
    }

    impl CameraBackend for RecordingCamera {
        fn name(&self) -> &str {
            "recording"
        }

        fn acquire(&self, request: &CameraRequest) -> Result<Arc<dyn VideoStream>, CameraError> {
            let stream = self.inner.acquire(request)?;
            self.streams.lock().unwrap().push(stream.clone());
            Ok(stream)
        }
    }

    #[test]
    fn test_teardown_while_autoplay_pending() {
        let camera = Arc::new(RecordingCamera {
            inner: SyntheticCamera::new(SyntheticOptions {
                play_delay: Duration::from_millis(150),
                ..SyntheticOptions::default()
            }),
            ..RecordingCamera::default()
        });
        let mut view = SmogView::mount(
            SoftwareCompositor::new(16, 9),
            camera.clone(),
            request(),
            LiveInputs::new(),
        );

        std::thread::sleep(Duration::from_millis(50));
        view.teardown();
        std::thread::sleep(Duration::from_millis(300));
        drop(view);

        let streams = camera.streams.lock().unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].tracks(), vec![TrackState::Ended]);
        assert!(streams[0].latest_frame().is_none());
    }
}
