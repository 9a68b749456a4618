//! Camera session
//!
//! Acquisition and playback start run as one-shot worker threads that
//! report back over a channel. The owner drains the channel from its own
//! loop with [`CameraSession::poll`], so nothing here blocks rendering.

use crate::{CameraBackend, CameraError, CameraRequest, PlayTrigger, TrackState, VideoFrame, VideoStream};
use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Playback progress of an acquired stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Acquired, autoplay attempt still running
    NotStarted,
    /// Autoplay refused, waiting for a manual start
    AwaitingGesture,
    /// Frames are flowing
    Active,
}

/// Overall session status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Waiting for the device
    Acquiring,
    /// A stream is bound
    Ready(PlaybackState),
    /// The device could not be acquired
    Failed(CameraError),
    /// Torn down
    Stopped,
}

enum SessionEvent {
    Acquired(Arc<dyn VideoStream>),
    AcquireFailed(CameraError),
    Autoplay(Result<(), CameraError>),
    ManualStart(Result<(), CameraError>),
}

/// Set once the session stops. Workers hold the lock while handing over a
/// stream, so a stream is either queued before the session drains its
/// channel or stopped by the worker itself.
type StopGate = Arc<Mutex<bool>>;

/// Owns one camera stream for the lifetime of a view
pub struct CameraSession {
    status: SessionStatus,
    stream: Option<Arc<dyn VideoStream>>,
    events_tx: Sender<SessionEvent>,
    events_rx: Receiver<SessionEvent>,
    stopped: StopGate,
    manual_pending: bool,
}

impl CameraSession {
    /// Begin acquiring a stream from `backend`
    pub fn open(backend: Arc<dyn CameraBackend>, request: CameraRequest) -> Self {
        let (events_tx, events_rx) = unbounded();
        let stopped = StopGate::default();

        let mut session = Self {
            status: SessionStatus::Acquiring,
            stream: None,
            events_tx: events_tx.clone(),
            events_rx,
            stopped: stopped.clone(),
            manual_pending: false,
        };

        info!("Acquiring camera from '{}' backend", backend.name());
        let spawned = thread::Builder::new()
            .name("camera-acquire".into())
            .spawn(move || acquire_worker(backend, request, stopped, events_tx));

        if let Err(e) = spawned {
            warn!("Failed to spawn camera worker: {}", e);
            session.status = SessionStatus::Failed(CameraError::AcquisitionFailed(e.to_string()));
        }

        session
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    /// A stream has been bound (playback may not have started)
    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Apply every pending worker outcome. Returns `true` if the status changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.events_rx.try_recv() {
                Ok(event) => changed |= self.apply(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        changed
    }

    /// Block up to `timeout` for the next outcome, then drain the rest
    pub fn poll_timeout(&mut self, timeout: Duration) -> bool {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => {
                let changed = self.apply(event);
                self.poll() || changed
            }
            Err(_) => false,
        }
    }

    fn apply(&mut self, event: SessionEvent) -> bool {
        if self.status == SessionStatus::Stopped {
            if let SessionEvent::Acquired(stream) = event {
                stream.stop();
            }
            return false;
        }

        let previous = self.status.clone();
        match event {
            SessionEvent::Acquired(stream) => {
                info!("Camera stream acquired: {}", stream.label());
                self.stream = Some(stream);
                self.status = SessionStatus::Ready(PlaybackState::NotStarted);
            }
            SessionEvent::AcquireFailed(e) => {
                warn!("Camera access error: {}", e);
                self.status = SessionStatus::Failed(e);
            }
            SessionEvent::Autoplay(result) => {
                if self.status == SessionStatus::Ready(PlaybackState::NotStarted) {
                    self.status = match result {
                        Ok(()) => SessionStatus::Ready(PlaybackState::Active),
                        Err(CameraError::PlaybackBlocked) => {
                            warn!("Autoplay prevented, waiting for manual start");
                            SessionStatus::Ready(PlaybackState::AwaitingGesture)
                        }
                        Err(e) => {
                            warn!("Camera playback failed: {}", e);
                            SessionStatus::Ready(PlaybackState::AwaitingGesture)
                        }
                    };
                }
            }
            SessionEvent::ManualStart(result) => {
                self.manual_pending = false;
                match result {
                    Ok(()) => self.status = SessionStatus::Ready(PlaybackState::Active),
                    Err(e) => warn!("Manual start failed: {}", e),
                }
            }
        }
        self.status != previous
    }

    /// Retry playback from a user action. Returns `false` if there is
    /// nothing to start or an attempt is already running.
    pub fn manual_start(&mut self) -> bool {
        if self.status != SessionStatus::Ready(PlaybackState::AwaitingGesture) || self.manual_pending {
            return false;
        }
        let Some(stream) = self.stream.clone() else {
            return false;
        };

        let tx = self.events_tx.clone();
        let spawned = thread::Builder::new()
            .name("camera-play".into())
            .spawn(move || {
                let result = stream.play(PlayTrigger::UserGesture);
                let _ = tx.send(SessionEvent::ManualStart(result));
            });

        match spawned {
            Ok(_) => {
                debug!("Manual camera start requested");
                self.manual_pending = true;
                true
            }
            Err(e) => {
                warn!("Failed to spawn camera start worker: {}", e);
                false
            }
        }
    }

    /// Newest frame while playback is active
    pub fn latest_frame(&self) -> Option<VideoFrame> {
        match self.status {
            SessionStatus::Ready(PlaybackState::Active) => self.stream.as_ref()?.latest_frame(),
            _ => None,
        }
    }

    /// Track states of the bound stream, empty if none was acquired
    pub fn tracks(&self) -> Vec<TrackState> {
        self.stream.as_ref().map(|s| s.tracks()).unwrap_or_default()
    }

    /// Stop the device. Safe to call repeatedly; a stream that arrives
    /// after this is stopped immediately.
    pub fn stop(&mut self) {
        if self.status != SessionStatus::Stopped {
            *self.stopped.lock().unwrap_or_else(|e| e.into_inner()) = true;
            self.status = SessionStatus::Stopped;

            if let Some(stream) = &self.stream {
                stream.stop();
                debug!("Camera tracks stopped");
            }
        }
        self.release_queued();
    }

    /// Stop any stream still waiting in the channel
    fn release_queued(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            if let SessionEvent::Acquired(stream) = event {
                debug!("Releasing stream that arrived after stop");
                stream.stop();
                self.stream.get_or_insert(stream);
            }
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn acquire_worker(
    backend: Arc<dyn CameraBackend>,
    request: CameraRequest,
    stopped: StopGate,
    events: Sender<SessionEvent>,
) {
    let stream = match backend.acquire(&request) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = events.send(SessionEvent::AcquireFailed(e));
            return;
        }
    };

    {
        let stopped = stopped.lock().unwrap_or_else(|e| e.into_inner());
        if *stopped || events.send(SessionEvent::Acquired(stream.clone())).is_err() {
            debug!("Session closed during acquisition, releasing device");
            stream.stop();
            return;
        }
    }

    let result = stream.play(PlayTrigger::Autoplay);
    let _ = events.send(SessionEvent::Autoplay(result));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NoCamera, SyntheticCamera, SyntheticOptions};
    use std::time::Instant;

    const WAIT: Duration = Duration::from_secs(5);

    fn request() -> CameraRequest {
        CameraRequest {
            width: 8,
            height: 8,
            ..CameraRequest::default()
        }
    }

    fn wait_for(session: &mut CameraSession, expected: SessionStatus) {
        let deadline = Instant::now() + WAIT;
        while session.status() != &expected {
            assert!(Instant::now() < deadline, "stuck in {:?}", session.status());
            session.poll_timeout(Duration::from_millis(10));
        }
    }

    fn slow_camera(play_delay: Duration) -> SyntheticCamera {
        SyntheticCamera::new(SyntheticOptions {
            play_delay,
            ..SyntheticOptions::default()
        })
    }

    #[test]
    fn test_acquire_and_play() {
        let mut session = CameraSession::open(Arc::new(SyntheticCamera::default()), request());
        assert_eq!(session.status(), &SessionStatus::Acquiring);
        assert!(session.latest_frame().is_none());

        wait_for(&mut session, SessionStatus::Ready(PlaybackState::Active));
        assert!(session.latest_frame().is_some());
    }

    #[test]
    fn test_not_started_while_autoplay_runs() {
        let mut session = CameraSession::open(Arc::new(slow_camera(Duration::from_millis(200))), request());
        wait_for(&mut session, SessionStatus::Ready(PlaybackState::NotStarted));
        assert!(session.has_stream());
        assert!(session.latest_frame().is_none());

        wait_for(&mut session, SessionStatus::Ready(PlaybackState::Active));
        assert!(session.latest_frame().is_some());
    }

    #[test]
    fn test_blocked_then_manual_start() {
        let camera = SyntheticCamera::new(SyntheticOptions {
            autoplay: false,
            ..SyntheticOptions::default()
        });
        let mut session = CameraSession::open(Arc::new(camera), request());

        wait_for(&mut session, SessionStatus::Ready(PlaybackState::AwaitingGesture));
        assert!(session.has_stream());
        assert!(session.latest_frame().is_none());

        assert!(session.manual_start());
        assert!(!session.manual_start());
        wait_for(&mut session, SessionStatus::Ready(PlaybackState::Active));
        assert!(session.latest_frame().is_some());
    }

    #[test]
    fn test_manual_start_needs_blocked_stream() {
        let mut session = CameraSession::open(Arc::new(SyntheticCamera::default()), request());
        assert!(!session.manual_start());
        wait_for(&mut session, SessionStatus::Ready(PlaybackState::Active));
        assert!(!session.manual_start());
    }

    #[test]
    fn test_failures() {
        let mut session = CameraSession::open(Arc::new(NoCamera), request());
        wait_for(&mut session, SessionStatus::Failed(CameraError::DeviceUnsupported));
        assert!(!session.has_stream());

        let denied = SyntheticCamera::new(SyntheticOptions {
            deny_permission: true,
            ..SyntheticOptions::default()
        });
        let mut session = CameraSession::open(Arc::new(denied), request());
        wait_for(&mut session, SessionStatus::Failed(CameraError::PermissionDenied));
    }

    #[test]
    fn test_stop_releases_tracks() {
        let mut session = CameraSession::open(Arc::new(SyntheticCamera::default()), request());
        wait_for(&mut session, SessionStatus::Ready(PlaybackState::Active));
        assert_eq!(session.tracks(), vec![TrackState::Live]);

        session.stop();
        session.stop();
        assert_eq!(session.status(), &SessionStatus::Stopped);
        assert_eq!(session.tracks(), vec![TrackState::Ended]);
        assert!(session.latest_frame().is_none());
        assert!(!session.poll());
    }

    #[test]
    fn test_stop_during_slow_autoplay_releases_device() {
        let camera = Arc::new(slow_camera(Duration::from_millis(150)));
        let mut session = CameraSession::open(camera, request());

        // never polled: the stream is only reachable through the channel
        std::thread::sleep(Duration::from_millis(50));
        session.stop();
        assert_eq!(session.tracks(), vec![TrackState::Ended]);

        std::thread::sleep(Duration::from_millis(300));
        assert!(!session.poll());
        assert_eq!(session.status(), &SessionStatus::Stopped);
        assert!(session.latest_frame().is_none());
        assert_eq!(session.tracks(), vec![TrackState::Ended]);
    }
}
