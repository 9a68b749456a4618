//! Frame loop bookkeeping
//!
//! The host drives the loop from its redraw callback; this type only
//! tracks whether another frame may run and how long the loop has been
//! going. Once cancelled it never ticks again.

use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
enum LoopState {
    Idle,
    Running { started: Instant },
    Cancelled,
}

/// One scheduled frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Zero-based frame counter
    pub index: u64,
    /// Time since the loop started
    pub elapsed: Duration,
}

impl FrameTick {
    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }
}

#[derive(Debug)]
pub struct FrameLoop {
    state: LoopState,
    frames: u64,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::Idle,
            frames: 0,
        }
    }

    /// Start the loop. Has no effect once started or cancelled.
    pub fn start(&mut self, now: Instant) {
        if self.state == LoopState::Idle {
            debug!("Frame loop started");
            self.state = LoopState::Running { started: now };
        }
    }

    /// Claim the next frame, `None` unless running
    pub fn tick(&mut self, now: Instant) -> Option<FrameTick> {
        let LoopState::Running { started } = self.state else {
            return None;
        };
        let tick = FrameTick {
            index: self.frames,
            elapsed: now.saturating_duration_since(started),
        };
        self.frames += 1;
        Some(tick)
    }

    pub fn cancel(&mut self) {
        if self.state != LoopState::Cancelled {
            debug!("Frame loop cancelled after {} frames", self.frames);
            self.state = LoopState::Cancelled;
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, LoopState::Running { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == LoopState::Cancelled
    }

    /// Frames produced so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_loop_does_not_tick() {
        let mut frame_loop = FrameLoop::new();
        assert!(frame_loop.tick(Instant::now()).is_none());
        assert_eq!(frame_loop.frames(), 0);
    }

    #[test]
    fn test_elapsed_from_start() {
        let start = Instant::now();
        let mut frame_loop = FrameLoop::new();
        frame_loop.start(start);

        let first = frame_loop.tick(start).unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.elapsed, Duration::ZERO);

        let second = frame_loop.tick(start + Duration::from_millis(500)).unwrap();
        assert_eq!(second.index, 1);
        assert_eq!(second.elapsed_secs(), 0.5);

        // restarting keeps the first start time
        frame_loop.start(start + Duration::from_secs(10));
        let third = frame_loop.tick(start + Duration::from_secs(1)).unwrap();
        assert_eq!(third.elapsed, Duration::from_secs(1));
    }

    #[test]
    fn test_cancel_is_final() {
        let now = Instant::now();
        let mut frame_loop = FrameLoop::new();
        frame_loop.start(now);
        frame_loop.tick(now).unwrap();

        frame_loop.cancel();
        assert!(frame_loop.is_cancelled());
        assert!(frame_loop.tick(now).is_none());

        frame_loop.start(now);
        assert!(!frame_loop.is_running());
        assert_eq!(frame_loop.frames(), 1);
    }
}
