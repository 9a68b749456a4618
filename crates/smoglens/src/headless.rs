//! Headless snapshot mode
//!
//! Runs the view against the software compositor for a fixed number of
//! frames, captures once and exports the JPEG.

use crate::config::AppConfig;
use crate::export::CaptureExporter;
use crate::feed::AqiFeed;
use anyhow::{bail, Context, Result};
use smoglens_model::LiveInputs;
use smoglens_render::{SmogView, SoftwareCompositor, ViewState};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Simulated time between headless frames
const FRAME_TIME: Duration = Duration::from_millis(16);

pub fn run(config: &AppConfig) -> Result<PathBuf> {
    let headless = &config.headless;
    info!(
        "Headless snapshot: {} frames at {}x{}",
        headless.frames, headless.width, headless.height
    );

    let feed = AqiFeed::new(&config.locations, config.default_location_index(), LiveInputs::new());
    let exporter = CaptureExporter::from_config(&config.capture);

    let target = SoftwareCompositor::new(headless.width, headless.height);
    let mut view = SmogView::mount(
        target,
        config.camera.backend()?,
        config.camera.request(),
        feed.live().clone(),
    )
    .with_jpeg_quality(config.capture.quality);

    let timeout = Duration::from_secs(headless.camera_timeout_secs);
    let mut state = view.wait_for_camera(timeout);
    if state == ViewState::AwaitingManualStart {
        info!("Autoplay blocked, starting playback manually");
        view.manual_start();
        state = wait_for_active(&mut view, timeout);
    }
    match state {
        ViewState::Active => {}
        ViewState::Error(e) => bail!("Camera unavailable: {}", e),
        other => bail!("Camera not ready after {:?}: {:?}", timeout, other),
    }

    let start = Instant::now();
    let mut now = start;
    for i in 0..headless.frames {
        now = start + FRAME_TIME * i;
        if let Some(report) = view.frame(now).context("Failed to render frame")? {
            debug!(
                "Frame {} t={:.2}s opacity={:.3}",
                report.index, report.elapsed_secs, report.params.opacity
            );
        }
    }

    let frame = view.capture(now).context("Failed to capture frame")?;
    let path = exporter.export(&frame)?;
    view.teardown();
    Ok(path)
}

fn wait_for_active(view: &mut SmogView<SoftwareCompositor>, timeout: Duration) -> ViewState {
    let deadline = Instant::now() + timeout;
    loop {
        view.update(Instant::now());
        let state = view.state();
        if state != ViewState::AwaitingManualStart || Instant::now() >= deadline {
            if state == ViewState::AwaitingManualStart {
                warn!("Manual start did not complete");
            }
            return state;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}
