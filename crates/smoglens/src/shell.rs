//! Window shell
//!
//! Winit event loop hosting one [`SmogView`] on the GPU compositor.
//! Redraws are requested continuously while the frame loop runs; otherwise
//! the loop wakes periodically to pick up camera outcomes.
//!
//! Keys: Space captures, Enter starts a blocked camera, Tab or 1-9 switch
//! location, Up/Down change the AQI, Delete drops the reading, L logs the
//! legend.

use crate::config::AppConfig;
use crate::export::CaptureExporter;
use crate::feed::AqiFeed;
use smoglens_model::LiveInputs;
use smoglens_render::{GpuCompositor, GpuError, GpuOptions, RenderError, SmogView, ViewState};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId};

/// Wake-up interval while waiting on the camera
const IDLE_POLL: Duration = Duration::from_millis(50);

enum Command {
    Capture,
    ManualStart,
    NextLocation,
    SelectLocation(usize),
    Nudge(i32),
    ClearReading,
    ShowLegend,
}

fn command_for(key: &Key) -> Option<Command> {
    match key {
        Key::Named(NamedKey::Space) => Some(Command::Capture),
        Key::Named(NamedKey::Enter) => Some(Command::ManualStart),
        Key::Named(NamedKey::Tab) => Some(Command::NextLocation),
        Key::Named(NamedKey::ArrowUp) => Some(Command::Nudge(1)),
        Key::Named(NamedKey::ArrowDown) => Some(Command::Nudge(-1)),
        Key::Named(NamedKey::Delete) | Key::Named(NamedKey::Backspace) => {
            Some(Command::ClearReading)
        }
        Key::Character(c) => match c.as_str() {
            "l" | "L" => Some(Command::ShowLegend),
            digit => digit
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=9).contains(n))
                .map(|n| Command::SelectLocation(n - 1)),
        },
        _ => None,
    }
}

fn state_label(state: &ViewState) -> String {
    match state {
        ViewState::Initializing => "starting camera".into(),
        ViewState::Active => "live".into(),
        ViewState::AwaitingManualStart => "press Enter to start camera".into(),
        ViewState::Error(e) if state.is_permission_denied() => format!("camera blocked: {}", e),
        ViewState::Error(e) => format!("camera error: {}", e),
        ViewState::Closed => "closed".into(),
    }
}

pub struct SmogShell {
    config: AppConfig,
    window: Option<Arc<Window>>,
    view: Option<SmogView<GpuCompositor>>,
    feed: AqiFeed,
    exporter: CaptureExporter,
    title: String,
}

impl SmogShell {
    pub fn new(config: AppConfig) -> Self {
        let feed = AqiFeed::new(&config.locations, config.default_location_index(), LiveInputs::new());
        let exporter = CaptureExporter::from_config(&config.capture);

        Self {
            config,
            window: None,
            view: None,
            feed,
            exporter,
            title: String::new(),
        }
    }

    fn init_view(&mut self, window: Arc<Window>) -> anyhow::Result<()> {
        let request = self.config.camera.request();
        let options = GpuOptions {
            low_power: self.config.window.low_power,
            vsync: self.config.window.vsync,
            ..GpuOptions::for_camera(&request)
        };
        let compositor = pollster::block_on(GpuCompositor::for_window(window, options))?;
        info!("Using adapter: {}", compositor.adapter_name());

        let view = SmogView::mount(
            compositor,
            self.config.camera.backend()?,
            request,
            self.feed.live().clone(),
        )
        .with_jpeg_quality(self.config.capture.quality);

        self.view = Some(view);
        Ok(())
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Capture => self.capture(),
            Command::ManualStart => {
                if let Some(view) = &mut self.view {
                    if !view.manual_start() {
                        debug!("Nothing to start");
                    }
                }
            }
            Command::NextLocation => {
                self.feed.select_next();
            }
            Command::SelectLocation(index) => {
                self.feed.select(index);
            }
            Command::Nudge(steps) => self.feed.nudge(steps),
            Command::ClearReading => self.feed.clear_reading(),
            Command::ShowLegend => self.feed.log_legend(),
        }
        self.refresh_title();
    }

    fn capture(&mut self) {
        let Some(view) = &mut self.view else {
            return;
        };
        match view.capture(Instant::now()) {
            Ok(frame) => {
                if let Err(e) = self.exporter.export(&frame) {
                    error!("{}", e);
                }
            }
            Err(e) => warn!("Capture failed: {}", e),
        }
    }

    fn render(&mut self) {
        let Some(view) = &mut self.view else {
            return;
        };
        match view.frame(Instant::now()) {
            Ok(_) => {}
            Err(RenderError::Gpu(GpuError::SurfaceLost)) => debug!("Surface reconfigured, skipping frame"),
            Err(e) => warn!("Failed to render frame: {}", e),
        }
    }

    fn refresh_title(&mut self) {
        let (Some(window), Some(view)) = (&self.window, &self.view) else {
            return;
        };

        let location = self.feed.location().map_or("-", |l| l.name.as_str());
        let aqi = self
            .feed
            .reading()
            .map_or_else(|| "--".to_string(), |aqi| aqi.to_string());
        let title = format!(
            "{} | {} | AQI {} ({}) | {}",
            self.config.window.title,
            location,
            aqi,
            self.feed.category(),
            state_label(&view.state())
        );

        if title != self.title {
            window.set_title(&title);
            self.title = title;
        }
    }

    fn shutdown(&mut self) {
        if let Some(mut view) = self.view.take() {
            view.teardown();
        }
    }
}

impl ApplicationHandler for SmogShell {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title(self.config.window.title.clone())
            .with_inner_size(LogicalSize::new(self.config.window.width, self.config.window.height));

        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };
        info!("Window created");

        self.window = Some(window.clone());
        if let Err(e) = self.init_view(window) {
            error!("Failed to initialize rendering: {:#}", e);
            event_loop.exit();
            return;
        }
        self.refresh_title();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Window close requested");
                self.shutdown();
                event_loop.exit();
            }

            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if width > 0 && height > 0 {
                    debug!("Window resized: {}x{}", width, height);
                    if let Some(view) = &mut self.view {
                        view.resize(width, height);
                    }
                }
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Some(command) = command_for(&logical_key) {
                    self.handle(command);
                }
            }

            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                // a click counts as the gesture a blocked camera waits for
                if self.view.as_ref().is_some_and(|v| v.state() == ViewState::AwaitingManualStart) {
                    self.handle(Command::ManualStart);
                }
            }

            WindowEvent::RedrawRequested => self.render(),

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(view) = &mut self.view else {
            return;
        };

        if view.update(Instant::now()) {
            self.refresh_title();
        }

        let running = self.view.as_ref().is_some_and(|v| v.wants_frames());
        if running {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            event_loop.set_control_flow(ControlFlow::Poll);
        } else {
            event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + IDLE_POLL));
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}

/// Open the window and run until it is closed
pub fn run(config: AppConfig) -> anyhow::Result<()> {
    info!("Starting window shell");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut shell = SmogShell::new(config);
    event_loop.run_app(&mut shell)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use smoglens_camera::CameraError;

    #[test]
    fn test_shell_creation() {
        let shell = SmogShell::new(AppConfig::default());
        assert!(shell.window.is_none());
        assert!(shell.view.is_none());
        assert_eq!(shell.feed.live().reading(), Some(275));
    }

    #[test]
    fn test_key_bindings() {
        assert!(matches!(command_for(&Key::Named(NamedKey::Space)), Some(Command::Capture)));
        assert!(matches!(command_for(&Key::Named(NamedKey::ArrowDown)), Some(Command::Nudge(-1))));
        assert!(matches!(command_for(&Key::Character("3".into())), Some(Command::SelectLocation(2))));
        assert!(matches!(command_for(&Key::Character("L".into())), Some(Command::ShowLegend)));
        assert!(command_for(&Key::Character("0".into())).is_none());
        assert!(command_for(&Key::Character("x".into())).is_none());
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(state_label(&ViewState::Active), "live");
        assert!(state_label(&ViewState::Error(CameraError::PermissionDenied)).starts_with("camera blocked"));
        assert!(state_label(&ViewState::Error(CameraError::DeviceUnsupported)).starts_with("camera error"));
    }
}
