//! Player window
//!
//! The window is driven one iteration at a time with `pump_app_events`, so
//! the playback loop stays in control of the calling thread.

use std::sync::Arc;
use std::time::Duration;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowId};

use super::DisplayError;
use crate::playback::EventPump;

/// Pump attempts allowed for the platform to deliver `resumed`
const CREATE_ATTEMPTS: usize = 100;
const CREATE_POLL: Duration = Duration::from_millis(10);

/// Logical window size when no monitor can be queried
const FALLBACK_SIZE: (u32, u32) = (1280, 720);

/// Initial inner size as a fraction of the monitor size
pub fn initial_size(monitor: PhysicalSize<u32>, scale: f32) -> PhysicalSize<u32> {
    let scale = if scale.is_finite() { scale.clamp(0.1, 1.0) } else { 0.5 };
    PhysicalSize::new(
        ((monitor.width as f32 * scale).round() as u32).max(1),
        ((monitor.height as f32 * scale).round() as u32).max(1),
    )
}

struct WindowState {
    title: String,
    scale: f32,
    window: Option<Arc<Window>>,
    size: PhysicalSize<u32>,
    close_requested: bool,
    error: Option<winit::error::OsError>,
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes().with_title(self.title.as_str());
        let attributes = match event_loop.primary_monitor() {
            Some(monitor) => attributes.with_inner_size(initial_size(monitor.size(), self.scale)),
            None => attributes.with_inner_size(LogicalSize::new(FALLBACK_SIZE.0, FALLBACK_SIZE.1)),
        };

        match event_loop.create_window(attributes) {
            Ok(window) => {
                self.size = window.inner_size();
                tracing::info!(
                    "Created window '{}' at {}x{}",
                    self.title,
                    self.size.width,
                    self.size.height
                );
                self.window = Some(Arc::new(window));
            }
            Err(e) => {
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::debug!("Window close requested");
                self.close_requested = true;
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => match logical_key.as_ref() {
                Key::Named(NamedKey::Escape) | Key::Character("q") | Key::Character("Q") => {
                    tracing::debug!("Quit key pressed");
                    self.close_requested = true;
                }
                _ => {}
            },
            WindowEvent::Resized(size) => {
                self.size = size;
            }
            _ => {}
        }
    }
}

/// A window pumped from the playback loop
pub struct PlayerWindow {
    event_loop: EventLoop<()>,
    state: WindowState,
    window: Arc<Window>,
}

impl PlayerWindow {
    /// Create the event loop and wait for the platform to hand out a window
    pub fn new(title: &str, scale: f32) -> Result<Self, DisplayError> {
        let mut event_loop = EventLoop::new()?;
        let mut state = WindowState {
            title: title.to_string(),
            scale,
            window: None,
            size: PhysicalSize::new(0, 0),
            close_requested: false,
            error: None,
        };

        for _ in 0..CREATE_ATTEMPTS {
            let status = event_loop.pump_app_events(Some(CREATE_POLL), &mut state);
            if let PumpStatus::Exit(code) = status {
                tracing::debug!("Event loop exited with {} during window creation", code);
            }
            if let Some(e) = state.error.take() {
                return Err(e.into());
            }
            if state.window.is_some() {
                break;
            }
        }

        let window = state.window.clone().ok_or(DisplayError::NoWindow)?;
        Ok(Self {
            event_loop,
            state,
            window,
        })
    }

    pub fn window(&self) -> Arc<Window> {
        Arc::clone(&self.window)
    }
}

impl EventPump for PlayerWindow {
    fn run_iteration(&mut self) -> bool {
        if self.state.close_requested {
            return false;
        }
        if let PumpStatus::Exit(_) = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.state)
        {
            self.state.close_requested = true;
        }
        !self.state.close_requested
    }

    fn drawable_size(&self) -> (u32, u32) {
        (self.state.size.width, self.state.size.height)
    }
}
