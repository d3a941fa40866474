//! Window management using winit
//!
//! [`WinitPlatform`] owns the event loop and pumps it once per frame without
//! blocking, translating winit events into engine [`Event`]s.

use std::sync::Arc;
use std::time::{Duration, Instant};

use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event as WinitEvent, MouseScrollDelta, WindowEvent},
    event_loop::EventLoop,
    keyboard::PhysicalKey,
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Window as WinitWindow, WindowBuilder},
};

use crate::application::Platform;
use crate::error::{EngineError, EngineResult};
use crate::events::{Event, EventKind};
use crate::EngineConfig;

/// Native window plus its event loop
pub struct WinitPlatform {
    event_loop: EventLoop<()>,
    window: Arc<WinitWindow>,
    start: Instant,
    exited: bool,
}

impl WinitPlatform {
    /// Create a window sized and titled from `config`
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        let event_loop =
            EventLoop::new().map_err(|e| EngineError::Platform(format!("event loop: {e}")))?;
        let window = WindowBuilder::new()
            .with_title(&config.title)
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .build(&event_loop)
            .map_err(|e| EngineError::Platform(format!("window: {e}")))?;

        log::info!(
            "Created window \"{}\" ({}x{})",
            config.title,
            config.width,
            config.height
        );

        Ok(Self {
            event_loop,
            window: Arc::new(window),
            start: Instant::now(),
            exited: false,
        })
    }

    /// Get the raw window for backend initialization
    pub fn window(&self) -> &WinitWindow {
        &self.window
    }

    /// Get arc reference to window
    pub fn window_arc(&self) -> Arc<WinitWindow> {
        Arc::clone(&self.window)
    }

    /// Current window dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }
}

fn translate(event: WindowEvent, events: &mut Vec<Event>) {
    match event {
        WindowEvent::CloseRequested => events.push(EventKind::WindowClose.into()),
        WindowEvent::Resized(size) => events.push(
            EventKind::WindowResize {
                width: size.width,
                height: size.height,
            }
            .into(),
        ),
        WindowEvent::KeyboardInput { event, .. } => {
            if let PhysicalKey::Code(key) = event.physical_key {
                let kind = match event.state {
                    ElementState::Pressed => EventKind::KeyPressed {
                        key,
                        repeat: event.repeat,
                    },
                    ElementState::Released => EventKind::KeyReleased { key },
                };
                events.push(kind.into());
            }
            if event.state == ElementState::Pressed {
                if let Some(text) = &event.text {
                    events.extend(
                        text.chars()
                            .filter(|c| !c.is_control())
                            .map(|c| Event::new(EventKind::KeyTyped(c))),
                    );
                }
            }
        }
        WindowEvent::CursorMoved { position, .. } => events.push(
            EventKind::MouseMoved {
                x: position.x as f32,
                y: position.y as f32,
            }
            .into(),
        ),
        WindowEvent::MouseWheel { delta, .. } => {
            let (x_offset, y_offset) = match delta {
                MouseScrollDelta::LineDelta(x, y) => (x, y),
                MouseScrollDelta::PixelDelta(p) => (p.x as f32, p.y as f32),
            };
            events.push(EventKind::MouseScrolled { x_offset, y_offset }.into());
        }
        WindowEvent::MouseInput { state, button, .. } => {
            let kind = match state {
                ElementState::Pressed => EventKind::MouseButtonPressed(button),
                ElementState::Released => EventKind::MouseButtonReleased(button),
            };
            events.push(kind.into());
        }
        _ => {}
    }
}

impl Platform for WinitPlatform {
    fn poll_events(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.exited {
            return events;
        }

        let window_id = self.window.id();
        let status = self
            .event_loop
            .pump_events(Some(Duration::ZERO), |event, _elwt| {
                if let WinitEvent::WindowEvent { window_id: id, event } = event {
                    if id == window_id {
                        translate(event, &mut events);
                    }
                }
            });

        if let PumpStatus::Exit(code) = status {
            log::debug!("Event loop exited with code {}", code);
            self.exited = true;
            events.push(EventKind::WindowClose.into());
        }
        events
    }

    fn swap_buffers(&mut self) {
        self.window.request_redraw();
    }

    fn time(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}
