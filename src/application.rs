//! Application main loop
//!
//! [`Application`] owns the layer stack and the renderers and drives one
//! frame at a time: poll platform events, update every layer, run the GUI
//! hook, present and swap. The windowing system and the GUI library are
//! reached only through the [`Platform`] and [`GuiOverlay`] traits.

use crate::backend::GraphicsContext;
use crate::error::EngineResult;
use crate::events::{Event, EventKind};
use crate::layer::{Layer, LayerStack};
use crate::renderer::{Renderer, Renderer2D};

/// Time elapsed since the previous frame
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Timestep(f32);

impl Timestep {
    pub fn new(seconds: f32) -> Self {
        Self(seconds)
    }

    pub fn seconds(&self) -> f32 {
        self.0
    }

    pub fn milliseconds(&self) -> f32 {
        self.0 * 1000.0
    }
}

impl From<Timestep> for f32 {
    fn from(timestep: Timestep) -> Self {
        timestep.0
    }
}

/// Windowing collaborator
pub trait Platform {
    /// Drain the events raised since the last call
    fn poll_events(&mut self) -> Vec<Event>;

    fn swap_buffers(&mut self);

    /// Monotonic time in seconds
    fn time(&self) -> f64;
}

/// GUI collaborator, invoked once per frame around the layers' GUI hooks
pub trait GuiOverlay {
    fn begin(&mut self);
    fn end(&mut self);
}

/// Rendering state handed to layers
pub struct Graphics {
    pub context: GraphicsContext,
    pub renderer: Renderer,
    pub renderer_2d: Renderer2D,
}

impl Graphics {
    pub fn new(context: GraphicsContext) -> Self {
        let renderer = Renderer::new(&context);
        let renderer_2d = Renderer2D::new(&context);
        Self {
            context,
            renderer,
            renderer_2d,
        }
    }
}

pub struct Application<P: Platform> {
    platform: P,
    graphics: Graphics,
    layer_stack: LayerStack,
    gui: Option<Box<dyn GuiOverlay>>,
    running: bool,
    minimized: bool,
    last_frame_time: f64,
}

impl<P: Platform> Application<P> {
    /// Create the application and initialize both renderers
    pub fn new(platform: P, context: GraphicsContext) -> EngineResult<Self> {
        let mut graphics = Graphics::new(context);
        graphics.renderer.init();
        graphics.renderer_2d.init()?;

        let (width, height) = graphics.context.surface_size();
        graphics.renderer.on_window_resize(width, height);

        let last_frame_time = platform.time();
        log::info!(
            "Application created ({} backend, {}x{})",
            graphics.context.backend_name(),
            width,
            height
        );

        Ok(Self {
            platform,
            graphics,
            layer_stack: LayerStack::new(),
            gui: None,
            running: true,
            minimized: false,
            last_frame_time,
        })
    }

    pub fn set_gui_overlay(&mut self, gui: Box<dyn GuiOverlay>) {
        self.gui = Some(gui);
    }

    pub fn push_layer(&mut self, mut layer: Box<dyn Layer>) -> EngineResult<()> {
        layer.on_attach(&mut self.graphics)?;
        log::debug!("Layer `{}` attached", layer.name());
        self.layer_stack.push_layer(layer);
        Ok(())
    }

    pub fn push_overlay(&mut self, mut overlay: Box<dyn Layer>) -> EngineResult<()> {
        overlay.on_attach(&mut self.graphics)?;
        log::debug!("Overlay `{}` attached", overlay.name());
        self.layer_stack.push_overlay(overlay);
        Ok(())
    }

    pub fn layer_stack(&self) -> &LayerStack {
        &self.layer_stack
    }

    pub fn graphics(&self) -> &Graphics {
        &self.graphics
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    /// Stop the loop after the current frame
    pub fn close(&mut self) {
        self.running = false;
    }

    /// Handle application events, then offer the event to the layers
    pub fn on_event(&mut self, event: &mut Event) {
        log::trace!("{}", event);

        event.dispatch(|kind| match *kind {
            EventKind::WindowClose => {
                self.running = false;
                Some(true)
            }
            EventKind::WindowResize { width, height } => {
                if width == 0 || height == 0 {
                    self.minimized = true;
                    return Some(false);
                }
                self.minimized = false;
                self.graphics.context.resize(width, height);
                self.graphics.renderer.on_window_resize(width, height);
                Some(false)
            }
            _ => None,
        });

        self.layer_stack.dispatch(event);
    }

    /// Run a single frame
    pub fn run_frame(&mut self) -> EngineResult<()> {
        for mut event in self.platform.poll_events() {
            self.on_event(&mut event);
        }
        if !self.running {
            return Ok(());
        }

        let time = self.platform.time();
        let timestep = Timestep::new((time - self.last_frame_time) as f32);
        self.last_frame_time = time;

        if !self.minimized {
            self.graphics.context.begin_frame()?;
            for layer in self.layer_stack.iter_mut() {
                layer.on_update(&mut self.graphics, timestep)?;
            }

            if let Some(gui) = self.gui.as_mut() {
                gui.begin();
            }
            for layer in self.layer_stack.iter_mut() {
                layer.on_gui_render();
            }
            if let Some(gui) = self.gui.as_mut() {
                gui.end();
            }

            self.graphics.context.end_frame()?;
        }

        self.platform.swap_buffers();
        Ok(())
    }

    /// Run frames until the window closes, then detach every layer
    pub fn run(&mut self) -> EngineResult<()> {
        while self.running {
            if let Err(e) = self.run_frame() {
                log::error!("Frame failed: {}", e);
                self.shutdown();
                return Err(e);
            }
        }
        self.shutdown();
        Ok(())
    }

    /// Detach every layer, top first, and release renderer resources
    pub fn shutdown(&mut self) {
        for mut layer in self.layer_stack.drain() {
            layer.on_detach();
            log::debug!("Layer `{}` detached", layer.name());
        }
        self.graphics.renderer_2d.shutdown();
    }
}
