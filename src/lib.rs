//! Canopy - a small 2D rendering engine
//!
//! The engine is split into a backend layer and a renderer layer:
//! - **Backends** implement [`GraphicsBackend`]: a wgpu backend drawing into a
//!   winit window, and a headless backend that records commands in memory.
//! - **Renderer resources** ([`VertexBuffer`], [`IndexBuffer`], [`VertexArray`],
//!   [`Shader`]) talk to the active backend through a shared [`GraphicsContext`].
//! - **Scenes** are bracketed by [`Renderer::begin_scene`] and
//!   [`Renderer::end_scene`]; every submission inside is drawn with the
//!   camera's view-projection matrix.
//! - An [`Application`] drives the frame loop over a [`LayerStack`].
//!
//! # Example
//!
//! ```ignore
//! canopy::init();
//! let config = EngineConfig::default();
//! let platform = WinitPlatform::new(&config)?;
//! let backend = Backend::new(platform.window_arc(), config.backend, config.vsync)?;
//! let mut app = Application::new(platform, GraphicsContext::new(backend))?;
//! app.push_layer(Box::new(MyLayer::new()))?;
//! app.run()?;
//! ```

pub mod application;
pub mod backend;
pub mod error;
pub mod events;
pub mod layer;
pub mod renderer;
pub mod scene;
pub mod shader;
pub mod window;

pub use application::{Application, GuiOverlay, Graphics, Platform, Timestep};
pub use backend::{Backend, GraphicsBackend, GraphicsContext, HeadlessBackend, WgpuBackend};
pub use error::{EngineError, EngineResult};
pub use events::{Event, EventCategory, EventKind};
pub use layer::{Layer, LayerStack};
pub use renderer::{
    BufferElement, BufferLayout, IndexBuffer, RenderCommand, Renderer, Renderer2D, RendererError,
    SceneContext, SceneStats, VertexArray, VertexBuffer,
};
pub use scene::OrthographicCamera;
pub use shader::{Shader, ShaderError};
pub use window::WinitPlatform;

pub use backend::ShaderDataType;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Backend selection for the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendType {
    /// wgpu backend drawing into the window surface
    #[default]
    Wgpu,
    /// In-memory recording backend, nothing is presented
    Headless,
}

/// Configuration for initializing the engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Which backend to use
    pub backend: BackendType,
    /// Enable vsync
    pub vsync: bool,
    /// Color the frame is cleared to
    pub clear_color: glam::Vec4,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "Canopy".to_string(),
            width: 1280,
            height: 720,
            backend: BackendType::Wgpu,
            vsync: true,
            clear_color: glam::Vec4::new(0.1, 0.1, 0.1, 1.0),
        }
    }
}

/// Install the `env_logger` logger, `info` unless `RUST_LOG` says otherwise
///
/// Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

/// Initialize logging and report the engine version
pub fn init() {
    init_logging();
    log::info!("Canopy v{}", VERSION);
}
