//! Renderer abstraction layer
//!
//! Backend-agnostic resources ([`VertexBuffer`], [`IndexBuffer`],
//! [`VertexArray`]) plus the scene-level [`Renderer`] and the quad-oriented
//! [`Renderer2D`] built on it. All draw traffic goes through
//! [`RenderCommand`].

pub mod buffer;
pub mod render_command;
pub mod renderer_2d;
pub mod scene;
pub mod vertex_array;

pub use buffer::{BufferElement, BufferLayout, IndexBuffer, VertexBuffer};
pub use render_command::RenderCommand;
pub use renderer_2d::Renderer2D;
pub use scene::{Renderer, SceneContext, SceneStats};
pub use vertex_array::VertexArray;

use thiserror::Error;

use crate::backend::BackendError;
use crate::shader::ShaderError;

/// Renderer usage and resource errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RendererError {
    #[error("A scene is already active")]
    SceneAlreadyActive,
    #[error("No active scene")]
    NoActiveScene,
    #[error("Scene context does not belong to the active scene")]
    StaleScene,
    #[error("Vertex array has no index buffer")]
    MissingIndexBuffer,
    #[error("Index count {requested} exceeds the {available} indices of the index buffer")]
    IndexCountOutOfRange { requested: u32, available: u32 },
    #[error("Vertex buffer has no layout")]
    EmptyLayout,
    #[error("Renderer2D is not initialized")]
    NotInitialized,
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Shader(#[from] ShaderError),
}
