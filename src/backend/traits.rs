//! Core backend abstraction traits
//!
//! These traits define the interface that every graphics backend must implement.
//! Engine-level resources ([`VertexBuffer`](crate::renderer::VertexBuffer),
//! [`Shader`](crate::shader::Shader), ...) only ever talk to a backend through
//! the opaque handles defined here.

use crate::backend::types::*;
use glam::Vec4;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to initialize backend: {0}")]
    InitializationFailed(String),
    #[error("Failed to create surface: {0}")]
    SurfaceCreationFailed(String),
    #[error("Failed to create device: {0}")]
    DeviceCreationFailed(String),
    #[error("Failed to acquire next image: {0}")]
    AcquireImageFailed(String),
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Failed to create shader: {0}")]
    ShaderCreationFailed(String),
    #[error("Failed to create pipeline: {0}")]
    PipelineCreationFailed(String),
    #[error("Feature not supported: {0}")]
    FeatureNotSupported(String),
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Surface lost")]
    SurfaceLost,
    #[error("Out of memory")]
    OutOfMemory,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a GPU buffer (vertex or index data)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u64);

/// Handle to a backend vertex array object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArrayHandle(pub(crate) u64);

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub(crate) u64);

/// Resolved location of a uniform inside a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub(crate) u32);

impl UniformLocation {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderStageFlags(u32);

impl ShaderStageFlags {
    pub const NONE: Self = Self(0);
    pub const VERTEX: Self = Self(1 << 0);
    pub const FRAGMENT: Self = Self(1 << 1);
    pub const VERTEX_FRAGMENT: Self = Self((1 << 0) | (1 << 1));

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for ShaderStageFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ShaderStageFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Main graphics backend trait
///
/// Resource creation, binding and uniform state may be driven by any engine
/// resource. Clearing, viewport changes and draws are only issued by
/// [`RenderCommand`](crate::renderer::RenderCommand).
pub trait GraphicsBackend {
    /// Human readable backend name
    fn name(&self) -> &'static str;

    /// Resize the render surface
    fn resize(&mut self, width: u32, height: u32);

    /// Get the actual surface size (may be clamped by device limits)
    fn surface_size(&self) -> (u32, u32);

    /// Begin a new frame
    fn begin_frame(&mut self) -> BackendResult<()>;

    /// End and present the frame
    fn end_frame(&mut self) -> BackendResult<()>;

    // Buffers

    /// Create an immutable buffer initialized with `data`
    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> BackendResult<BufferHandle>;

    /// Destroy a buffer
    fn destroy_buffer(&mut self, buffer: BufferHandle);

    // Vertex arrays

    /// Create an empty vertex array
    fn create_vertex_array(&mut self) -> BackendResult<VertexArrayHandle>;

    /// Register a vertex buffer and its attributes with a vertex array
    fn attach_vertex_buffer(
        &mut self,
        vertex_array: VertexArrayHandle,
        binding: &VertexBufferBinding,
    ) -> BackendResult<()>;

    /// Set the index buffer used when drawing a vertex array
    fn set_index_buffer(
        &mut self,
        vertex_array: VertexArrayHandle,
        buffer: BufferHandle,
    ) -> BackendResult<()>;

    /// Make a vertex array current (`None` unbinds)
    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>);

    /// Destroy a vertex array
    fn destroy_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    // Programs

    /// Create a program from already validated stage sources
    fn create_program(&mut self, desc: &ProgramDescriptor) -> BackendResult<ProgramHandle>;

    /// Make a program current (`None` unbinds)
    fn bind_program(&mut self, program: Option<ProgramHandle>);

    /// Store a uniform value for the next draws issued with `program`
    fn set_uniform(
        &mut self,
        program: ProgramHandle,
        location: UniformLocation,
        value: &UniformValue,
    ) -> BackendResult<()>;

    /// Destroy a program
    fn destroy_program(&mut self, program: ProgramHandle);

    // Commands

    /// Enable standard alpha blending for subsequent draws
    fn enable_blending(&mut self);

    /// Set the color used by [`clear`](Self::clear)
    fn set_clear_color(&mut self, color: Vec4);

    /// Clear the current render target
    fn clear(&mut self);

    /// Set the viewport rectangle in pixels
    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32);

    /// Draw `index_count` indices of `vertex_array` with the currently bound program
    fn draw_indexed(
        &mut self,
        vertex_array: VertexArrayHandle,
        index_count: u32,
    ) -> BackendResult<()>;
}
