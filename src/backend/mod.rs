//! Backend abstraction layer
//!
//! Provides the [`GraphicsBackend`] trait implemented by the wgpu and
//! headless backends, and [`GraphicsContext`], the shared handle every
//! engine resource keeps to the active backend.

pub mod headless;
pub mod traits;
pub mod types;
pub mod wgpu_backend;

pub use headless::{DrawRecord, HeadlessBackend, RecordedCommand};
pub use traits::*;
pub use types::*;
pub use wgpu_backend::WgpuBackend;

use crate::BackendType;
use glam::Vec4;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use winit::window::Window as WinitWindow;

/// Backend wrapper to abstract over different backends
pub enum Backend {
    Headless(HeadlessBackend),
    Wgpu(WgpuBackend),
}

impl Backend {
    /// Create a backend of the requested type for `window`
    pub fn new(
        window: Arc<WinitWindow>,
        backend_type: BackendType,
        vsync: bool,
    ) -> BackendResult<Self> {
        match backend_type {
            BackendType::Wgpu => Ok(Backend::Wgpu(WgpuBackend::new(window, vsync)?)),
            BackendType::Headless => {
                let size = window.inner_size();
                Ok(Backend::Headless(HeadlessBackend::new(size.width, size.height)))
            }
        }
    }

    /// Create a headless backend with a virtual surface
    pub fn headless(width: u32, height: u32) -> Self {
        Backend::Headless(HeadlessBackend::new(width, height))
    }

    fn inner(&self) -> &dyn GraphicsBackend {
        match self {
            Backend::Headless(b) => b,
            Backend::Wgpu(b) => b,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn GraphicsBackend {
        match self {
            Backend::Headless(b) => b,
            Backend::Wgpu(b) => b,
        }
    }

    /// Get the headless backend (if using it)
    pub fn as_headless(&self) -> Option<&HeadlessBackend> {
        match self {
            Backend::Headless(b) => Some(b),
            _ => None,
        }
    }

    /// Get the wgpu backend (if using wgpu)
    pub fn as_wgpu(&self) -> Option<&WgpuBackend> {
        match self {
            Backend::Wgpu(b) => Some(b),
            _ => None,
        }
    }
}

impl GraphicsBackend for Backend {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.inner_mut().resize(width, height)
    }

    fn surface_size(&self) -> (u32, u32) {
        self.inner().surface_size()
    }

    fn begin_frame(&mut self) -> BackendResult<()> {
        self.inner_mut().begin_frame()
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        self.inner_mut().end_frame()
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> BackendResult<BufferHandle> {
        self.inner_mut().create_buffer(kind, data)
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        self.inner_mut().destroy_buffer(buffer)
    }

    fn create_vertex_array(&mut self) -> BackendResult<VertexArrayHandle> {
        self.inner_mut().create_vertex_array()
    }

    fn attach_vertex_buffer(
        &mut self,
        vertex_array: VertexArrayHandle,
        binding: &VertexBufferBinding,
    ) -> BackendResult<()> {
        self.inner_mut().attach_vertex_buffer(vertex_array, binding)
    }

    fn set_index_buffer(
        &mut self,
        vertex_array: VertexArrayHandle,
        buffer: BufferHandle,
    ) -> BackendResult<()> {
        self.inner_mut().set_index_buffer(vertex_array, buffer)
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>) {
        self.inner_mut().bind_vertex_array(vertex_array)
    }

    fn destroy_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.inner_mut().destroy_vertex_array(vertex_array)
    }

    fn create_program(&mut self, desc: &ProgramDescriptor) -> BackendResult<ProgramHandle> {
        self.inner_mut().create_program(desc)
    }

    fn bind_program(&mut self, program: Option<ProgramHandle>) {
        self.inner_mut().bind_program(program)
    }

    fn set_uniform(
        &mut self,
        program: ProgramHandle,
        location: UniformLocation,
        value: &UniformValue,
    ) -> BackendResult<()> {
        self.inner_mut().set_uniform(program, location, value)
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        self.inner_mut().destroy_program(program)
    }

    fn enable_blending(&mut self) {
        self.inner_mut().enable_blending()
    }

    fn set_clear_color(&mut self, color: Vec4) {
        self.inner_mut().set_clear_color(color)
    }

    fn clear(&mut self) {
        self.inner_mut().clear()
    }

    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.inner_mut().set_viewport(x, y, width, height)
    }

    fn draw_indexed(
        &mut self,
        vertex_array: VertexArrayHandle,
        index_count: u32,
    ) -> BackendResult<()> {
        self.inner_mut().draw_indexed(vertex_array, index_count)
    }
}

/// Shared handle to the active backend
///
/// Cloning is cheap; every clone talks to the same backend. Resources keep a
/// clone so they can release their backend objects when dropped.
#[derive(Clone)]
pub struct GraphicsContext {
    backend: Rc<RefCell<Backend>>,
}

impl GraphicsContext {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend: Rc::new(RefCell::new(backend)),
        }
    }

    /// Context backed by a [`HeadlessBackend`]
    pub fn headless(width: u32, height: u32) -> Self {
        Self::new(Backend::headless(width, height))
    }

    /// Run `f` with exclusive access to the backend
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut Backend) -> R) -> R {
        f(&mut self.backend.borrow_mut())
    }

    /// Release a backend object from a `Drop` impl
    ///
    /// Skipped with a warning if the backend is already borrowed.
    pub(crate) fn release(&self, f: impl FnOnce(&mut Backend)) {
        match self.backend.try_borrow_mut() {
            Ok(mut backend) => f(&mut backend),
            Err(_) => log::warn!("Backend busy, leaking resource on drop"),
        }
    }

    /// Inspect the headless backend, `None` for any other backend
    pub fn inspect_headless<R>(&self, f: impl FnOnce(&HeadlessBackend) -> R) -> Option<R> {
        self.backend.borrow().as_headless().map(f)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.borrow().name()
    }

    pub fn begin_frame(&self) -> BackendResult<()> {
        self.backend.borrow_mut().begin_frame()
    }

    pub fn end_frame(&self) -> BackendResult<()> {
        self.backend.borrow_mut().end_frame()
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.backend.borrow_mut().resize(width, height)
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.backend.borrow().surface_size()
    }
}

impl std::fmt::Debug for GraphicsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsContext")
            .field("backend", &self.backend_name())
            .finish()
    }
}
