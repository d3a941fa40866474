//! Headless backend for testing and development.
//!
//! This backend doesn't touch a GPU. It keeps buffer contents, vertex array
//! bindings and program uniform state in memory and records every clear,
//! viewport change and draw so callers can inspect what would have been
//! rendered.

use std::collections::HashMap;

use glam::Vec4;

use crate::backend::traits::*;
use crate::backend::types::*;

/// Commands kept by [`HeadlessBackend::new`] before the oldest are discarded
pub const DEFAULT_COMMAND_LIMIT: usize = 16 * 1024;

/// A command observed by the headless backend
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    Clear { color: Vec4 },
    SetViewport { x: u32, y: u32, width: u32, height: u32 },
    DrawIndexed(DrawRecord),
}

/// Snapshot of the state a draw was issued with
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: Option<ProgramHandle>,
    pub vertex_array: VertexArrayHandle,
    pub index_count: u32,
    /// Uniform values that were set on the program at draw time
    pub uniforms: Vec<(String, UniformValue)>,
}

impl DrawRecord {
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms
            .iter()
            .find(|(uniform, _)| uniform == name)
            .map(|(_, value)| value)
    }
}

struct HeadlessBuffer {
    kind: BufferKind,
    data: Vec<u8>,
}

#[derive(Default)]
struct HeadlessVertexArray {
    bindings: Vec<VertexBufferBinding>,
    index_buffer: Option<BufferHandle>,
}

struct HeadlessProgram {
    label: Option<String>,
    uniforms: Vec<UniformInfo>,
    values: Vec<Option<UniformValue>>,
}

/// Recording backend without GPU access
pub struct HeadlessBackend {
    width: u32,
    height: u32,

    buffers: HashMap<u64, HeadlessBuffer>,
    vertex_arrays: HashMap<u64, HeadlessVertexArray>,
    programs: HashMap<u64, HeadlessProgram>,
    next_id: u64,

    bound_program: Option<ProgramHandle>,
    bound_vertex_array: Option<VertexArrayHandle>,
    clear_color: Vec4,
    blending: bool,

    in_frame: bool,
    frames_presented: u64,
    commands: Vec<RecordedCommand>,
    command_limit: usize,
    dropped_commands: usize,
}

impl HeadlessBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_command_limit(width, height, DEFAULT_COMMAND_LIMIT)
    }

    /// Backend keeping at most `limit` recorded commands
    ///
    /// Once the log is full the older half is discarded, so the most recent
    /// commands are always available.
    pub fn with_command_limit(width: u32, height: u32, limit: usize) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            programs: HashMap::new(),
            next_id: 1,
            bound_program: None,
            bound_vertex_array: None,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            blending: false,
            in_frame: false,
            frames_presented: 0,
            commands: Vec::new(),
            command_limit: limit.max(1),
            dropped_commands: 0,
        }
    }

    fn record(&mut self, command: RecordedCommand) {
        if self.commands.len() >= self.command_limit {
            let excess = self.commands.len() - self.command_limit / 2;
            self.commands.drain(..excess);
            self.dropped_commands += excess;
            log::trace!("HeadlessBackend: discarded {} recorded commands", excess);
        }
        self.commands.push(command);
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Retained commands, oldest first, since creation or the last
    /// [`take_commands`](Self::take_commands)
    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<RecordedCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Commands discarded because the log was full
    pub fn dropped_command_count(&self) -> usize {
        self.dropped_commands
    }

    pub fn draws(&self) -> impl Iterator<Item = &DrawRecord> {
        self.commands.iter().filter_map(|cmd| match cmd {
            RecordedCommand::DrawIndexed(draw) => Some(draw),
            _ => None,
        })
    }

    pub fn draw_count(&self) -> usize {
        self.draws().count()
    }

    pub fn clear_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, RecordedCommand::Clear { .. }))
            .count()
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn is_in_frame(&self) -> bool {
        self.in_frame
    }

    pub fn blending_enabled(&self) -> bool {
        self.blending
    }

    pub fn bound_program(&self) -> Option<ProgramHandle> {
        self.bound_program
    }

    pub fn bound_vertex_array(&self) -> Option<VertexArrayHandle> {
        self.bound_vertex_array
    }

    /// Number of buffers currently alive
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn live_vertex_array_count(&self) -> usize {
        self.vertex_arrays.len()
    }

    pub fn buffer_data(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer.0).map(|b| b.data.as_slice())
    }

    pub fn buffer_kind(&self, buffer: BufferHandle) -> Option<BufferKind> {
        self.buffers.get(&buffer.0).map(|b| b.kind)
    }

    pub fn vertex_array_bindings(&self, vertex_array: VertexArrayHandle) -> Option<&[VertexBufferBinding]> {
        self.vertex_arrays
            .get(&vertex_array.0)
            .map(|va| va.bindings.as_slice())
    }

    pub fn program_label(&self, program: ProgramHandle) -> Option<&str> {
        self.programs
            .get(&program.0)
            .and_then(|p| p.label.as_deref())
    }

    pub fn uniform_value(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        let program = self.programs.get(&program.0)?;
        let index = program.uniforms.iter().position(|u| u.name == name)?;
        program.values[index]
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "Headless"
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
        }
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn begin_frame(&mut self) -> BackendResult<()> {
        self.in_frame = true;
        Ok(())
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        if self.in_frame {
            self.in_frame = false;
            self.frames_presented += 1;
        }
        Ok(())
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> BackendResult<BufferHandle> {
        let id = self.allocate_id();
        log::trace!("HeadlessBackend: creating {:?} buffer {} ({} bytes)", kind, id, data.len());
        self.buffers.insert(
            id,
            HeadlessBuffer {
                kind,
                data: data.to_vec(),
            },
        );
        Ok(BufferHandle(id))
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        log::trace!("HeadlessBackend: destroying buffer {}", buffer.0);
        self.buffers.remove(&buffer.0);
    }

    fn create_vertex_array(&mut self) -> BackendResult<VertexArrayHandle> {
        let id = self.allocate_id();
        self.vertex_arrays.insert(id, HeadlessVertexArray::default());
        Ok(VertexArrayHandle(id))
    }

    fn attach_vertex_buffer(
        &mut self,
        vertex_array: VertexArrayHandle,
        binding: &VertexBufferBinding,
    ) -> BackendResult<()> {
        if !self.buffers.contains_key(&binding.buffer.0) {
            return Err(BackendError::InvalidHandle(format!("buffer {}", binding.buffer.0)));
        }
        let va = self
            .vertex_arrays
            .get_mut(&vertex_array.0)
            .ok_or_else(|| BackendError::InvalidHandle(format!("vertex array {}", vertex_array.0)))?;
        va.bindings.push(binding.clone());
        Ok(())
    }

    fn set_index_buffer(
        &mut self,
        vertex_array: VertexArrayHandle,
        buffer: BufferHandle,
    ) -> BackendResult<()> {
        if !self.buffers.contains_key(&buffer.0) {
            return Err(BackendError::InvalidHandle(format!("buffer {}", buffer.0)));
        }
        let va = self
            .vertex_arrays
            .get_mut(&vertex_array.0)
            .ok_or_else(|| BackendError::InvalidHandle(format!("vertex array {}", vertex_array.0)))?;
        va.index_buffer = Some(buffer);
        Ok(())
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>) {
        self.bound_vertex_array = vertex_array;
    }

    fn destroy_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.vertex_arrays.remove(&vertex_array.0);
        if self.bound_vertex_array == Some(vertex_array) {
            self.bound_vertex_array = None;
        }
    }

    fn create_program(&mut self, desc: &ProgramDescriptor) -> BackendResult<ProgramHandle> {
        let id = self.allocate_id();
        log::trace!(
            "HeadlessBackend: creating program {:?} with {} uniforms",
            desc.label,
            desc.uniforms.len()
        );
        self.programs.insert(
            id,
            HeadlessProgram {
                label: desc.label.clone(),
                uniforms: desc.uniforms.clone(),
                values: vec![None; desc.uniforms.len()],
            },
        );
        Ok(ProgramHandle(id))
    }

    fn bind_program(&mut self, program: Option<ProgramHandle>) {
        self.bound_program = program;
    }

    fn set_uniform(
        &mut self,
        program: ProgramHandle,
        location: UniformLocation,
        value: &UniformValue,
    ) -> BackendResult<()> {
        let program = self
            .programs
            .get_mut(&program.0)
            .ok_or_else(|| BackendError::InvalidHandle(format!("program {}", program.0)))?;
        let slot = program
            .values
            .get_mut(location.index())
            .ok_or_else(|| BackendError::InvalidParameter(format!("uniform location {}", location.0)))?;
        *slot = Some(*value);
        Ok(())
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program.0);
        if self.bound_program == Some(program) {
            self.bound_program = None;
        }
    }

    fn enable_blending(&mut self) {
        self.blending = true;
    }

    fn set_clear_color(&mut self, color: Vec4) {
        self.clear_color = color;
    }

    fn clear(&mut self) {
        self.record(RecordedCommand::Clear {
            color: self.clear_color,
        });
    }

    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.record(RecordedCommand::SetViewport {
            x,
            y,
            width,
            height,
        });
    }

    fn draw_indexed(
        &mut self,
        vertex_array: VertexArrayHandle,
        index_count: u32,
    ) -> BackendResult<()> {
        let va = self
            .vertex_arrays
            .get(&vertex_array.0)
            .ok_or_else(|| BackendError::InvalidHandle(format!("vertex array {}", vertex_array.0)))?;
        let index_buffer = va.index_buffer.ok_or_else(|| {
            BackendError::InvalidParameter("vertex array has no index buffer".into())
        })?;
        let available = self
            .buffers
            .get(&index_buffer.0)
            .map(|b| b.data.len() / std::mem::size_of::<u32>())
            .unwrap_or(0);
        if index_count as usize > available {
            return Err(BackendError::InvalidParameter(format!(
                "index count {} exceeds index buffer length {}",
                index_count, available
            )));
        }

        let uniforms = self
            .bound_program
            .and_then(|handle| self.programs.get(&handle.0))
            .map(|program| {
                program
                    .uniforms
                    .iter()
                    .zip(&program.values)
                    .filter_map(|(info, value)| value.map(|v| (info.name.clone(), v)))
                    .collect()
            })
            .unwrap_or_default();

        self.record(RecordedCommand::DrawIndexed(DrawRecord {
            program: self.bound_program,
            vertex_array,
            index_count,
            uniforms,
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_array(backend: &mut HeadlessBackend) -> VertexArrayHandle {
        let vertices = backend.create_buffer(BufferKind::Vertex, &[0u8; 48]).unwrap();
        let indices: [u32; 6] = [0, 1, 2, 2, 3, 0];
        let index_buffer = backend
            .create_buffer(BufferKind::Index, bytemuck::cast_slice(&indices))
            .unwrap();
        let va = backend.create_vertex_array().unwrap();
        backend
            .attach_vertex_buffer(
                va,
                &VertexBufferBinding {
                    buffer: vertices,
                    stride: 12,
                    attributes: vec![],
                },
            )
            .unwrap();
        backend.set_index_buffer(va, index_buffer).unwrap();
        va
    }

    #[test]
    fn test_records_draws() {
        let mut backend = HeadlessBackend::default();
        let va = quad_array(&mut backend);
        backend.draw_indexed(va, 6).unwrap();
        assert_eq!(backend.draw_count(), 1);
        assert_eq!(backend.draws().next().unwrap().index_count, 6);
    }

    #[test]
    fn test_rejects_oversized_draw() {
        let mut backend = HeadlessBackend::default();
        let va = quad_array(&mut backend);
        assert!(backend.draw_indexed(va, 7).is_err());
        assert_eq!(backend.draw_count(), 0);
    }

    #[test]
    fn test_frame_counting() {
        let mut backend = HeadlessBackend::default();
        backend.end_frame().unwrap();
        assert_eq!(backend.frames_presented(), 0);
        backend.begin_frame().unwrap();
        backend.end_frame().unwrap();
        assert_eq!(backend.frames_presented(), 1);
    }

    #[test]
    fn test_command_log_is_bounded() {
        let mut backend = HeadlessBackend::with_command_limit(64, 64, 4);
        for i in 0..10 {
            backend.set_clear_color(Vec4::splat(i as f32));
            backend.clear();
            assert!(backend.commands().len() <= 4);
        }

        assert_eq!(backend.commands().len() + backend.dropped_command_count(), 10);
        assert_eq!(
            backend.commands().last(),
            Some(&RecordedCommand::Clear {
                color: Vec4::splat(9.0)
            })
        );
    }
}
