//! wgpu backend implementation
//!
//! Draws are not encoded immediately: each `draw_indexed` snapshots the
//! bound program's uniforms into a bind group and is replayed inside a single
//! render pass when the frame ends.

use crate::backend::traits::*;
use crate::backend::types::*;
use glam::Vec4;
use std::collections::HashMap;
use std::sync::Arc;
use wgpu::util::DeviceExt;

/// A linked program: two shader modules plus the layout of its uniforms
struct WgpuProgram {
    label: Option<String>,
    vertex_module: wgpu::ShaderModule,
    vertex_entry: String,
    fragment_module: wgpu::ShaderModule,
    fragment_entry: String,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    uniforms: Vec<UniformInfo>,
    /// Current bytes of every uniform, indexed by location
    values: Vec<Vec<u8>>,
}

#[derive(Default)]
struct WgpuVertexArray {
    bindings: Vec<VertexBufferBinding>,
    index_buffer: Option<BufferHandle>,
}

/// A draw waiting for the end of the frame
struct PendingDraw {
    pipeline_key: (u64, u64),
    bind_group: wgpu::BindGroup,
    _uniform_buffers: Vec<wgpu::Buffer>,
    vertex_buffers: Vec<BufferHandle>,
    index_buffer: BufferHandle,
    index_count: u32,
}

/// wgpu backend implementation
pub struct WgpuBackend {
    #[allow(dead_code)]
    instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    #[allow(dead_code)]
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    current_texture: Option<wgpu::SurfaceTexture>,

    // Resource storage
    buffers: HashMap<u64, wgpu::Buffer>,
    vertex_arrays: HashMap<u64, WgpuVertexArray>,
    programs: HashMap<u64, WgpuProgram>,
    // Pipelines keyed by (program, vertex array)
    pipelines: HashMap<(u64, u64), wgpu::RenderPipeline>,
    next_id: u64,

    // Current state
    bound_program: Option<ProgramHandle>,
    bound_vertex_array: Option<VertexArrayHandle>,
    clear_color: wgpu::Color,
    pending_clear: bool,
    blend: Option<wgpu::BlendState>,
    viewport: Option<[u32; 4]>,
    draws: Vec<PendingDraw>,
}

impl WgpuBackend {
    fn convert_vertex_format(attribute: &VertexAttributeDesc) -> BackendResult<wgpu::VertexFormat> {
        let format = match (attribute.kind, attribute.components) {
            (ScalarKind::Float, 1) => wgpu::VertexFormat::Float32,
            (ScalarKind::Float, 2) => wgpu::VertexFormat::Float32x2,
            (ScalarKind::Float, 3) => wgpu::VertexFormat::Float32x3,
            (ScalarKind::Float, 4) => wgpu::VertexFormat::Float32x4,
            (ScalarKind::Int, 1) => wgpu::VertexFormat::Sint32,
            (ScalarKind::Int, 2) => wgpu::VertexFormat::Sint32x2,
            (ScalarKind::Int, 3) => wgpu::VertexFormat::Sint32x3,
            (ScalarKind::Int, 4) => wgpu::VertexFormat::Sint32x4,
            (kind, components) => {
                return Err(BackendError::FeatureNotSupported(format!(
                    "vertex attribute at location {} ({:?} x{})",
                    attribute.location, kind, components
                )))
            }
        };
        Ok(format)
    }

    fn convert_visibility(flags: ShaderStageFlags) -> wgpu::ShaderStages {
        let mut result = wgpu::ShaderStages::NONE;
        if flags.contains(ShaderStageFlags::VERTEX) {
            result |= wgpu::ShaderStages::VERTEX;
        }
        if flags.contains(ShaderStageFlags::FRAGMENT) {
            result |= wgpu::ShaderStages::FRAGMENT;
        }
        result
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Create a backend rendering into `window`
    pub fn new(window: Arc<winit::window::Window>, vsync: bool) -> BackendResult<Self> {
        pollster::block_on(Self::new_async(window, vsync))
    }

    pub async fn new_async(window: Arc<winit::window::Window>, vsync: bool) -> BackendResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| BackendError::SurfaceCreationFailed(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| BackendError::InitializationFailed("No suitable adapter found".into()))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Selected GPU: {} ({:?} backend)",
            adapter_info.name,
            adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Canopy Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| BackendError::DeviceCreationFailed(e.to_string()))?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| BackendError::SurfaceCreationFailed("surface reports no formats".into()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let present_mode = if vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &surface_config);

        Ok(Self {
            instance,
            surface,
            adapter,
            device,
            queue,
            surface_config,
            current_texture: None,
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            programs: HashMap::new(),
            pipelines: HashMap::new(),
            next_id: 1,
            bound_program: None,
            bound_vertex_array: None,
            clear_color: wgpu::Color::BLACK,
            pending_clear: false,
            blend: None,
            viewport: None,
            draws: Vec::new(),
        })
    }

    /// Build the render pipeline for a program / vertex array pair if it doesn't exist yet
    fn ensure_pipeline(&mut self, program: ProgramHandle, vertex_array: VertexArrayHandle) -> BackendResult<()> {
        let key = (program.0, vertex_array.0);
        if self.pipelines.contains_key(&key) {
            return Ok(());
        }

        let pipeline = {
            let program = self
                .programs
                .get(&program.0)
                .ok_or_else(|| BackendError::InvalidHandle(format!("program {}", program.0)))?;
            let va = self
                .vertex_arrays
                .get(&vertex_array.0)
                .ok_or_else(|| BackendError::InvalidHandle(format!("vertex array {}", vertex_array.0)))?;

            // Build vertex buffer layouts with proper lifetimes
            let vertex_attrs: Vec<Vec<wgpu::VertexAttribute>> = va
                .bindings
                .iter()
                .map(|binding| {
                    binding
                        .attributes
                        .iter()
                        .map(|a| {
                            Ok(wgpu::VertexAttribute {
                                format: Self::convert_vertex_format(a)?,
                                offset: a.offset as u64,
                                shader_location: a.location,
                            })
                        })
                        .collect::<BackendResult<Vec<_>>>()
                })
                .collect::<BackendResult<Vec<_>>>()?;

            let vertex_buffers: Vec<wgpu::VertexBufferLayout> = va
                .bindings
                .iter()
                .zip(vertex_attrs.iter())
                .map(|(binding, attrs)| wgpu::VertexBufferLayout {
                    array_stride: binding.stride as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: attrs,
                })
                .collect();

            let color_targets = [Some(wgpu::ColorTargetState {
                format: self.surface_config.format,
                blend: self.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })];

            self.device.push_error_scope(wgpu::ErrorFilter::Validation);
            let pipeline = self
                .device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: program.label.as_deref(),
                    layout: Some(&program.pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &program.vertex_module,
                        entry_point: &program.vertex_entry,
                        buffers: &vertex_buffers,
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &program.fragment_module,
                        entry_point: &program.fragment_entry,
                        targets: &color_targets,
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    }),
                    primitive: wgpu::PrimitiveState::default(),
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                });
            if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
                return Err(BackendError::PipelineCreationFailed(error.to_string()));
            }
            pipeline
        };

        self.pipelines.insert(key, pipeline);
        Ok(())
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }
}

impl GraphicsBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            let max_size = self.device.limits().max_texture_dimension_2d;
            self.surface_config.width = width.min(max_size);
            self.surface_config.height = height.min(max_size);
            self.surface.configure(&self.device, &self.surface_config);
        }
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    fn begin_frame(&mut self) -> BackendResult<()> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.surface_config);
                self.surface.get_current_texture().map_err(|e| match e {
                    wgpu::SurfaceError::Lost => BackendError::SurfaceLost,
                    wgpu::SurfaceError::OutOfMemory => BackendError::OutOfMemory,
                    _ => BackendError::AcquireImageFailed(e.to_string()),
                })?
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(BackendError::OutOfMemory),
            Err(e) => return Err(BackendError::AcquireImageFailed(e.to_string())),
        };

        self.current_texture = Some(output);
        self.draws.clear();
        self.pending_clear = false;
        Ok(())
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        let Some(frame) = self.current_texture.take() else {
            return Ok(());
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let draws = std::mem::take(&mut self.draws);
        let load = if self.pending_clear {
            wgpu::LoadOp::Clear(self.clear_color)
        } else {
            wgpu::LoadOp::Load
        };

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some([x, y, width, height]) = self.viewport {
                let (surface_width, surface_height) = self.surface_size();
                let x = x.min(surface_width.saturating_sub(1));
                let y = y.min(surface_height.saturating_sub(1));
                let width = width.min(surface_width - x).max(1);
                let height = height.min(surface_height - y).max(1);
                render_pass.set_viewport(
                    x as f32,
                    y as f32,
                    width as f32,
                    height as f32,
                    0.0,
                    1.0,
                );
            }

            for draw in &draws {
                let Some(pipeline) = self.pipelines.get(&draw.pipeline_key) else {
                    continue;
                };
                let Some(index_buffer) = self.buffers.get(&draw.index_buffer.0) else {
                    continue;
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &draw.bind_group, &[]);
                for (slot, handle) in draw.vertex_buffers.iter().enumerate() {
                    if let Some(buffer) = self.buffers.get(&handle.0) {
                        render_pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                    }
                }
                render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        self.pending_clear = false;
        Ok(())
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> BackendResult<BufferHandle> {
        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        };
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(match kind {
                    BufferKind::Vertex => "Vertex Buffer",
                    BufferKind::Index => "Index Buffer",
                }),
                contents: data,
                usage: usage | wgpu::BufferUsages::COPY_DST,
            });

        let id = self.allocate_id();
        log::trace!("WgpuBackend: created {:?} buffer {} ({} bytes)", kind, id, data.len());
        self.buffers.insert(id, buffer);
        Ok(BufferHandle(id))
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if let Some(buffer) = self.buffers.remove(&buffer.0) {
            buffer.destroy();
        }
    }

    fn create_vertex_array(&mut self) -> BackendResult<VertexArrayHandle> {
        let id = self.allocate_id();
        self.vertex_arrays.insert(id, WgpuVertexArray::default());
        Ok(VertexArrayHandle(id))
    }

    fn attach_vertex_buffer(
        &mut self,
        vertex_array: VertexArrayHandle,
        binding: &VertexBufferBinding,
    ) -> BackendResult<()> {
        // Reject layouts wgpu cannot express before they reach a pipeline
        for attribute in &binding.attributes {
            Self::convert_vertex_format(attribute)?;
        }
        if !self.buffers.contains_key(&binding.buffer.0) {
            return Err(BackendError::InvalidHandle(format!("buffer {}", binding.buffer.0)));
        }
        let va = self
            .vertex_arrays
            .get_mut(&vertex_array.0)
            .ok_or_else(|| BackendError::InvalidHandle(format!("vertex array {}", vertex_array.0)))?;
        va.bindings.push(binding.clone());
        self.pipelines.retain(|(_, va_id), _| *va_id != vertex_array.0);
        Ok(())
    }

    fn set_index_buffer(
        &mut self,
        vertex_array: VertexArrayHandle,
        buffer: BufferHandle,
    ) -> BackendResult<()> {
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
        self.pipelines.retain(|(_, va_id), _| *va_id != vertex_array.0);
        if self.bound_vertex_array == Some(vertex_array) {
            self.bound_vertex_array = None;
        }
    }

    fn create_program(&mut self, desc: &ProgramDescriptor) -> BackendResult<ProgramHandle> {
        if let Some(uniform) = desc.uniforms.iter().find(|u| u.group != 0) {
            return Err(BackendError::FeatureNotSupported(format!(
                "uniform `{}` must be declared in @group(0), found @group({})",
                uniform.name, uniform.group
            )));
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let vertex_module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: desc.label.as_deref(),
                source: wgpu::ShaderSource::Wgsl(desc.vertex_source.as_str().into()),
            });
        let fragment_module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: desc.label.as_deref(),
                source: wgpu::ShaderSource::Wgsl(desc.fragment_source.as_str().into()),
            });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(BackendError::ShaderCreationFailed(error.to_string()));
        }

        let layout_entries: Vec<wgpu::BindGroupLayoutEntry> = desc
            .uniforms
            .iter()
            .map(|uniform| wgpu::BindGroupLayoutEntry {
                binding: uniform.binding,
                visibility: Self::convert_visibility(uniform.visibility),
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();

        let bind_group_layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: desc.label.as_deref(),
                entries: &layout_entries,
            });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: desc.label.as_deref(),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let values = desc
            .uniforms
            .iter()
            .map(|uniform| vec![0u8; uniform.ty.byte_size()])
            .collect();

        let id = self.allocate_id();
        log::trace!("WgpuBackend: created program {} {:?}", id, desc.label);
        self.programs.insert(
            id,
            WgpuProgram {
                label: desc.label.clone(),
                vertex_module,
                vertex_entry: desc.vertex_entry.clone(),
                fragment_module,
                fragment_entry: desc.fragment_entry.clone(),
                bind_group_layout,
                pipeline_layout,
                uniforms: desc.uniforms.clone(),
                values,
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
        *slot = value.to_bytes();
        Ok(())
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program.0);
        self.pipelines.retain(|(program_id, _), _| *program_id != program.0);
        if self.bound_program == Some(program) {
            self.bound_program = None;
        }
    }

    fn enable_blending(&mut self) {
        self.blend = Some(wgpu::BlendState::ALPHA_BLENDING);
        self.pipelines.clear();
    }

    fn set_clear_color(&mut self, color: Vec4) {
        self.clear_color = wgpu::Color {
            r: color.x as f64,
            g: color.y as f64,
            b: color.z as f64,
            a: color.w as f64,
        };
    }

    fn clear(&mut self) {
        // Clearing discards everything drawn earlier in the frame
        self.draws.clear();
        self.pending_clear = true;
    }

    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.viewport = Some([x, y, width, height]);
    }

    fn draw_indexed(
        &mut self,
        vertex_array: VertexArrayHandle,
        index_count: u32,
    ) -> BackendResult<()> {
        let program_handle = self
            .bound_program
            .ok_or_else(|| BackendError::InvalidParameter("no program bound".into()))?;

        if self.current_texture.is_none() {
            log::warn!("WgpuBackend: draw issued outside of a frame, ignoring");
            return Ok(());
        }

        self.ensure_pipeline(program_handle, vertex_array)?;

        let program = self
            .programs
            .get(&program_handle.0)
            .ok_or_else(|| BackendError::InvalidHandle(format!("program {}", program_handle.0)))?;
        let va = self
            .vertex_arrays
            .get(&vertex_array.0)
            .ok_or_else(|| BackendError::InvalidHandle(format!("vertex array {}", vertex_array.0)))?;
        let index_buffer = va.index_buffer.ok_or_else(|| {
            BackendError::InvalidParameter("vertex array has no index buffer".into())
        })?;

        let uniform_buffers: Vec<wgpu::Buffer> = program
            .uniforms
            .iter()
            .zip(&program.values)
            .map(|(uniform, bytes)| {
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&uniform.name),
                        contents: bytes,
                        usage: wgpu::BufferUsages::UNIFORM,
                    })
            })
            .collect();

        let entries: Vec<wgpu::BindGroupEntry> = program
            .uniforms
            .iter()
            .zip(&uniform_buffers)
            .map(|(uniform, buffer)| wgpu::BindGroupEntry {
                binding: uniform.binding,
                resource: buffer.as_entire_binding(),
            })
            .collect();

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: program.label.as_deref(),
            layout: &program.bind_group_layout,
            entries: &entries,
        });

        let vertex_buffers = va.bindings.iter().map(|b| b.buffer).collect();
        drop(entries);

        self.draws.push(PendingDraw {
            pipeline_key: (program_handle.0, vertex_array.0),
            bind_group,
            _uniform_buffers: uniform_buffers,
            vertex_buffers,
            index_buffer,
            index_count,
        });
        Ok(())
    }
}
