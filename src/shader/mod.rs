//! Shader programs
//!
//! A [`Shader`] is built from WGSL source for a vertex and a fragment stage.
//! Both stages are compiled and linked before anything reaches the backend,
//! so construction either yields a usable program or an error carrying the
//! compiler log.
//!
//! # Example
//!
//! ```ignore
//! let shader = Shader::new(&context, "FlatColor", VERTEX_SRC, FRAGMENT_SRC)?;
//! shader.bind();
//! shader.upload_uniform_mat4("u_ViewProjection", &camera.view_projection_matrix())?;
//! ```

pub mod compiler;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use thiserror::Error;

use crate::backend::{
    BackendError, GraphicsBackend, GraphicsContext, ProgramDescriptor, ProgramHandle, ShaderStage,
    UniformInfo, UniformLocation, UniformType, UniformValue,
};

pub use compiler::{compile_stage, link, CompiledStage, LinkedProgram};

/// Shader construction and uniform upload errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShaderError {
    #[error("Failed to compile {stage} shader:\n{log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("No {stage} entry point found")]
    MissingEntryPoint { stage: ShaderStage },
    #[error("Failed to link program: {log}")]
    Link { log: String },
    #[error("Uniform `{name}` is {expected:?}, got {found:?}")]
    UniformTypeMismatch {
        name: String,
        expected: UniformType,
        found: UniformType,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// A linked vertex + fragment program
pub struct Shader {
    context: GraphicsContext,
    name: String,
    program: ProgramHandle,
    uniforms: Vec<UniformInfo>,
}

impl Shader {
    /// Compile, link and upload a program
    pub fn new(
        context: &GraphicsContext,
        name: impl Into<String>,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, ShaderError> {
        let name = name.into();
        Self::build(context, &name, vertex_source, fragment_source)
            .map(|(program, uniforms)| {
                log::debug!("Created shader `{}` with {} uniforms", name, uniforms.len());
                Self {
                    context: context.clone(),
                    name: name.clone(),
                    program,
                    uniforms,
                }
            })
            .map_err(|e| {
                log::error!("Shader `{}`: {}", name, e);
                e
            })
    }

    fn build(
        context: &GraphicsContext,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<(ProgramHandle, Vec<UniformInfo>), ShaderError> {
        let vertex = compile_stage(ShaderStage::Vertex, vertex_source)?;
        let fragment = compile_stage(ShaderStage::Fragment, fragment_source)?;
        let linked = link(&vertex, &fragment)?;

        let desc = ProgramDescriptor {
            label: Some(name.to_string()),
            vertex_source: vertex_source.to_string(),
            vertex_entry: linked.vertex_entry,
            fragment_source: fragment_source.to_string(),
            fragment_entry: linked.fragment_entry,
            uniforms: linked.uniforms,
        };
        let program = context.with_backend(|b| b.create_program(&desc))?;
        Ok((program, desc.uniforms))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> ProgramHandle {
        self.program
    }

    pub fn bind(&self) {
        let program = self.program;
        self.context.with_backend(|b| b.bind_program(Some(program)));
    }

    pub fn unbind(&self) {
        self.context.with_backend(|b| b.bind_program(None));
    }

    /// Uniforms the linked program exposes, sorted by binding
    pub fn uniforms(&self) -> &[UniformInfo] {
        &self.uniforms
    }

    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms
            .iter()
            .position(|u| u.name == name)
            .map(|index| UniformLocation(index as u32))
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniform_location(name).is_some()
    }

    /// Set a uniform for subsequent draws
    ///
    /// Names the program doesn't use are ignored.
    pub fn upload_uniform(&self, name: &str, value: UniformValue) -> Result<(), ShaderError> {
        let Some(location) = self.uniform_location(name) else {
            log::trace!("Shader `{}`: no active uniform `{}`", self.name, name);
            return Ok(());
        };

        let expected = self.uniforms[location.index()].ty;
        if expected != value.uniform_type() {
            log::warn!(
                "Shader `{}`: uniform `{}` is {:?}, got {:?}",
                self.name,
                name,
                expected,
                value.uniform_type()
            );
            return Err(ShaderError::UniformTypeMismatch {
                name: name.to_string(),
                expected,
                found: value.uniform_type(),
            });
        }

        let program = self.program;
        self.context
            .with_backend(|b| b.set_uniform(program, location, &value))?;
        Ok(())
    }

    pub fn upload_uniform_int(&self, name: &str, value: i32) -> Result<(), ShaderError> {
        self.upload_uniform(name, UniformValue::Int(value))
    }

    pub fn upload_uniform_float(&self, name: &str, value: f32) -> Result<(), ShaderError> {
        self.upload_uniform(name, UniformValue::Float(value))
    }

    pub fn upload_uniform_float2(&self, name: &str, value: Vec2) -> Result<(), ShaderError> {
        self.upload_uniform(name, UniformValue::Float2(value))
    }

    pub fn upload_uniform_float3(&self, name: &str, value: Vec3) -> Result<(), ShaderError> {
        self.upload_uniform(name, UniformValue::Float3(value))
    }

    pub fn upload_uniform_float4(&self, name: &str, value: Vec4) -> Result<(), ShaderError> {
        self.upload_uniform(name, UniformValue::Float4(value))
    }

    pub fn upload_uniform_mat3(&self, name: &str, matrix: &Mat3) -> Result<(), ShaderError> {
        self.upload_uniform(name, UniformValue::Mat3(*matrix))
    }

    pub fn upload_uniform_mat4(&self, name: &str, matrix: &Mat4) -> Result<(), ShaderError> {
        self.upload_uniform(name, UniformValue::Mat4(*matrix))
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        let program = self.program;
        self.context.release(|b| b.destroy_program(program));
    }
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("name", &self.name)
            .field("program", &self.program)
            .field("uniforms", &self.uniforms.len())
            .finish()
    }
}
