//! Engine-level error type

use thiserror::Error;

use crate::backend::BackendError;
use crate::renderer::RendererError;
use crate::shader::ShaderError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Renderer(#[from] RendererError),
    #[error("Platform error: {0}")]
    Platform(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
