//! Graphics contract errors

use thiserror::Error;

use super::handle::{ShaderHandle, UniformHandle, VertexBufferHandle};
use super::types::{ShaderStage, UniformType};

/// Errors raised by resource construction and command buffer submission
#[derive(Debug, Error)]
pub enum GfxError {
    #[error("{stage} shader failed to compile: {message}")]
    ShaderCompile { stage: ShaderStage, message: String },

    #[error("shader {0:?} does not exist or was destroyed")]
    UnknownShader(ShaderHandle),

    #[error("uniform {0:?} does not exist or was destroyed")]
    UnknownUniform(UniformHandle),

    #[error("vertex buffer {0:?} does not exist or was destroyed")]
    UnknownVertexBuffer(VertexBufferHandle),

    #[error("uniform name must not be empty")]
    EmptyUniformName,

    #[error("shader already has a uniform named '{0}'")]
    DuplicateUniform(String),

    #[error("uniform '{name}' is declared as {expected}, got {actual}")]
    UniformTypeMismatch {
        name: String,
        expected: UniformType,
        actual: UniformType,
    },

    #[error("uniform '{name}' does not belong to the bound shader")]
    UniformNotInShader { name: String },

    #[error("uniform bound with no shader bound")]
    UniformWithoutShader,

    #[error("draw recorded with no shader bound")]
    NoShaderBound,

    #[error("draw recorded with no vertex buffer bound")]
    NoVertexBufferBound,

    #[error("draw of {count} vertices from {start} exceeds buffer of {available} vertices")]
    DrawOutOfRange {
        start: u32,
        count: u32,
        available: u32,
    },

    #[error("vertex layout must contain at least one attribute")]
    EmptyVertexLayout,

    #[error("vertex data of {len} floats is not a whole number of {stride}-float vertices")]
    MisalignedVertexData { len: usize, stride: usize },

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("graphics device error: {0}")]
    Device(String),
}

/// Result alias for graphics operations
pub type GfxResult<T> = Result<T, GfxError>;
