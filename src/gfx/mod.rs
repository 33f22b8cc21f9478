//! Immediate-mode graphics contract
//!
//! ## Architecture
//!
//! - `handle`: generational handles for shaders, uniforms and vertex buffers
//! - `command`: the deferred, append-only command buffer
//! - `resources`: backend-independent resource table and construction checks
//! - `frame`: resolution of a command list into an ordered frame plan
//! - `backend`: the [`GraphicsBackend`] trait applications draw through
//! - `headless`: in-memory backend for tests, health checks and headless runs
//! - `wgpu_backend`: window-surface backend on wgpu

pub mod backend;
pub mod command;
pub mod error;
pub mod frame;
pub mod handle;
pub mod headless;
pub mod resources;
pub mod types;
pub mod wgpu_backend;

pub use backend::GraphicsBackend;
pub use command::{Command, CommandBuffer};
pub use error::{GfxError, GfxResult};
pub use frame::{DrawPlan, FramePlan, PassPlan, ResolvedFrame};
pub use handle::{ShaderHandle, UniformHandle, VertexBufferHandle};
pub use headless::HeadlessBackend;
pub use types::{ShaderStage, UniformType, UniformValue, VertexAttribute, Viewport};
pub use wgpu_backend::WgpuBackend;
