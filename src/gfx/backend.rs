//! Graphics backend capability trait

use super::command::CommandBuffer;
use super::error::GfxResult;
use super::frame::FramePlan;
use super::handle::{ShaderHandle, UniformHandle, VertexBufferHandle};
use super::types::{UniformType, VertexAttribute, Viewport};

/// The graphics interface an application renders through
///
/// Construction calls return handles that stay valid until the matching
/// `destroy_*` call or until the backend is dropped. Drawing goes through a
/// [`CommandBuffer`]: recording is free of side effects and
/// [`submit_command_buffer`](Self::submit_command_buffer) executes the
/// recorded commands in order exactly once.
pub trait GraphicsBackend {
    /// Short backend name for logging
    fn name(&self) -> &str;

    /// Current render target size
    fn target_size(&self) -> Viewport;

    /// Resizes the render target
    fn resize(&mut self, width: u32, height: u32);

    /// Creates an empty command buffer
    fn construct_command_buffer(&self) -> CommandBuffer {
        CommandBuffer::new()
    }

    /// Compiles a shader program from WGSL vertex and fragment stage sources
    fn construct_shader(&mut self, vertex_src: &str, fragment_src: &str)
    -> GfxResult<ShaderHandle>;

    /// Declares a named uniform input on a shader
    fn construct_uniform(
        &mut self,
        shader: ShaderHandle,
        name: &str,
        ty: UniformType,
    ) -> GfxResult<UniformHandle>;

    /// Uploads vertex data described by `layout`
    fn construct_vertex_buffer(
        &mut self,
        layout: &[VertexAttribute],
        data: &[f32],
    ) -> GfxResult<VertexBufferHandle>;

    /// Destroys a shader and all uniforms constructed against it
    fn destroy_shader(&mut self, shader: ShaderHandle) -> GfxResult<()>;

    fn destroy_vertex_buffer(&mut self, buffer: VertexBufferHandle) -> GfxResult<()>;

    /// Executes and drains the buffer
    ///
    /// The whole buffer is validated before anything executes. On error the
    /// buffer is still drained and nothing is drawn. Returns the executed plan.
    fn submit_command_buffer(&mut self, cb: &mut CommandBuffer) -> GfxResult<FramePlan>;
}
