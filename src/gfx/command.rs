//! Deferred command buffer
//!
//! Every call on a [`CommandBuffer`] only appends to an ordered list. Nothing
//! reaches the backend until the buffer is handed to
//! [`GraphicsBackend::submit_command_buffer`](super::GraphicsBackend::submit_command_buffer),
//! which drains it.

use super::handle::{ShaderHandle, UniformHandle, VertexBufferHandle};
use super::types::{UniformValue, Viewport};

// ============================================================================
// COMMANDS
// ============================================================================

/// A single recorded drawing operation
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Clear the target to this colour
    SetViewClear([f32; 4]),
    /// Restrict following draws to this viewport
    SetViewport(Viewport),
    /// Bind a shader program for following draws
    BindShader(ShaderHandle),
    /// Set a uniform of the currently bound shader
    BindUniform(UniformHandle, UniformValue),
    /// Bind a vertex buffer for following draws
    BindVertexBuffer(VertexBufferHandle),
    /// Draw `count` vertices starting at `start`
    Draw { start: u32, count: u32 },
}

impl Command {
    /// Debug name for render debugging
    pub fn debug_name(&self) -> &'static str {
        match self {
            Command::SetViewClear(_) => "SetViewClear",
            Command::SetViewport(_) => "SetViewport",
            Command::BindShader(_) => "BindShader",
            Command::BindUniform(..) => "BindUniform",
            Command::BindVertexBuffer(_) => "BindVertexBuffer",
            Command::Draw { .. } => "Draw",
        }
    }
}

// ============================================================================
// COMMAND BUFFER
// ============================================================================

/// Append-only list of commands for one frame
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    /// Creates an empty command buffer
    pub fn new() -> Self {
        Self {
            commands: Vec::with_capacity(16),
        }
    }

    /// Records a clear of the target with the given RGBA colour
    pub fn set_view_clear(&mut self, color: [f32; 4]) -> &mut Self {
        self.push(Command::SetViewClear(color))
    }

    /// Records the viewport used by following draws
    pub fn set_viewport(&mut self, width: u32, height: u32) -> &mut Self {
        self.push(Command::SetViewport(Viewport::new(width, height)))
    }

    pub fn bind_shader(&mut self, shader: ShaderHandle) -> &mut Self {
        self.push(Command::BindShader(shader))
    }

    /// Records a uniform value for the shader bound at that point in the buffer
    pub fn bind_uniform(&mut self, uniform: UniformHandle, value: UniformValue) -> &mut Self {
        self.push(Command::BindUniform(uniform, value))
    }

    pub fn bind_vertex_buffer(&mut self, buffer: VertexBufferHandle) -> &mut Self {
        self.push(Command::BindVertexBuffer(buffer))
    }

    /// Records a draw using whatever was bound most recently before it
    pub fn draw(&mut self, start: u32, count: u32) -> &mut Self {
        self.push(Command::Draw { start, count })
    }

    /// Commands recorded so far, in order
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Takes all recorded commands, leaving the buffer empty but keeping its capacity
    pub fn drain(&mut self) -> Vec<Command> {
        let mut taken = Vec::with_capacity(self.commands.capacity());
        std::mem::swap(&mut taken, &mut self.commands);
        taken
    }

    fn push(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }
}
