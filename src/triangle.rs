//! The triangle application
//!
//! Builds one shader with a colour uniform and a three-vertex buffer at init,
//! then every frame clears the window, draws the triangle and submits. Escape
//! ends the session.

use anyhow::Context;
use tracing::info;

use crate::app::input::KeyCode;
use crate::app::{Application, EngineContext, UpdateStatus};
use crate::gfx::{
    CommandBuffer, ShaderHandle, UniformHandle, UniformType, UniformValue, VertexAttribute,
    VertexBufferHandle,
};

/// Vertex stage: passes positions straight through to clip space
pub const VERTEX_SHADER: &str = r#"
@vertex
fn vs_main(@location(0) a_pos: vec3<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(a_pos, 1.0);
}
"#;

/// Fragment stage: fills with the `u_color` uniform
pub const FRAGMENT_SHADER: &str = r#"
@group(0) @binding(0)
var<uniform> u_color: vec4<f32>;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return u_color;
}
"#;

/// Name of the colour uniform
pub const COLOR_UNIFORM: &str = "u_color";

pub const VERTEX_LAYOUT: [VertexAttribute; 1] = [VertexAttribute::Float3];

/// One triangle, counter-clockwise in clip space
#[rustfmt::skip]
pub const VERTICES: [f32; 9] = [
     0.0,  0.5, 0.0,
     0.5, -0.5, 0.0,
    -0.5, -0.5, 0.0,
];

pub const VERTEX_COUNT: u32 = 3;

pub const CLEAR_COLOR: [f32; 4] = [0.2, 0.2, 0.2, 1.0];

pub const TRIANGLE_COLOR: [f32; 4] = [1.0, 0.6, 0.1, 1.0];

/// Resources constructed at init
struct Scene {
    cb: CommandBuffer,
    shader: ShaderHandle,
    color: UniformHandle,
    vbo: VertexBufferHandle,
}

/// Draws a single coloured triangle until Escape is pressed
#[derive(Default)]
pub struct TriangleApp {
    scene: Option<Scene>,
}

impl TriangleApp {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Application for TriangleApp {
    fn init(&mut self, ctx: &mut EngineContext<'_>) -> anyhow::Result<()> {
        let gfx = ctx.graphics();

        let cb = gfx.construct_command_buffer();
        let shader = gfx
            .construct_shader(VERTEX_SHADER, FRAGMENT_SHADER)
            .context("failed to construct triangle shader")?;
        let color = gfx
            .construct_uniform(shader, COLOR_UNIFORM, UniformType::Vec4)
            .context("failed to construct colour uniform")?;
        let vbo = gfx
            .construct_vertex_buffer(&VERTEX_LAYOUT, &VERTICES)
            .context("failed to construct triangle vertex buffer")?;

        info!(backend = gfx.name(), "Triangle resources constructed");

        self.scene = Some(Scene {
            cb,
            shader,
            color,
            vbo,
        });
        Ok(())
    }

    fn update(&mut self, ctx: &mut EngineContext<'_>) -> anyhow::Result<UpdateStatus> {
        if ctx.platform().key_pressed(KeyCode::Escape) {
            return Ok(UpdateStatus::Done);
        }

        let scene = self
            .scene
            .as_mut()
            .context("update called before init")?;
        let (width, height) = ctx.platform().window_size();

        scene
            .cb
            .set_view_clear(CLEAR_COLOR)
            .set_viewport(width, height)
            .bind_shader(scene.shader)
            .bind_uniform(scene.color, UniformValue::Vec4(TRIANGLE_COLOR))
            .bind_vertex_buffer(scene.vbo)
            .draw(0, VERTEX_COUNT);

        ctx.graphics()
            .submit_command_buffer(&mut scene.cb)
            .context("failed to submit triangle frame")?;

        Ok(UpdateStatus::InProgress)
    }

    fn shutdown(&mut self, ctx: &mut EngineContext<'_>) {
        info!(frames = ctx.frame(), "Goodbye from the triangle");
    }
}
