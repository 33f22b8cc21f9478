//! Headless backend that executes frame plans into an in-memory log

use std::collections::VecDeque;

use tracing::debug;

use super::backend::GraphicsBackend;
use super::command::CommandBuffer;
use super::error::GfxResult;
use super::frame::{self, FramePlan};
use super::handle::{ShaderHandle, UniformHandle, VertexBufferHandle};
use super::resources::{ResourceTable, check_stage_source};
use super::types::{ShaderStage, UniformType, VertexAttribute, Viewport};

/// Stage sources kept for inspection
#[derive(Debug, Clone)]
pub struct ShaderSource {
    pub vertex: String,
    pub fragment: String,
}

/// Frames kept by [`HeadlessBackend::new`]
pub const DEFAULT_FRAME_LOG: usize = 16;

/// Backend without a GPU
///
/// Successful submissions append their [`FramePlan`] to a bounded log; once it
/// holds `frame_log` plans the oldest is dropped. Vertex data is kept so tests
/// can inspect exactly what a draw would read.
#[derive(Debug)]
pub struct HeadlessBackend {
    resources: ResourceTable<ShaderSource, Vec<f32>>,
    target: Viewport,
    frames: VecDeque<FramePlan>,
    frame_log: usize,
    submitted: u64,
}

impl HeadlessBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            resources: ResourceTable::new(),
            target: Viewport::new(width, height),
            frames: VecDeque::new(),
            frame_log: DEFAULT_FRAME_LOG,
            submitted: 0,
        }
    }

    /// Keeps at most `capacity` executed frames; 0 keeps none
    pub fn with_frame_log(mut self, capacity: usize) -> Self {
        self.frame_log = capacity;
        self.frames.truncate(capacity);
        self
    }

    /// The most recent executed frames, oldest first
    pub fn frames(&self) -> &VecDeque<FramePlan> {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&FramePlan> {
        self.frames.back()
    }

    /// Successful submissions since construction, logged or not
    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    pub fn resources(&self) -> &ResourceTable<ShaderSource, Vec<f32>> {
        &self.resources
    }

    /// Raw vertex data of a buffer
    pub fn vertex_data(&self, buffer: VertexBufferHandle) -> GfxResult<&[f32]> {
        Ok(&self.resources.vertex_buffer(buffer)?.payload)
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn target_size(&self) -> Viewport {
        self.target
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.target = Viewport::new(width.max(1), height.max(1));
    }

    fn construct_shader(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
    ) -> GfxResult<ShaderHandle> {
        check_stage_source(ShaderStage::Vertex, vertex_src)?;
        check_stage_source(ShaderStage::Fragment, fragment_src)?;

        let handle = self.resources.insert_shader(ShaderSource {
            vertex: vertex_src.to_string(),
            fragment: fragment_src.to_string(),
        });
        debug!(?handle, "Shader constructed");
        Ok(handle)
    }

    fn construct_uniform(
        &mut self,
        shader: ShaderHandle,
        name: &str,
        ty: UniformType,
    ) -> GfxResult<UniformHandle> {
        self.resources.insert_uniform(shader, name, ty)
    }

    fn construct_vertex_buffer(
        &mut self,
        layout: &[VertexAttribute],
        data: &[f32],
    ) -> GfxResult<VertexBufferHandle> {
        self.resources
            .insert_vertex_buffer(layout, data, data.to_vec())
    }

    fn destroy_shader(&mut self, shader: ShaderHandle) -> GfxResult<()> {
        self.resources.remove_shader(shader).map(|_| ())
    }

    fn destroy_vertex_buffer(&mut self, buffer: VertexBufferHandle) -> GfxResult<()> {
        self.resources.remove_vertex_buffer(buffer).map(|_| ())
    }

    fn submit_command_buffer(&mut self, cb: &mut CommandBuffer) -> GfxResult<FramePlan> {
        let commands = cb.drain();
        let plan = frame::resolve(&commands, &self.resources, self.target)?
            .commit(&mut self.resources);

        debug!(
            frame = self.submitted,
            commands = commands.len(),
            draws = plan.draw_count(),
            "Command buffer executed"
        );
        self.submitted += 1;
        if self.frame_log > 0 {
            if self.frames.len() == self.frame_log {
                self.frames.pop_front();
            }
            self.frames.push_back(plan.clone());
        }
        Ok(plan)
    }
}
