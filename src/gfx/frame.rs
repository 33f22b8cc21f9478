//! Resolution of a submitted command list into an executable frame plan
//!
//! Binds are stateful: a draw uses whatever shader, vertex buffer, viewport and
//! uniform values were most recently recorded before it. Resolution walks the
//! commands once in order, validates every handle against the resource table
//! and snapshots the bindings of each draw. Uniform writes are staged in the
//! returned [`ResolvedFrame`] and only reach the table through
//! [`ResolvedFrame::commit`], which backends call once the frame has executed,
//! so a failed submission leaves no trace.

use std::collections::HashMap;

use super::command::Command;
use super::error::{GfxError, GfxResult};
use super::handle::{ShaderHandle, UniformHandle, VertexBufferHandle};
use super::resources::ResourceTable;
use super::types::{UniformValue, Viewport};

/// A validated draw with all of its bindings captured
#[derive(Debug, Clone, PartialEq)]
pub struct DrawPlan {
    pub shader: ShaderHandle,
    pub vertex_buffer: VertexBufferHandle,
    pub start: u32,
    pub count: u32,
    pub viewport: Viewport,
    /// Value of every uniform of `shader`, in binding order
    pub uniforms: Vec<(UniformHandle, UniformValue)>,
}

/// A run of draws sharing one load operation
#[derive(Debug, Clone, PartialEq)]
pub struct PassPlan {
    /// `Some` clears the target first, `None` keeps previous contents
    pub clear: Option<[f32; 4]>,
    pub draws: Vec<DrawPlan>,
}

/// Everything one submission does, in execution order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FramePlan {
    pub passes: Vec<PassPlan>,
}

impl FramePlan {
    /// All draws across passes in execution order
    pub fn draws(&self) -> impl Iterator<Item = &DrawPlan> {
        self.passes.iter().flat_map(|p| p.draws.iter())
    }

    pub fn draw_count(&self) -> usize {
        self.passes.iter().map(|p| p.draws.len()).sum()
    }

    /// Clear colour of the last clearing pass
    pub fn final_clear(&self) -> Option<[f32; 4]> {
        self.passes.iter().rev().find_map(|p| p.clear)
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

/// A resolved frame whose uniform writes are not yet committed
#[derive(Debug)]
#[must_use = "uniform writes are lost unless the frame is committed"]
pub struct ResolvedFrame {
    plan: FramePlan,
    staged: HashMap<UniformHandle, UniformValue>,
}

impl ResolvedFrame {
    pub fn plan(&self) -> &FramePlan {
        &self.plan
    }

    /// Writes the staged uniform values to `table` and hands back the plan
    pub fn commit<S, V>(self, table: &mut ResourceTable<S, V>) -> FramePlan {
        for (uniform, value) in self.staged {
            table.set_uniform_value(uniform, value);
        }
        self.plan
    }
}

/// Bindings active at the current point of the command list
struct BindState {
    shader: Option<ShaderHandle>,
    vertex_buffer: Option<VertexBufferHandle>,
    viewport: Viewport,
}

/// Resolves `commands` against `table` without modifying it
///
/// `target` is the size of the render target; it is the viewport until one is
/// recorded and bounds every recorded viewport.
pub fn resolve<S, V>(
    commands: &[Command],
    table: &ResourceTable<S, V>,
    target: Viewport,
) -> GfxResult<ResolvedFrame> {
    let mut plan = FramePlan::default();
    let mut state = BindState {
        shader: None,
        vertex_buffer: None,
        viewport: target,
    };
    let mut staged: HashMap<UniformHandle, UniformValue> = HashMap::new();

    for command in commands {
        match *command {
            Command::SetViewClear(color) => {
                plan.passes.push(PassPlan {
                    clear: Some(color),
                    draws: Vec::new(),
                });
            }
            Command::SetViewport(viewport) => {
                state.viewport = viewport.clamped_to(target);
            }
            Command::BindShader(shader) => {
                table.shader(shader)?;
                state.shader = Some(shader);
            }
            Command::BindUniform(uniform, value) => {
                let entry = table.uniform(uniform)?;
                let bound = state.shader.ok_or(GfxError::UniformWithoutShader)?;
                if entry.shader != bound {
                    return Err(GfxError::UniformNotInShader {
                        name: entry.name.clone(),
                    });
                }
                if entry.ty != value.ty() {
                    return Err(GfxError::UniformTypeMismatch {
                        name: entry.name.clone(),
                        expected: entry.ty,
                        actual: value.ty(),
                    });
                }
                staged.insert(uniform, value);
            }
            Command::BindVertexBuffer(buffer) => {
                table.vertex_buffer(buffer)?;
                state.vertex_buffer = Some(buffer);
            }
            Command::Draw { start, count } => {
                let draw = resolve_draw(&state, table, &staged, start, count)?;
                match plan.passes.last_mut() {
                    Some(pass) => pass.draws.push(draw),
                    None => plan.passes.push(PassPlan {
                        clear: None,
                        draws: vec![draw],
                    }),
                }
            }
        }
    }

    Ok(ResolvedFrame { plan, staged })
}

fn resolve_draw<S, V>(
    state: &BindState,
    table: &ResourceTable<S, V>,
    staged: &HashMap<UniformHandle, UniformValue>,
    start: u32,
    count: u32,
) -> GfxResult<DrawPlan> {
    let shader = state.shader.ok_or(GfxError::NoShaderBound)?;
    let vertex_buffer = state.vertex_buffer.ok_or(GfxError::NoVertexBufferBound)?;

    let available = table.vertex_buffer(vertex_buffer)?.vertex_count;
    let in_range = start
        .checked_add(count)
        .is_some_and(|end| end <= available);
    if !in_range {
        return Err(GfxError::DrawOutOfRange {
            start,
            count,
            available,
        });
    }

    let uniforms = table
        .shader(shader)?
        .uniforms
        .iter()
        .map(|handle| {
            let value = match staged.get(handle) {
                Some(value) => *value,
                None => table.uniform(*handle)?.value,
            };
            Ok((*handle, value))
        })
        .collect::<GfxResult<Vec<_>>>()?;

    Ok(DrawPlan {
        shader,
        vertex_buffer,
        start,
        count,
        viewport: state.viewport,
        uniforms,
    })
}
