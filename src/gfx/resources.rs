//! Backend-independent resource bookkeeping
//!
//! Both backends keep their resource metadata in a [`ResourceTable`] so that
//! handle validation, uniform ownership and vertex counts behave identically
//! regardless of where the pixels end up. Backends attach their own GPU
//! objects through the generic `S`/`V` payloads.

use slotmap::SlotMap;

use super::error::{GfxError, GfxResult};
use super::handle::{ShaderHandle, UniformHandle, VertexBufferHandle};
use super::types::{ShaderStage, UniformType, UniformValue, VertexAttribute, floats_per_vertex};

/// Metadata of a shader program plus backend payload
#[derive(Debug)]
pub struct ShaderEntry<S> {
    /// Uniforms in construction order; uniform `i` is binding `i`
    pub uniforms: Vec<UniformHandle>,
    pub payload: S,
}

/// A named uniform and its current program-state value
#[derive(Debug, Clone)]
pub struct UniformEntry {
    pub shader: ShaderHandle,
    pub name: String,
    pub ty: UniformType,
    /// Binding slot within the owning shader
    pub slot: usize,
    pub value: UniformValue,
}

/// Layout and size of an uploaded vertex buffer plus backend payload
#[derive(Debug)]
pub struct VertexBufferEntry<V> {
    pub layout: Vec<VertexAttribute>,
    pub vertex_count: u32,
    pub payload: V,
}

/// Table of live resources
#[derive(Debug)]
pub struct ResourceTable<S, V> {
    shaders: SlotMap<ShaderHandle, ShaderEntry<S>>,
    uniforms: SlotMap<UniformHandle, UniformEntry>,
    vertex_buffers: SlotMap<VertexBufferHandle, VertexBufferEntry<V>>,
}

impl<S, V> Default for ResourceTable<S, V> {
    fn default() -> Self {
        Self {
            shaders: SlotMap::with_key(),
            uniforms: SlotMap::with_key(),
            vertex_buffers: SlotMap::with_key(),
        }
    }
}

impl<S, V> ResourceTable<S, V> {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== SHADERS =====

    pub fn insert_shader(&mut self, payload: S) -> ShaderHandle {
        self.shaders.insert(ShaderEntry {
            uniforms: Vec::new(),
            payload,
        })
    }

    pub fn shader(&self, handle: ShaderHandle) -> GfxResult<&ShaderEntry<S>> {
        self.shaders
            .get(handle)
            .ok_or(GfxError::UnknownShader(handle))
    }

    /// Removes a shader and every uniform constructed against it
    pub fn remove_shader(&mut self, handle: ShaderHandle) -> GfxResult<ShaderEntry<S>> {
        let entry = self
            .shaders
            .remove(handle)
            .ok_or(GfxError::UnknownShader(handle))?;
        for uniform in &entry.uniforms {
            self.uniforms.remove(*uniform);
        }
        Ok(entry)
    }

    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    // ===== UNIFORMS =====

    /// Registers a uniform on a shader
    ///
    /// Names are unique per shader. The value starts zeroed.
    pub fn insert_uniform(
        &mut self,
        shader: ShaderHandle,
        name: &str,
        ty: UniformType,
    ) -> GfxResult<UniformHandle> {
        if name.is_empty() {
            return Err(GfxError::EmptyUniformName);
        }

        let entry = self
            .shaders
            .get(shader)
            .ok_or(GfxError::UnknownShader(shader))?;
        let duplicate = entry
            .uniforms
            .iter()
            .filter_map(|u| self.uniforms.get(*u))
            .any(|u| u.name == name);
        if duplicate {
            return Err(GfxError::DuplicateUniform(name.to_string()));
        }

        let slot = entry.uniforms.len();
        let handle = self.uniforms.insert(UniformEntry {
            shader,
            name: name.to_string(),
            ty,
            slot,
            value: UniformValue::zeroed(ty),
        });

        if let Some(entry) = self.shaders.get_mut(shader) {
            entry.uniforms.push(handle);
        }
        Ok(handle)
    }

    pub fn uniform(&self, handle: UniformHandle) -> GfxResult<&UniformEntry> {
        self.uniforms
            .get(handle)
            .ok_or(GfxError::UnknownUniform(handle))
    }

    pub(crate) fn set_uniform_value(&mut self, handle: UniformHandle, value: UniformValue) {
        if let Some(entry) = self.uniforms.get_mut(handle) {
            entry.value = value;
        }
    }

    /// Declared types of a shader's uniforms in binding order
    pub fn uniform_types(&self, shader: ShaderHandle) -> GfxResult<Vec<UniformType>> {
        let entry = self.shader(shader)?;
        entry
            .uniforms
            .iter()
            .map(|u| self.uniform(*u).map(|u| u.ty))
            .collect()
    }

    // ===== VERTEX BUFFERS =====

    /// Validates layout and data and registers a vertex buffer
    pub fn insert_vertex_buffer(
        &mut self,
        layout: &[VertexAttribute],
        data: &[f32],
        payload: V,
    ) -> GfxResult<VertexBufferHandle> {
        let vertex_count = vertex_count(layout, data)?;
        Ok(self.vertex_buffers.insert(VertexBufferEntry {
            layout: layout.to_vec(),
            vertex_count,
            payload,
        }))
    }

    pub fn vertex_buffer(&self, handle: VertexBufferHandle) -> GfxResult<&VertexBufferEntry<V>> {
        self.vertex_buffers
            .get(handle)
            .ok_or(GfxError::UnknownVertexBuffer(handle))
    }

    pub fn remove_vertex_buffer(
        &mut self,
        handle: VertexBufferHandle,
    ) -> GfxResult<VertexBufferEntry<V>> {
        self.vertex_buffers
            .remove(handle)
            .ok_or(GfxError::UnknownVertexBuffer(handle))
    }

    pub fn vertex_buffer_count(&self) -> usize {
        self.vertex_buffers.len()
    }
}

/// Number of whole vertices in `data` for `layout`
pub fn vertex_count(layout: &[VertexAttribute], data: &[f32]) -> GfxResult<u32> {
    let stride = floats_per_vertex(layout);
    if stride == 0 {
        return Err(GfxError::EmptyVertexLayout);
    }
    if data.len() % stride != 0 {
        return Err(GfxError::MisalignedVertexData {
            len: data.len(),
            stride,
        });
    }
    u32::try_from(data.len() / stride).map_err(|_| GfxError::MisalignedVertexData {
        len: data.len(),
        stride,
    })
}

/// Checks that a stage source is non-empty and declares its entry point
pub fn check_stage_source(stage: ShaderStage, source: &str) -> GfxResult<()> {
    if source.trim().is_empty() {
        return Err(GfxError::ShaderCompile {
            stage,
            message: "source is empty".to_string(),
        });
    }

    let entry = format!("fn {}", stage.entry_point());
    if !source.contains(stage.attribute()) || !source.contains(&entry) {
        return Err(GfxError::ShaderCompile {
            stage,
            message: format!(
                "missing entry point `{} {}`",
                stage.attribute(),
                entry
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    type Table = ResourceTable<(), ()>;

    #[test]
    fn test_uniform_slots_follow_construction_order() {
        let mut table = Table::new();
        let shader = table.insert_shader(());
        let a = table.insert_uniform(shader, "u_color", UniformType::Vec4).unwrap();
        let b = table.insert_uniform(shader, "u_scale", UniformType::Float).unwrap();

        assert_eq!(table.uniform(a).unwrap().slot, 0);
        assert_eq!(table.uniform(b).unwrap().slot, 1);
        assert_eq!(
            table.uniform_types(shader).unwrap(),
            vec![UniformType::Vec4, UniformType::Float]
        );
    }

    #[test]
    fn test_duplicate_and_empty_uniform_names_rejected() {
        let mut table = Table::new();
        let shader = table.insert_shader(());
        table.insert_uniform(shader, "u_color", UniformType::Vec4).unwrap();

        assert!(matches!(
            table.insert_uniform(shader, "u_color", UniformType::Vec4),
            Err(GfxError::DuplicateUniform(_))
        ));
        assert!(matches!(
            table.insert_uniform(shader, "", UniformType::Vec4),
            Err(GfxError::EmptyUniformName)
        ));
    }

    #[test]
    fn test_removing_shader_invalidates_its_uniforms() {
        let mut table = Table::new();
        let shader = table.insert_shader(());
        let uniform = table.insert_uniform(shader, "u_color", UniformType::Vec4).unwrap();

        table.remove_shader(shader).unwrap();

        assert!(matches!(table.shader(shader), Err(GfxError::UnknownShader(_))));
        assert!(matches!(table.uniform(uniform), Err(GfxError::UnknownUniform(_))));
    }

    #[test]
    fn test_stale_handle_does_not_alias_reused_slot() {
        let mut table = Table::new();
        let old = table
            .insert_vertex_buffer(&[VertexAttribute::Float3], &[0.0; 9], ())
            .unwrap();
        table.remove_vertex_buffer(old).unwrap();
        let new = table
            .insert_vertex_buffer(&[VertexAttribute::Float2], &[0.0; 4], ())
            .unwrap();

        assert_ne!(old, new);
        assert!(table.vertex_buffer(old).is_err());
        assert_eq!(table.vertex_buffer(new).unwrap().vertex_count, 2);
    }

    #[test]
    fn test_vertex_count() {
        assert_eq!(vertex_count(&[VertexAttribute::Float3], &[0.0; 9]).unwrap(), 3);
        assert!(matches!(
            vertex_count(&[VertexAttribute::Float3], &[0.0; 8]),
            Err(GfxError::MisalignedVertexData { len: 8, stride: 3 })
        ));
        assert!(matches!(
            vertex_count(&[], &[0.0; 3]),
            Err(GfxError::EmptyVertexLayout)
        ));
    }

    #[test]
    fn test_stage_source_check() {
        let vs = "@vertex\nfn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(); }";
        assert!(check_stage_source(ShaderStage::Vertex, vs).is_ok());
        assert!(check_stage_source(ShaderStage::Fragment, vs).is_err());
        assert!(check_stage_source(ShaderStage::Vertex, "   ").is_err());
    }
}
