//! Opaque resource handles
//!
//! Handles are generational keys into the backend's resource table. Once a
//! resource is destroyed its old handles stay stale forever, even if the slot
//! is reused by a newer resource.

use slotmap::new_key_type;

new_key_type! {
    /// Handle to a compiled shader program (vertex + fragment stage)
    pub struct ShaderHandle;

    /// Handle to a named uniform input of a shader program
    pub struct UniformHandle;

    /// Handle to an uploaded vertex buffer
    pub struct VertexBufferHandle;
}
