//! Plain data types shared by commands, resources and backends

use std::fmt;

/// Entry point every vertex stage must define
pub const VERTEX_ENTRY: &str = "vs_main";

/// Entry point every fragment stage must define
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Entry point name expected in this stage's source
    pub fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => VERTEX_ENTRY,
            ShaderStage::Fragment => FRAGMENT_ENTRY,
        }
    }

    /// WGSL attribute that marks the entry point of this stage
    pub fn attribute(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "@vertex",
            ShaderStage::Fragment => "@fragment",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// One attribute of a vertex layout. Attribute `i` is read from `@location(i)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    Float,
    Float2,
    Float3,
    Float4,
}

impl VertexAttribute {
    /// Number of `f32` components in this attribute
    pub fn components(self) -> usize {
        match self {
            VertexAttribute::Float => 1,
            VertexAttribute::Float2 => 2,
            VertexAttribute::Float3 => 3,
            VertexAttribute::Float4 => 4,
        }
    }

    /// Size in bytes
    pub fn size(self) -> usize {
        self.components() * std::mem::size_of::<f32>()
    }
}

/// Number of floats one vertex occupies for the given layout
pub fn floats_per_vertex(layout: &[VertexAttribute]) -> usize {
    layout.iter().map(|a| a.components()).sum()
}

/// Declared type of a uniform input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl UniformType {
    /// Size in bytes of the value itself
    pub fn size(self) -> usize {
        match self {
            UniformType::Float => 4,
            UniformType::Vec2 => 8,
            UniformType::Vec3 => 12,
            UniformType::Vec4 => 16,
            UniformType::Mat4 => 64,
        }
    }

    /// Size of the value padded to a 16 byte uniform slot
    pub fn padded_size(self) -> usize {
        self.size().div_ceil(16) * 16
    }
}

impl fmt::Display for UniformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UniformType::Float => "f32",
            UniformType::Vec2 => "vec2<f32>",
            UniformType::Vec3 => "vec3<f32>",
            UniformType::Vec4 => "vec4<f32>",
            UniformType::Mat4 => "mat4x4<f32>",
        };
        f.write_str(name)
    }
}

/// A value bound to a uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat4([[f32; 4]; 4]),
}

impl UniformValue {
    /// The all-zero value of a uniform type (what an unbound uniform reads)
    pub fn zeroed(ty: UniformType) -> Self {
        match ty {
            UniformType::Float => UniformValue::Float(0.0),
            UniformType::Vec2 => UniformValue::Vec2([0.0; 2]),
            UniformType::Vec3 => UniformValue::Vec3([0.0; 3]),
            UniformType::Vec4 => UniformValue::Vec4([0.0; 4]),
            UniformType::Mat4 => UniformValue::Mat4([[0.0; 4]; 4]),
        }
    }

    pub fn ty(&self) -> UniformType {
        match self {
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Vec2(_) => UniformType::Vec2,
            UniformValue::Vec3(_) => UniformType::Vec3,
            UniformValue::Vec4(_) => UniformType::Vec4,
            UniformValue::Mat4(_) => UniformType::Mat4,
        }
    }

    /// Raw bytes of the value, unpadded
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            UniformValue::Float(v) => bytemuck::bytes_of(v),
            UniformValue::Vec2(v) => bytemuck::bytes_of(v),
            UniformValue::Vec3(v) => bytemuck::bytes_of(v),
            UniformValue::Vec4(v) => bytemuck::bytes_of(v),
            UniformValue::Mat4(v) => bytemuck::bytes_of(v),
        }
    }
}

/// Viewport in pixels, anchored at the top-left of the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Clamps the viewport so it never exceeds the target size
    pub fn clamped_to(self, target: Viewport) -> Self {
        Self {
            width: self.width.min(target.width),
            height: self.height.min(target.height),
        }
    }
}
