//! Common types shared between backends

use crate::backend::traits::{BufferHandle, ShaderStageFlags};
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

/// Semantic type of one vertex element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderDataType {
    Float,
    Float2,
    Float3,
    Float4,
    Mat3,
    Mat4,
    Int,
    Int2,
    Int3,
    Int4,
    Bool,
}

/// Scalar kind of each component of a [`ShaderDataType`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Float,
    Int,
    Bool,
}

impl ShaderDataType {
    /// Size in bytes of one element of this type
    pub fn size(&self) -> u32 {
        match self {
            ShaderDataType::Float | ShaderDataType::Int => 4,
            ShaderDataType::Float2 | ShaderDataType::Int2 => 8,
            ShaderDataType::Float3 | ShaderDataType::Int3 => 12,
            ShaderDataType::Float4 | ShaderDataType::Int4 => 16,
            ShaderDataType::Mat3 => 4 * 3 * 3,
            ShaderDataType::Mat4 => 4 * 4 * 4,
            ShaderDataType::Bool => 1,
        }
    }

    /// Number of components per attribute slot
    pub fn component_count(&self) -> u32 {
        match self {
            ShaderDataType::Float | ShaderDataType::Int | ShaderDataType::Bool => 1,
            ShaderDataType::Float2 | ShaderDataType::Int2 => 2,
            ShaderDataType::Float3 | ShaderDataType::Int3 | ShaderDataType::Mat3 => 3,
            ShaderDataType::Float4 | ShaderDataType::Int4 | ShaderDataType::Mat4 => 4,
        }
    }

    /// Number of consecutive attribute slots the type occupies (one per matrix column)
    pub fn slot_count(&self) -> u32 {
        match self {
            ShaderDataType::Mat3 => 3,
            ShaderDataType::Mat4 => 4,
            _ => 1,
        }
    }

    pub fn scalar_kind(&self) -> ScalarKind {
        match self {
            ShaderDataType::Float
            | ShaderDataType::Float2
            | ShaderDataType::Float3
            | ShaderDataType::Float4
            | ShaderDataType::Mat3
            | ShaderDataType::Mat4 => ScalarKind::Float,
            ShaderDataType::Int
            | ShaderDataType::Int2
            | ShaderDataType::Int3
            | ShaderDataType::Int4 => ScalarKind::Int,
            ShaderDataType::Bool => ScalarKind::Bool,
        }
    }
}

/// Kind of data a buffer holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// One vertex attribute as seen by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttributeDesc {
    /// Shader input location
    pub location: u32,
    pub components: u32,
    pub kind: ScalarKind,
    pub normalized: bool,
    /// Byte offset within one vertex record
    pub offset: u32,
}

/// A vertex buffer together with the attributes it feeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexBufferBinding {
    pub buffer: BufferHandle,
    pub stride: u32,
    pub attributes: Vec<VertexAttributeDesc>,
}

/// Programmable shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn flag(&self) -> ShaderStageFlags {
        match self {
            ShaderStage::Vertex => ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => ShaderStageFlags::FRAGMENT,
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Type of a uniform a program exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    Float2,
    Float3,
    Float4,
    Int,
    Mat3,
    Mat4,
}

impl UniformType {
    /// Size in bytes of the uniform in the uniform address space
    ///
    /// `Mat3` columns are padded to 16 bytes.
    pub fn byte_size(&self) -> usize {
        match self {
            UniformType::Float | UniformType::Int => 4,
            UniformType::Float2 => 8,
            UniformType::Float3 => 12,
            UniformType::Float4 => 16,
            UniformType::Mat3 => 48,
            UniformType::Mat4 => 64,
        }
    }
}

/// A value uploaded to a uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Float2(Vec2),
    Float3(Vec3),
    Float4(Vec4),
    Int(i32),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn uniform_type(&self) -> UniformType {
        match self {
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Float2(_) => UniformType::Float2,
            UniformValue::Float3(_) => UniformType::Float3,
            UniformValue::Float4(_) => UniformType::Float4,
            UniformValue::Int(_) => UniformType::Int,
            UniformValue::Mat3(_) => UniformType::Mat3,
            UniformValue::Mat4(_) => UniformType::Mat4,
        }
    }

    /// Encode the value with uniform address space layout
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            UniformValue::Float(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Float2(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Float3(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Float4(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Int(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Mat3(m) => {
                let columns = [
                    m.x_axis.extend(0.0),
                    m.y_axis.extend(0.0),
                    m.z_axis.extend(0.0),
                ];
                bytemuck::cast_slice(&columns).to_vec()
            }
            UniformValue::Mat4(m) => bytemuck::bytes_of(m).to_vec(),
        }
    }
}

/// Reflected description of one uniform of a linked program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformInfo {
    pub name: String,
    pub ty: UniformType,
    pub group: u32,
    pub binding: u32,
    pub visibility: ShaderStageFlags,
}

/// Everything a backend needs to build a program
#[derive(Debug, Clone)]
pub struct ProgramDescriptor {
    pub label: Option<String>,
    pub vertex_source: String,
    pub vertex_entry: String,
    pub fragment_source: String,
    pub fragment_entry: String,
    /// Uniform table; a uniform's location is its index here
    pub uniforms: Vec<UniformInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_data_type_sizes() {
        assert_eq!(ShaderDataType::Float.size(), 4);
        assert_eq!(ShaderDataType::Float3.size(), 12);
        assert_eq!(ShaderDataType::Mat3.size(), 36);
        assert_eq!(ShaderDataType::Mat4.size(), 64);
        assert_eq!(ShaderDataType::Int4.size(), 16);
        assert_eq!(ShaderDataType::Bool.size(), 1);
    }

    #[test]
    fn test_matrix_slots() {
        assert_eq!(ShaderDataType::Mat4.slot_count(), 4);
        assert_eq!(ShaderDataType::Mat4.component_count(), 4);
        assert_eq!(ShaderDataType::Float2.slot_count(), 1);
    }

    #[test]
    fn test_uniform_value_encoding() {
        assert_eq!(UniformValue::Float(1.0).to_bytes().len(), 4);
        assert_eq!(UniformValue::Float3(Vec3::ONE).to_bytes().len(), 12);
        assert_eq!(UniformValue::Mat4(Mat4::IDENTITY).to_bytes().len(), 64);

        let mat3 = UniformValue::Mat3(Mat3::IDENTITY);
        assert_eq!(mat3.to_bytes().len(), UniformType::Mat3.byte_size());
    }
}
