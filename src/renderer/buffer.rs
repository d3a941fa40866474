//! Vertex and index buffers and the layouts that describe vertex records

use crate::backend::{BufferHandle, BufferKind, GraphicsBackend, GraphicsContext, ShaderDataType};
use crate::renderer::RendererError;

/// One named field of a vertex record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferElement {
    pub name: String,
    pub data_type: ShaderDataType,
    /// Size in bytes, always `data_type.size()`
    pub size: u32,
    /// Byte offset within the record, filled in by [`BufferLayout::new`]
    pub offset: u32,
    pub normalized: bool,
}

impl BufferElement {
    pub fn new(data_type: ShaderDataType, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type,
            size: data_type.size(),
            offset: 0,
            normalized: false,
        }
    }

    /// Mark the element as normalized
    pub fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }
}

/// Ordered description of one vertex record
///
/// Offsets and stride are computed once on construction; the layout is
/// immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferLayout {
    elements: Vec<BufferElement>,
    stride: u32,
}

impl BufferLayout {
    pub fn new(elements: Vec<BufferElement>) -> Self {
        let mut layout = Self {
            elements,
            stride: 0,
        };
        layout.calculate_offsets_and_stride();
        layout
    }

    fn calculate_offsets_and_stride(&mut self) {
        let mut offset = 0;
        for element in &mut self.elements {
            element.offset = offset;
            offset += element.size;
        }
        self.stride = offset;
    }

    pub fn elements(&self) -> &[BufferElement] {
        &self.elements
    }

    /// Size in bytes of one vertex record
    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BufferElement> {
        self.elements.iter()
    }
}

impl<'a> IntoIterator for &'a BufferLayout {
    type Item = &'a BufferElement;
    type IntoIter = std::slice::Iter<'a, BufferElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl<const N: usize> From<[(ShaderDataType, &str); N]> for BufferLayout {
    fn from(elements: [(ShaderDataType, &str); N]) -> Self {
        Self::new(
            elements
                .into_iter()
                .map(|(data_type, name)| BufferElement::new(data_type, name))
                .collect(),
        )
    }
}

/// Vertex data resident in the backend
pub struct VertexBuffer {
    context: GraphicsContext,
    handle: BufferHandle,
    size: usize,
    layout: BufferLayout,
}

impl VertexBuffer {
    /// Upload `vertices` into a new buffer with an empty layout
    pub fn create(context: &GraphicsContext, vertices: &[f32]) -> Result<Self, RendererError> {
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let handle = context.with_backend(|b| b.create_buffer(BufferKind::Vertex, bytes))?;
        Ok(Self {
            context: context.clone(),
            handle,
            size: bytes.len(),
            layout: BufferLayout::default(),
        })
    }

    pub fn set_layout(&mut self, layout: BufferLayout) {
        self.layout = layout;
    }

    pub fn with_layout(mut self, layout: BufferLayout) -> Self {
        self.set_layout(layout);
        self
    }

    pub fn layout(&self) -> &BufferLayout {
        &self.layout
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    /// Size of the vertex data in bytes
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Drop for VertexBuffer {
    fn drop(&mut self) {
        let handle = self.handle;
        self.context.release(|b| b.destroy_buffer(handle));
    }
}

/// 32-bit index data resident in the backend
pub struct IndexBuffer {
    context: GraphicsContext,
    handle: BufferHandle,
    count: u32,
}

impl IndexBuffer {
    pub fn create(context: &GraphicsContext, indices: &[u32]) -> Result<Self, RendererError> {
        let handle = context.with_backend(|b| {
            b.create_buffer(BufferKind::Index, bytemuck::cast_slice(indices))
        })?;
        Ok(Self {
            context: context.clone(),
            handle,
            count: indices.len() as u32,
        })
    }

    /// Number of indices
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }
}

impl Drop for IndexBuffer {
    fn drop(&mut self) {
        let handle = self.handle;
        self.context.release(|b| b.destroy_buffer(handle));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_offsets() {
        let layout = BufferLayout::from([
            (ShaderDataType::Float3, "a_Position"),
            (ShaderDataType::Float4, "a_Color"),
            (ShaderDataType::Float2, "a_TexCoord"),
        ]);

        let offsets: Vec<u32> = layout.iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 12, 28]);
        assert_eq!(layout.stride(), 36);
    }

    #[test]
    fn test_empty_layout() {
        let layout = BufferLayout::default();
        assert!(layout.is_empty());
        assert_eq!(layout.stride(), 0);
    }

    #[test]
    fn test_buffers_release_on_drop() {
        let context = GraphicsContext::headless(64, 64);
        {
            let vb = VertexBuffer::create(&context, &[0.0, 1.0, 2.0]).unwrap();
            let ib = IndexBuffer::create(&context, &[0, 1, 2]).unwrap();
            assert_eq!(vb.size(), 12);
            assert_eq!(ib.count(), 3);
            assert_eq!(context.inspect_headless(|h| h.live_buffer_count()), Some(2));
        }
        assert_eq!(context.inspect_headless(|h| h.live_buffer_count()), Some(0));
    }
}
