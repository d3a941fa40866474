//! Vertex arrays: vertex buffers plus an index buffer forming one drawable unit

use std::ops::Range;
use std::rc::Rc;

use crate::backend::{
    GraphicsBackend, GraphicsContext, VertexArrayHandle, VertexAttributeDesc, VertexBufferBinding,
};
use crate::renderer::buffer::{IndexBuffer, VertexBuffer};
use crate::renderer::RendererError;

/// A drawable set of vertex buffers and one index buffer
///
/// Attribute slots are handed out sequentially across every buffer ever
/// attached, in attachment order. Matrix elements take one slot per column.
pub struct VertexArray {
    context: GraphicsContext,
    handle: VertexArrayHandle,
    vertex_buffers: Vec<Rc<VertexBuffer>>,
    slot_ranges: Vec<Range<u32>>,
    index_buffer: Option<Rc<IndexBuffer>>,
    next_attribute_index: u32,
}

impl VertexArray {
    pub fn create(context: &GraphicsContext) -> Result<Self, RendererError> {
        let handle = context.with_backend(|b| b.create_vertex_array())?;
        Ok(Self {
            context: context.clone(),
            handle,
            vertex_buffers: Vec::new(),
            slot_ranges: Vec::new(),
            index_buffer: None,
            next_attribute_index: 0,
        })
    }

    pub fn bind(&self) {
        let handle = self.handle;
        self.context.with_backend(|b| b.bind_vertex_array(Some(handle)));
    }

    pub fn unbind(&self) {
        self.context.with_backend(|b| b.bind_vertex_array(None));
    }

    /// Attach a vertex buffer, registering every layout element as attributes
    ///
    /// Fails with [`RendererError::EmptyLayout`] if the buffer has no layout.
    pub fn add_vertex_buffer(&mut self, vertex_buffer: Rc<VertexBuffer>) -> Result<(), RendererError> {
        let layout = vertex_buffer.layout();
        if layout.is_empty() {
            log::error!("Vertex buffer has no layout");
            return Err(RendererError::EmptyLayout);
        }

        let first_slot = self.next_attribute_index;
        let mut location = first_slot;
        let mut attributes = Vec::new();
        for element in layout {
            let columns = element.data_type.slot_count();
            let column_size = element.size / columns;
            for column in 0..columns {
                attributes.push(VertexAttributeDesc {
                    location,
                    components: element.data_type.component_count(),
                    kind: element.data_type.scalar_kind(),
                    normalized: element.normalized,
                    offset: element.offset + column * column_size,
                });
                location += 1;
            }
        }

        let binding = VertexBufferBinding {
            buffer: vertex_buffer.handle(),
            stride: layout.stride(),
            attributes,
        };
        let handle = self.handle;
        self.context
            .with_backend(|b| b.attach_vertex_buffer(handle, &binding))?;

        self.next_attribute_index = location;
        self.slot_ranges.push(first_slot..location);
        self.vertex_buffers.push(vertex_buffer);
        Ok(())
    }

    pub fn set_index_buffer(&mut self, index_buffer: Rc<IndexBuffer>) -> Result<(), RendererError> {
        let handle = self.handle;
        let buffer = index_buffer.handle();
        self.context.with_backend(|b| b.set_index_buffer(handle, buffer))?;
        self.index_buffer = Some(index_buffer);
        Ok(())
    }

    pub fn vertex_buffers(&self) -> &[Rc<VertexBuffer>] {
        &self.vertex_buffers
    }

    pub fn index_buffer(&self) -> Option<&Rc<IndexBuffer>> {
        self.index_buffer.as_ref()
    }

    /// Total number of attribute slots in use
    pub fn attribute_count(&self) -> u32 {
        self.next_attribute_index
    }

    /// Attribute slots assigned to the `buffer_index`-th attached buffer
    pub fn attribute_slots(&self, buffer_index: usize) -> Option<Range<u32>> {
        self.slot_ranges.get(buffer_index).cloned()
    }

    pub fn handle(&self) -> VertexArrayHandle {
        self.handle
    }
}

impl Drop for VertexArray {
    fn drop(&mut self) {
        let handle = self.handle;
        self.context.release(|b| b.destroy_vertex_array(handle));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ShaderDataType;
    use crate::renderer::BufferLayout;

    #[test]
    fn test_rejects_buffer_without_layout() {
        let context = GraphicsContext::headless(64, 64);
        let mut va = VertexArray::create(&context).unwrap();
        let vb = Rc::new(VertexBuffer::create(&context, &[0.0; 3]).unwrap());

        assert!(matches!(
            va.add_vertex_buffer(vb),
            Err(RendererError::EmptyLayout)
        ));
        assert_eq!(va.attribute_count(), 0);
        assert!(va.vertex_buffers().is_empty());
    }

    #[test]
    fn test_matrix_takes_one_slot_per_column() {
        let context = GraphicsContext::headless(64, 64);
        let mut va = VertexArray::create(&context).unwrap();
        let vb = VertexBuffer::create(&context, &[0.0; 19])
            .unwrap()
            .with_layout(BufferLayout::from([
                (ShaderDataType::Float3, "a_Position"),
                (ShaderDataType::Mat4, "a_Model"),
            ]));
        va.add_vertex_buffer(Rc::new(vb)).unwrap();

        assert_eq!(va.attribute_slots(0), Some(0..5));

        let bindings = context
            .inspect_headless(|h| h.vertex_array_bindings(va.handle()).map(|b| b.to_vec()))
            .flatten()
            .unwrap();
        let offsets: Vec<u32> = bindings[0].attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 28, 44, 60]);
        assert_eq!(bindings[0].stride, 76);
    }

    #[test]
    fn test_shared_buffer_outlives_array() {
        let context = GraphicsContext::headless(64, 64);
        let vb = Rc::new(
            VertexBuffer::create(&context, &[0.0; 3])
                .unwrap()
                .with_layout(BufferLayout::from([(ShaderDataType::Float3, "a_Position")])),
        );
        {
            let mut va = VertexArray::create(&context).unwrap();
            va.add_vertex_buffer(vb.clone()).unwrap();
        }
        assert_eq!(Rc::strong_count(&vb), 1);
        assert_eq!(context.inspect_headless(|h| h.live_buffer_count()), Some(1));
    }
}
