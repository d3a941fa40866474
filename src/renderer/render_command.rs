//! Thin façade over the backend's clear, viewport and draw commands
//!
//! Nothing else in the engine issues these commands directly.

use glam::Vec4;

use crate::backend::{GraphicsBackend, GraphicsContext};
use crate::renderer::vertex_array::VertexArray;
use crate::renderer::RendererError;

#[derive(Debug, Clone)]
pub struct RenderCommand {
    context: GraphicsContext,
}

impl RenderCommand {
    pub fn new(context: &GraphicsContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// One-time render state setup (alpha blending)
    pub fn init(&self) {
        self.context.with_backend(|b| b.enable_blending());
    }

    pub fn set_clear_color(&self, color: Vec4) {
        self.context.with_backend(|b| b.set_clear_color(color));
    }

    pub fn clear(&self) {
        self.context.with_backend(|b| b.clear());
    }

    pub fn set_viewport(&self, x: u32, y: u32, width: u32, height: u32) {
        self.context
            .with_backend(|b| b.set_viewport(x, y, width, height));
    }

    /// Draw `vertex_array` using its index buffer
    ///
    /// `index_count` overrides the index buffer's own count and may not
    /// exceed it.
    pub fn draw_indexed(
        &self,
        vertex_array: &VertexArray,
        index_count: Option<u32>,
    ) -> Result<(), RendererError> {
        let Some(index_buffer) = vertex_array.index_buffer() else {
            log::error!("Cannot draw a vertex array without an index buffer");
            return Err(RendererError::MissingIndexBuffer);
        };
        let available = index_buffer.count();
        let count = index_count.unwrap_or(available);
        if count > available {
            log::error!(
                "Index count {} exceeds the {} indices of the index buffer",
                count,
                available
            );
            return Err(RendererError::IndexCountOutOfRange {
                requested: count,
                available,
            });
        }
        let handle = vertex_array.handle();
        self.context.with_backend(|b| b.draw_indexed(handle, count))?;
        Ok(())
    }

    pub fn context(&self) -> &GraphicsContext {
        &self.context
    }
}
