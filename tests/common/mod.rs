//! Shared helpers for the headless integration tests.

#![allow(dead_code)]

use std::rc::Rc;

use canopy::backend::DrawRecord;
use canopy::{
    BufferLayout, GraphicsContext, IndexBuffer, Shader, ShaderDataType, VertexArray, VertexBuffer,
};

pub const VERTEX_SRC: &str = r#"
@group(0) @binding(0) var<uniform> u_ViewProjection: mat4x4<f32>;
@group(0) @binding(1) var<uniform> u_Transform: mat4x4<f32>;

@vertex
fn vs_main(@location(0) a_Position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return u_ViewProjection * u_Transform * vec4<f32>(a_Position, 1.0);
}
"#;

pub const FRAGMENT_SRC: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(0.2, 0.3, 0.8, 1.0);
}
"#;

pub fn headless_context() -> GraphicsContext {
    canopy::init_logging();
    GraphicsContext::headless(1280, 720)
}

pub fn test_shader(context: &GraphicsContext) -> Shader {
    Shader::new(context, "Test", VERTEX_SRC, FRAGMENT_SRC).expect("valid test shader")
}

/// A unit quad with a position-only layout and six indices
pub fn quad(context: &GraphicsContext) -> VertexArray {
    #[rustfmt::skip]
    let vertices: [f32; 12] = [
        -0.5, -0.5, 0.0,
         0.5, -0.5, 0.0,
         0.5,  0.5, 0.0,
        -0.5,  0.5, 0.0,
    ];
    let vb = VertexBuffer::create(context, &vertices)
        .expect("vertex buffer")
        .with_layout(BufferLayout::from([(ShaderDataType::Float3, "a_Position")]));
    let ib = IndexBuffer::create(context, &[0, 1, 2, 2, 3, 0]).expect("index buffer");

    let mut va = VertexArray::create(context).expect("vertex array");
    va.add_vertex_buffer(Rc::new(vb)).expect("attach vertex buffer");
    va.set_index_buffer(Rc::new(ib)).expect("attach index buffer");
    va
}

pub fn recorded_draws(context: &GraphicsContext) -> Vec<DrawRecord> {
    context
        .inspect_headless(|h| h.draws().cloned().collect())
        .expect("headless backend")
}
