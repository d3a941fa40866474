//! Flat-colour quad renderer built on the scene submission protocol
//!
//! Each quad is one indexed draw of a shared unit quad, scaled and
//! translated by its model transform.

use std::rc::Rc;

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::backend::{GraphicsContext, ShaderDataType};
use crate::renderer::buffer::{BufferLayout, IndexBuffer, VertexBuffer};
use crate::renderer::scene::{Renderer, SceneContext, SceneStats};
use crate::renderer::vertex_array::VertexArray;
use crate::renderer::RendererError;
use crate::scene::OrthographicCamera;
use crate::shader::Shader;

const FLAT_COLOR_VERTEX: &str = r#"
@group(0) @binding(0) var<uniform> u_ViewProjection: mat4x4<f32>;
@group(0) @binding(1) var<uniform> u_Transform: mat4x4<f32>;

@vertex
fn vs_main(@location(0) a_Position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return u_ViewProjection * u_Transform * vec4<f32>(a_Position, 1.0);
}
"#;

const FLAT_COLOR_FRAGMENT: &str = r#"
@group(0) @binding(2) var<uniform> u_Color: vec4<f32>;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return u_Color;
}
"#;

const QUAD_VERTICES: [f32; 3 * 4] = [
    -0.5, -0.5, 0.0, //
    0.5, -0.5, 0.0, //
    0.5, 0.5, 0.0, //
    -0.5, 0.5, 0.0, //
];

const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

struct Renderer2DStorage {
    quad_vertex_array: VertexArray,
    flat_color_shader: Shader,
}

/// Quad renderer; call [`init`](Self::init) before drawing
pub struct Renderer2D {
    context: GraphicsContext,
    storage: Option<Renderer2DStorage>,
}

impl Renderer2D {
    pub fn new(context: &GraphicsContext) -> Self {
        Self {
            context: context.clone(),
            storage: None,
        }
    }

    /// Create the shared quad geometry and the flat-colour shader
    pub fn init(&mut self) -> Result<(), RendererError> {
        let mut quad_vertex_array = VertexArray::create(&self.context)?;

        let vertex_buffer = VertexBuffer::create(&self.context, &QUAD_VERTICES)?
            .with_layout(BufferLayout::from([(ShaderDataType::Float3, "a_Position")]));
        quad_vertex_array.add_vertex_buffer(Rc::new(vertex_buffer))?;

        let index_buffer = IndexBuffer::create(&self.context, &QUAD_INDICES)?;
        quad_vertex_array.set_index_buffer(Rc::new(index_buffer))?;

        let flat_color_shader = Shader::new(
            &self.context,
            "FlatColor",
            FLAT_COLOR_VERTEX,
            FLAT_COLOR_FRAGMENT,
        )?;

        self.storage = Some(Renderer2DStorage {
            quad_vertex_array,
            flat_color_shader,
        });
        log::debug!("Renderer2D initialized");
        Ok(())
    }

    /// Release the quad geometry and shader
    pub fn shutdown(&mut self) {
        if self.storage.take().is_some() {
            log::debug!("Renderer2D shut down");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.storage.is_some()
    }

    pub fn begin_scene(
        &self,
        renderer: &mut Renderer,
        camera: &OrthographicCamera,
    ) -> Result<SceneContext, RendererError> {
        renderer.begin_scene(camera)
    }

    pub fn end_scene(
        &self,
        renderer: &mut Renderer,
        scene: SceneContext,
    ) -> Result<SceneStats, RendererError> {
        renderer.end_scene(scene)
    }

    /// Draw an axis-aligned quad centred on `position` at depth 0
    pub fn draw_quad(
        &self,
        renderer: &mut Renderer,
        scene: &SceneContext,
        position: Vec2,
        size: Vec2,
        color: Vec4,
    ) -> Result<(), RendererError> {
        self.draw_quad_3d(renderer, scene, position.extend(0.0), size, color)
    }

    /// Draw an axis-aligned quad centred on `position`
    pub fn draw_quad_3d(
        &self,
        renderer: &mut Renderer,
        scene: &SceneContext,
        position: Vec3,
        size: Vec2,
        color: Vec4,
    ) -> Result<(), RendererError> {
        let Some(storage) = &self.storage else {
            log::error!("Renderer2D used before init");
            return Err(RendererError::NotInitialized);
        };

        renderer.check_scene(scene)?;

        let transform =
            Mat4::from_translation(position) * Mat4::from_scale(Vec3::new(size.x, size.y, 1.0));

        storage
            .flat_color_shader
            .upload_uniform_float4("u_Color", color)?;
        renderer.submit(
            scene,
            &storage.flat_color_shader,
            &storage.quad_vertex_array,
            transform,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::UniformValue;

    #[test]
    fn test_draw_before_init_fails() {
        let context = GraphicsContext::headless(64, 64);
        let mut renderer = Renderer::new(&context);
        let renderer_2d = Renderer2D::new(&context);
        let camera = OrthographicCamera::new(-1.0, 1.0, -1.0, 1.0);

        let scene = renderer_2d.begin_scene(&mut renderer, &camera).unwrap();
        let result = renderer_2d.draw_quad(&mut renderer, &scene, Vec2::ZERO, Vec2::ONE, Vec4::ONE);
        assert!(matches!(result, Err(RendererError::NotInitialized)));
        renderer_2d.end_scene(&mut renderer, scene).unwrap();
    }

    #[test]
    fn test_quad_draw_uniforms() {
        let context = GraphicsContext::headless(64, 64);
        let mut renderer = Renderer::new(&context);
        let mut renderer_2d = Renderer2D::new(&context);
        renderer_2d.init().unwrap();
        let camera = OrthographicCamera::new(-1.0, 1.0, -1.0, 1.0);

        let color = Vec4::new(0.8, 0.2, 0.3, 1.0);
        let scene = renderer_2d.begin_scene(&mut renderer, &camera).unwrap();
        renderer_2d
            .draw_quad(&mut renderer, &scene, Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0), color)
            .unwrap();
        let stats = renderer_2d.end_scene(&mut renderer, scene).unwrap();
        assert_eq!(stats.draw_calls, 1);

        let draw = context
            .inspect_headless(|h| h.draws().next().cloned())
            .flatten()
            .unwrap();
        assert_eq!(draw.index_count, 6);
        assert_eq!(draw.uniform("u_Color"), Some(&UniformValue::Float4(color)));

        let expected = Mat4::from_translation(Vec3::new(1.0, 2.0, 0.0))
            * Mat4::from_scale(Vec3::new(3.0, 4.0, 1.0));
        assert_eq!(draw.uniform("u_Transform"), Some(&UniformValue::Mat4(expected)));
    }

    #[test]
    fn test_rejected_quad_leaves_color_untouched() {
        let context = GraphicsContext::headless(64, 64);
        let mut renderer = Renderer::new(&context);
        let mut idle_renderer = Renderer::new(&context);
        let mut renderer_2d = Renderer2D::new(&context);
        renderer_2d.init().unwrap();
        let camera = OrthographicCamera::new(-1.0, 1.0, -1.0, 1.0);

        let scene = renderer_2d.begin_scene(&mut renderer, &camera).unwrap();
        renderer_2d
            .draw_quad(&mut renderer, &scene, Vec2::ZERO, Vec2::ONE, Vec4::ONE)
            .unwrap();

        let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let result = renderer_2d.draw_quad(&mut idle_renderer, &scene, Vec2::ZERO, Vec2::ONE, red);
        assert!(matches!(result, Err(RendererError::NoActiveScene)));
        renderer_2d.end_scene(&mut renderer, scene).unwrap();

        let program = renderer_2d
            .storage
            .as_ref()
            .map(|s| s.flat_color_shader.handle())
            .unwrap();
        let color = context
            .inspect_headless(|h| h.uniform_value(program, "u_Color"))
            .flatten();
        assert_eq!(color, Some(UniformValue::Float4(Vec4::ONE)));
        assert_eq!(context.inspect_headless(|h| h.draw_count()), Some(1));
    }

    #[test]
    fn test_quad_depth_reaches_transform() {
        let context = GraphicsContext::headless(64, 64);
        let mut renderer = Renderer::new(&context);
        let mut renderer_2d = Renderer2D::new(&context);
        renderer_2d.init().unwrap();
        let camera = OrthographicCamera::new(-1.0, 1.0, -1.0, 1.0);

        let scene = renderer_2d.begin_scene(&mut renderer, &camera).unwrap();
        renderer_2d
            .draw_quad_3d(
                &mut renderer,
                &scene,
                Vec3::new(0.25, -0.5, 0.5),
                Vec2::new(2.0, 0.5),
                Vec4::ONE,
            )
            .unwrap();
        renderer_2d.end_scene(&mut renderer, scene).unwrap();

        let draw = context
            .inspect_headless(|h| h.draws().next().cloned())
            .flatten()
            .unwrap();
        let expected = Mat4::from_translation(Vec3::new(0.25, -0.5, 0.5))
            * Mat4::from_scale(Vec3::new(2.0, 0.5, 1.0));
        assert_eq!(draw.uniform("u_Transform"), Some(&UniformValue::Mat4(expected)));
    }

    #[test]
    fn test_shutdown_releases_resources() {
        let context = GraphicsContext::headless(64, 64);
        let mut renderer_2d = Renderer2D::new(&context);
        renderer_2d.init().unwrap();
        assert!(renderer_2d.is_initialized());

        renderer_2d.shutdown();
        assert!(!renderer_2d.is_initialized());
        assert_eq!(context.inspect_headless(|h| h.live_buffer_count()), Some(0));
        assert_eq!(context.inspect_headless(|h| h.live_program_count()), Some(0));
    }
}
