//! Sandbox demo: a grid of squares and a vertex-coloured triangle
//!
//! Arrow keys move the camera, A/D rotate it.
//!
//! ```bash
//! cargo run --example sandbox -- --backend wgpu --width 1280 --height 720
//! ```

use std::collections::HashSet;
use std::rc::Rc;

use canopy::{
    Application, Backend, BackendType, BufferLayout, EngineConfig, EngineResult, Event, EventKind,
    Graphics, GraphicsContext, IndexBuffer, Layer, OrthographicCamera, ShaderDataType, Shader,
    Timestep, VertexArray, VertexBuffer, WinitPlatform,
};
use clap::Parser;
use glam::{Mat4, Vec3, Vec4};
use winit::keyboard::KeyCode;

/// Graphics backend selection for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
enum CliBackend {
    /// Draw into the window through wgpu
    #[default]
    Wgpu,
    /// Record commands in memory without presenting anything
    Headless,
}

impl From<CliBackend> for BackendType {
    fn from(cli: CliBackend) -> Self {
        match cli {
            CliBackend::Wgpu => BackendType::Wgpu,
            CliBackend::Headless => BackendType::Headless,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "sandbox", about = "Canopy sandbox demo")]
struct Args {
    /// Graphics backend
    #[arg(long, value_enum, default_value_t = CliBackend::Wgpu)]
    backend: CliBackend,
    /// Window width in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,
    /// Window height in pixels
    #[arg(long, default_value_t = 720)]
    height: u32,
    /// Disable vsync
    #[arg(long)]
    no_vsync: bool,
}

const BLUE_VERTEX: &str = r#"
@group(0) @binding(0) var<uniform> u_ViewProjection: mat4x4<f32>;
@group(0) @binding(1) var<uniform> u_Transform: mat4x4<f32>;

@vertex
fn vs_main(@location(0) a_Position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return u_ViewProjection * u_Transform * vec4<f32>(a_Position, 1.0);
}
"#;

const BLUE_FRAGMENT: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(0.2, 0.3, 0.8, 1.0);
}
"#;

const COLOR_VERTEX: &str = r#"
@group(0) @binding(0) var<uniform> u_ViewProjection: mat4x4<f32>;
@group(0) @binding(1) var<uniform> u_Transform: mat4x4<f32>;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec4<f32>,
}

@vertex
fn vs_main(@location(0) a_Position: vec3<f32>, @location(1) a_Color: vec4<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = u_ViewProjection * u_Transform * vec4<f32>(a_Position, 1.0);
    out.color = a_Color;
    return out;
}
"#;

const COLOR_FRAGMENT: &str = r#"
@fragment
fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
    return color;
}
"#;

struct SceneResources {
    triangle_shader: Shader,
    triangle_va: VertexArray,
    blue_shader: Shader,
    square_va: VertexArray,
}

struct ExampleLayer {
    resources: Option<SceneResources>,
    clear_color: Vec4,
    camera: OrthographicCamera,
    camera_position: Vec3,
    camera_move_speed: f32,
    camera_rotation: f32,
    camera_rotation_speed: f32,
    keys_down: HashSet<KeyCode>,
}

impl ExampleLayer {
    fn new(clear_color: Vec4) -> Self {
        Self {
            resources: None,
            clear_color,
            camera: OrthographicCamera::new(-1.6, 1.6, -0.9, 0.9),
            camera_position: Vec3::ZERO,
            camera_move_speed: 5.0,
            camera_rotation: 0.0,
            camera_rotation_speed: 180.0,
            keys_down: HashSet::new(),
        }
    }

    fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    fn create_resources(context: &GraphicsContext) -> EngineResult<SceneResources> {
        let mut triangle_va = VertexArray::create(context)?;
        #[rustfmt::skip]
        let vertices: [f32; 3 * 7] = [
            -0.5, -0.5, 0.0, 0.8, 0.2, 0.8, 1.0,
             0.5, -0.5, 0.0, 0.2, 0.3, 0.8, 1.0,
             0.0,  0.5, 0.0, 0.8, 0.8, 0.2, 1.0,
        ];
        let vertex_buffer = VertexBuffer::create(context, &vertices)?.with_layout(BufferLayout::from([
            (ShaderDataType::Float3, "a_Position"),
            (ShaderDataType::Float4, "a_Color"),
        ]));
        triangle_va.add_vertex_buffer(Rc::new(vertex_buffer))?;
        triangle_va.set_index_buffer(Rc::new(IndexBuffer::create(context, &[0u32, 1, 2])?))?;

        let mut square_va = VertexArray::create(context)?;
        #[rustfmt::skip]
        let square_vertices: [f32; 3 * 4] = [
            -0.5, -0.5, 0.0,
             0.5, -0.5, 0.0,
             0.5,  0.5, 0.0,
            -0.5,  0.5, 0.0,
        ];
        let square_vb = VertexBuffer::create(context, &square_vertices)?
            .with_layout(BufferLayout::from([(ShaderDataType::Float3, "a_Position")]));
        square_va.add_vertex_buffer(Rc::new(square_vb))?;
        square_va.set_index_buffer(Rc::new(IndexBuffer::create(context, &[0u32, 1, 2, 2, 3, 0])?))?;

        Ok(SceneResources {
            triangle_shader: Shader::new(context, "VertexColor", COLOR_VERTEX, COLOR_FRAGMENT)?,
            triangle_va,
            blue_shader: Shader::new(context, "Blue", BLUE_VERTEX, BLUE_FRAGMENT)?,
            square_va,
        })
    }
}

impl Layer for ExampleLayer {
    fn name(&self) -> &str {
        "ExampleLayer"
    }

    fn on_attach(&mut self, graphics: &mut Graphics) -> EngineResult<()> {
        self.resources = Some(Self::create_resources(&graphics.context)?);
        Ok(())
    }

    fn on_detach(&mut self) {
        self.resources = None;
    }

    fn on_update(&mut self, graphics: &mut Graphics, timestep: Timestep) -> EngineResult<()> {
        let ts = timestep.seconds();

        if self.is_key_pressed(KeyCode::ArrowLeft) {
            self.camera_position.x -= self.camera_move_speed * ts;
        } else if self.is_key_pressed(KeyCode::ArrowRight) {
            self.camera_position.x += self.camera_move_speed * ts;
        }
        if self.is_key_pressed(KeyCode::ArrowUp) {
            self.camera_position.y += self.camera_move_speed * ts;
        } else if self.is_key_pressed(KeyCode::ArrowDown) {
            self.camera_position.y -= self.camera_move_speed * ts;
        }
        if self.is_key_pressed(KeyCode::KeyA) {
            self.camera_rotation += self.camera_rotation_speed * ts;
        } else if self.is_key_pressed(KeyCode::KeyD) {
            self.camera_rotation -= self.camera_rotation_speed * ts;
        }

        let Some(resources) = &self.resources else {
            return Ok(());
        };

        let renderer = &mut graphics.renderer;
        renderer.set_clear_color(self.clear_color);
        renderer.clear();

        self.camera.set_position(self.camera_position);
        self.camera.set_rotation(self.camera_rotation);

        let scene = renderer.begin_scene(&self.camera)?;
        for y in 0..20 {
            for x in 0..20 {
                let position = Vec3::new(x as f32 * 0.11, y as f32 * 0.11, 0.0);
                let transform = Mat4::from_translation(position) * Mat4::from_scale(Vec3::splat(0.1));
                renderer.submit(&scene, &resources.blue_shader, &resources.square_va, transform)?;
            }
        }
        renderer.submit(
            &scene,
            &resources.triangle_shader,
            &resources.triangle_va,
            Mat4::IDENTITY,
        )?;
        let stats = renderer.end_scene(scene)?;
        log::trace!("{} draw calls", stats.draw_calls);
        Ok(())
    }

    fn on_event(&mut self, event: &mut Event) {
        match event.kind {
            EventKind::KeyPressed { key, .. } => {
                self.keys_down.insert(key);
            }
            EventKind::KeyReleased { key } => {
                self.keys_down.remove(&key);
            }
            _ => {}
        }
    }
}

fn main() -> EngineResult<()> {
    canopy::init();
    let args = Args::parse();

    let config = EngineConfig {
        title: "Canopy Sandbox".to_string(),
        width: args.width,
        height: args.height,
        backend: args.backend.into(),
        vsync: !args.no_vsync,
        ..Default::default()
    };

    let platform = WinitPlatform::new(&config)?;
    let backend = Backend::new(platform.window_arc(), config.backend, config.vsync)?;
    let context = GraphicsContext::new(backend);

    let mut app = Application::new(platform, context)?;
    app.push_layer(Box::new(ExampleLayer::new(config.clear_color)))?;
    app.run()
}
