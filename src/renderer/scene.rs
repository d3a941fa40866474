//! Scene submission: `begin_scene` / `submit` / `end_scene`

use glam::{Mat4, Vec4};

use crate::backend::GraphicsContext;
use crate::renderer::render_command::RenderCommand;
use crate::renderer::vertex_array::VertexArray;
use crate::renderer::RendererError;
use crate::scene::OrthographicCamera;
use crate::shader::Shader;

/// Camera state captured by [`Renderer::begin_scene`]
///
/// Valid until passed back to [`Renderer::end_scene`].
#[derive(Debug)]
pub struct SceneContext {
    id: u64,
    view_projection: Mat4,
}

impl SceneContext {
    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }
}

/// Bookkeeping reported when a scene ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneStats {
    pub draw_calls: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SceneState {
    Idle,
    Active { id: u64, draw_calls: u32 },
}

/// Scene-level renderer
///
/// Every submission inside a scene is drawn immediately through
/// [`RenderCommand`]; ending the scene only closes the bracket.
pub struct Renderer {
    command: RenderCommand,
    state: SceneState,
    next_scene_id: u64,
}

impl Renderer {
    pub fn new(context: &GraphicsContext) -> Self {
        Self {
            command: RenderCommand::new(context),
            state: SceneState::Idle,
            next_scene_id: 1,
        }
    }

    pub fn init(&self) {
        self.command.init();
    }

    pub fn on_window_resize(&self, width: u32, height: u32) {
        self.command.set_viewport(0, 0, width, height);
    }

    pub fn command(&self) -> &RenderCommand {
        &self.command
    }

    pub fn set_clear_color(&self, color: Vec4) {
        self.command.set_clear_color(color);
    }

    pub fn clear(&self) {
        self.command.clear();
    }

    pub fn is_scene_active(&self) -> bool {
        matches!(self.state, SceneState::Active { .. })
    }

    /// Open a scene using `camera`'s current view-projection matrix
    pub fn begin_scene(&mut self, camera: &OrthographicCamera) -> Result<SceneContext, RendererError> {
        if self.is_scene_active() {
            log::error!("begin_scene called while a scene is already active");
            return Err(RendererError::SceneAlreadyActive);
        }

        let id = self.next_scene_id;
        self.next_scene_id += 1;
        self.state = SceneState::Active { id, draw_calls: 0 };
        log::trace!("Scene {} begun", id);

        Ok(SceneContext {
            id,
            view_projection: camera.view_projection_matrix(),
        })
    }

    /// Draw `vertex_array` with `shader` and model `transform`
    ///
    /// Rejected without touching the backend unless `scene` is the active
    /// scene and `vertex_array` has an index buffer.
    pub fn submit(
        &mut self,
        scene: &SceneContext,
        shader: &Shader,
        vertex_array: &VertexArray,
        transform: Mat4,
    ) -> Result<(), RendererError> {
        self.check_scene(scene)?;
        if vertex_array.index_buffer().is_none() {
            log::error!("Cannot submit a vertex array without an index buffer");
            return Err(RendererError::MissingIndexBuffer);
        }

        shader.bind();
        shader.upload_uniform_mat4("u_ViewProjection", &scene.view_projection)?;
        shader.upload_uniform_mat4("u_Transform", &transform)?;

        vertex_array.bind();
        self.command.draw_indexed(vertex_array, None)?;

        if let SceneState::Active { draw_calls, .. } = &mut self.state {
            *draw_calls += 1;
        }
        Ok(())
    }

    /// Close the scene opened by [`begin_scene`](Self::begin_scene)
    pub fn end_scene(&mut self, scene: SceneContext) -> Result<SceneStats, RendererError> {
        let draw_calls = self.check_scene(&scene)?;
        self.state = SceneState::Idle;
        log::trace!("Scene {} ended after {} draw calls", scene.id, draw_calls);
        Ok(SceneStats { draw_calls })
    }

    /// Draw count of the active scene if `scene` is it
    pub(crate) fn check_scene(&self, scene: &SceneContext) -> Result<u32, RendererError> {
        match self.state {
            SceneState::Idle => {
                log::error!("No active scene, call begin_scene first");
                Err(RendererError::NoActiveScene)
            }
            SceneState::Active { id, draw_calls } => {
                if id != scene.id {
                    log::error!("Scene {} is no longer active", scene.id);
                    return Err(RendererError::StaleScene);
                }
                Ok(draw_calls)
            }
        }
    }
}
