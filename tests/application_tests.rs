//! Layer stack and application loop integration tests.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use canopy::{
    Application, Backend, EngineResult, Event, EventKind, Graphics, GraphicsContext, GuiOverlay,
    HeadlessBackend, Layer, LayerStack, Platform, Timestep,
};
use glam::{Mat4, Vec2, Vec4};
use winit::keyboard::KeyCode;

use common::headless_context;

type Log = Rc<RefCell<Vec<String>>>;

/// Layer that logs every callback and optionally consumes events
struct TraceLayer {
    name: &'static str,
    log: Log,
    consume: bool,
}

impl TraceLayer {
    fn boxed(name: &'static str, log: &Log, consume: bool) -> Box<Self> {
        Box::new(Self {
            name,
            log: log.clone(),
            consume,
        })
    }

    fn record(&self, what: &str) {
        self.log.borrow_mut().push(format!("{}:{}", self.name, what));
    }
}

impl Layer for TraceLayer {
    fn name(&self) -> &str {
        self.name
    }

    fn on_attach(&mut self, _graphics: &mut Graphics) -> EngineResult<()> {
        self.record("attach");
        Ok(())
    }

    fn on_detach(&mut self) {
        self.record("detach");
    }

    fn on_update(&mut self, _graphics: &mut Graphics, _timestep: Timestep) -> EngineResult<()> {
        self.record("update");
        Ok(())
    }

    fn on_gui_render(&mut self) {
        self.record("gui");
    }

    fn on_event(&mut self, event: &mut Event) {
        self.record("event");
        if self.consume {
            event.handled = true;
        }
    }
}

struct ScriptedPlatform {
    frames: Vec<Vec<Event>>,
    time: f64,
    swaps: Rc<RefCell<u32>>,
}

impl Platform for ScriptedPlatform {
    fn poll_events(&mut self) -> Vec<Event> {
        if self.frames.is_empty() {
            vec![Event::new(EventKind::WindowClose)]
        } else {
            self.frames.remove(0)
        }
    }

    fn swap_buffers(&mut self) {
        *self.swaps.borrow_mut() += 1;
        self.time += 0.5;
    }

    fn time(&self) -> f64 {
        self.time
    }
}

struct RecordingGui {
    log: Log,
}

impl GuiOverlay for RecordingGui {
    fn begin(&mut self) {
        self.log.borrow_mut().push("gui:begin".into());
    }

    fn end(&mut self) {
        self.log.borrow_mut().push("gui:end".into());
    }
}

fn key_pressed() -> Event {
    Event::new(EventKind::KeyPressed {
        key: KeyCode::Space,
        repeat: false,
    })
}

// ============================================================================
// Layer stack
// ============================================================================

#[test]
fn test_overlay_receives_events_first() {
    let log = Log::default();
    let mut stack = LayerStack::new();
    stack.push_layer(TraceLayer::boxed("A", &log, false));
    stack.push_overlay(TraceLayer::boxed("B", &log, false));

    let mut event = key_pressed();
    stack.dispatch(&mut event);

    assert_eq!(*log.borrow(), vec!["B:event", "A:event"]);
}

#[test]
fn test_handled_event_stops_propagation() {
    let log = Log::default();
    let mut stack = LayerStack::new();
    stack.push_layer(TraceLayer::boxed("A", &log, false));
    stack.push_overlay(TraceLayer::boxed("B", &log, true));

    let mut event = key_pressed();
    stack.dispatch(&mut event);

    assert!(event.handled);
    assert_eq!(*log.borrow(), vec!["B:event"]);
}

#[test]
fn test_update_order_layers_then_overlays() {
    let log = Log::default();
    let mut stack = LayerStack::new();
    stack.push_overlay(TraceLayer::boxed("gui", &log, false));
    stack.push_layer(TraceLayer::boxed("world", &log, false));
    stack.push_overlay(TraceLayer::boxed("debug", &log, false));
    stack.push_layer(TraceLayer::boxed("hud", &log, false));

    let names: Vec<&str> = stack.iter().map(|l| l.name()).collect();
    assert_eq!(names, vec!["world", "hud", "gui", "debug"]);

    let mut event = key_pressed();
    stack.dispatch(&mut event);
    assert_eq!(
        *log.borrow(),
        vec!["debug:event", "gui:event", "hud:event", "world:event"]
    );
}

// ============================================================================
// Application loop
// ============================================================================

#[test]
fn test_frame_order_and_shutdown() {
    let log = Log::default();
    let swaps = Rc::new(RefCell::new(0));
    let platform = ScriptedPlatform {
        frames: vec![vec![key_pressed()], vec![]],
        time: 0.0,
        swaps: swaps.clone(),
    };
    let context = headless_context();

    let mut app = Application::new(platform, context.clone()).unwrap();
    app.set_gui_overlay(Box::new(RecordingGui { log: log.clone() }));
    app.push_layer(TraceLayer::boxed("A", &log, false)).unwrap();
    app.push_overlay(TraceLayer::boxed("B", &log, false)).unwrap();

    app.run().unwrap();

    let expected: Vec<&str> = vec![
        "A:attach", "B:attach",
        // frame 1
        "B:event", "A:event", "A:update", "B:update", "gui:begin", "A:gui", "B:gui", "gui:end",
        // frame 2
        "A:update", "B:update", "gui:begin", "A:gui", "B:gui", "gui:end",
        // close, handled by the application before the layers see it
        "B:detach", "A:detach",
    ];
    assert_eq!(*log.borrow(), expected);
    assert_eq!(*swaps.borrow(), 2);
    assert_eq!(context.inspect_headless(|h| h.frames_presented()), Some(2));
    assert!(app.layer_stack().is_empty());
}

#[test]
fn test_resize_forwards_viewport() {
    let swaps = Rc::new(RefCell::new(0));
    let platform = ScriptedPlatform {
        frames: vec![vec![Event::new(EventKind::WindowResize {
            width: 640,
            height: 360,
        })]],
        time: 0.0,
        swaps,
    };
    let context = headless_context();
    let mut app = Application::new(platform, context.clone()).unwrap();

    app.run_frame().unwrap();

    assert_eq!(context.surface_size(), (640, 360));
    let last_viewport = context
        .inspect_headless(|h| {
            h.commands()
                .iter()
                .rev()
                .find_map(|c| match c {
                    canopy::backend::RecordedCommand::SetViewport { width, height, .. } => {
                        Some((*width, *height))
                    }
                    _ => None,
                })
        })
        .flatten();
    assert_eq!(last_viewport, Some((640, 360)));
}

/// Layer drawing quads through the 2D renderer, like a game layer would
struct QuadLayer {
    timesteps: Rc<RefCell<Vec<f32>>>,
}

impl Layer for QuadLayer {
    fn name(&self) -> &str {
        "Quads"
    }

    fn on_update(&mut self, graphics: &mut Graphics, timestep: Timestep) -> EngineResult<()> {
        self.timesteps.borrow_mut().push(timestep.seconds());

        let camera = canopy::OrthographicCamera::new(-1.6, 1.6, -0.9, 0.9);
        let Graphics {
            renderer,
            renderer_2d,
            ..
        } = graphics;

        let scene = renderer_2d.begin_scene(renderer, &camera)?;
        for i in 0..3 {
            renderer_2d.draw_quad(
                renderer,
                &scene,
                Vec2::new(i as f32 * 0.5, 0.0),
                Vec2::splat(0.4),
                Vec4::new(0.8, 0.2, 0.3, 1.0),
            )?;
        }
        renderer_2d.end_scene(renderer, scene)?;
        Ok(())
    }
}

#[test]
fn test_layers_draw_quads_each_frame() {
    let timesteps = Rc::new(RefCell::new(Vec::new()));
    let platform = ScriptedPlatform {
        frames: vec![vec![], vec![]],
        time: 1.0,
        swaps: Rc::new(RefCell::new(0)),
    };
    let context = headless_context();
    let mut app = Application::new(platform, context.clone()).unwrap();
    app.push_layer(Box::new(QuadLayer {
        timesteps: timesteps.clone(),
    }))
    .unwrap();

    app.run().unwrap();

    assert_eq!(*timesteps.borrow(), vec![0.0, 0.5]);
    let draws = common::recorded_draws(&context);
    assert_eq!(draws.len(), 6);
    assert!(draws.iter().all(|d| d.index_count == 6));

    let expected = Mat4::from_translation(glam::Vec3::new(1.0, 0.0, 0.0))
        * Mat4::from_scale(glam::Vec3::new(0.4, 0.4, 1.0));
    assert_eq!(
        draws[2].uniform("u_Transform"),
        Some(&canopy::backend::UniformValue::Mat4(expected))
    );
}

#[test]
fn test_long_run_keeps_command_log_bounded() {
    let platform = ScriptedPlatform {
        frames: vec![Vec::new(); 1000],
        time: 0.0,
        swaps: Rc::new(RefCell::new(0)),
    };
    let backend = Backend::Headless(HeadlessBackend::with_command_limit(1280, 720, 256));
    let context = GraphicsContext::new(backend);
    let mut app = Application::new(platform, context.clone()).unwrap();
    app.push_layer(Box::new(QuadLayer {
        timesteps: Rc::new(RefCell::new(Vec::new())),
    }))
    .unwrap();

    app.run().unwrap();

    let (retained, dropped, frames) = context
        .inspect_headless(|h| {
            (
                h.commands().len(),
                h.dropped_command_count(),
                h.frames_presented(),
            )
        })
        .unwrap();
    assert_eq!(frames, 1000);
    assert!(retained <= 256);
    // One viewport from startup plus three quads per frame
    assert_eq!(retained + dropped, 1 + 3 * 1000);
    assert!(matches!(
        context.inspect_headless(|h| h.commands().last().cloned()).flatten(),
        Some(canopy::backend::RecordedCommand::DrawIndexed(_))
    ));
}
