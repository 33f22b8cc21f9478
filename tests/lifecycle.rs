//! Lifecycle ordering through the headless driver

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::bail;
use simple_triangle::app::input::KeyCode;
use simple_triangle::app::{
    AppConfig, Application, BackendKind, Engine, EngineContext, EngineError, LifecycleState,
    Platform, UpdateStatus,
};
use simple_triangle::gfx::{
    CommandBuffer, FramePlan, GfxError, GfxResult, GraphicsBackend, HeadlessBackend,
    ShaderHandle, UniformHandle, UniformType, VertexAttribute, VertexBufferHandle, Viewport,
};
use simple_triangle::triangle::TriangleApp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Init,
    Update(u64),
    Shutdown,
}

/// Records every callback; finishes or fails on request
struct Recorder {
    calls: Rc<RefCell<Vec<Call>>>,
    fail_init: bool,
    done_at: Option<u64>,
    fail_at: Option<u64>,
}

impl Recorder {
    fn new(calls: Rc<RefCell<Vec<Call>>>) -> Self {
        Self {
            calls,
            fail_init: false,
            done_at: None,
            fail_at: None,
        }
    }
}

impl Application for Recorder {
    fn init(&mut self, _ctx: &mut EngineContext<'_>) -> anyhow::Result<()> {
        self.calls.borrow_mut().push(Call::Init);
        if self.fail_init {
            bail!("init refused");
        }
        Ok(())
    }

    fn update(&mut self, ctx: &mut EngineContext<'_>) -> anyhow::Result<UpdateStatus> {
        let frame = ctx.frame();
        self.calls.borrow_mut().push(Call::Update(frame));
        if self.fail_at == Some(frame) {
            bail!("update refused");
        }
        if self.done_at == Some(frame) {
            return Ok(UpdateStatus::Done);
        }
        Ok(UpdateStatus::InProgress)
    }

    fn shutdown(&mut self, _ctx: &mut EngineContext<'_>) {
        self.calls.borrow_mut().push(Call::Shutdown);
    }
}

/// Headless backend whose vertex buffer uploads always fail
struct NoVertexMemory(HeadlessBackend);

impl GraphicsBackend for NoVertexMemory {
    fn name(&self) -> &str {
        "no-vertex-memory"
    }

    fn target_size(&self) -> Viewport {
        self.0.target_size()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.0.resize(width, height);
    }

    fn construct_shader(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
    ) -> GfxResult<ShaderHandle> {
        self.0.construct_shader(vertex_src, fragment_src)
    }

    fn construct_uniform(
        &mut self,
        shader: ShaderHandle,
        name: &str,
        ty: UniformType,
    ) -> GfxResult<UniformHandle> {
        self.0.construct_uniform(shader, name, ty)
    }

    fn construct_vertex_buffer(
        &mut self,
        _layout: &[VertexAttribute],
        _data: &[f32],
    ) -> GfxResult<VertexBufferHandle> {
        Err(GfxError::Device("out of memory".to_string()))
    }

    fn destroy_shader(&mut self, shader: ShaderHandle) -> GfxResult<()> {
        self.0.destroy_shader(shader)
    }

    fn destroy_vertex_buffer(&mut self, buffer: VertexBufferHandle) -> GfxResult<()> {
        self.0.destroy_vertex_buffer(buffer)
    }

    fn submit_command_buffer(&mut self, cb: &mut CommandBuffer) -> GfxResult<FramePlan> {
        self.0.submit_command_buffer(cb)
    }
}

fn headless_config() -> AppConfig {
    let mut config = AppConfig::builtin("test");
    config.graphics.backend = BackendKind::Headless;
    config
}

fn run(app: Recorder, max_frames: Option<u64>) -> (Engine, Result<u64, EngineError>) {
    let mut engine = Engine::new(headless_config(), Box::new(app));
    let mut backend = HeadlessBackend::new(800, 600);
    let mut platform = Platform::new(800, 600);
    let result = engine.run_headless(&mut backend, &mut platform, max_frames, |_, _| {});
    (engine, result)
}

#[test]
fn test_done_ends_updates_and_shuts_down_once() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut app = Recorder::new(calls.clone());
    app.done_at = Some(2);

    let (engine, result) = run(app, None);

    assert_eq!(result.unwrap(), 3);
    assert_eq!(engine.state(), LifecycleState::ShutDown);
    assert_eq!(
        *calls.borrow(),
        vec![
            Call::Init,
            Call::Update(0),
            Call::Update(1),
            Call::Update(2),
            Call::Shutdown
        ]
    );
}

#[test]
fn test_frame_limit_stops_like_a_closed_window() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let (_, result) = run(Recorder::new(calls.clone()), Some(2));

    assert_eq!(result.unwrap(), 2);
    assert_eq!(
        *calls.borrow(),
        vec![Call::Init, Call::Update(0), Call::Update(1), Call::Shutdown]
    );
}

#[test]
fn test_zero_frame_limit_still_inits_and_shuts_down() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let (_, result) = run(Recorder::new(calls.clone()), Some(0));

    assert_eq!(result.unwrap(), 0);
    assert_eq!(*calls.borrow(), vec![Call::Init, Call::Shutdown]);
}

#[test]
fn test_init_failure_skips_updates() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut app = Recorder::new(calls.clone());
    app.fail_init = true;

    let (engine, result) = run(app, Some(5));

    assert!(matches!(result, Err(EngineError::Init(_))));
    assert_eq!(engine.state(), LifecycleState::ShutDown);
    assert_eq!(*calls.borrow(), vec![Call::Init, Call::Shutdown]);
}

#[test]
fn test_update_failure_stops_loop() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut app = Recorder::new(calls.clone());
    app.fail_at = Some(1);

    let (_, result) = run(app, Some(10));

    match result {
        Err(EngineError::Update { frame, .. }) => assert_eq!(frame, 1),
        other => panic!("expected update failure, got {other:?}"),
    }
    assert_eq!(
        *calls.borrow(),
        vec![Call::Init, Call::Update(0), Call::Update(1), Call::Shutdown]
    );
}

#[test]
fn test_lifecycle_misuse_is_rejected() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut engine = Engine::new(headless_config(), Box::new(Recorder::new(calls.clone())));
    let mut backend = HeadlessBackend::new(800, 600);
    let platform = Platform::new(800, 600);

    assert!(matches!(
        engine.update(&mut backend, &platform),
        Err(EngineError::Lifecycle { action: "update", .. })
    ));

    engine.init(&mut backend, &platform).unwrap();
    assert!(matches!(
        engine.init(&mut backend, &platform),
        Err(EngineError::Lifecycle { action: "init", .. })
    ));

    engine.shutdown(&mut backend, &platform).unwrap();
    assert!(matches!(
        engine.shutdown(&mut backend, &platform),
        Err(EngineError::Lifecycle { .. })
    ));
    assert!(engine.update(&mut backend, &platform).is_err());

    assert_eq!(*calls.borrow(), vec![Call::Init, Call::Shutdown]);
}

#[test]
fn test_abandon_before_init_invokes_nothing() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut engine = Engine::new(headless_config(), Box::new(Recorder::new(calls.clone())));

    engine.abandon();

    assert_eq!(engine.state(), LifecycleState::ShutDown);
    assert!(calls.borrow().is_empty());
}

#[test]
fn test_escape_finishes_triangle() {
    let mut engine = Engine::new(headless_config(), Box::new(TriangleApp::new()));
    let mut backend = HeadlessBackend::new(800, 600);
    let mut platform = Platform::new(800, 600);

    let frames = engine
        .run_headless(&mut backend, &mut platform, Some(100), |frame, platform| {
            if frame == 2 {
                platform.press_key(KeyCode::Escape);
            }
        })
        .unwrap();

    // The Escape frame returns Done without submitting
    assert_eq!(frames, 3);
    assert_eq!(backend.submitted(), 2);
    assert_eq!(engine.state(), LifecycleState::ShutDown);
}

#[test]
fn test_triangle_construction_failure_is_fatal() {
    let mut engine = Engine::new(headless_config(), Box::new(TriangleApp::new()));
    let mut backend = NoVertexMemory(HeadlessBackend::new(800, 600));
    let mut platform = Platform::new(800, 600);

    let result = engine.run_headless(&mut backend, &mut platform, Some(10), |_, _| {});

    match result {
        Err(EngineError::Init(e)) => {
            assert!(format!("{e:#}").contains("out of memory"), "{e:#}");
        }
        other => panic!("expected init failure, got {other:?}"),
    }
    assert_eq!(engine.frame(), 0);
    assert_eq!(engine.state(), LifecycleState::ShutDown);
    assert_eq!(backend.0.submitted(), 0);
    assert_eq!(backend.0.resources().shader_count(), 1);
}

#[test]
fn test_escape_tapped_between_frames_finishes_triangle() {
    let mut engine = Engine::new(headless_config(), Box::new(TriangleApp::new()));
    let mut backend = HeadlessBackend::new(800, 600);
    let mut platform = Platform::new(800, 600);

    let frames = engine
        .run_headless(&mut backend, &mut platform, Some(100), |frame, platform| {
            if frame == 1 {
                platform.press_key(KeyCode::Escape);
                platform.release_key(KeyCode::Escape);
            }
        })
        .unwrap();

    assert_eq!(frames, 2);
    assert_eq!(backend.submitted(), 1);
}

#[test]
fn test_held_escape_is_only_pressed_once() {
    let mut platform = Platform::new(800, 600);

    platform.press_key(KeyCode::Escape);
    assert!(platform.key_pressed(KeyCode::Escape));

    platform.advance_frame();
    assert!(!platform.key_pressed(KeyCode::Escape));
    assert!(platform.key_down(KeyCode::Escape));

    platform.release_key(KeyCode::Escape);
    assert!(platform.key_released(KeyCode::Escape));
}

#[test]
fn test_configured_headless_run_succeeds() {
    let mut config = headless_config();
    config.graphics.headless_frames = 4;

    let engine = Engine::new(config, Box::new(TriangleApp::new()));

    assert!(engine.run().is_ok());
}
