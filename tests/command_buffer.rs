//! Command buffer submission against the headless backend

use simple_triangle::gfx::{
    CommandBuffer, GfxError, GraphicsBackend, HeadlessBackend, ShaderHandle, UniformHandle,
    UniformType, UniformValue, VertexAttribute, VertexBufferHandle, Viewport,
};
use simple_triangle::triangle::{
    CLEAR_COLOR, COLOR_UNIFORM, FRAGMENT_SHADER, TRIANGLE_COLOR, VERTEX_COUNT, VERTEX_LAYOUT,
    VERTEX_SHADER, VERTICES,
};

struct Scene {
    backend: HeadlessBackend,
    shader: ShaderHandle,
    color: UniformHandle,
    vbo: VertexBufferHandle,
}

fn scene() -> Scene {
    let mut backend = HeadlessBackend::new(800, 600);
    let shader = backend
        .construct_shader(VERTEX_SHADER, FRAGMENT_SHADER)
        .unwrap();
    let color = backend
        .construct_uniform(shader, COLOR_UNIFORM, UniformType::Vec4)
        .unwrap();
    let vbo = backend
        .construct_vertex_buffer(&VERTEX_LAYOUT, &VERTICES)
        .unwrap();
    Scene {
        backend,
        shader,
        color,
        vbo,
    }
}

fn record_triangle(cb: &mut CommandBuffer, scene: &Scene) {
    cb.set_view_clear(CLEAR_COLOR)
        .set_viewport(800, 600)
        .bind_shader(scene.shader)
        .bind_uniform(scene.color, UniformValue::Vec4(TRIANGLE_COLOR))
        .bind_vertex_buffer(scene.vbo)
        .draw(0, VERTEX_COUNT);
}

#[test]
fn test_recording_has_no_effect_until_submit() {
    let s = scene();
    let mut cb = s.backend.construct_command_buffer();
    record_triangle(&mut cb, &s);

    assert_eq!(cb.len(), 6);
    assert!(s.backend.frames().is_empty());
    assert_eq!(
        s.backend.resources().uniform(s.color).unwrap().value,
        UniformValue::Vec4([0.0; 4])
    );
}

#[test]
fn test_triangle_frame_at_800x600() {
    let mut s = scene();
    let mut cb = s.backend.construct_command_buffer();
    record_triangle(&mut cb, &s);

    let plan = s.backend.submit_command_buffer(&mut cb).unwrap();

    assert!(cb.is_empty());
    assert_eq!(plan.passes.len(), 1);
    assert_eq!(plan.final_clear(), Some(CLEAR_COLOR));

    let draws: Vec<_> = plan.draws().collect();
    assert_eq!(draws.len(), 1);
    let draw = draws[0];
    assert_eq!((draw.start, draw.count), (0, 3));
    assert_eq!(draw.viewport, Viewport::new(800, 600));
    assert_eq!(
        draw.uniforms,
        vec![(s.color, UniformValue::Vec4(TRIANGLE_COLOR))]
    );
    assert_eq!(s.backend.vertex_data(draw.vertex_buffer).unwrap(), VERTICES);
    assert_eq!(s.backend.frames(), &[plan]);
}

#[test]
fn test_submission_executes_once() {
    let mut s = scene();
    let mut cb = s.backend.construct_command_buffer();
    record_triangle(&mut cb, &s);

    s.backend.submit_command_buffer(&mut cb).unwrap();
    let second = s.backend.submit_command_buffer(&mut cb).unwrap();

    assert!(second.is_empty());
    assert_eq!(s.backend.frames().len(), 2);
    assert_eq!(s.backend.frames()[0].draw_count(), 1);
    assert_eq!(s.backend.frames()[1].draw_count(), 0);
}

#[test]
fn test_commands_execute_in_recorded_order() {
    let mut s = scene();
    let mut cb = s.backend.construct_command_buffer();
    cb.set_view_clear([1.0, 0.0, 0.0, 1.0])
        .bind_shader(s.shader)
        .bind_vertex_buffer(s.vbo)
        .bind_uniform(s.color, UniformValue::Vec4([0.0, 1.0, 0.0, 1.0]))
        .draw(0, 1)
        .bind_uniform(s.color, UniformValue::Vec4([0.0, 0.0, 1.0, 1.0]))
        .set_viewport(100, 50)
        .draw(1, 2)
        .set_view_clear([0.0, 0.0, 0.0, 1.0])
        .draw(0, 3);

    let plan = s.backend.submit_command_buffer(&mut cb).unwrap();

    assert_eq!(plan.passes.len(), 2);
    assert_eq!(plan.passes[0].clear, Some([1.0, 0.0, 0.0, 1.0]));
    assert_eq!(plan.final_clear(), Some([0.0, 0.0, 0.0, 1.0]));

    let draws: Vec<_> = plan.draws().collect();
    assert_eq!(draws.len(), 3);
    assert_eq!(draws[0].uniforms[0].1, UniformValue::Vec4([0.0, 1.0, 0.0, 1.0]));
    assert_eq!(draws[0].viewport, Viewport::new(800, 600));
    assert_eq!(draws[1].uniforms[0].1, UniformValue::Vec4([0.0, 0.0, 1.0, 1.0]));
    assert_eq!(draws[1].viewport, Viewport::new(100, 50));
    assert_eq!((draws[2].start, draws[2].count), (0, 3));
    assert_eq!(draws[2].viewport, Viewport::new(100, 50));
}

#[test]
fn test_viewport_is_clamped_to_target() {
    let mut s = scene();
    let mut cb = CommandBuffer::new();
    cb.set_viewport(4000, 100)
        .bind_shader(s.shader)
        .bind_vertex_buffer(s.vbo)
        .draw(0, 3);

    let plan = s.backend.submit_command_buffer(&mut cb).unwrap();

    let draw = plan.draws().next().unwrap();
    assert_eq!(draw.viewport, Viewport::new(800, 100));
}

#[test]
fn test_failed_submission_draws_nothing_and_commits_nothing() {
    let mut s = scene();
    let mut cb = CommandBuffer::new();
    cb.set_view_clear(CLEAR_COLOR)
        .bind_shader(s.shader)
        .bind_uniform(s.color, UniformValue::Vec4(TRIANGLE_COLOR))
        .bind_vertex_buffer(s.vbo)
        .draw(0, 3)
        .draw(2, 5);

    let err = s.backend.submit_command_buffer(&mut cb).unwrap_err();

    assert!(matches!(
        err,
        GfxError::DrawOutOfRange {
            start: 2,
            count: 5,
            available: 3
        }
    ));
    assert!(cb.is_empty());
    assert!(s.backend.frames().is_empty());
    assert_eq!(
        s.backend.resources().uniform(s.color).unwrap().value,
        UniformValue::Vec4([0.0; 4])
    );
}

#[test]
fn test_uniform_value_persists_across_submissions() {
    let mut s = scene();
    let mut cb = CommandBuffer::new();
    cb.bind_shader(s.shader)
        .bind_uniform(s.color, UniformValue::Vec4(TRIANGLE_COLOR))
        .bind_vertex_buffer(s.vbo)
        .draw(0, 3);
    s.backend.submit_command_buffer(&mut cb).unwrap();

    cb.bind_shader(s.shader).bind_vertex_buffer(s.vbo).draw(0, 3);
    let plan = s.backend.submit_command_buffer(&mut cb).unwrap();

    let draw = plan.draws().next().unwrap();
    assert_eq!(draw.uniforms[0].1, UniformValue::Vec4(TRIANGLE_COLOR));
}

#[test]
fn test_destroyed_handles_are_rejected() {
    let mut s = scene();
    s.backend.destroy_vertex_buffer(s.vbo).unwrap();

    let mut cb = CommandBuffer::new();
    cb.bind_shader(s.shader).bind_vertex_buffer(s.vbo).draw(0, 3);
    assert!(matches!(
        s.backend.submit_command_buffer(&mut cb),
        Err(GfxError::UnknownVertexBuffer(_))
    ));
    assert!(matches!(
        s.backend.destroy_vertex_buffer(s.vbo),
        Err(GfxError::UnknownVertexBuffer(_))
    ));

    // A new buffer never reuses the stale handle
    let vbo = s
        .backend
        .construct_vertex_buffer(&VERTEX_LAYOUT, &VERTICES)
        .unwrap();
    assert_ne!(vbo, s.vbo);

    s.backend.destroy_shader(s.shader).unwrap();
    cb.bind_shader(s.shader)
        .bind_uniform(s.color, UniformValue::Vec4(TRIANGLE_COLOR));
    assert!(matches!(
        s.backend.submit_command_buffer(&mut cb),
        Err(GfxError::UnknownShader(_))
    ));
    assert!(matches!(
        s.backend.resources().uniform(s.color),
        Err(GfxError::UnknownUniform(_))
    ));
}

#[test]
fn test_construction_errors() {
    let mut backend = HeadlessBackend::new(800, 600);

    assert!(matches!(
        backend.construct_shader("", FRAGMENT_SHADER),
        Err(GfxError::ShaderCompile { .. })
    ));
    assert!(matches!(
        backend.construct_vertex_buffer(&[], &VERTICES),
        Err(GfxError::EmptyVertexLayout)
    ));
    assert!(matches!(
        backend.construct_vertex_buffer(&[VertexAttribute::Float2], &VERTICES),
        Err(GfxError::MisalignedVertexData { len: 9, stride: 2 })
    ));

    let shader = backend
        .construct_shader(VERTEX_SHADER, FRAGMENT_SHADER)
        .unwrap();
    backend
        .construct_uniform(shader, COLOR_UNIFORM, UniformType::Vec4)
        .unwrap();
    assert!(matches!(
        backend.construct_uniform(shader, COLOR_UNIFORM, UniformType::Vec4),
        Err(GfxError::DuplicateUniform(_))
    ));
    assert!(matches!(
        backend.construct_uniform(shader, "", UniformType::Float),
        Err(GfxError::EmptyUniformName)
    ));
}
