//! Engine events flowing through the bridge into scheduler state.

use wavefront::engine::{channel, Engine, EngineEvent, FreeCamEngine, SceneBuffer, SceneSizes};
use wavefront::scheduler::{FrameScheduler, Parity, ScheduleParams, SchedulerState};
use wavefront::Error;

fn apply_all(state: &mut SchedulerState, events: Vec<EngineEvent>) -> Vec<EngineEvent> {
    events.into_iter().filter(|e| !state.apply(e)).collect()
}

fn scheduler() -> FrameScheduler {
    FrameScheduler::new(ScheduleParams {
        width: 64,
        height: 64,
        bounce_limit: 2,
        samples_per_frame: 1,
        filter_iterations: 3,
        loop_scenes: true,
    })
}

#[test]
fn filter_key_enables_denoiser_on_next_frame() {
    let (bridge, events) = channel();
    let mut engine = FreeCamEngine::default();
    engine.init(&bridge).unwrap();

    let sched = scheduler();
    let mut state = SchedulerState::default();
    let leftover = apply_all(&mut state, events.drain());
    assert!(matches!(leftover[0], EngineEvent::CreateResources(_)));

    // Run a couple of frames with the denoiser off
    for _ in 0..3 {
        sched.plan_frame(&mut state);
        engine.update(&bridge, 0.0, true, false);
        sched.end_frame(&mut state, 0);
        apply_all(&mut state, events.drain());
    }
    assert_eq!(state.accum, Parity::One);
    assert!(state.sample_index > 0);

    engine.key_down('f', 0.1);
    engine.update(&bridge, 0.1, true, false);
    apply_all(&mut state, events.drain());

    assert!(state.filter);
    assert!(state.reproj);
    assert_eq!(state.sample_index, 0);
    assert_eq!(state.accum, Parity::Zero);

    let plan = sched.plan_frame(&mut state);
    assert!(plan.denoised);
    assert!(plan.cleared_radiance);
}

#[test]
fn disabling_reprojection_disables_filter() {
    let (bridge, events) = channel();
    let mut state = SchedulerState { filter: true, reproj: true, sample_index: 40, accum: Parity::One, ..Default::default() };

    bridge.toggle_reprojection();
    apply_all(&mut state, events.drain());

    assert!(!state.reproj);
    assert!(!state.filter);
    assert_eq!((state.sample_index, state.accum), (0, Parity::Zero));
}

#[test]
fn toggles_apply_in_send_order() {
    let (bridge, events) = channel();
    let mut state = SchedulerState::default();

    bridge.toggle_filter();
    bridge.toggle_filter();
    bridge.toggle_converge();
    bridge.set_light_triangle_count(17);
    assert!(apply_all(&mut state, events.drain()).is_empty());

    assert!(!state.filter);
    // Reprojection stays on after the filter goes off again
    assert!(state.reproj);
    assert!(state.converge);
    assert_eq!(state.light_triangles, 17);
}

#[test]
fn light_count_reaches_frame_config() {
    let (bridge, events) = channel();
    let sched = scheduler();
    let mut state = SchedulerState::default();
    bridge.set_light_triangle_count(5);
    apply_all(&mut state, events.drain());
    let plan = sched.plan_frame(&mut state);
    assert_eq!(plan.config.light_triangles(), 5);
}

#[test]
fn buffer_ids_and_config_range() {
    let (bridge, events) = channel();
    bridge.write_buffer_id(3, 0, &[0; 48]).unwrap();
    assert!(matches!(bridge.write_buffer_id(9, 0, &[0; 4]), Err(Error::UnknownBuffer(9))));

    let drained = events.drain();
    assert_eq!(drained.len(), 1);
    assert!(matches!(drained[0], EngineEvent::WriteBuffer { buffer: SceneBuffer::Triangles, .. }));

    assert!(SceneBuffer::Config.check_write(48, 16).is_ok());
    assert!(matches!(
        SceneBuffer::Config.check_write(16, 8),
        Err(Error::ConfigWriteOutOfRange { .. })
    ));
    assert!(matches!(SceneBuffer::Camera.check_write(2, 4), Err(Error::UnalignedWrite { .. })));
}

#[test]
fn empty_scene_keeps_bindings_valid() {
    let sizes = SceneSizes::empty_scene();
    for buffer in [
        SceneBuffer::Camera,
        SceneBuffer::Materials,
        SceneBuffer::Instances,
        SceneBuffer::Triangles,
        SceneBuffer::TriangleNormals,
        SceneBuffer::LightTriangles,
        SceneBuffer::Nodes,
    ] {
        assert!(sizes.size_of(buffer) > 0, "{buffer:?}");
        assert_eq!(sizes.size_of(buffer) % 4, 0);
    }
    assert_eq!(sizes.camera, 48);
}

#[test]
fn engine_loop_end_restarts_counters() {
    let (bridge, events) = channel();
    let mut engine = FreeCamEngine::default().with_loop_length(1.0);
    engine.init(&bridge).unwrap();

    let sched = scheduler();
    let mut state = SchedulerState { converge: true, ..Default::default() };
    apply_all(&mut state, events.drain());

    let mut restarted = false;
    for frame in 0..5 {
        sched.plan_frame(&mut state);
        let finished = engine.update(&bridge, frame as f64 * 0.6, state.converge, false);
        sched.end_frame(&mut state, finished);
        apply_all(&mut state, events.drain());
        if finished > 0 {
            assert_eq!((state.frame_index, state.sample_index), (0, 0));
            restarted = true;
        }
    }
    assert!(restarted);
}
