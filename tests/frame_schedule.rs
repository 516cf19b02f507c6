//! End-to-end frame planning scenarios, no GPU required.

use wavefront::scheduler::{
    audit_staging, filter_pair, reprojection_pair, AccumSlot, BindingKey, BufferId, ControlKernel, DisplayPipeline,
    FrameScheduler, GpuCommand, Kernel, Parity, ScheduleParams, SchedulerState,
};

fn params(bounce_limit: u32, samples_per_frame: u32) -> ScheduleParams {
    ScheduleParams {
        width: 320,
        height: 180,
        bounce_limit,
        samples_per_frame,
        filter_iterations: 4,
        loop_scenes: true,
    }
}

fn denoising() -> SchedulerState {
    SchedulerState { filter: true, reproj: true, ..Default::default() }
}

fn kernels(commands: &[GpuCommand]) -> Vec<Kernel> {
    commands.iter().filter_map(GpuCommand::kernel).collect()
}

#[test]
fn five_bounces_one_sample_with_filter() {
    let sched = FrameScheduler::new(params(5, 1));
    let mut state = denoising();
    let plan = sched.plan_frame(&mut state);

    let mut expected = vec![Kernel::Generate];
    for j in 0..5 {
        expected.extend([
            Kernel::Intersect,
            Kernel::Shade,
            Kernel::Control(ControlKernel::UpdateGrids),
            Kernel::Shadow,
            Kernel::Control(if j == 4 { ControlKernel::FinalizeSample } else { ControlKernel::ResetShadow }),
        ]);
    }
    expected.extend([Kernel::Reproject, Kernel::Variance]);
    for _ in 0..4 {
        expected.extend([Kernel::Control(ControlKernel::AdvanceFilterStep), Kernel::Filter]);
    }
    assert_eq!(kernels(plan.commands.commands()), expected);

    assert_eq!(plan.commands.draws().count(), 1);
    assert_eq!(plan.display.pipeline, DisplayPipeline::Temporal);
    assert!(audit_staging(&plan.commands).is_ok());

    assert_eq!(state.accum, Parity::Zero);
    sched.end_frame(&mut state, 0);
    assert_eq!(state.accum, Parity::One);
}

#[test]
fn bounce_triples_scale_with_samples() {
    for (b, s) in [(1, 1), (3, 2), (15, 4)] {
        let sched = FrameScheduler::new(params(b, s));
        let plan = sched.plan_frame(&mut denoising());
        let triples = (b * s) as usize;
        assert_eq!(plan.commands.dispatches_of(Kernel::Intersect), triples);
        assert_eq!(plan.commands.dispatches_of(Kernel::Shade), triples);
        assert_eq!(plan.commands.dispatches_of(Kernel::Shadow), triples);
        assert_eq!(plan.commands.dispatches_of(Kernel::Generate), s as usize);
        assert!(audit_staging(&plan.commands).is_ok(), "B={b} S={s}");
    }
}

#[test]
fn path_buffers_alternate_per_bounce() {
    let sched = FrameScheduler::new(params(4, 1));
    let plan = sched.plan_frame(&mut denoising());
    let slots: Vec<usize> = plan
        .commands
        .commands()
        .iter()
        .filter_map(|c| match c.binding() {
            Some(BindingKey::Intersect(slot)) => Some(slot.index()),
            _ => None,
        })
        .collect();
    assert_eq!(slots, vec![0, 1, 0, 1]);
}

#[test]
fn denoiser_off_uses_passthrough() {
    let sched = FrameScheduler::new(params(5, 1));
    let mut state = SchedulerState::default();
    let plan = sched.plan_frame(&mut state);

    for k in [Kernel::Reproject, Kernel::Variance, Kernel::Filter] {
        assert_eq!(plan.commands.dispatches_of(k), 0);
    }
    assert_eq!(plan.commands.dispatches_of(Kernel::Control(ControlKernel::AdvanceFilterStep)), 0);
    assert!(!plan.denoised);
    assert_eq!(plan.display.pipeline, DisplayPipeline::Passthrough);
    assert!(matches!(
        plan.commands.draws().next(),
        Some(GpuCommand::Draw { pipeline: DisplayPipeline::Passthrough, .. })
    ));
}

#[test]
fn accumulation_parity_flips_every_frame() {
    let sched = FrameScheduler::new(params(2, 1));
    let mut state = denoising();
    let mut seen = Vec::new();
    for _ in 0..6 {
        seen.push(state.accum.index());
        let plan = sched.plan_frame(&mut state);
        assert!(audit_staging(&plan.commands).is_ok());
        sched.end_frame(&mut state, 0);
    }
    assert_eq!(seen, vec![0, 1, 0, 1, 0, 1]);
}

#[test]
fn radiance_cleared_only_on_fresh_accumulation() {
    let sched = FrameScheduler::new(params(2, 1));
    let mut state = SchedulerState { converge: true, ..denoising() };

    let first = sched.plan_frame(&mut state);
    assert!(first.commands.clears(BufferId::Radiance));
    sched.end_frame(&mut state, 0);

    let second = sched.plan_frame(&mut state);
    assert!(!second.commands.clears(BufferId::Radiance));
    sched.end_frame(&mut state, 0);

    state.reset_samples();
    let third = sched.plan_frame(&mut state);
    assert!(third.cleared_radiance);
    assert!(matches!(third.commands.commands().first(), Some(GpuCommand::Clear(BufferId::Radiance))));
}

#[test]
fn finished_loop_restarts_counters() {
    let sched = FrameScheduler::new(params(2, 2));
    let mut state = denoising();
    for _ in 0..3 {
        sched.plan_frame(&mut state);
        sched.end_frame(&mut state, 0);
    }
    assert_eq!((state.frame_index, state.sample_index), (3, 6));
    let accum_before = state.accum;

    sched.plan_frame(&mut state);
    sched.end_frame(&mut state, 1);
    assert_eq!((state.frame_index, state.sample_index), (0, 0));
    // Only the regular per-frame flip
    assert_eq!(state.accum, accum_before.flip());

    let plan = sched.plan_frame(&mut state);
    assert!(plan.cleared_radiance);
    assert_eq!(plan.config.frame_index, 0);
}

#[test]
fn history_feeds_next_reprojection() {
    for parity in [Parity::Zero, Parity::One] {
        let written = filter_pair(0, parity).dst();
        assert_eq!(reprojection_pair(parity.flip()).src(), written);
        // Without filtering the reprojection output is the history
        assert_eq!(reprojection_pair(parity.flip()).src(), reprojection_pair(parity).dst());
    }
}

#[test]
fn filter_pairs_never_alias() {
    for iterations in 1..=8 {
        for parity in [Parity::Zero, Parity::One] {
            for i in 0..iterations {
                let p = filter_pair(i, parity);
                assert_ne!(p.src(), p.dst());
                assert!(AccumSlot::ALL.contains(&p.src()));
            }
        }
    }
}
