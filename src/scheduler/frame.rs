//! Per-frame orchestration.
//!
//! A displayed frame is: config write, radiance clear on a fresh
//! accumulation, `samples_per_frame` bounce sequences, the denoiser, the
//! display draw. After submission the caller runs the engine update and then
//! [`FrameScheduler::end_frame`].

use crate::settings::Settings;
use crate::util::Result;

use super::bounce::BounceScheduler;
use super::commands::{BufferId, CommandList};
use super::denoise::TemporalDenoiser;
use super::frame_config::FrameConfig;
use super::present::{select_display, DisplaySelection, Presenter};
use super::state::SchedulerState;

/// Fixed parameters of a rendering session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleParams {
    pub width: u32,
    pub height: u32,
    pub bounce_limit: u32,
    pub samples_per_frame: u32,
    pub filter_iterations: u32,
    pub loop_scenes: bool,
}

impl ScheduleParams {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            width: settings.width,
            height: settings.height(),
            bounce_limit: settings.max_bounces,
            samples_per_frame: settings.samples_per_frame,
            filter_iterations: settings.filter_iterations,
            loop_scenes: settings.loop_scenes,
        })
    }
}

/// Everything needed to submit one displayed frame.
#[derive(Clone, Debug)]
pub struct FramePlan {
    /// Written to offset 0 of the config buffer before the commands run.
    pub config: FrameConfig,
    pub commands: CommandList,
    pub cleared_radiance: bool,
    pub denoised: bool,
    pub display: DisplaySelection,
}

/// Builds frame plans and advances counters.
#[derive(Clone, Debug)]
pub struct FrameScheduler {
    params: ScheduleParams,
    bounce: BounceScheduler,
    denoiser: TemporalDenoiser,
    presenter: Presenter,
}

impl FrameScheduler {
    pub fn new(params: ScheduleParams) -> Self {
        Self {
            params,
            bounce: BounceScheduler::new(params.width, params.height, params.bounce_limit),
            denoiser: TemporalDenoiser::new(params.width, params.height, params.filter_iterations),
            presenter: Presenter,
        }
    }

    pub fn params(&self) -> &ScheduleParams {
        &self.params
    }

    /// Record the frame. Advances `sample_index` once per sample, matching
    /// the finalize kernel on the device.
    pub fn plan_frame(&self, state: &mut SchedulerState) -> FramePlan {
        let p = &self.params;
        let config = FrameConfig::begin_frame(p.width, p.height, p.bounce_limit, state.frame_index, state.sample_index)
            .with_light_triangles(state.light_triangles);

        let mut commands = CommandList::new();

        let cleared_radiance = state.sample_index == 0;
        if cleared_radiance {
            commands.clear_buffer(BufferId::Radiance);
        }

        for _ in 0..p.samples_per_frame {
            self.bounce.encode_sample(&mut commands);
            state.sample_index = state.sample_index.wrapping_add(1);
        }

        let denoised = self.denoiser.encode(state.filter, state.reproj, state.accum, &mut commands);

        let display = select_display(state.filter, state.reproj, state.accum, p.filter_iterations);
        self.presenter.encode(display, &mut commands);

        tracing::debug!(
            frame = state.frame_index,
            samples = state.sample_index,
            accum = state.accum.index(),
            cleared_radiance,
            denoised,
            commands = commands.len(),
            "planned frame"
        );

        FramePlan { config, commands, cleared_radiance, denoised, display }
    }

    /// Flip parity and advance or reset counters after the engine update.
    pub fn end_frame(&self, state: &mut SchedulerState, finished: i32) {
        state.accum = state.accum.flip();
        if finished > 0 && self.params.loop_scenes {
            tracing::debug!(frame = state.frame_index, "scene loop finished, restarting counters");
            state.frame_index = 0;
            state.sample_index = 0;
        } else {
            state.frame_index = state.frame_index.wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::commands::{Kernel, Parity};

    fn params() -> ScheduleParams {
        ScheduleParams {
            width: 64,
            height: 36,
            bounce_limit: 3,
            samples_per_frame: 2,
            filter_iterations: 4,
            loop_scenes: true,
        }
    }

    #[test]
    fn test_plan_advances_samples() {
        let sched = FrameScheduler::new(params());
        let mut state = SchedulerState::default();
        let plan = sched.plan_frame(&mut state);
        assert!(plan.cleared_radiance);
        assert_eq!(plan.config.sample_index, 0);
        assert_eq!(state.sample_index, 2);
        assert_eq!(plan.commands.dispatches_of(Kernel::Intersect), 6);

        let plan = sched.plan_frame(&mut state);
        assert!(!plan.cleared_radiance);
        assert_eq!(plan.config.sample_index, 2);
    }

    #[test]
    fn test_end_frame() {
        let sched = FrameScheduler::new(params());
        let mut state = SchedulerState { sample_index: 5, frame_index: 9, ..Default::default() };
        sched.end_frame(&mut state, 0);
        assert_eq!(state.accum, Parity::One);
        assert_eq!(state.frame_index, 10);

        sched.end_frame(&mut state, 1);
        assert_eq!(state.accum, Parity::Zero);
        assert_eq!((state.frame_index, state.sample_index), (0, 0));
    }

    #[test]
    fn test_finished_without_loop_mode() {
        let sched = FrameScheduler::new(ScheduleParams { loop_scenes: false, ..params() });
        let mut state = SchedulerState { sample_index: 5, frame_index: 9, ..Default::default() };
        sched.end_frame(&mut state, 1);
        assert_eq!((state.frame_index, state.sample_index), (10, 5));
    }
}
