//! Scheduler-visible flags and counters.

use crate::engine::EngineEvent;
use crate::settings::Settings;

use super::commands::Parity;

/// Everything the frame loop mutates between frames.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulerState {
    pub filter: bool,
    pub reproj: bool,
    pub converge: bool,
    pub edit_mode: bool,
    /// `accumIdx`
    pub accum: Parity,
    pub sample_index: u32,
    pub frame_index: u32,
    pub light_triangles: u32,
}

impl SchedulerState {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            filter: settings.filter,
            reproj: settings.reprojection || settings.filter,
            converge: settings.converge,
            edit_mode: settings.edit_mode,
            ..Default::default()
        }
    }

    /// Copy the user-facing toggles back for persisting.
    pub fn write_back(&self, settings: &mut Settings) {
        settings.filter = self.filter;
        settings.reprojection = self.reproj;
        settings.converge = self.converge;
        settings.edit_mode = self.edit_mode;
    }

    pub fn reset_samples(&mut self) {
        self.sample_index = 0;
    }

    fn restart_accumulation(&mut self) {
        self.sample_index = 0;
        self.accum = Parity::Zero;
    }

    pub fn toggle_converge(&mut self) {
        self.converge = !self.converge;
    }

    /// Filtering needs reprojected history, so enabling it enables both.
    pub fn toggle_filter(&mut self) {
        self.filter = !self.filter;
        if self.filter {
            self.reproj = true;
        }
        self.restart_accumulation();
    }

    /// Disabling reprojection also disables filtering.
    pub fn toggle_reprojection(&mut self) {
        self.reproj = !self.reproj;
        if !self.reproj {
            self.filter = false;
        }
        self.restart_accumulation();
    }

    /// Apply a state-changing event. Returns `false` for events the frame
    /// loop handles itself (resource creation, writes, exports).
    pub fn apply(&mut self, event: &EngineEvent) -> bool {
        match event {
            EngineEvent::ResetSamples => self.reset_samples(),
            EngineEvent::SetLightTriangleCount(n) => self.light_triangles = *n,
            EngineEvent::ToggleConverge => self.toggle_converge(),
            EngineEvent::ToggleFilter => self.toggle_filter(),
            EngineEvent::ToggleReprojection => self.toggle_reprojection(),
            EngineEvent::CreateResources(_) | EngineEvent::WriteBuffer { .. } | EngineEvent::SaveBinary(_) => {
                return false
            }
        }
        true
    }
}
