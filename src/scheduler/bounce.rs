//! Per-sample bounce loop.
//!
//! One sample is a fixed state sequence:
//!
//! ```text
//! stage, GEN, { INTERSECT_j, SHADE_j, CONTROL_UPDATE_j, stage, SHADOW_j, CONTROL_RESET_j } for j in 0..B
//! ```
//!
//! with the final reset replaced by the finalize variant. Path state buffers
//! swap every bounce.

use super::commands::{BindingKey, CommandList, ControlKernel, Kernel, PathSlot};
use super::compaction::{stage_indirect_args, IndirectRegion};
use super::frame_config::GridDims;

/// Input path slot of bounce `j`.
pub fn path_slot(j: u32) -> PathSlot {
    PathSlot::for_bounce(j)
}

/// States of the per-sample sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BounceStage {
    /// Copy grids ahead of the first indirect dispatch of the sample.
    StagePrimary,
    Generate,
    Intersect(u32),
    Shade(u32),
    UpdateGrids(u32),
    /// Copy the grids the update just rewrote.
    StageShadow(u32),
    Shadow(u32),
    /// Reset after the shadow pass; `last` selects the finalize variant.
    Reset { bounce: u32, last: bool },
}

/// Iterator over one sample's states.
#[derive(Clone, Debug)]
pub struct BounceStages {
    bounce_limit: u32,
    next: Option<BounceStage>,
}

impl Iterator for BounceStages {
    type Item = BounceStage;

    fn next(&mut self) -> Option<BounceStage> {
        let current = self.next?;
        let b = self.bounce_limit;
        self.next = match current {
            BounceStage::StagePrimary => Some(BounceStage::Generate),
            BounceStage::Generate if b == 0 => None,
            BounceStage::Generate => Some(BounceStage::Intersect(0)),
            BounceStage::Intersect(j) => Some(BounceStage::Shade(j)),
            BounceStage::Shade(j) => Some(BounceStage::UpdateGrids(j)),
            BounceStage::UpdateGrids(j) => Some(BounceStage::StageShadow(j)),
            BounceStage::StageShadow(j) => Some(BounceStage::Shadow(j)),
            BounceStage::Shadow(j) => Some(BounceStage::Reset { bounce: j, last: j + 1 == b }),
            BounceStage::Reset { last: true, .. } => None,
            BounceStage::Reset { bounce, .. } => Some(BounceStage::Intersect(bounce + 1)),
        };
        Some(current)
    }
}

/// Encodes the wavefront sequence for one sample.
#[derive(Clone, Copy, Debug)]
pub struct BounceScheduler {
    width: u32,
    height: u32,
    bounce_limit: u32,
}

impl BounceScheduler {
    pub fn new(width: u32, height: u32, bounce_limit: u32) -> Self {
        Self { width, height, bounce_limit }
    }

    pub fn stages(&self) -> BounceStages {
        BounceStages {
            bounce_limit: self.bounce_limit,
            next: Some(BounceStage::StagePrimary),
        }
    }

    /// Append one sample's commands.
    pub fn encode_sample(&self, commands: &mut CommandList) {
        let image = GridDims::for_image(self.width, self.height);
        for stage in self.stages() {
            match stage {
                BounceStage::StagePrimary | BounceStage::StageShadow(_) => stage_indirect_args(commands),
                BounceStage::Generate => {
                    commands.dispatch(Kernel::Generate, BindingKey::Generate, [image.x, image.y, image.z])
                }
                BounceStage::Intersect(j) => commands.dispatch_indirect(
                    Kernel::Intersect,
                    BindingKey::Intersect(path_slot(j)),
                    IndirectRegion::Path,
                ),
                BounceStage::Shade(j) => {
                    commands.dispatch_indirect(Kernel::Shade, BindingKey::Shade(path_slot(j)), IndirectRegion::Path)
                }
                BounceStage::UpdateGrids(_) => commands.control(ControlKernel::UpdateGrids),
                BounceStage::Shadow(_) => {
                    commands.dispatch_indirect(Kernel::Shadow, BindingKey::Shadow, IndirectRegion::Shadow)
                }
                BounceStage::Reset { last: false, .. } => commands.control(ControlKernel::ResetShadow),
                BounceStage::Reset { last: true, .. } => commands.control(ControlKernel::FinalizeSample),
            }
        }
    }
}
