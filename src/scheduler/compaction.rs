//! Stream compaction bridge.
//!
//! Control kernels write workgroup counts into the config buffer. Indirect
//! dispatches read them from a separate grid buffer, so every count a control
//! kernel changes has to be staged by a copy before the next dispatch that
//! consumes it.

use std::fmt;

use thiserror::Error;

use super::commands::{BufferId, CommandList, ControlKernel, GpuCommand, Kernel};
use super::frame_config::{GRID_BYTES, GRID_OFFSET};

/// Region of the grid buffer an indirect dispatch reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndirectRegion {
    /// Surviving paths, offset 0.
    Path,
    /// Queued shadow rays, offset 16.
    Shadow,
}

impl IndirectRegion {
    pub fn offset(self) -> u64 {
        match self {
            Self::Path => 0,
            Self::Shadow => 16,
        }
    }
}

/// Record the copy of both grids from the config buffer into the grid buffer.
pub fn stage_indirect_args(commands: &mut CommandList) {
    commands.copy(BufferId::Config, GRID_OFFSET, BufferId::Grid, 0, GRID_BYTES);
}

/// True if `cmd` is a staging copy that covers `region`.
fn stages(cmd: &GpuCommand, region: IndirectRegion) -> bool {
    match cmd {
        GpuCommand::Copy(c) => {
            c.src == BufferId::Config
                && c.dst == BufferId::Grid
                && c.dst_offset <= region.offset()
                && c.dst_offset + c.size >= region.offset() + 16
                && c.src_offset + region.offset() - c.dst_offset == GRID_OFFSET + region.offset()
        }
        _ => false,
    }
}

/// Why an indirect dispatch would read stale counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StaleCause {
    /// No staging copy precedes the dispatch.
    NeverStaged,
    /// A control kernel rewrote the region after the last staging copy.
    Mutated(ControlKernel),
}

impl fmt::Display for StaleCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeverStaged => f.write_str("was never staged"),
            Self::Mutated(by) => write!(f, "was rewritten by {} since last stage", Kernel::Control(*by).name()),
        }
    }
}

/// Ordering violation found by [`audit_staging`].
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[error("command {index}: {} reads {region:?} grid that {cause}", .kernel.name())]
pub struct StaleDispatch {
    /// Position of the offending command in the list.
    pub index: usize,
    pub kernel: Kernel,
    pub region: IndirectRegion,
    pub cause: StaleCause,
}

/// Check that no indirect dispatch reads a grid region a control kernel
/// changed after the most recent staging copy.
pub fn audit_staging(commands: &CommandList) -> Result<(), StaleDispatch> {
    for (index, cmd) in commands.commands().iter().enumerate() {
        let GpuCommand::DispatchIndirect { kernel, region, .. } = *cmd else {
            continue;
        };
        let before = &commands.commands()[..index];
        let mut cause = Some(StaleCause::NeverStaged);
        for prior in before.iter().rev() {
            if stages(prior, region) {
                cause = None;
                break;
            }
            if let Some(Kernel::Control(ck)) = prior.kernel() {
                if ck.mutates(region) {
                    cause = Some(StaleCause::Mutated(ck));
                    break;
                }
            }
        }
        if let Some(cause) = cause {
            return Err(StaleDispatch { index, kernel, region, cause });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::commands::{BindingKey, PathSlot};

    #[test]
    fn test_offsets() {
        assert_eq!(IndirectRegion::Path.offset(), 0);
        assert_eq!(IndirectRegion::Shadow.offset(), 16);
    }

    #[test]
    fn test_stage_copies_both_grids() {
        let mut list = CommandList::new();
        stage_indirect_args(&mut list);
        let copy = list.copies().next().copied().unwrap();
        assert_eq!(copy.src, BufferId::Config);
        assert_eq!(copy.src_offset, 16);
        assert_eq!(copy.dst, BufferId::Grid);
        assert_eq!(copy.dst_offset, 0);
        assert_eq!(copy.size, 32);
    }

    #[test]
    fn test_audit_unstaged() {
        let mut list = CommandList::new();
        list.dispatch_indirect(Kernel::Intersect, BindingKey::Intersect(PathSlot::Zero), IndirectRegion::Path);
        let err = audit_staging(&list).unwrap_err();
        assert_eq!(err.cause, StaleCause::NeverStaged);
        assert_eq!(err.index, 0);
    }

    #[test]
    fn test_audit_detects_mutation() {
        let mut list = CommandList::new();
        stage_indirect_args(&mut list);
        list.dispatch_indirect(Kernel::Shade, BindingKey::Shade(PathSlot::Zero), IndirectRegion::Path);
        list.control(ControlKernel::UpdateGrids);
        list.dispatch_indirect(Kernel::Shadow, BindingKey::Shadow, IndirectRegion::Shadow);

        let err = audit_staging(&list).unwrap_err();
        assert_eq!(err.index, 3);
        assert_eq!(err.cause, StaleCause::Mutated(ControlKernel::UpdateGrids));
        assert!(err.to_string().contains("rewritten by control/update"));
    }

    #[test]
    fn test_stale_dispatch_is_an_error() {
        let mut list = CommandList::new();
        list.dispatch_indirect(Kernel::Shadow, BindingKey::Shadow, IndirectRegion::Shadow);
        let err: anyhow::Error = audit_staging(&list).unwrap_err().into();
        assert_eq!(err.to_string(), "command 0: shadow reads Shadow grid that was never staged");
        assert!(err.downcast_ref::<StaleDispatch>().is_some());
    }

    #[test]
    fn test_audit_ignores_unrelated_mutation() {
        let mut list = CommandList::new();
        stage_indirect_args(&mut list);
        list.control(ControlKernel::ResetShadow);
        list.dispatch_indirect(Kernel::Intersect, BindingKey::Intersect(PathSlot::One), IndirectRegion::Path);
        assert!(audit_staging(&list).is_ok());
    }
}
