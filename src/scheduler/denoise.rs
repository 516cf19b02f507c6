//! Temporal denoiser driver: reprojection, variance estimation and the
//! à-trous filter iterations, with accumulation slot rotation.
//!
//! With `prev = accumIdx`, `next = 1 - accumIdx` and `scratch = 2`:
//!
//! | step | read | write |
//! |---|---|---|
//! | reprojection | prev | next |
//! | variance | next | prev |
//! | filter 0 | prev | next |
//! | filter 1 | next | scratch |
//! | filter odd i ≥ 3 | prev | scratch |
//! | filter even i ≥ 2 | scratch | prev |
//!
//! Filter iteration 0 lands in `next`, which becomes `prev` after the parity
//! flip, so next frame reprojects from the first filtered result.

use super::commands::{AccumPair, AccumSlot, BindingKey, BufferId, CommandList, ControlKernel, Kernel, Parity};
use super::frame_config::GridDims;

/// Bytes of the camera block remembered for reprojection.
pub const CAMERA_BYTES: u64 = 48;
/// Bytes per pixel of the position/normal attribute buffer.
pub const ATTRIBUTE_BYTES_PER_PIXEL: u64 = 32;

fn prev(parity: Parity) -> AccumSlot {
    parity.slot()
}

fn next(parity: Parity) -> AccumSlot {
    parity.flip().slot()
}

/// Temporal accumulation step.
pub fn reprojection_pair(parity: Parity) -> AccumPair {
    AccumPair::pair(prev(parity), next(parity))
}

/// Variance estimation step, reading what reprojection wrote.
pub fn variance_pair(parity: Parity) -> AccumPair {
    AccumPair::pair(next(parity), prev(parity))
}

/// Slots read and written by filter iteration `iteration`.
pub fn filter_pair(iteration: u32, parity: Parity) -> AccumPair {
    match iteration {
        0 => AccumPair::pair(prev(parity), next(parity)),
        1 => AccumPair::pair(next(parity), AccumSlot::Slot2),
        i if i % 2 == 1 => AccumPair::pair(prev(parity), AccumSlot::Slot2),
        _ => AccumPair::pair(AccumSlot::Slot2, prev(parity)),
    }
}

/// Slot holding the displayable result, or `None` when the denoiser is off
/// and the raw radiance is shown.
pub fn output_slot(filter: bool, reproj: bool, parity: Parity, iterations: u32) -> Option<AccumSlot> {
    match (filter, reproj) {
        (false, false) => None,
        (false, true) => Some(next(parity)),
        (true, _) => match iterations {
            0 => Some(prev(parity)),
            k => Some(filter_pair(k - 1, parity).dst()),
        },
    }
}

/// Encodes the denoiser for one displayed frame.
#[derive(Clone, Copy, Debug)]
pub struct TemporalDenoiser {
    grid: GridDims,
    pixels: u64,
    iterations: u32,
}

impl TemporalDenoiser {
    pub fn new(width: u32, height: u32, iterations: u32) -> Self {
        Self {
            grid: GridDims::for_image(width, height),
            pixels: width as u64 * height as u64,
            iterations,
        }
    }

    fn dispatch(&self, commands: &mut CommandList, kernel: Kernel, pair: AccumPair) {
        commands.dispatch(kernel, BindingKey::Denoise(pair), [self.grid.x, self.grid.y, self.grid.z]);
    }

    /// Append denoiser commands. Returns whether anything was recorded.
    pub fn encode(&self, filter: bool, reproj: bool, parity: Parity, commands: &mut CommandList) -> bool {
        if !(filter || reproj) {
            return false;
        }

        self.dispatch(commands, Kernel::Reproject, reprojection_pair(parity));

        if filter {
            self.dispatch(commands, Kernel::Variance, variance_pair(parity));
            for i in 0..self.iterations {
                commands.control(ControlKernel::AdvanceFilterStep);
                self.dispatch(commands, Kernel::Filter, filter_pair(i, parity));
            }
        }

        // History for next frame's reprojection
        commands.copy(BufferId::Camera, 0, BufferId::LastCamera, 0, CAMERA_BYTES);
        commands.copy(
            BufferId::Attributes,
            0,
            BufferId::LastAttributes,
            0,
            self.pixels * ATTRIBUTE_BYTES_PER_PIXEL,
        );
        true
    }
}
