//! Wavefront scheduler.
//!
//! Produces, per displayed frame, a [`FrameConfig`] blob and an ordered
//! [`CommandList`] of clears, copies, dispatches and the display draw. The
//! list is device-independent; the `gpu` module translates it to wgpu.
//!
//! # Modules
//!
//! - [`frame_config`] - 48-byte per-frame blob and indirect grid sizing
//! - [`compaction`] - staging of indirect dispatch arguments
//! - [`bounce`] - per-sample bounce state machine
//! - [`denoise`] - reprojection, variance and filter slot rotation
//! - [`present`] - display buffer selection
//! - [`layout`] - bind group entry order and buffer sizes
//! - [`frame`] - top-level frame plan

pub mod bounce;
pub mod commands;
pub mod compaction;
pub mod denoise;
pub mod frame;
pub mod frame_config;
pub mod layout;
pub mod present;
pub mod state;

pub use bounce::{path_slot, BounceScheduler, BounceStage};
pub use commands::{
    AccumPair, AccumSlot, BindingKey, BufferCopy, BufferId, CommandList, ControlKernel, GpuCommand, Kernel, Parity,
    PathSlot,
};
pub use compaction::{audit_staging, stage_indirect_args, IndirectRegion, StaleCause, StaleDispatch};
pub use denoise::{filter_pair, output_slot, reprojection_pair, variance_pair, TemporalDenoiser};
pub use frame::{FramePlan, FrameScheduler, ScheduleParams};
pub use frame_config::{FrameConfig, GridDims};
pub use layout::{buffer_size, Access, LayoutKind};
pub use present::{select_display, DisplayPipeline, DisplaySelection, Presenter};
pub use state::SchedulerState;
