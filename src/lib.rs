//! # Wavefront
//!
//! Host-side scheduler and frame loop for a real-time wavefront path tracer.
//!
//! Each displayed frame is planned as a device-independent [`CommandList`]:
//! ray generation, a bounded loop of intersect/shade/shadow stages sized by
//! indirect dispatch, an optional SVGF-style temporal denoiser, and a
//! full-screen display draw. The `gpu` module translates plans to wgpu and
//! the `viewer` module drives them from a native window.
//!
//! ## Modules
//!
//! - [`util`] - Errors and tracing setup
//! - [`settings`] - Persisted render settings
//! - [`scheduler`] - Frame planning, bounce loop, denoiser slot rotation
//! - [`engine`] - Scene engine interface and the built-in free camera
//! - `gpu` - Device, buffers, pipelines, command encoding (feature `viewer`)
//! - `viewer` - Window and frame loop (feature `viewer`)
//!
//! ## Example
//!
//! ```
//! use wavefront::prelude::*;
//!
//! let settings = Settings::default();
//! let scheduler = FrameScheduler::new(ScheduleParams::from_settings(&settings).unwrap());
//! let mut state = SchedulerState::from_settings(&settings);
//! let plan = scheduler.plan_frame(&mut state);
//! assert!(audit_staging(&plan.commands).is_ok());
//! ```

pub mod engine;
pub mod scheduler;
pub mod settings;
pub mod util;

#[cfg(feature = "viewer")]
pub mod gpu;

#[cfg(feature = "viewer")]
pub mod viewer;

pub use scheduler::{CommandList, FramePlan, FrameScheduler, ScheduleParams, SchedulerState};
pub use settings::Settings;
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::engine::{channel, CameraPose, Engine, EngineBridge, EngineEvent, FreeCamEngine, SceneBuffer, SceneSizes};
    pub use crate::scheduler::{
        audit_staging, AccumSlot, BindingKey, BufferId, CommandList, FramePlan, FrameScheduler, GpuCommand, Kernel,
        Parity, ScheduleParams, SchedulerState,
    };
    pub use crate::settings::Settings;
    pub use crate::util::{Error, Result};
}
