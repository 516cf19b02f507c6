//! Utility types shared across the crate.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - [`init_tracing`] - Logging setup

mod error;
mod logging;

pub use error::*;
pub use logging::*;
