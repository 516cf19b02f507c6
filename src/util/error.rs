//! Error types for the wavefront scheduler.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for scheduler, engine bridge and GPU setup.
#[derive(Error, Debug)]
pub enum Error {
    /// No GPU adapter matched the request
    #[error("No GPU adapter available: {0}")]
    NoAdapter(String),

    /// Logical device request was rejected
    #[error("Failed to request logical device: {0}")]
    DeviceRequest(String),

    /// Swap chain cannot present in the expected pixel format
    #[error("Expected surface pixel format {expected}, but adapter offers {actual}")]
    SurfaceFormat { expected: String, actual: String },

    /// Window surface could not be created
    #[error("Surface error: {0}")]
    Surface(String),

    /// Shader source file missing or unreadable
    #[error("Failed to load shader {path}: {source}")]
    ShaderLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Shader module or pipeline rejected by the device
    #[error("Shader {shader} (entry point {entry}) rejected: {message}")]
    ShaderCompile {
        shader: String,
        entry: String,
        message: String,
    },

    /// Settings failed validation
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Engine referenced a buffer id outside its ABI
    #[error("Unknown engine buffer id: {0}")]
    UnknownBuffer(u32),

    /// Engine wrote outside the part of the config blob it owns
    #[error("Config write at {offset}..{end} outside engine range {min}..{max}")]
    ConfigWriteOutOfRange { offset: u64, end: u64, min: u64, max: u64 },

    /// Buffer write offset or size not a multiple of 4 bytes
    #[error("Unaligned buffer write: offset {offset}, size {size}")]
    UnalignedWrite { offset: u64, size: u64 },

    /// Engine wrote past the end of a scene buffer
    #[error("Write of {size} bytes at {offset} overflows {buffer} ({capacity} bytes)")]
    WriteOverflow {
        buffer: &'static str,
        offset: u64,
        size: u64,
        capacity: u64,
    },

    /// Engine wrote before requesting resources
    #[error("GPU resources have not been created yet")]
    ResourcesMissing,

    /// Settings file could not be parsed
    #[error("Settings parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid settings error.
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::InvalidSettings(msg.into())
    }

    /// True for errors raised while bringing up the device; the frame loop must not start.
    pub fn is_fatal_init(&self) -> bool {
        matches!(
            self,
            Self::NoAdapter(_)
                | Self::DeviceRequest(_)
                | Self::SurfaceFormat { .. }
                | Self::Surface(_)
                | Self::ShaderLoad { .. }
                | Self::ShaderCompile { .. }
        )
    }
}

/// Result type alias for wavefront operations.
pub type Result<T> = std::result::Result<T, Error>;
