//! Result codes shared across the vision pipeline.
//!
//! Configuration and resource problems are surfaced as `VisionError`;
//! transient tracking failures are not errors (see `tracking::classifier`).

use thiserror::Error;

/// Errors that abort the current operation and leave prior state intact.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VisionError {
    /// A resolution, ROI, or buffer size is unsupported or out of bounds.
    #[error("invalid size: {0} x {1}")]
    InvalidSize(usize, usize),

    /// A caller-supplied parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// A scratch arena would exceed its fixed capacity.
    #[error("arena out of memory: requested {requested} bytes, {remaining} remaining")]
    OutOfMemory { requested: usize, remaining: usize },

    /// `update` was called before a successful `init`.
    #[error("vision system not initialized")]
    NotInitialized,
}

pub type VisionResult<T> = Result<T, VisionError>;
