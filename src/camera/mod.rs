//! Camera-side concerns: intrinsics, frames, and the imaging pipeline
//! (auto-exposure, vignetting correction, snapshot capture).

pub mod calibration;
pub mod exposure;
pub mod frame;
pub mod snapshot;
pub mod vignette;

pub use calibration::{CameraCalibration, SUPPORTED_RESOLUTIONS};
pub use exposure::AutoExposure;
pub use frame::Frame;
pub use snapshot::{Roi, SnapshotRequest, SnapshotSlot};
pub use vignette::correct_vignetting;
