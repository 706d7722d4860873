//! Tracking pipeline: mode state, the template tracker, its kinematic
//! predictor, the success classifier, and docking pose computation.

pub mod classifier;
pub mod docking;
pub mod mode;
pub mod predictor;
pub mod template;

pub use classifier::{classify_track, TrackFailure};
pub use docking::{observed_marker_pose, DockingPose};
pub use mode::{PassiveModes, VisionMode};
pub use predictor::{predict_camera_motion, PredictedMotion, RobotState};
pub use template::{TemplateTracker, TrackOutcome, TrackerPose};
