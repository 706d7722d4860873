//! Marker and face detection glue.
//!
//! The fiducial decoder and the face classifier are external collaborators;
//! this module fixes their interfaces and the types that cross them, plus the
//! saliency detector and the marker-to-track target staging.

pub mod marker_to_track;
pub mod saliency;

use nalgebra::Matrix3;

use crate::camera::frame::Frame;
use crate::config::{DetectionParams, FaceDetectParams};
use crate::error::VisionResult;
use crate::geometry::quad::Quad;
use crate::memory::VisionMemory;

pub use marker_to_track::MarkerToTrack;
pub use saliency::{PanTiltCorrection, SaliencyDetector};

/// A fiducial marker observed in one frame.
///
/// Owned by the detector for the duration of one cycle; copied into a
/// mailbox for cross-thread consumption, so no arena memory outlives the
/// cycle that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedMarker {
    /// Decoded marker type/id.
    pub marker_type: u16,
    /// Image-plane corner quad.
    pub quad: Quad,
    /// Homography computed during extraction, forwarded from the decoder.
    pub homography: Matrix3<f64>,
    /// Capture timestamp of the frame this was seen in (seconds).
    pub timestamp: f64,
    /// False for candidates whose decode did not verify.
    pub is_valid: bool,
}

/// Raw decoder output: one candidate quad with its decoded type and the
/// homography computed during extraction.
#[derive(Debug, Clone)]
pub struct DetectedQuad {
    pub marker_type: u16,
    pub quad: Quad,
    pub homography: Matrix3<f64>,
}

/// The black-box fiducial decoder.
///
/// Implementations allocate all per-frame scratch from the provided arenas
/// and return at most `params.max_markers` candidates.
pub trait MarkerDecoder: Send {
    fn detect_markers(
        &mut self,
        frame: &Frame,
        params: &DetectionParams,
        scratch: &mut VisionMemory,
    ) -> VisionResult<Vec<DetectedQuad>>;
}

/// A detected face.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Detector-assigned track id, negative while tentative.
    pub id: i64,
    pub score: f64,
}

/// The black-box face detector/classifier.
pub trait FaceDetector: Send {
    fn update(&mut self, frame: &Frame, params: &FaceDetectParams) -> VisionResult<()>;
    fn faces(&self) -> Vec<Face>;
}
