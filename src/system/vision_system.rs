//! The per-cycle vision pipeline: mode bookkeeping, detection, tracking,
//! faces, saliency, snapshots, and exposure, in a fixed order.
//!
//! Everything here runs on the vision thread. The only cross-thread surfaces
//! are the result mailboxes and the staged inputs (target, snapshot request,
//! parameter setters), all of which take effect at a well-defined point of
//! the next cycle.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::camera::calibration::CameraCalibration;
use crate::camera::exposure::AutoExposure;
use crate::camera::frame::Frame;
use crate::camera::snapshot::{SnapshotRequest, SnapshotSlot};
use crate::camera::vignette::correct_vignetting;
use crate::config::{
    DetectionParams, ExposureParams, FaceDetectParams, TrackerParams, VignettingParams,
};
use crate::detection::{
    FaceDetector, MarkerDecoder, MarkerToTrack, ObservedMarker, SaliencyDetector,
};
use crate::error::{VisionError, VisionResult};
use crate::memory::VisionMemory;
use crate::system::mailboxes::VisionMailboxes;
use crate::tracking::classifier::classify_track;
use crate::tracking::docking::docking_pose_from_tracker;
use crate::tracking::mode::VisionMode;
use crate::tracking::predictor::{predict_camera_motion, RobotState};
use crate::tracking::template::TemplateTracker;

/// Consecutive failed tracker updates before the target is re-armed and the
/// system falls back to marker search.
pub const MAX_TRACKING_FAILURES: u32 = 1;

pub struct VisionSystem {
    calib: Option<CameraCalibration>,
    mode: VisionMode,
    memory: VisionMemory,
    mailboxes: Arc<VisionMailboxes>,
    decoder: Box<dyn MarkerDecoder>,
    face_detector: Box<dyn FaceDetector>,
    saliency: SaliencyDetector,
    exposure: AutoExposure,
    snapshot: SnapshotSlot,
    detection_params: DetectionParams,
    tracker_params: TrackerParams,
    face_params: FaceDetectParams,
    vignetting: VignettingParams,
    marker_to_track: MarkerToTrack,
    staged_target: Option<MarkerToTrack>,
    num_track_failures: u32,
    tracker_just_initialized: bool,
    prev_state: Option<RobotState>,
    cur_state: Option<RobotState>,
    frame_number: u64,
}

impl VisionSystem {
    pub fn new(
        decoder: Box<dyn MarkerDecoder>,
        face_detector: Box<dyn FaceDetector>,
        mailboxes: Arc<VisionMailboxes>,
    ) -> Self {
        Self {
            calib: None,
            mode: VisionMode::Idle,
            memory: VisionMemory::new(),
            mailboxes,
            decoder,
            face_detector,
            saliency: SaliencyDetector::new(),
            exposure: AutoExposure::new(ExposureParams::default()),
            snapshot: SnapshotSlot::new(),
            detection_params: DetectionParams::default(),
            tracker_params: TrackerParams::default(),
            face_params: FaceDetectParams::default(),
            vignetting: VignettingParams::default(),
            marker_to_track: MarkerToTrack::cleared(),
            staged_target: None,
            num_track_failures: 0,
            tracker_just_initialized: false,
            prev_state: None,
            cur_state: None,
            frame_number: 0,
        }
    }

    /// (Re-)initializes for a calibration. Re-init with the identical
    /// calibration is a no-op; a different one resets all derived state and
    /// restarts in marker-detection mode.
    pub fn init(&mut self, calib: CameraCalibration) -> VisionResult<()> {
        calib.validate()?;
        if self.calib.as_ref() == Some(&calib) {
            debug!("init with identical calibration, nothing to do");
            return Ok(());
        }
        info!(
            nrows = calib.nrows,
            ncols = calib.ncols,
            fx = calib.fx,
            fy = calib.fy,
            fov_h_deg = calib.horizontal_fov().to_degrees(),
            fov_v_deg = calib.vertical_fov().to_degrees(),
            "vision system init"
        );
        self.calib = Some(calib);
        self.mode = VisionMode::Idle;
        self.mode.set_flag(|f| f.detecting_markers = true);
        self.memory.reset_all();
        self.marker_to_track.clear();
        self.staged_target = None;
        self.num_track_failures = 0;
        self.tracker_just_initialized = false;
        self.prev_state = None;
        self.cur_state = None;
        self.frame_number = 0;
        self.saliency.reset();
        self.snapshot = SnapshotSlot::new();
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.calib.is_some()
    }

    pub fn calibration(&self) -> Option<&CameraCalibration> {
        self.calib.as_ref()
    }

    pub fn mailboxes(&self) -> Arc<VisionMailboxes> {
        self.mailboxes.clone()
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn is_tracking(&self) -> bool {
        self.mode.is_tracking()
    }

    pub fn mode(&self) -> &VisionMode {
        &self.mode
    }

    pub fn marker_target(&self) -> &MarkerToTrack {
        &self.marker_to_track
    }

    pub fn num_track_failures(&self) -> u32 {
        self.num_track_failures
    }

    pub fn exposure_s(&self) -> f64 {
        self.exposure.exposure_s()
    }

    pub fn enable_marker_detection(&mut self, on: bool) {
        self.mode.set_flag(|f| f.detecting_markers = on);
    }

    pub fn enable_face_detection(&mut self, on: bool) {
        self.mode.set_flag(|f| f.detecting_faces = on);
    }

    pub fn enable_saliency(&mut self, on: bool) {
        if !on {
            self.saliency.reset();
        }
        self.mode.set_flag(|f| f.looking_for_saliency = on);
    }

    /// Drops every mode, including any live tracker.
    pub fn set_idle(&mut self) {
        self.mode.set_idle();
    }

    /// Stages a new tracking target; it is validated and applied at the top
    /// of the next cycle. Staging a cleared target stops tracking.
    pub fn set_marker_to_track(&mut self, target: MarkerToTrack) {
        debug!(marker_type = ?target.marker_type, "tracking target staged");
        self.staged_target = Some(target);
    }

    /// Stops tracking and clears the target, from the next cycle on.
    pub fn stop_tracking(&mut self) {
        self.staged_target = Some(MarkerToTrack::cleared());
    }

    /// Stages a snapshot request for the next cycle. Returns false when a
    /// request is already pending.
    pub fn take_snapshot(&mut self, request: SnapshotRequest) -> bool {
        let accepted = self.snapshot.request(request);
        if accepted {
            self.mode.set_flag(|f| f.taking_snapshot = true);
        }
        accepted
    }

    pub fn set_detection_params(&mut self, params: DetectionParams) {
        self.detection_params = params;
    }

    pub fn set_tracker_params(&mut self, params: TrackerParams) {
        self.tracker_params = params;
    }

    pub fn set_face_detect_params(&mut self, params: FaceDetectParams) {
        self.face_params = params;
    }

    pub fn set_exposure_params(&mut self, params: ExposureParams) {
        self.exposure = AutoExposure::new(params);
    }

    pub fn set_vignetting_params(&mut self, params: VignettingParams) {
        self.vignetting = params;
    }

    /// Runs one full vision cycle over `frame`.
    ///
    /// The stage order is fixed: staged target swap-in, vignetting
    /// correction, snapshot fulfillment, marker detection (which may start
    /// tracking), the tracker update, face detection, saliency, and finally
    /// auto-exposure. Auto-exposure is skipped on cycles where the tracker
    /// ran, so a lighting step never lands inside a refinement.
    pub fn update(&mut self, robot: RobotState, frame: &mut Frame) -> VisionResult<()> {
        let calib = match &self.calib {
            Some(c) => c.clone(),
            None => return Err(VisionError::NotInitialized),
        };
        if frame.nrows() != calib.nrows || frame.ncols() != calib.ncols {
            return Err(VisionError::InvalidSize(frame.nrows(), frame.ncols()));
        }

        self.frame_number += 1;
        self.prev_state = self.cur_state.replace(robot);
        self.tracker_just_initialized = false;
        self.memory.reset_all();

        self.apply_staged_target()?;

        correct_vignetting(frame, &self.vignetting);

        if self.mode.active_flags().taking_snapshot {
            let result = self.snapshot.fulfill(frame);
            self.mode.set_flag(|f| f.taking_snapshot = false);
            result?;
        }

        if self.mode.active_flags().detecting_markers {
            self.detect_markers(frame, &calib)?;
        }

        let tracker_ran = self.update_tracking(frame);

        if self.mode.active_flags().detecting_faces {
            self.face_detector.update(frame, &self.face_params)?;
            self.mailboxes.faces.put(self.face_detector.faces());
        }

        if self.mode.active_flags().looking_for_saliency {
            if let Some(correction) = self.saliency.update(frame, &calib) {
                self.mailboxes.pan_tilt.put(correction);
            }
        }

        if !tracker_ran {
            self.exposure.update(frame);
        }
        Ok(())
    }

    /// Swaps the staged target into the active one, once per cycle.
    ///
    /// Validation happens here, at swap-in: a rejected target leaves the
    /// active one untouched. A specified target restarts marker search; a
    /// cleared one stops tracking and leaves the modes as they are.
    fn apply_staged_target(&mut self) -> VisionResult<()> {
        let staged = match self.staged_target.take() {
            Some(t) => t,
            None => return Ok(()),
        };
        if let Err(err) = staged.validate() {
            warn!(%err, "rejecting staged tracking target");
            return Err(err);
        }

        if staged.is_specified() {
            info!(marker_type = ?staged.marker_type, width_mm = staged.width_mm, "new tracking target");
            self.marker_to_track = staged;
            self.num_track_failures = 0;
            self.mode.stop_tracking();
            self.mode.set_flag(|f| f.detecting_markers = true);
        } else {
            info!("tracking target cleared");
            self.marker_to_track.clear();
            self.num_track_failures = 0;
            self.mode.stop_tracking();
        }
        Ok(())
    }

    /// Runs the decoder, publishes the per-cycle marker list, and starts
    /// tracking when the wanted marker shows up.
    fn detect_markers(&mut self, frame: &Frame, calib: &CameraCalibration) -> VisionResult<()> {
        let detected =
            self.decoder
                .detect_markers(frame, &self.detection_params, &mut self.memory)?;

        let markers: Vec<ObservedMarker> = detected
            .into_iter()
            .take(self.detection_params.max_markers)
            .map(|d| ObservedMarker {
                marker_type: d.marker_type,
                quad: d.quad,
                homography: d.homography,
                timestamp: frame.timestamp,
                is_valid: true,
            })
            .collect();
        debug!(count = markers.len(), "marker detection");

        if !self.mode.is_tracking() && self.marker_to_track.is_specified() {
            if let Some(wanted) = markers.iter().find(|m| self.marker_to_track.matches(m)) {
                match TemplateTracker::init(
                    frame,
                    &wanted.quad,
                    self.marker_to_track.width_mm,
                    calib,
                    &self.tracker_params,
                ) {
                    Ok(tracker) => {
                        info!(marker_type = wanted.marker_type, "tracking started");
                        self.mode.enter_tracking(tracker);
                        self.tracker_just_initialized = true;
                        self.num_track_failures = 0;
                    }
                    Err(err) => {
                        warn!(%err, "template init failed, continuing search");
                    }
                }
            }
        }

        // The whole list, even when empty: "looked and found nothing" is a
        // result too.
        self.mailboxes.markers.put(markers);
        Ok(())
    }

    /// Predicts, refines, classifies, and publishes one tracker step.
    /// Returns whether a tracker existed this cycle.
    fn update_tracking(&mut self, frame: &Frame) -> bool {
        let just_initialized = self.tracker_just_initialized;
        let check_angle_x = self.marker_to_track.check_angle_x;

        let prediction = match (&self.prev_state, &self.cur_state) {
            (Some(prev), Some(cur)) if !just_initialized => {
                Some(predict_camera_motion(prev, cur))
            }
            _ => None,
        };

        let (verdict, pose, quad) = {
            let tracker = match &mut self.mode {
                VisionMode::Tracking { tracker, .. } => tracker,
                _ => return false,
            };
            if let Some(motion) = &prediction {
                tracker.apply_rigid(&motion.rotation, &motion.translation);
            }
            let before = tracker.pose();
            let verdict = if just_initialized {
                // The pose came straight out of P3P this cycle; there is
                // nothing to compare an update against yet.
                Ok(())
            } else {
                let outcome = tracker.update(frame, &self.tracker_params);
                classify_track(
                    &before,
                    &tracker.pose(),
                    &outcome,
                    check_angle_x,
                    &self.tracker_params,
                )
            };
            (verdict, tracker.pose(), tracker.projected_quad())
        };

        match verdict {
            Ok(()) => {
                if let Some(quad) = quad {
                    self.mailboxes.tracker_quad.put(quad);
                }
                let head_angle = self.cur_state.as_ref().map_or(0.0, |s| s.head_angle_rad);
                self.mailboxes.docking_pose.put(docking_pose_from_tracker(
                    &pose,
                    &self.marker_to_track,
                    head_angle,
                    frame.timestamp,
                ));
                self.num_track_failures = 0;
            }
            Err(failure) => {
                self.num_track_failures += 1;
                info!(
                    reason = failure.reason(),
                    failures = self.num_track_failures,
                    "tracking update failed"
                );
                if self.num_track_failures >= MAX_TRACKING_FAILURES {
                    info!("too many tracking failures, resuming marker search");
                    self.mode.stop_tracking();
                    self.mode.set_flag(|f| f.detecting_markers = true);
                    self.num_track_failures = 0;
                }
            }
        }
        true
    }
}
