//! Multi-criterion success classification for one tracker update.
//!
//! The checks run in a fixed order and the first failure wins; each failure
//! carries a log-worthy reason. The solver's own `converged` flag is
//! reported alongside but does not participate: a converged fit can still be
//! rejected here, and a non-converged fit can still pass. That asymmetry is
//! long-standing product behavior and is kept.

use std::f64::consts::PI;

use crate::config::TrackerParams;
use crate::tracking::template::{TrackOutcome, TrackerPose};

/// Closest usable tracking distance (mm).
pub const MIN_TRACKER_DISTANCE: f64 = 20.0;
/// Farthest usable tracking distance (mm).
pub const MAX_TRACKER_DISTANCE: f64 = 500.0;
/// Largest acceptable marker tilt on any axis during docking (rad).
pub const MAX_BLOCK_DOCKING_ANGLE: f64 = 30.0 * PI / 180.0;
/// Largest acceptable bearing off the camera axis during docking (rad).
pub const MAX_DOCKING_FOV_ANGLE: f64 = 25.0 * PI / 180.0;

/// Why a tracker update was classified as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackFailure {
    /// An angle changed more than the per-update tolerance.
    AngleJump,
    /// Final distance below `MIN_TRACKER_DISTANCE`.
    TooClose,
    /// Final distance above `MAX_TRACKER_DISTANCE`.
    TooFar,
    /// Translation changed more than the per-update tolerance.
    TranslationJump,
    /// |angleX| above `MAX_BLOCK_DOCKING_ANGLE` (only when enabled).
    XAngleTooLarge,
    /// |angleY| above `MAX_BLOCK_DOCKING_ANGLE`.
    YAngleTooLarge,
    /// |angleZ| above `MAX_BLOCK_DOCKING_ANGLE`.
    ZAngleTooLarge,
    /// Marker bearing outside the docking field of view.
    OutsideDockingFov,
    /// Too few in-bounds pixels passed intensity verification.
    AppearanceMismatch,
}

impl TrackFailure {
    pub fn reason(&self) -> &'static str {
        match self {
            TrackFailure::AngleJump => "angle(s) changed too much",
            TrackFailure::TooClose => "final distance too close",
            TrackFailure::TooFar => "final distance too far away",
            TrackFailure::TranslationJump => "position changed too much",
            TrackFailure::XAngleTooLarge => "target X angle too large",
            TrackFailure::YAngleTooLarge => "target Y angle too large",
            TrackFailure::ZAngleTooLarge => "target Z angle too large",
            TrackFailure::OutsideDockingFov => "FOV angle too large",
            TrackFailure::AppearanceMismatch => "pixel intensity verification failed",
        }
    }
}

/// Classifies one update given the pose before and after refinement.
///
/// `check_angle_x` comes from the tracking target; markers docked from
/// arbitrary roll (e.g. charger ramps) disable the X-angle check.
pub fn classify_track(
    before: &TrackerPose,
    after: &TrackerPose,
    outcome: &TrackOutcome,
    check_angle_x: bool,
    params: &TrackerParams,
) -> Result<(), TrackFailure> {
    let angle_jump = (before.angle_x - after.angle_x).abs() > params.success_tolerance_angle
        || (before.angle_y - after.angle_y).abs() > params.success_tolerance_angle
        || (before.angle_z - after.angle_z).abs() > params.success_tolerance_angle;
    if angle_jump {
        return Err(TrackFailure::AngleJump);
    }
    if after.translation.z < MIN_TRACKER_DISTANCE {
        return Err(TrackFailure::TooClose);
    }
    if after.translation.z > MAX_TRACKER_DISTANCE {
        return Err(TrackFailure::TooFar);
    }
    if (before.translation - after.translation).norm() > params.success_tolerance_distance {
        return Err(TrackFailure::TranslationJump);
    }
    if check_angle_x && after.angle_x.abs() > MAX_BLOCK_DOCKING_ANGLE {
        return Err(TrackFailure::XAngleTooLarge);
    }
    if after.angle_y.abs() > MAX_BLOCK_DOCKING_ANGLE {
        return Err(TrackFailure::YAngleTooLarge);
    }
    if after.angle_z.abs() > MAX_BLOCK_DOCKING_ANGLE {
        return Err(TrackFailure::ZAngleTooLarge);
    }
    if (after.translation.x.abs() / after.translation.z).atan() > MAX_DOCKING_FOV_ANGLE {
        return Err(TrackFailure::OutsideDockingFov);
    }
    let similar_fraction = if outcome.num_in_bounds > 0 {
        outcome.num_similar as f64 / outcome.num_in_bounds as f64
    } else {
        0.0
    };
    if similar_fraction < params.success_tolerance_matching_fraction {
        return Err(TrackFailure::AppearanceMismatch);
    }
    Ok(())
}
