//! Docking pose computation: from a verified marker to a pose the motion
//! planner can drive to.

use nalgebra::{Matrix3, Vector3};

use crate::camera::calibration::CameraCalibration;
use crate::detection::MarkerToTrack;
use crate::error::VisionResult;
use crate::geometry::pose::{Pose, rot_y};
use crate::geometry::p3p::marker_pose_from_quad;
use crate::geometry::quad::{canonical_corners, Quad};
use crate::tracking::predictor::{HEAD_CAM_POSITION, NECK_JOINT_POSITION};
use crate::tracking::template::TrackerPose;

/// A docking pose ready for the consumer thread, in robot coordinates
/// (X forward, Y left, Z up) at the frame's capture time.
#[derive(Debug, Clone, PartialEq)]
pub struct DockingPose {
    pub pose: Pose,
    pub timestamp: f64,
}

/// Applies the target's post-dock offset, expressed in the marker's own
/// frame.
///
/// The tracker keeps the marker in camera coordinates, so the requested "X"
/// offset (distance off the marker's face) points along the marker's
/// negative Z axis, and the "Y" offset along its negative Y axis.
pub fn compose_post_offset(marker_pose_wrt_camera: &Pose, target: &MarkerToTrack) -> Pose {
    if target.post_offset_angle_rad == 0.0
        && target.post_offset_x_mm == 0.0
        && target.post_offset_y_mm == 0.0
    {
        return marker_pose_wrt_camera.clone();
    }
    let offset_wrt_marker = Pose::from_rt(
        rot_y(target.post_offset_angle_rad),
        Vector3::new(-target.post_offset_y_mm, 0.0, -target.post_offset_x_mm),
    );
    marker_pose_wrt_camera.compose(&offset_wrt_marker)
}

/// Docking pose from the tracker's current state: post-dock offset applied
/// in the marker frame, then re-expressed in robot coordinates through the
/// head/neck chain at the given head angle.
pub fn docking_pose_from_tracker(
    pose: &TrackerPose,
    target: &MarkerToTrack,
    head_angle_rad: f64,
    timestamp: f64,
) -> DockingPose {
    let wrt_camera = compose_post_offset(&pose.to_pose(), target);
    DockingPose {
        pose: pose_wrt_robot(&wrt_camera, head_angle_rad),
        timestamp,
    }
}

/// Pose of the head camera relative to the robot for the given head angle.
///
/// The rotation re-expresses camera axes (X right, Y down, Z forward) in
/// robot axes (X forward, Y left, Z up); the translation walks the
/// neck-joint/head-camera mounting chain.
#[rustfmt::skip]
pub fn cam_pose_wrt_robot(head_angle_rad: f64) -> Pose {
    let (sin_h, cos_h) = head_angle_rad.sin_cos();
    let rotation = Matrix3::new(
         0.0,  sin_h,  cos_h,
        -1.0,  0.0,    0.0,
         0.0, -cos_h,  sin_h,
    );
    let translation = Vector3::new(
        HEAD_CAM_POSITION[0] * cos_h - HEAD_CAM_POSITION[2] * sin_h + NECK_JOINT_POSITION[0],
        HEAD_CAM_POSITION[1],
        HEAD_CAM_POSITION[2] * cos_h + HEAD_CAM_POSITION[0] * sin_h + NECK_JOINT_POSITION[2],
    );
    Pose::from_rt(rotation, translation)
}

/// Re-expresses a camera-relative pose in robot coordinates.
pub fn pose_wrt_robot(pose_wrt_camera: &Pose, head_angle_rad: f64) -> Pose {
    cam_pose_wrt_robot(head_angle_rad).compose(pose_wrt_camera)
}

/// One-shot pose estimate for an observed marker (outside of tracking).
///
/// When the marker's in-plane orientation is irrelevant the quad is first
/// re-sorted to canonical clockwise order, so any detection rotation of the
/// same physical marker yields the same pose.
pub fn observed_marker_pose(
    quad: &Quad,
    width_mm: f64,
    calib: &CameraCalibration,
    orientation_matters: bool,
) -> VisionResult<Pose> {
    let corners = canonical_corners(width_mm);
    if orientation_matters {
        marker_pose_from_quad(quad, &corners, calib)
    } else {
        marker_pose_from_quad(&quad.sorted_clockwise(), &corners, calib)
    }
}
