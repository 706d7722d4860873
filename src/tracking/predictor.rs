//! Kinematic tracker prediction.
//!
//! Between two frames the robot has driven and possibly moved its head; this
//! module turns the odometric delta plus the two head angles into a rigid
//! pre-transform for the tracker, so the iterative solver starts near the
//! answer. Purely advisory: skipping it costs iterations, not correctness.

use nalgebra::{Matrix3, Vector3};

/// Head camera position in head coordinates (mm). Y is zero by mounting
/// design; the closed-form geometry below relies on that.
pub const HEAD_CAM_POSITION: [f64; 3] = [12.0, 0.0, -10.5];
/// Neck joint position in robot coordinates (mm).
pub const NECK_JOINT_POSITION: [f64; 3] = [-13.0, 0.0, 33.5];

/// One per-cycle snapshot of the robot's state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotState {
    /// World position (mm).
    pub x_mm: f64,
    pub y_mm: f64,
    /// World heading (rad).
    pub heading_rad: f64,
    /// Head tilt angle (rad).
    pub head_angle_rad: f64,
    /// Capture timestamp (seconds).
    pub timestamp: f64,
}

/// Rigid camera-frame motion predicted from odometry and head motion.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictedMotion {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

/// Robot-frame pose change between two snapshots: forward and lateral
/// translation in the previous robot frame, plus the heading change.
pub fn pose_change(prev: &RobotState, cur: &RobotState) -> (f64, f64, f64) {
    let dx = cur.x_mm - prev.x_mm;
    let dy = cur.y_mm - prev.y_mm;
    let (sin_h, cos_h) = prev.heading_rad.sin_cos();
    let t_fwd = cos_h * dx + sin_h * dy;
    let t_hor = -sin_h * dx + cos_h * dy;
    let d_theta = wrap_angle(cur.heading_rad - prev.heading_rad);
    (t_fwd, t_hor, d_theta)
}

fn wrap_angle(angle: f64) -> f64 {
    let two_pi = 2.0 * std::f64::consts::PI;
    let wrapped = angle.rem_euclid(two_pi);
    if wrapped > std::f64::consts::PI {
        wrapped - two_pi
    } else {
        wrapped
    }
}

/// Closed-form camera-frame motion between two robot-state snapshots.
///
/// The rotation and translation entries were derived symbolically (Sage)
/// from the neck/head-camera mounting chain, assuming both mounting points
/// have zero Y component. Deterministic: identical inputs give bit-identical
/// output.
pub fn predict_camera_motion(prev: &RobotState, cur: &RobotState) -> PredictedMotion {
    let (t_fwd, t_hor, d_theta) = pose_change(prev, cur);

    let (s_h1, c_h1) = prev.head_angle_rad.sin_cos();
    let (s_h2, c_h2) = cur.head_angle_rad.sin_cos();
    let (s_r, c_r) = d_theta.sin_cos();

    #[rustfmt::skip]
    let rotation = Matrix3::new(
        c_r,        s_h1 * s_r,                      c_h1 * s_r,
        -s_h2 * s_r, c_r * s_h1 * s_h2 + c_h1 * c_h2, c_h1 * c_r * s_h2 - c_h2 * s_h1,
        -c_h2 * s_r, c_h2 * c_r * s_h1 - c_h1 * s_h2, c_h1 * c_h2 * c_r + s_h1 * s_h2,
    );

    let hx = HEAD_CAM_POSITION[0];
    let hz = HEAD_CAM_POSITION[2];
    let nx = NECK_JOINT_POSITION[0];
    let nz = NECK_JOINT_POSITION[2];

    let term1 = hx * c_h1 - hz * s_h1 + nx;
    let term2 = hz * c_h1 + hx * s_h1 + nz;
    let term3 = hz * c_h2 + hx * s_h2 + nz;
    let term4 = hx * c_h2 - hz * s_h2 + nx;
    let term5 = t_fwd * c_r + t_hor * s_r;

    let translation = Vector3::new(
        t_hor * c_r + term1 * s_r - t_fwd * s_r,
        term1 * c_r * s_h2 - term2 * c_h2 + term3 * c_h2 - term4 * s_h2 - term5 * s_h2,
        term1 * c_h2 * c_r - term4 * c_h2 - term5 * c_h2 + term2 * s_h2 - term3 * s_h2,
    );

    PredictedMotion {
        rotation,
        translation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn state(x: f64, y: f64, heading: f64, head: f64) -> RobotState {
        RobotState {
            x_mm: x,
            y_mm: y,
            heading_rad: heading,
            head_angle_rad: head,
            timestamp: 0.0,
        }
    }

    #[test]
    fn test_no_motion_is_identity() {
        let s = state(100.0, 50.0, 0.3, -0.2);
        let motion = predict_camera_motion(&s, &s);

        assert_relative_eq!(motion.rotation, Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(motion.translation, Vector3::zeros(), epsilon = 1e-9);
    }

    #[test]
    fn test_pose_change_is_in_robot_frame() {
        // Robot facing +Y, drives +Y by 10: that's pure forward motion.
        let prev = state(0.0, 0.0, std::f64::consts::FRAC_PI_2, 0.0);
        let cur = state(0.0, 10.0, std::f64::consts::FRAC_PI_2, 0.0);
        let (t_fwd, t_hor, d_theta) = pose_change(&prev, &cur);

        assert_relative_eq!(t_fwd, 10.0, epsilon = 1e-12);
        assert_relative_eq!(t_hor, 0.0, epsilon = 1e-12);
        assert_relative_eq!(d_theta, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_heading_wraps_across_pi() {
        let prev = state(0.0, 0.0, 3.1, 0.0);
        let cur = state(0.0, 0.0, -3.1, 0.0);
        let (_, _, d_theta) = pose_change(&prev, &cur);
        assert_relative_eq!(d_theta, 2.0 * std::f64::consts::PI - 6.2, epsilon = 1e-12);
    }

    #[test]
    fn test_forward_drive_moves_marker_closer() {
        // Driving straight toward the marker shrinks camera-frame Z.
        let prev = state(0.0, 0.0, 0.0, 0.0);
        let cur = state(20.0, 0.0, 0.0, 0.0);
        let motion = predict_camera_motion(&prev, &cur);

        assert_relative_eq!(motion.rotation, Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(motion.translation.z, -20.0, epsilon = 1e-9);
        assert_relative_eq!(motion.translation.x, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let prev = state(12.5, -3.25, 0.4, -0.15);
        let cur = state(14.0, -2.75, 0.45, -0.05);

        let a = predict_camera_motion(&prev, &cur);
        let b = predict_camera_motion(&prev, &cur);

        // Bit-identical, not merely close.
        assert_eq!(a, b);
    }
}
