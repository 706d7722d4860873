//! Rigid 3D transforms used throughout the pipeline.

use nalgebra::{Matrix3, Vector3};

/// A rigid transform: `p_out = rotation * p_in + translation`.
///
/// Translations are in millimeters, matching the rest of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl Pose {
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn from_rt(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Composition `self * other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &Pose) -> Pose {
        Pose {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    pub fn inverse(&self) -> Pose {
        let r_inv = self.rotation.transpose();
        Pose {
            rotation: r_inv,
            translation: -(r_inv * self.translation),
        }
    }

    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * p + self.translation
    }

    /// Pose from XYZ Euler angles, composed as `Rz * Ry * Rx`.
    pub fn from_euler_xyz(ax: f64, ay: f64, az: f64, translation: Vector3<f64>) -> Self {
        Self {
            rotation: rot_z(az) * rot_y(ay) * rot_x(ax),
            translation,
        }
    }
}

/// Rotation about the X axis.
#[rustfmt::skip]
pub fn rot_x(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        1.0, 0.0, 0.0,
        0.0, c,  -s,
        0.0, s,   c,
    )
}

/// Rotation about the Y axis.
#[rustfmt::skip]
pub fn rot_y(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
         c,  0.0, s,
         0.0, 1.0, 0.0,
        -s,  0.0, c,
    )
}

/// Rotation about the Z axis.
#[rustfmt::skip]
pub fn rot_z(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c,  -s,  0.0,
        s,   c,  0.0,
        0.0, 0.0, 1.0,
    )
}

/// Recover (ax, ay, az) such that `rot_z(az) * rot_y(ay) * rot_x(ax)` equals
/// `r`, assuming `r` is a proper rotation away from the ay = ±90 deg
/// singularity.
pub fn euler_xyz_from_rotation(r: &Matrix3<f64>) -> (f64, f64, f64) {
    let ay = (-r[(2, 0)]).clamp(-1.0, 1.0).asin();
    let ax = r[(2, 1)].atan2(r[(2, 2)]);
    let az = r[(1, 0)].atan2(r[(0, 0)]);
    (ax, ay, az)
}

/// Angle (rad) of the relative rotation between two rotation matrices.
pub fn rotation_angle_between(a: &Matrix3<f64>, b: &Matrix3<f64>) -> f64 {
    let rel = a.transpose() * b;
    let cos_angle = ((rel.trace() - 1.0) / 2.0).clamp(-1.0, 1.0);
    cos_angle.acos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_compose_inverse_is_identity() {
        let pose = Pose::from_euler_xyz(0.1, -0.4, 0.7, Vector3::new(5.0, -2.0, 80.0));
        let round_trip = pose.compose(&pose.inverse());

        assert_relative_eq!(round_trip.rotation, Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(round_trip.translation, Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn test_transform_point_matches_compose() {
        let a = Pose::from_euler_xyz(0.2, 0.1, -0.3, Vector3::new(1.0, 2.0, 3.0));
        let b = Pose::from_euler_xyz(-0.1, 0.5, 0.0, Vector3::new(-4.0, 0.0, 10.0));
        let p = Vector3::new(7.0, -1.0, 2.0);

        let via_compose = a.compose(&b).transform_point(&p);
        let via_apply = a.transform_point(&b.transform_point(&p));

        assert_relative_eq!(via_compose, via_apply, epsilon = 1e-12);
    }

    #[test]
    fn test_euler_round_trip() {
        let (ax, ay, az) = (0.3, -0.25, 1.1);
        let r = rot_z(az) * rot_y(ay) * rot_x(ax);
        let (bx, by, bz) = euler_xyz_from_rotation(&r);

        assert_relative_eq!(ax, bx, epsilon = 1e-12);
        assert_relative_eq!(ay, by, epsilon = 1e-12);
        assert_relative_eq!(az, bz, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_angle_between() {
        let a = rot_y(0.2);
        let b = rot_y(0.5);
        assert_relative_eq!(rotation_angle_between(&a, &b), 0.3, epsilon = 1e-12);
    }
}
