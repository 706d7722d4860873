//! Perspective-3-point pose recovery for marker quads.
//!
//! Grunert's distance formulation (quartic in the distance ratio, solved via
//! the companion matrix) followed by 3-point absolute orientation. The fourth
//! quad corner disambiguates the up-to-four algebraic solutions, and a short
//! Gauss-Newton polish on all four corners tightens the result.

use nalgebra::{Matrix3, Matrix4, Matrix6, Point2, Vector3, Vector6};

use crate::camera::CameraCalibration;
use crate::error::{VisionError, VisionResult};
use crate::geometry::pose::{euler_xyz_from_rotation, Pose, rot_x, rot_y, rot_z};
use crate::geometry::quad::Quad;

/// Roots with an imaginary part above this (relative) are discarded.
const REAL_ROOT_TOLERANCE: f64 = 1e-8;

/// Candidate poses of three known points relative to the camera.
///
/// `world` are the 3D points in the marker frame, `bearings` the unit rays
/// through their projections. Each returned pose maps marker coordinates to
/// camera coordinates; all returned solutions place the points in front of
/// the camera.
pub fn solve_p3p(world: &[Vector3<f64>; 3], bearings: &[Vector3<f64>; 3]) -> Vec<Pose> {
    let a2 = (world[1] - world[2]).norm_squared();
    let b2 = (world[0] - world[2]).norm_squared();
    let c2 = (world[0] - world[1]).norm_squared();
    if a2 <= 0.0 || b2 <= 0.0 || c2 <= 0.0 {
        return Vec::new();
    }

    let cos_alpha = bearings[1].dot(&bearings[2]);
    let cos_beta = bearings[0].dot(&bearings[2]);
    let cos_gamma = bearings[0].dot(&bearings[1]);

    // Grunert's quartic in v = s3/s1 (Haralick et al. formulation).
    let ac_b = (a2 - c2) / b2;
    let apc_b = (a2 + c2) / b2;

    let a4 = (ac_b - 1.0) * (ac_b - 1.0) - 4.0 * (c2 / b2) * cos_alpha * cos_alpha;
    let a3 = 4.0
        * (ac_b * (1.0 - ac_b) * cos_beta - (1.0 - apc_b) * cos_alpha * cos_gamma
            + 2.0 * (c2 / b2) * cos_alpha * cos_alpha * cos_beta);
    let a2_coeff = 2.0
        * (ac_b * ac_b - 1.0
            + 2.0 * ac_b * ac_b * cos_beta * cos_beta
            + 2.0 * ((b2 - c2) / b2) * cos_alpha * cos_alpha
            - 4.0 * apc_b * cos_alpha * cos_beta * cos_gamma
            + 2.0 * ((b2 - a2) / b2) * cos_gamma * cos_gamma);
    let a1 = 4.0
        * (-ac_b * (1.0 + ac_b) * cos_beta + 2.0 * (a2 / b2) * cos_gamma * cos_gamma * cos_beta
            - (1.0 - apc_b) * cos_alpha * cos_gamma);
    let a0 = (1.0 + ac_b) * (1.0 + ac_b) - 4.0 * (a2 / b2) * cos_gamma * cos_gamma;

    if a4.abs() < 1e-12 {
        return Vec::new();
    }

    let mut solutions = Vec::new();
    for v in real_quartic_roots(a4, a3, a2_coeff, a1, a0) {
        if v <= 0.0 {
            continue;
        }
        let denom = 2.0 * (cos_gamma - v * cos_alpha);
        if denom.abs() < 1e-12 {
            continue;
        }
        let u = ((-1.0 + ac_b) * v * v - 2.0 * ac_b * cos_beta * v + 1.0 + ac_b) / denom;
        if u <= 0.0 {
            continue;
        }
        let s1_sq = c2 / (1.0 + u * u - 2.0 * u * cos_gamma);
        if !(s1_sq.is_finite() && s1_sq > 0.0) {
            continue;
        }
        let s1 = s1_sq.sqrt();
        let s2 = u * s1;
        let s3 = v * s1;

        // Reject roots that do not satisfy the remaining side constraint.
        let a2_check = s2 * s2 + s3 * s3 - 2.0 * s2 * s3 * cos_alpha;
        if (a2_check - a2).abs() > 1e-6 * (1.0 + a2) {
            continue;
        }

        let cam_points = [s1 * bearings[0], s2 * bearings[1], s3 * bearings[2]];
        if let Some(pose) = absolute_orientation(world, &cam_points) {
            solutions.push(pose);
        }
    }
    solutions
}

/// Least-squares rigid transform mapping `world` points onto `cam` points.
fn absolute_orientation(world: &[Vector3<f64>; 3], cam: &[Vector3<f64>; 3]) -> Option<Pose> {
    let cw = (world[0] + world[1] + world[2]) / 3.0;
    let cc = (cam[0] + cam[1] + cam[2]) / 3.0;

    let mut h = Matrix3::zeros();
    for i in 0..3 {
        h += (world[i] - cw) * (cam[i] - cc).transpose();
    }

    let svd = h.svd(true, true);
    let u = svd.u?;
    let v = svd.v_t?.transpose();

    let mut d = Matrix3::identity();
    if (v * u.transpose()).determinant() < 0.0 {
        d[(2, 2)] = -1.0;
    }
    let rotation = v * d * u.transpose();
    let translation = cc - rotation * cw;
    Some(Pose::from_rt(rotation, translation))
}

/// Real roots of `a4 x^4 + a3 x^3 + a2 x^2 + a1 x + a0` via the companion
/// matrix eigenvalues.
fn real_quartic_roots(a4: f64, a3: f64, a2: f64, a1: f64, a0: f64) -> Vec<f64> {
    let b3 = a3 / a4;
    let b2 = a2 / a4;
    let b1 = a1 / a4;
    let b0 = a0 / a4;

    #[rustfmt::skip]
    let companion = Matrix4::new(
        -b3, -b2, -b1, -b0,
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
    );

    companion
        .complex_eigenvalues()
        .iter()
        .filter(|e| e.im.abs() <= REAL_ROOT_TOLERANCE * (1.0 + e.re.abs()))
        .map(|e| e.re)
        .collect()
}

/// Unit ray through an image point for the given intrinsics.
fn bearing(calib: &CameraCalibration, p: &Point2<f64>) -> Vector3<f64> {
    Vector3::new(
        (p.x - calib.cx) / calib.fx,
        (p.y - calib.cy) / calib.fy,
        1.0,
    )
    .normalize()
}

fn project(calib: &CameraCalibration, p_cam: &Vector3<f64>) -> Option<Point2<f64>> {
    if p_cam.z <= 0.0 {
        return None;
    }
    Some(Point2::new(
        calib.fx * p_cam.x / p_cam.z + calib.cx,
        calib.fy * p_cam.y / p_cam.z + calib.cy,
    ))
}

fn reprojection_error(calib: &CameraCalibration, pose: &Pose, quad: &Quad, corners: &[Vector3<f64>; 4]) -> f64 {
    let mut total = 0.0;
    for i in 0..4 {
        match project(calib, &pose.transform_point(&corners[i])) {
            Some(p) => {
                total += (p - quad.corners[i]).norm_squared();
            }
            None => return f64::INFINITY,
        }
    }
    total.sqrt()
}

/// Pose of a marker relative to the camera from its corner quad.
///
/// `corners3d` are the canonical marker-frame corners (same index order as
/// the quad). Degenerate quads and configurations with no physical P3P
/// solution are rejected with `InvalidParameter`.
pub fn marker_pose_from_quad(
    quad: &Quad,
    corners3d: &[Vector3<f64>; 4],
    calib: &CameraCalibration,
) -> VisionResult<Pose> {
    if quad.is_degenerate() {
        return Err(VisionError::InvalidParameter("degenerate marker quad"));
    }

    let world = [corners3d[0], corners3d[1], corners3d[2]];
    let bearings = [
        bearing(calib, &quad.corners[0]),
        bearing(calib, &quad.corners[1]),
        bearing(calib, &quad.corners[2]),
    ];

    // The fourth corner selects among the algebraic candidates.
    let mut best: Option<(f64, Pose)> = None;
    for pose in solve_p3p(&world, &bearings) {
        let err = reprojection_error(calib, &pose, quad, corners3d);
        if err.is_finite() && best.as_ref().map_or(true, |(e, _)| err < *e) {
            best = Some((err, pose));
        }
    }

    let (_, pose) = best.ok_or(VisionError::InvalidParameter("no P3P solution"))?;
    Ok(refine_pose(pose, quad, corners3d, calib))
}

/// A few Gauss-Newton steps on the 4-corner reprojection residual.
fn refine_pose(
    init: Pose,
    quad: &Quad,
    corners3d: &[Vector3<f64>; 4],
    calib: &CameraCalibration,
) -> Pose {
    const MAX_ITERATIONS: usize = 10;
    const STEP_TOLERANCE: f64 = 1e-10;
    const ANGLE_DELTA: f64 = 1e-6;
    const TRANS_DELTA: f64 = 1e-4;

    let (ax, ay, az) = euler_xyz_from_rotation(&init.rotation);
    let mut params = Vector6::new(
        ax,
        ay,
        az,
        init.translation.x,
        init.translation.y,
        init.translation.z,
    );

    let residuals = |p: &Vector6<f64>| -> Option<[f64; 8]> {
        let pose = pose_from_params(p);
        let mut r = [0.0; 8];
        for i in 0..4 {
            let proj = project(calib, &pose.transform_point(&corners3d[i]))?;
            r[2 * i] = proj.x - quad.corners[i].x;
            r[2 * i + 1] = proj.y - quad.corners[i].y;
        }
        Some(r)
    };

    for _ in 0..MAX_ITERATIONS {
        let r0 = match residuals(&params) {
            Some(r) => r,
            None => break,
        };

        // Numeric Jacobian, central differences.
        let mut jtj = Matrix6::zeros();
        let mut jtr = Vector6::zeros();
        let mut jacobian = [[0.0; 6]; 8];
        let mut ok = true;
        for k in 0..6 {
            let delta = if k < 3 { ANGLE_DELTA } else { TRANS_DELTA };
            let mut plus = params;
            let mut minus = params;
            plus[k] += delta;
            minus[k] -= delta;
            match (residuals(&plus), residuals(&minus)) {
                (Some(rp), Some(rm)) => {
                    for i in 0..8 {
                        jacobian[i][k] = (rp[i] - rm[i]) / (2.0 * delta);
                    }
                }
                _ => {
                    ok = false;
                    break;
                }
            }
        }
        if !ok {
            break;
        }

        for i in 0..8 {
            for k in 0..6 {
                jtr[k] += jacobian[i][k] * r0[i];
                for l in 0..6 {
                    jtj[(k, l)] += jacobian[i][k] * jacobian[i][l];
                }
            }
        }

        let step = match jtj.cholesky() {
            Some(chol) => chol.solve(&(-jtr)),
            None => break,
        };
        params += step;
        if step.norm() < STEP_TOLERANCE {
            break;
        }
    }

    pose_from_params(&params)
}

fn pose_from_params(p: &Vector6<f64>) -> Pose {
    Pose::from_rt(
        rot_z(p[2]) * rot_y(p[1]) * rot_x(p[0]),
        Vector3::new(p[3], p[4], p[5]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::pose::rotation_angle_between;
    use crate::geometry::quad::canonical_corners;
    use approx::assert_relative_eq;

    fn test_calib() -> CameraCalibration {
        CameraCalibration::new(300.0, 300.0, 320.0, 240.0, 480, 640)
    }

    fn project_quad(pose: &Pose, corners: &[Vector3<f64>; 4], calib: &CameraCalibration) -> Quad {
        let pts = corners.map(|c| {
            let p = pose.transform_point(&c);
            Point2::new(
                calib.fx * p.x / p.z + calib.cx,
                calib.fy * p.y / p.z + calib.cy,
            )
        });
        Quad::new(pts)
    }

    #[test]
    fn test_round_trip_frontal_marker() {
        let calib = test_calib();
        let corners = canonical_corners(40.0);
        let truth = Pose::from_euler_xyz(0.0, 0.0, 0.0, Vector3::new(5.0, -3.0, 150.0));
        let quad = project_quad(&truth, &corners, &calib);

        let recovered = marker_pose_from_quad(&quad, &corners, &calib).unwrap();

        assert_relative_eq!(
            recovered.translation,
            truth.translation,
            max_relative = 1e-3
        );
        assert!(rotation_angle_between(&recovered.rotation, &truth.rotation) < 1e-3);
    }

    #[test]
    fn test_round_trip_oblique_marker() {
        let calib = test_calib();
        let corners = canonical_corners(25.0);
        let truth = Pose::from_euler_xyz(-0.2, 0.35, 0.1, Vector3::new(-12.0, 8.0, 90.0));
        let quad = project_quad(&truth, &corners, &calib);

        let recovered = marker_pose_from_quad(&quad, &corners, &calib).unwrap();

        assert_relative_eq!(
            recovered.translation,
            truth.translation,
            max_relative = 1e-3
        );
        assert!(rotation_angle_between(&recovered.rotation, &truth.rotation) < 1e-3);
    }

    #[test]
    fn test_recovered_distance_matches_truth() {
        let calib = test_calib();
        let corners = canonical_corners(40.0);
        let truth = Pose::from_euler_xyz(0.0, 0.15, 0.0, Vector3::new(0.0, 0.0, 200.0));
        let quad = project_quad(&truth, &corners, &calib);

        let recovered = marker_pose_from_quad(&quad, &corners, &calib).unwrap();
        assert_relative_eq!(recovered.translation.norm(), 200.0, max_relative = 1e-3);
    }

    #[test]
    fn test_degenerate_quad_rejected() {
        let calib = test_calib();
        let corners = canonical_corners(40.0);
        let collinear = Quad::new([
            Point2::new(100.0, 100.0),
            Point2::new(110.0, 110.0),
            Point2::new(120.0, 120.0),
            Point2::new(130.0, 130.0),
        ]);

        let result = marker_pose_from_quad(&collinear, &corners, &calib);
        assert_eq!(
            result,
            Err(VisionError::InvalidParameter("degenerate marker quad"))
        );
    }
}
