//! Sampled planar 6-DOF template tracker.
//!
//! The tracker anchors a grid of reference samples on a marker's face at
//! init time and refines a 6-DOF pose (three Euler angles + translation)
//! against each new frame with bounded-iteration Gauss-Newton on the
//! brightness-normalized sample residuals.

use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};
use tracing::debug;

use crate::camera::calibration::CameraCalibration;
use crate::camera::frame::Frame;
use crate::config::TrackerParams;
use crate::error::{VisionError, VisionResult};
use crate::geometry::pose::{euler_xyz_from_rotation, Pose, rot_x, rot_y, rot_z};
use crate::geometry::p3p::marker_pose_from_quad;
use crate::geometry::quad::{canonical_corners, Quad};

/// Tracker state: marker pose relative to the camera as XYZ Euler angles
/// (composed `Rz * Ry * Rx`) plus translation in mm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerPose {
    pub angle_x: f64,
    pub angle_y: f64,
    pub angle_z: f64,
    pub translation: Vector3<f64>,
}

impl TrackerPose {
    pub fn rotation(&self) -> Matrix3<f64> {
        rot_z(self.angle_z) * rot_y(self.angle_y) * rot_x(self.angle_x)
    }

    pub fn to_pose(&self) -> Pose {
        Pose::from_rt(self.rotation(), self.translation)
    }

    pub fn from_pose(pose: &Pose) -> Self {
        let (angle_x, angle_y, angle_z) = euler_xyz_from_rotation(&pose.rotation);
        Self {
            angle_x,
            angle_y,
            angle_z,
            translation: pose.translation,
        }
    }
}

/// One reference sample: a point on the marker face and its grayvalue at
/// init time.
#[derive(Debug, Clone, Copy)]
struct TemplateSample {
    point: Vector3<f64>,
    ref_value: f64,
}

/// Diagnostics from one `update` call. `converged` is the solver's own
/// verdict; the success classifier judges the update independently.
#[derive(Debug, Clone, Copy)]
pub struct TrackOutcome {
    pub converged: bool,
    pub mean_abs_difference: f64,
    pub num_in_bounds: usize,
    pub num_similar: usize,
}

/// The single live template tracking filter.
///
/// Exactly one instance exists while the system is in Tracking mode; it is
/// created by `init` and destroyed on mode exit or re-initialization.
#[derive(Debug, Clone)]
pub struct TemplateTracker {
    pose: TrackerPose,
    width_mm: f64,
    calib: CameraCalibration,
    samples: Vec<TemplateSample>,
    ref_mean: f64,
    iterations: u64,
}

impl TemplateTracker {
    /// Builds a tracker anchored on `quad`, seeded from the camera
    /// intrinsics and the target's physical width.
    pub fn init(
        frame: &Frame,
        quad: &Quad,
        width_mm: f64,
        calib: &CameraCalibration,
        params: &TrackerParams,
    ) -> VisionResult<Self> {
        if width_mm <= 0.0 {
            return Err(VisionError::InvalidParameter("non-positive marker width"));
        }

        let corners = canonical_corners(width_mm);
        let pose = marker_pose_from_quad(quad, &corners, calib)?;

        let n = params.template_grid_size.max(2);
        let h = width_mm / 2.0;
        let mut samples = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                let x = -h + width_mm * (i as f64) / ((n - 1) as f64);
                let y = -h + width_mm * (j as f64) / ((n - 1) as f64);
                let point = Vector3::new(x, y, 0.0);
                if let Some((row, col)) = project(calib, &pose.transform_point(&point)) {
                    if let Some(value) = frame.sample_bilinear(row, col) {
                        samples.push(TemplateSample {
                            point,
                            ref_value: value,
                        });
                    }
                }
            }
        }

        if samples.len() < n * n / 2 {
            return Err(VisionError::InvalidParameter("template mostly out of view"));
        }

        let ref_mean = samples.iter().map(|s| s.ref_value).sum::<f64>() / samples.len() as f64;
        Ok(Self {
            pose: TrackerPose::from_pose(&pose),
            width_mm,
            calib: calib.clone(),
            samples,
            ref_mean,
            iterations: 0,
        })
    }

    pub fn pose(&self) -> TrackerPose {
        self.pose
    }

    pub fn width_mm(&self) -> f64 {
        self.width_mm
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Rigid pre-transform from the kinematic predictor:
    /// `R_new = r * R`, `t_new = r * t + t_delta`.
    pub fn apply_rigid(&mut self, r: &Matrix3<f64>, t_delta: &Vector3<f64>) {
        let rotation = r * self.pose.rotation();
        let translation = r * self.pose.translation + t_delta;
        self.pose = TrackerPose::from_pose(&Pose::from_rt(rotation, translation));
    }

    /// The current pose's marker outline in image coordinates; `None` when
    /// the marker is behind the camera.
    pub fn projected_quad(&self) -> Option<Quad> {
        let pose = self.pose.to_pose();
        let corners = canonical_corners(self.width_mm);
        let mut projected = [nalgebra::Point2::new(0.0, 0.0); 4];
        for (i, corner) in corners.iter().enumerate() {
            let (row, col) = project(&self.calib, &pose.transform_point(corner))?;
            projected[i] = nalgebra::Point2::new(col, row);
        }
        Some(Quad::new(projected))
    }

    /// One bounded-iteration refinement against `frame`.
    pub fn update(&mut self, frame: &Frame, params: &TrackerParams) -> TrackOutcome {
        self.iterations += 1;

        let mut state = Vector6::new(
            self.pose.angle_x,
            self.pose.angle_y,
            self.pose.angle_z,
            self.pose.translation.x,
            self.pose.translation.y,
            self.pose.translation.z,
        );

        const ANGLE_DELTA: f64 = 1e-3;
        const TRANS_DELTA: f64 = 0.1;

        let mut converged = false;
        for _ in 0..params.max_iterations {
            let r0 = self.residuals(frame, &state);

            // Numeric Jacobian, central differences per parameter.
            let mut jacobian = vec![[0.0; 6]; self.samples.len()];
            for k in 0..6 {
                let delta = if k < 3 { ANGLE_DELTA } else { TRANS_DELTA };
                let mut plus = state;
                let mut minus = state;
                plus[k] += delta;
                minus[k] -= delta;
                let rp = self.residuals(frame, &plus);
                let rm = self.residuals(frame, &minus);
                for i in 0..self.samples.len() {
                    jacobian[i][k] = (rp[i] - rm[i]) / (2.0 * delta);
                }
            }

            let mut jtj = Matrix6::<f64>::zeros();
            let mut jtr = Vector6::<f64>::zeros();
            for (i, row) in jacobian.iter().enumerate() {
                for k in 0..6 {
                    jtr[k] += row[k] * r0[i];
                    for l in 0..6 {
                        jtj[(k, l)] += row[k] * row[l];
                    }
                }
            }

            // Levenberg damping keeps the step sane on flat texture.
            let damping = 1e-6 * jtj.trace().max(1e-12);
            for k in 0..6 {
                jtj[(k, k)] += damping;
            }

            let step = match jtj.cholesky() {
                Some(chol) => chol.solve(&(-jtr)),
                None => break,
            };
            state += step;

            let angle_step = step.fixed_rows::<3>(0).amax();
            let trans_step = step.fixed_rows::<3>(3).norm();
            if angle_step < params.convergence_tolerance_angle
                && trans_step < params.convergence_tolerance_distance
            {
                converged = true;
                break;
            }
        }

        self.pose = TrackerPose {
            angle_x: state[0],
            angle_y: state[1],
            angle_z: state[2],
            translation: Vector3::new(state[3], state[4], state[5]),
        };

        let verdict = self.verify(frame, params);
        debug!(
            converged,
            num_in_bounds = verdict.num_in_bounds,
            num_similar = verdict.num_similar,
            "template tracker update"
        );
        TrackOutcome {
            converged,
            ..verdict
        }
    }

    /// Brightness-normalized residuals of every sample at the given state;
    /// out-of-bounds samples contribute zero.
    fn residuals(&self, frame: &Frame, state: &Vector6<f64>) -> Vec<f64> {
        let pose = pose_from_state(state);
        let mut values: Vec<Option<f64>> = Vec::with_capacity(self.samples.len());
        let mut sum = 0.0;
        let mut count = 0usize;
        for sample in &self.samples {
            let value = project(&self.calib, &pose.transform_point(&sample.point))
                .and_then(|(row, col)| frame.sample_bilinear(row, col));
            if let Some(v) = value {
                sum += v;
                count += 1;
            }
            values.push(value);
        }
        let cur_mean = if count > 0 { sum / count as f64 } else { 0.0 };

        values
            .iter()
            .zip(&self.samples)
            .map(|(value, sample)| match value {
                Some(v) => (v - cur_mean) - (sample.ref_value - self.ref_mean),
                None => 0.0,
            })
            .collect()
    }

    /// Counts in-bounds and intensity-verified samples at the current pose.
    fn verify(&self, frame: &Frame, params: &TrackerParams) -> TrackOutcome {
        let pose = self.pose.to_pose();
        let mut in_bounds = Vec::with_capacity(self.samples.len());
        let mut sum = 0.0;
        for sample in &self.samples {
            if let Some(v) = project(&self.calib, &pose.transform_point(&sample.point))
                .and_then(|(row, col)| frame.sample_bilinear(row, col))
            {
                sum += v;
                in_bounds.push((v, sample.ref_value));
            }
        }
        let cur_mean = if in_bounds.is_empty() {
            0.0
        } else {
            sum / in_bounds.len() as f64
        };

        let mut num_similar = 0usize;
        let mut abs_sum = 0.0;
        for (v, ref_value) in &in_bounds {
            let diff = ((v - cur_mean) - (ref_value - self.ref_mean)).abs();
            abs_sum += diff;
            if diff <= params.verify_max_pixel_difference as f64 {
                num_similar += 1;
            }
        }
        TrackOutcome {
            converged: false,
            mean_abs_difference: if in_bounds.is_empty() {
                0.0
            } else {
                abs_sum / in_bounds.len() as f64
            },
            num_in_bounds: in_bounds.len(),
            num_similar,
        }
    }
}

fn pose_from_state(state: &Vector6<f64>) -> Pose {
    Pose::from_rt(
        rot_z(state[2]) * rot_y(state[1]) * rot_x(state[0]),
        Vector3::new(state[3], state[4], state[5]),
    )
}

/// Projects a camera-frame point to (row, col); `None` behind the camera.
fn project(calib: &CameraCalibration, p_cam: &Vector3<f64>) -> Option<(f64, f64)> {
    if p_cam.z <= 0.0 {
        return None;
    }
    Some((
        calib.fy * p_cam.y / p_cam.z + calib.cy,
        calib.fx * p_cam.x / p_cam.z + calib.cx,
    ))
}
