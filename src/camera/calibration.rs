//! Camera intrinsics and the supported capture resolutions.

use crate::error::{VisionError, VisionResult};

/// Capture resolutions (rows, cols) the pipeline accepts at init.
pub const SUPPORTED_RESOLUTIONS: [(usize, usize); 3] = [(480, 640), (296, 400), (240, 320)];

/// Pinhole intrinsics for the head camera.
///
/// Immutable after `VisionSystem::init`; a re-init with different values
/// resets the whole subsystem. Equality is full field-by-field comparison,
/// which is how calibration changes are detected.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraCalibration {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub skew: f64,
    pub nrows: usize,
    pub ncols: usize,
}

impl CameraCalibration {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64, nrows: usize, ncols: usize) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            skew: 0.0,
            nrows,
            ncols,
        }
    }

    pub fn is_supported_resolution(&self) -> bool {
        SUPPORTED_RESOLUTIONS.contains(&(self.nrows, self.ncols))
    }

    /// Rejects calibrations the pipeline cannot run with.
    pub fn validate(&self) -> VisionResult<()> {
        if !self.is_supported_resolution() {
            return Err(VisionError::InvalidSize(self.nrows, self.ncols));
        }
        if !(self.fx > 0.0 && self.fy > 0.0) {
            return Err(VisionError::InvalidParameter("non-positive focal length"));
        }
        Ok(())
    }

    /// Horizontal field of view (rad) from the focal length.
    pub fn horizontal_fov(&self) -> f64 {
        2.0 * (self.ncols as f64 / (2.0 * self.fx)).atan()
    }

    /// Vertical field of view (rad) from the focal length.
    pub fn vertical_fov(&self) -> f64 {
        2.0 * (self.nrows as f64 / (2.0 * self.fy)).atan()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_supported_resolutions_accepted() {
        for (nrows, ncols) in SUPPORTED_RESOLUTIONS {
            let calib = CameraCalibration::new(300.0, 300.0, 160.0, 120.0, nrows, ncols);
            assert!(calib.validate().is_ok());
        }
    }

    #[test]
    fn test_unsupported_resolution_rejected() {
        let calib = CameraCalibration::new(300.0, 300.0, 160.0, 120.0, 200, 300);
        assert_eq!(calib.validate(), Err(VisionError::InvalidSize(200, 300)));
    }

    #[test]
    fn test_fov_from_focal_length() {
        let calib = CameraCalibration::new(320.0, 320.0, 320.0, 240.0, 480, 640);
        assert_relative_eq!(calib.horizontal_fov(), 2.0 * 1.0f64.atan(), epsilon = 1e-12);
    }

    #[test]
    fn test_change_detected_by_equality() {
        let a = CameraCalibration::new(300.0, 300.0, 160.0, 120.0, 240, 320);
        let mut b = a.clone();
        assert_eq!(a, b);
        b.cx += 0.5;
        assert_ne!(a, b);
    }
}
