//! Frame-difference saliency: best-effort pan/tilt suggestions.
//!
//! Experimental mode. Computes the centroid of pixels that changed between
//! consecutive frames and turns it into a pan/tilt correction that would
//! center the activity. Not required for docking correctness.

use crate::camera::calibration::CameraCalibration;
use crate::camera::frame::Frame;

/// Suggested head motion to center the most recent salient region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanTiltCorrection {
    /// Positive turns the head left (rad).
    pub pan_rad: f64,
    /// Positive tilts the head up (rad).
    pub tilt_rad: f64,
}

pub struct SaliencyDetector {
    prev: Option<Frame>,
    /// Grayvalue change for a pixel to count as moving.
    diff_threshold: u8,
    /// Minimum number of changed pixels before a correction is emitted.
    min_changed_pixels: usize,
}

impl SaliencyDetector {
    pub fn new() -> Self {
        Self {
            prev: None,
            diff_threshold: 20,
            min_changed_pixels: 50,
        }
    }

    pub fn reset(&mut self) {
        self.prev = None;
    }

    /// Compares against the previous frame and emits a correction when
    /// enough pixels changed.
    pub fn update(&mut self, frame: &Frame, calib: &CameraCalibration) -> Option<PanTiltCorrection> {
        let prev = self.prev.replace(frame.clone())?;
        if prev.nrows() != frame.nrows() || prev.ncols() != frame.ncols() {
            return None;
        }

        let mut count = 0usize;
        let mut sum_row = 0.0;
        let mut sum_col = 0.0;
        for row in 0..frame.nrows() {
            for col in 0..frame.ncols() {
                let diff = frame.get(row, col).abs_diff(prev.get(row, col));
                if diff >= self.diff_threshold {
                    count += 1;
                    sum_row += row as f64;
                    sum_col += col as f64;
                }
            }
        }
        if count < self.min_changed_pixels {
            return None;
        }

        let centroid_col = sum_col / count as f64;
        let centroid_row = sum_row / count as f64;
        Some(PanTiltCorrection {
            pan_rad: ((calib.cx - centroid_col) / calib.fx).atan(),
            tilt_rad: ((calib.cy - centroid_row) / calib.fy).atan(),
        })
    }
}

impl Default for SaliencyDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calib() -> CameraCalibration {
        CameraCalibration::new(300.0, 300.0, 160.0, 120.0, 240, 320)
    }

    #[test]
    fn test_first_frame_emits_nothing() {
        let mut detector = SaliencyDetector::new();
        assert!(detector.update(&Frame::zeroed(240, 320, 0.0), &calib()).is_none());
    }

    #[test]
    fn test_static_scene_emits_nothing() {
        let mut detector = SaliencyDetector::new();
        let frame = Frame::zeroed(240, 320, 0.0);
        detector.update(&frame, &calib());
        assert!(detector.update(&frame, &calib()).is_none());
    }

    #[test]
    fn test_activity_left_of_center_pans_left() {
        let mut detector = SaliencyDetector::new();
        let first = Frame::zeroed(240, 320, 0.0);
        detector.update(&first, &calib());

        // Light up a block well left of the principal point.
        let mut second = Frame::zeroed(240, 320, 0.033);
        for row in 100..140 {
            for col in 20..60 {
                second.set(row, col, 255);
            }
        }
        let correction = detector.update(&second, &calib()).unwrap();
        assert!(correction.pan_rad > 0.0);
    }
}
