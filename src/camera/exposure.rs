//! Auto-exposure controller.
//!
//! Evaluates a high percentile of the frame intensity histogram every N
//! frames and nudges the exposure time by a bounded increment toward the
//! target high value. The `VisionSystem` skips the evaluation on cycles
//! where a tracker update already ran, so a lighting step never lands inside
//! a convergence.

use tracing::debug;

use crate::camera::frame::Frame;
use crate::config::ExposureParams;

/// Seconds of exposure per integer sensor count.
const SECONDS_PER_COUNT: f64 = 1e-3;

pub struct AutoExposure {
    params: ExposureParams,
    exposure_s: f64,
    frames_until_eval: u32,
}

impl AutoExposure {
    pub fn new(params: ExposureParams) -> Self {
        let exposure_s = 0.5 * (params.min_exposure_s + params.max_exposure_s);
        Self {
            params,
            exposure_s,
            frames_until_eval: 0,
        }
    }

    pub fn exposure_s(&self) -> f64 {
        self.exposure_s
    }

    /// Runs one evaluation if due; returns the new exposure time when it
    /// changed.
    pub fn update(&mut self, frame: &Frame) -> Option<f64> {
        if self.frames_until_eval > 0 {
            self.frames_until_eval -= 1;
            return None;
        }
        self.frames_until_eval = self.params.eval_period_frames.saturating_sub(1);

        let high = percentile_intensity(frame, self.params.target_percentile);
        let step = self.params.increment_counts as f64 * SECONDS_PER_COUNT;
        let target = self.params.target_high_value;

        let previous = self.exposure_s;
        if high > target {
            self.exposure_s -= step;
        } else if high < target {
            self.exposure_s += step;
        }
        self.exposure_s = self
            .exposure_s
            .clamp(self.params.min_exposure_s, self.params.max_exposure_s);

        if (self.exposure_s - previous).abs() > f64::EPSILON {
            debug!(
                high_value = high,
                exposure_s = self.exposure_s,
                "auto-exposure adjusted"
            );
            Some(self.exposure_s)
        } else {
            None
        }
    }
}

/// Intensity at the given percentile of the frame histogram.
fn percentile_intensity(frame: &Frame, percentile: f64) -> u8 {
    let mut histogram = [0usize; 256];
    for &px in frame.pixels() {
        histogram[px as usize] += 1;
    }
    let total = frame.pixels().len();
    let threshold = (percentile.clamp(0.0, 1.0) * total as f64).ceil() as usize;
    let mut cumulative = 0;
    for (value, &count) in histogram.iter().enumerate() {
        cumulative += count;
        if cumulative >= threshold {
            return value as u8;
        }
    }
    255
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_frame(value: u8) -> Frame {
        let mut frame = Frame::zeroed(240, 320, 0.0);
        frame.pixels_mut().fill(value);
        frame
    }

    #[test]
    fn test_dark_frame_raises_exposure() {
        let mut ae = AutoExposure::new(ExposureParams::default());
        let before = ae.exposure_s();
        let changed = ae.update(&flat_frame(10));
        assert!(changed.is_some());
        assert!(ae.exposure_s() > before);
    }

    #[test]
    fn test_saturated_frame_lowers_exposure() {
        let mut ae = AutoExposure::new(ExposureParams::default());
        let before = ae.exposure_s();
        ae.update(&flat_frame(255));
        assert!(ae.exposure_s() < before);
    }

    #[test]
    fn test_eval_period_is_respected() {
        let params = ExposureParams {
            eval_period_frames: 2,
            ..ExposureParams::default()
        };
        let mut ae = AutoExposure::new(params);
        assert!(ae.update(&flat_frame(10)).is_some());
        // Next frame falls inside the evaluation period.
        assert!(ae.update(&flat_frame(10)).is_none());
        assert!(ae.update(&flat_frame(10)).is_some());
    }

    #[test]
    fn test_exposure_clamped_to_range() {
        let params = ExposureParams {
            eval_period_frames: 1,
            ..ExposureParams::default()
        };
        let max = params.max_exposure_s;
        let mut ae = AutoExposure::new(params);
        for _ in 0..1000 {
            ae.update(&flat_frame(0));
        }
        assert!(ae.exposure_s() <= max);
    }

    #[test]
    fn test_percentile_of_flat_frame() {
        assert_eq!(percentile_intensity(&flat_frame(42), 0.95), 42);
    }
}
