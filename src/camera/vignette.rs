//! In-place radial vignetting correction.

use crate::camera::frame::Frame;
use crate::config::VignettingParams;

/// Applies the 5-coefficient radial gain polynomial to the frame in place.
///
/// The radius is measured from the image center and normalized so the far
/// corner sits at r = 1. Results saturate at 255.
pub fn correct_vignetting(frame: &mut Frame, params: &VignettingParams) {
    if !params.enabled {
        return;
    }
    let nrows = frame.nrows();
    let ncols = frame.ncols();
    let center_r = (nrows as f64 - 1.0) / 2.0;
    let center_c = (ncols as f64 - 1.0) / 2.0;
    let max_radius = (center_r * center_r + center_c * center_c).sqrt().max(1.0);
    let c = params.coeffs;

    for row in 0..nrows {
        let dr = row as f64 - center_r;
        for col in 0..ncols {
            let dc = col as f64 - center_c;
            let r = (dr * dr + dc * dc).sqrt() / max_radius;
            let gain = c[0] + r * (c[1] + r * (c[2] + r * (c[3] + r * c[4])));
            let corrected = (frame.get(row, col) as f64 * gain).round();
            frame.set(row, col, corrected.clamp(0.0, 255.0) as u8);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_is_identity() {
        let mut frame = Frame::zeroed(240, 320, 0.0);
        frame.pixels_mut().fill(80);
        correct_vignetting(&mut frame, &VignettingParams::default());
        assert!(frame.pixels().iter().all(|&p| p == 80));
    }

    #[test]
    fn test_unit_polynomial_is_identity() {
        let mut frame = Frame::zeroed(240, 320, 0.0);
        frame.pixels_mut().fill(80);
        let params = VignettingParams {
            enabled: true,
            coeffs: [1.0, 0.0, 0.0, 0.0, 0.0],
        };
        correct_vignetting(&mut frame, &params);
        assert!(frame.pixels().iter().all(|&p| p == 80));
    }

    #[test]
    fn test_quadratic_term_brightens_corners() {
        let mut frame = Frame::zeroed(240, 320, 0.0);
        frame.pixels_mut().fill(100);
        let params = VignettingParams {
            enabled: true,
            coeffs: [1.0, 0.0, 0.5, 0.0, 0.0],
        };
        correct_vignetting(&mut frame, &params);
        // Center untouched, far corner boosted by the r^2 term.
        assert_eq!(frame.get(120, 160), 100);
        assert_eq!(frame.get(0, 0), 150);
    }
}
