//! Grayscale camera frames.

use crate::error::{VisionError, VisionResult};

/// One grayscale frame plus its capture timestamp (seconds).
#[derive(Debug, Clone)]
pub struct Frame {
    data: Vec<u8>,
    nrows: usize,
    ncols: usize,
    pub timestamp: f64,
}

impl Frame {
    /// A zero-filled frame, mostly useful for tests and the demo binary.
    pub fn zeroed(nrows: usize, ncols: usize, timestamp: f64) -> Self {
        Self {
            data: vec![0; nrows * ncols],
            nrows,
            ncols,
            timestamp,
        }
    }

    pub fn from_data(data: Vec<u8>, nrows: usize, ncols: usize, timestamp: f64) -> VisionResult<Self> {
        if data.len() != nrows * ncols {
            return Err(VisionError::InvalidSize(nrows, ncols));
        }
        Ok(Self {
            data,
            nrows,
            ncols,
            timestamp,
        })
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.data[row * self.ncols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        self.data[row * self.ncols + col] = value;
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bilinear sample at fractional (row, col); `None` outside the frame.
    pub fn sample_bilinear(&self, row: f64, col: f64) -> Option<f64> {
        if !(row.is_finite() && col.is_finite()) {
            return None;
        }
        if row < 0.0 || col < 0.0 {
            return None;
        }
        let r0 = row.floor() as usize;
        let c0 = col.floor() as usize;
        if r0 + 1 >= self.nrows || c0 + 1 >= self.ncols {
            return None;
        }
        let fr = row - r0 as f64;
        let fc = col - c0 as f64;
        let p00 = self.get(r0, c0) as f64;
        let p01 = self.get(r0, c0 + 1) as f64;
        let p10 = self.get(r0 + 1, c0) as f64;
        let p11 = self.get(r0 + 1, c0 + 1) as f64;
        Some(
            p00 * (1.0 - fr) * (1.0 - fc)
                + p01 * (1.0 - fr) * fc
                + p10 * fr * (1.0 - fc)
                + p11 * fr * fc,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_data_validates_length() {
        assert!(Frame::from_data(vec![0; 12], 3, 4, 0.0).is_ok());
        assert_eq!(
            Frame::from_data(vec![0; 11], 3, 4, 0.0).err(),
            Some(VisionError::InvalidSize(3, 4))
        );
    }

    #[test]
    fn test_bilinear_interpolates() {
        let mut frame = Frame::zeroed(2, 2, 0.0);
        frame.set(0, 0, 0);
        frame.set(0, 1, 100);
        frame.set(1, 0, 100);
        frame.set(1, 1, 200);

        assert_relative_eq!(frame.sample_bilinear(0.5, 0.5).unwrap(), 100.0);
        assert_relative_eq!(frame.sample_bilinear(0.0, 0.0).unwrap(), 0.0);
        assert!(frame.sample_bilinear(1.5, 0.5).is_none());
    }
}
