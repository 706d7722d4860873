//! Deferred snapshot capture.
//!
//! A snapshot request is staged by the consumer thread and fulfilled by the
//! vision thread on the next cycle with a frame available. The output buffer
//! and ready flag are shared handles so the consumer can poll for completion
//! without blocking the vision thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::camera::frame::Frame;
use crate::error::{VisionError, VisionResult};

/// Region of interest in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub top: usize,
    pub left: usize,
    pub height: usize,
    pub width: usize,
}

/// One pending snapshot request.
#[derive(Clone)]
pub struct SnapshotRequest {
    pub roi: Roi,
    pub subsample: usize,
    pub buffer: Arc<Mutex<Vec<u8>>>,
    pub ready: Arc<AtomicBool>,
}

/// Holds at most one pending request; re-requests while pending are no-ops.
#[derive(Default)]
pub struct SnapshotSlot {
    pending: Option<SnapshotRequest>,
}

impl SnapshotSlot {
    pub fn new() -> Self {
        Self { pending: None }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Stages a request. Returns false (and changes nothing) if another
    /// request is already pending.
    pub fn request(&mut self, request: SnapshotRequest) -> bool {
        if self.pending.is_some() {
            warn!("snapshot already pending, ignoring new request");
            return false;
        }
        self.pending = Some(request);
        true
    }

    /// Fulfills the pending request from `frame`, if any.
    ///
    /// The ROI and subsample factor are validated against the frame here, at
    /// fulfillment time; on failure the request is dropped, the ready flag is
    /// never set, and the error propagates to the caller.
    pub fn fulfill(&mut self, frame: &Frame) -> VisionResult<()> {
        let request = match self.pending.take() {
            Some(r) => r,
            None => return Ok(()),
        };

        let roi = request.roi;
        let sub = request.subsample;
        if sub == 0 {
            return Err(VisionError::InvalidParameter("zero snapshot subsample"));
        }
        let out_of_bounds = roi.height == 0
            || roi.width == 0
            || roi.top + roi.height > frame.nrows()
            || roi.left + roi.width > frame.ncols();
        if out_of_bounds {
            return Err(VisionError::InvalidSize(roi.height, roi.width));
        }
        if roi.height % sub != 0 || roi.width % sub != 0 {
            return Err(VisionError::InvalidSize(roi.height, roi.width));
        }

        let out_rows = roi.height / sub;
        let out_cols = roi.width / sub;
        let mut buffer = request.buffer.lock();
        if buffer.len() != out_rows * out_cols {
            return Err(VisionError::InvalidSize(out_rows, out_cols));
        }

        for r in 0..out_rows {
            for c in 0..out_cols {
                buffer[r * out_cols + c] = frame.get(roi.top + r * sub, roi.left + c * sub);
            }
        }
        drop(buffer);

        request.ready.store(true, Ordering::SeqCst);
        Ok(())
    }
}
