//! Owns the vision thread: frames go in over a bounded channel, results come
//! back through the shared mailboxes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, error, info};

use crate::camera::frame::Frame;
use crate::system::mailboxes::VisionMailboxes;
use crate::system::vision_system::VisionSystem;
use crate::tracking::predictor::RobotState;

/// Frames the capture side manages to queue beyond the one being processed
/// are stale by definition; anything deeper just adds latency.
const FRAME_CHANNEL_CAPACITY: usize = 2;

/// One frame paired with the robot state at its capture time.
pub struct FrameMsg {
    pub robot: RobotState,
    pub frame: Frame,
}

/// Handle to the running vision thread.
///
/// Dropping the runner shuts the thread down and joins it.
pub struct VisionRunner {
    mailboxes: Arc<VisionMailboxes>,
    frame_tx: Sender<FrameMsg>,
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl VisionRunner {
    pub fn spawn(system: VisionSystem) -> Self {
        let mailboxes = system.mailboxes();
        let (frame_tx, frame_rx) = bounded(FRAME_CHANNEL_CAPACITY);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = shutdown.clone();
        let handle = thread::Builder::new()
            .name("vision".into())
            .spawn(move || run_loop(system, frame_rx, shutdown_flag))
            .ok();
        if handle.is_none() {
            error!("failed to spawn vision thread");
        }
        Self {
            mailboxes,
            frame_tx,
            shutdown,
            handle,
        }
    }

    pub fn mailboxes(&self) -> &Arc<VisionMailboxes> {
        &self.mailboxes
    }

    /// Hands a frame to the vision thread. Returns false when the channel is
    /// full and the frame was dropped.
    pub fn submit_frame(&self, robot: RobotState, frame: Frame) -> bool {
        match self.frame_tx.try_send(FrameMsg { robot, frame }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("vision thread busy, dropping frame");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                error!("vision thread gone, dropping frame");
                false
            }
        }
    }

    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("vision thread panicked");
            }
        }
    }
}

impl Drop for VisionRunner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_loop(mut system: VisionSystem, frame_rx: Receiver<FrameMsg>, shutdown: Arc<AtomicBool>) {
    info!("vision thread started");
    while !shutdown.load(Ordering::SeqCst) {
        match frame_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(mut msg) => {
                if let Err(err) = system.update(msg.robot, &mut msg.frame) {
                    error!(%err, "vision update failed");
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    info!("vision thread exiting");
}
