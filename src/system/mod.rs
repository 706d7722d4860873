//! System orchestration: the per-cycle pipeline, its result mailboxes, and
//! the thread that drives it.

pub mod mailboxes;
pub mod vision_runner;
pub mod vision_system;

pub use mailboxes::VisionMailboxes;
pub use vision_runner::{FrameMsg, VisionRunner};
pub use vision_system::{VisionSystem, MAX_TRACKING_FAILURES};
