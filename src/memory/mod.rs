//! Fixed-capacity scratch memory for the per-frame hot path.

pub mod arena;

pub use arena::{Arena, VisionMemory};
