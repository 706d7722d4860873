//! Bump-pointer scratch arenas.
//!
//! All per-frame allocations come from three fixed regions that are reset
//! once per processing cycle; nothing in the hot path touches the general
//! heap. Exceeding a region's capacity is a configuration error, not a
//! runtime condition, since the regions are sized to the worst case.

use crate::error::{VisionError, VisionResult};

/// Allocation alignment within an arena.
const ARENA_ALIGN: usize = 8;

/// A fixed-capacity byte region with a bump pointer.
pub struct Arena {
    name: &'static str,
    buf: Vec<u8>,
    top: usize,
}

impl Arena {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            buf: vec![0; capacity],
            top: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn used(&self) -> usize {
        self.top
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.aligned_top()
    }

    fn aligned_top(&self) -> usize {
        (self.top + ARENA_ALIGN - 1) & !(ARENA_ALIGN - 1)
    }

    /// Carves `len` bytes off the top of the arena.
    pub fn alloc(&mut self, len: usize) -> VisionResult<&mut [u8]> {
        let start = self.aligned_top();
        let end = start.checked_add(len).ok_or(VisionError::OutOfMemory {
            requested: len,
            remaining: 0,
        })?;
        if end > self.buf.len() {
            return Err(VisionError::OutOfMemory {
                requested: len,
                remaining: self.buf.len().saturating_sub(start),
            });
        }
        self.top = end;
        Ok(&mut self.buf[start..end])
    }

    /// Rewinds the bump pointer; previously handed-out slices are gone.
    pub fn reset(&mut self) {
        self.top = 0;
    }
}

/// Default capacity of the tightly-coupled "fast" region.
pub const FAST_SCRATCH_BYTES: usize = 48 * 1024;
/// Default capacity of the on-chip region.
pub const ONCHIP_SCRATCH_BYTES: usize = 192 * 1024;
/// Default capacity of the off-chip region.
pub const OFFCHIP_SCRATCH_BYTES: usize = 2 * 1024 * 1024;

/// The three scratch regions owned by the vision thread.
pub struct VisionMemory {
    pub fast: Arena,
    pub onchip: Arena,
    pub offchip: Arena,
}

impl VisionMemory {
    pub fn new() -> Self {
        Self {
            fast: Arena::new("fast", FAST_SCRATCH_BYTES),
            onchip: Arena::new("onchip", ONCHIP_SCRATCH_BYTES),
            offchip: Arena::new("offchip", OFFCHIP_SCRATCH_BYTES),
        }
    }

    /// Called once at the top of every processing cycle.
    pub fn reset_all(&mut self) {
        self.fast.reset();
        self.onchip.reset();
        self.offchip.reset();
    }
}

impl Default for VisionMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_within_capacity() {
        let mut arena = Arena::new("test", 64);
        let slice = arena.alloc(16).unwrap();
        assert_eq!(slice.len(), 16);
        assert_eq!(arena.used(), 16);
    }

    #[test]
    fn test_alloc_is_aligned() {
        let mut arena = Arena::new("test", 64);
        arena.alloc(3).unwrap();
        arena.alloc(8).unwrap();
        // Second allocation started at the next 8-byte boundary.
        assert_eq!(arena.used(), 16);
    }

    #[test]
    fn test_overflow_is_hard_error() {
        let mut arena = Arena::new("test", 32);
        arena.alloc(24).unwrap();
        let err = arena.alloc(16).unwrap_err();
        assert_eq!(
            err,
            VisionError::OutOfMemory {
                requested: 16,
                remaining: 8
            }
        );
    }

    #[test]
    fn test_reset_reclaims_everything() {
        let mut arena = Arena::new("test", 32);
        arena.alloc(32).unwrap();
        assert!(arena.alloc(1).is_err());
        arena.reset();
        assert!(arena.alloc(32).is_ok());
    }

    #[test]
    fn test_vision_memory_reset_all() {
        let mut memory = VisionMemory::new();
        memory.fast.alloc(100).unwrap();
        memory.onchip.alloc(100).unwrap();
        memory.offchip.alloc(100).unwrap();
        memory.reset_all();
        assert_eq!(memory.fast.used(), 0);
        assert_eq!(memory.onchip.used(), 0);
        assert_eq!(memory.offchip.used(), 0);
    }
}
