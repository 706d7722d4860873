//! Single-slot, last-writer-wins handoff between the vision thread and the
//! consumer thread.
//!
//! Deliberately not a queue: the consumer only ever wants the most recent
//! result of each kind, so a second `put` before a `take` silently discards
//! the first value. Lock hold time is one struct copy.

use parking_lot::Mutex;

pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Overwrites the slot unconditionally and marks it occupied.
    pub fn put(&self, value: T) {
        *self.slot.lock() = Some(value);
    }

    /// Takes the value, clearing occupancy; `None` when the slot is empty.
    pub fn take(&self) -> Option<T> {
        self.slot.lock().take()
    }

    pub fn is_occupied(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mailbox = Mailbox::new();
        mailbox.put(7u32);
        assert!(mailbox.is_occupied());
        assert_eq!(mailbox.take(), Some(7));
        assert_eq!(mailbox.take(), None);
        assert!(!mailbox.is_occupied());
    }

    #[test]
    fn test_last_writer_wins() {
        let mailbox = Mailbox::new();
        mailbox.put(1u32);
        mailbox.put(2u32);
        assert_eq!(mailbox.take(), Some(2));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn test_empty_take_returns_none() {
        let mailbox: Mailbox<u32> = Mailbox::new();
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn test_shared_across_threads() {
        use std::sync::Arc;

        let mailbox = Arc::new(Mailbox::new());
        let producer = mailbox.clone();
        let handle = std::thread::spawn(move || {
            for i in 0..100u32 {
                producer.put(i);
            }
        });
        handle.join().unwrap();
        assert_eq!(mailbox.take(), Some(99));
    }
}
