use crate::error::{FrameError, Result};

/// Per-connection source of request sequence numbers.
///
/// Starts at 0 and hands out each `u32` exactly once. After `u32::MAX` has
/// been issued the counter is exhausted and every further draw fails; it
/// never wraps around onto sequence numbers that may still be in flight.
#[derive(Debug, Clone)]
pub struct SequenceCounter {
    next: Option<u32>,
    last: Option<u32>,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// A counter whose first issued value is `origin`.
    pub fn starting_at(origin: u32) -> Self {
        Self {
            next: Some(origin),
            last: None,
        }
    }

    /// Issue the next sequence number.
    pub fn next_sequence(&mut self) -> Result<u32> {
        let current = self.next.ok_or(FrameError::SequenceExhausted {
            last: self.last.unwrap_or(u32::MAX),
        })?;
        self.next = current.checked_add(1);
        self.last = Some(current);
        Ok(current)
    }

    /// The value the next call to [`next_sequence`](Self::next_sequence)
    /// would return, if any.
    pub fn peek(&self) -> Option<u32> {
        self.next
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}
