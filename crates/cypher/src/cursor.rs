//! In-memory cursor for the projector (no disk persistence).
//!
//! Restarts replay from the configured start block and rebuild the store from history.

/// Cursor: position of the last applied log. In-memory only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    last_applied: Option<(u64, u64)>,
}

impl Cursor {
    pub fn new(block_number: u64, log_index: u64) -> Self {
        Self {
            last_applied: Some((block_number, log_index)),
        }
    }

    pub fn last_applied(&self) -> Option<(u64, u64)> {
        self.last_applied
    }

    /// True if `(block_number, log_index)` lies strictly after the last applied log.
    pub fn is_ahead(&self, block_number: u64, log_index: u64) -> bool {
        match self.last_applied {
            Some(last) => (block_number, log_index) > last,
            None => true,
        }
    }

    pub fn advance(&mut self, block_number: u64, log_index: u64) {
        self.last_applied = Some((block_number, log_index));
    }
}
