//! Fixed-capacity ring of recently published envelopes.
//!
//! Diagnostics only: the history is never used for delivery or replay guarantees.

use std::collections::VecDeque;
use std::sync::Arc;

use super::envelope::EventEnvelope;

/// FIFO ring buffer; the oldest envelope is evicted when full.
#[derive(Debug)]
pub struct HistoryBuffer {
    items: VecDeque<Arc<EventEnvelope>>,
    capacity: usize,
}

impl HistoryBuffer {
    /// Creates an empty buffer. Capacity is clamped to a minimum of 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an envelope, evicting the oldest one when full.
    pub fn push(&mut self, ev: Arc<EventEnvelope>) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(ev);
    }

    /// Returns the buffered envelopes, oldest first.
    pub fn snapshot(&self) -> Vec<Arc<EventEnvelope>> {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
