//! # Immutable event record carried by the bus.
//!
//! An [`EventEnvelope`] holds a dot-segmented type tag, an opaque JSON payload,
//! a correlation identifier and a creation timestamp. Once published it is shared
//! as `Arc<EventEnvelope>` and handlers only ever see `&EventEnvelope`; a handler
//! that wants a modified copy clones it.
//!
//! ## Ordering
//! Each envelope gets a process-wide, monotonically increasing `seq` at construction.
//! It orders history entries and log lines; delivery order between concurrent
//! producers is not implied by it.
//!
//! ## Example
//! ```rust
//! use nodevisor::EventEnvelope;
//! use serde_json::json;
//!
//! let ev = EventEnvelope::new("LOG.INFO", json!("hello"));
//! assert_eq!(ev.event_type(), "LOG.INFO");
//! assert_eq!(ev.payload(), &json!("hello"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use serde_json::Value;
use uuid::Uuid;

/// Global sequence counter for envelope ordering.
static ENVELOPE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Immutable event record: type tag, payload, correlation id, timestamp.
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    seq: u64,
    event_type: Arc<str>,
    payload: Value,
    correlation_id: Uuid,
    timestamp: SystemTime,
}

impl EventEnvelope {
    /// Creates an envelope with a fresh correlation id and the current timestamp.
    pub fn new(event_type: impl Into<Arc<str>>, payload: Value) -> Self {
        Self {
            seq: ENVELOPE_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            event_type: event_type.into(),
            payload,
            correlation_id: Uuid::new_v4(),
            timestamp: SystemTime::now(),
        }
    }

    /// Replaces the generated correlation id with the producer's own.
    #[inline]
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = id;
        self
    }

    /// Dot-segmented type tag (e.g. `"TOOL.INVOCATION"`).
    #[inline]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    #[inline]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    #[inline]
    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// Wall-clock creation time.
    #[inline]
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Monotonic sequence number assigned at construction.
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }
}
