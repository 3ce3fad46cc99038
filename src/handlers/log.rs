//! # LogWriter: envelope tracer
//!
//! A minimal handler that writes every envelope it receives to `tracing`.
//! Use it for debugging or demos; subscribe it to `"**"` to see all traffic.
//!
//! ## Example output
//! ```text
//! INFO nodevisor::handlers::log: event seq=4 event_type=TOOL.RESPONSE correlation_id=4b1f…
//! WARN nodevisor::handlers::log: error event seq=7 event_type=TOOL.ERROR kind="timeout"
//! INFO nodevisor::handlers::log: health uptime_seconds=10.0 active=2 total=14
//! ```

use tracing::{info, warn};

use crate::error::HandlerError;
use crate::events::{EventEnvelope, HEALTH_SHUTDOWN, HEALTH_SNAPSHOT};
use crate::handlers::Handler;

/// Envelope tracer handler.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Handler for LogWriter {
    fn handle(&self, e: &EventEnvelope) -> Result<(), HandlerError> {
        let p = e.payload();
        match e.event_type() {
            HEALTH_SNAPSHOT => {
                info!(
                    uptime_seconds = %p["uptime_seconds"],
                    active = %p["active_count"],
                    total = %p["total"],
                    succeeded = %p["succeeded"],
                    failed = %p["failed"],
                    "health"
                );
            }
            HEALTH_SHUTDOWN => {
                info!(
                    drained = %p["drained"],
                    abandoned = %p["abandoned"],
                    total = %p["total"],
                    "shutdown"
                );
            }
            t if t.ends_with(".ERROR") => {
                warn!(
                    seq = e.seq(),
                    event_type = t,
                    correlation_id = %e.correlation_id(),
                    kind = %p["error"]["kind"],
                    reason = %p["error"]["message"],
                    "error event"
                );
            }
            t => {
                info!(
                    seq = e.seq(),
                    event_type = t,
                    correlation_id = %e.correlation_id(),
                    "event"
                );
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "LogWriter"
    }
}
