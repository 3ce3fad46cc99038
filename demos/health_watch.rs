//! # Example: health_watch
//!
//! Runs a service for a few seconds with the built-in [`LogWriter`] tracing all traffic,
//! then stops it programmatically with a drain timeout shorter than the slowest call.
//!
//! Demonstrates how to:
//! - Subscribe [`LogWriter`] to `"**"` (requires the `logging` feature).
//! - Observe `HEALTH.SNAPSHOT` events while work is in flight.
//! - Read the `HEALTH.SHUTDOWN` report when a stuck invocation is abandoned.
//!
//! ## Run
//! ```bash
//! cargo run --example health_watch --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use nodevisor::{EventBus, EventEnvelope, LogWriter, NodeError, NodeFn, ServiceRuntime};
use serde_json::{Value, json};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let bus = EventBus::default();
    bus.subscribe("**", Arc::new(LogWriter::new()))?;

    // Sleeps for `input` seconds.
    let sleepy = NodeFn::arc("sleepy", |input: Value| async move {
        let secs = input.as_u64().ok_or_else(|| NodeError::fail("expected seconds"))?;
        tokio::time::sleep(Duration::from_secs(secs)).await;
        Ok::<_, NodeError>(json!({ "slept": secs }))
    });

    let service = ServiceRuntime::builder(bus.clone(), sleepy)
        .with_health_interval(Duration::from_secs(1))
        .build();
    service.start()?;

    for secs in [1, 2, 60] {
        bus.publish(EventEnvelope::new("TOOL.INVOCATION", json!(secs)))?;
    }

    tokio::time::sleep(Duration::from_millis(3500)).await;

    if let Some(report) = service.stop(Duration::from_secs(1)).await {
        println!(
            "drained={} abandoned={} succeeded={}",
            report.drained, report.abandoned, report.succeeded
        );
    }
    Ok(())
}
