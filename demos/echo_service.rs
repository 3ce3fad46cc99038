//! # Example: echo_service
//!
//! Minimal long-running service: an echo node served until Ctrl-C / SIGTERM.
//!
//! Demonstrates how to:
//! - Wrap a closure as a node with [`NodeFn`].
//! - Subscribe to responses and errors on the shared [`EventBus`].
//! - Serve with [`ServiceRuntime::run_until_signal`] and print the shutdown report.
//!
//! ## Flow
//! ```text
//! main
//!  ├─► bus.subscribe("TOOL.*")          (prints replies)
//!  ├─► producer task: publish(TOOL.INVOCATION) every second
//!  └─► run_until_signal()
//!        ├─► start()
//!        ├─► INVOCATION ─► echo node ─► RESPONSE
//!        └─► SIGINT/SIGTERM ─► drain ─► HEALTH.SHUTDOWN
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example echo_service
//! # press Ctrl-C to drain and exit
//! ```

use std::time::Duration;

use nodevisor::{EventBus, EventEnvelope, NodeError, NodeFn, ServiceRuntime};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Structured logs (RUST_LOG=debug for dispatch details)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // 2. Shared bus and a consumer for the service's replies
    let bus = EventBus::default();
    bus.subscribe_fn("TOOL.RESPONSE", |ev| {
        println!("[reply] {} -> {}", ev.correlation_id(), ev.payload()["result"]);
        Ok(())
    })?;
    bus.subscribe_fn("TOOL.ERROR", |ev| {
        println!("[error] {} -> {}", ev.correlation_id(), ev.payload()["error"]);
        Ok(())
    })?;

    // 3. The node: echo objects, reject everything else
    let echo = NodeFn::arc("echo", |input: Value| async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        if input.is_object() {
            Ok(input)
        } else {
            Err(NodeError::InvalidInput {
                message: format!("expected an object, got {input}"),
            })
        }
    });

    let service = ServiceRuntime::builder(bus.clone(), echo)
        .with_drain_timeout(Duration::from_secs(5))
        .with_health_interval(Duration::from_secs(5))
        .build();

    // 4. A producer sending one request per second, every third one malformed
    let producer = bus.clone();
    tokio::spawn(async move {
        let mut n = 0u64;
        loop {
            tokio::time::sleep(Duration::from_secs(1)).await;
            n += 1;
            let payload = if n % 3 == 0 {
                json!(n)
            } else {
                json!({ "n": n })
            };
            if producer
                .publish(EventEnvelope::new("TOOL.INVOCATION", payload))
                .is_err()
            {
                break;
            }
        }
    });

    // 5. Serve until a termination signal has drained the service
    if let Some(report) = service.run_until_signal().await? {
        println!(
            "[shutdown] total={} ok={} failed={} abandoned={}",
            report.total, report.succeeded, report.failed, report.abandoned
        );
    }
    Ok(())
}
