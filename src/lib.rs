//! # nodevisor
//!
//! **Nodevisor** turns a unit of business logic (a *node*) into a long-lived,
//! event-driven service running on tokio.
//!
//! It provides an in-process event bus with pattern routing, and a service runtime
//! that answers invocation events by calling the node, replies with response or
//! error events, reports health, and shuts down by draining in-flight work.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   producers                                   consumers
//!   (user code)                                 (user handlers)
//!        │                                            ▲
//!        │ publish(TOOL.INVOCATION)                   │ TOOL.RESPONSE / TOOL.ERROR / HEALTH.*
//!        ▼                                            │
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  EventBus                                                         │
//! │  - SubscriptionRegistry (pattern → handler, registration order)   │
//! │  - HistoryBuffer (bounded ring of recent envelopes)               │
//! │  - per-handler failure isolation (errors + panics counted)        │
//! └──────┬────────────────────────────────────────────────────▲───────┘
//!        │ InvocationHandler (sync: admit + spawn)            │ publish
//!        ▼                                                    │
//! ┌───────────────────────────────────────────────────────────┴───────┐
//! │  ServiceRuntime                                                   │
//! │  - InvocationTracker (active set + counters, one mutex)           │
//! │  - invocation tasks ──► Node::run(input)                          │
//! │  - health timer ──► HEALTH.SNAPSHOT                               │
//! │  - stop()/signals ──► drain (timeout) ──► HEALTH.SHUTDOWN         │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Stopped ──► Starting ──► Running ──► Draining ──► Terminated
//!
//! Running:
//!   INVOCATION ─► admit(correlation_id) ─► spawn ─► node.run(payload)
//!                                                   ├─ Ok  ─► RESPONSE {correlation_id, result}
//!                                                   └─ Err ─► ERROR {correlation_id, error{kind,message}}
//! Draining:
//!   unsubscribe ─► wait for active invocations (bounded) ─► abandon the rest ─► report
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                        |
//! |-------------------|--------------------------------------------------------------|-------------------------------------------|
//! | **Bus**           | Pattern-routed pub/sub with bounded history.                 | [`EventBus`], [`Pattern`], [`EventEnvelope`] |
//! | **Handlers**      | Synchronous, fail-isolated bus callbacks.                    | [`Handler`], [`HandlerFn`]                |
//! | **Nodes**         | Business logic wrapped as a service.                         | [`Node`], [`NodeFn`], [`NodeRef`]         |
//! | **Service**       | Start, serve, report health, drain on stop/signal.           | [`ServiceRuntime`], [`ServiceState`]      |
//! | **Errors**        | Typed errors for routing, nodes and lifecycle.               | [`BusError`], [`NodeError`], [`RuntimeError`] |
//! | **Configuration** | Runtime settings with sentinel helpers.                      | [`RuntimeConfig`]                         |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], a handler that traces every envelope it receives.
//!
//! ## Example
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use std::time::Duration;
//! use nodevisor::{EventBus, EventEnvelope, NodeError, NodeFn, ResponsePayload, ServiceRuntime};
//! use serde_json::{Value, json};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = EventBus::default();
//!
//!     let replies = Arc::new(Mutex::new(Vec::new()));
//!     let sink = replies.clone();
//!     bus.subscribe_fn("*.RESPONSE", move |ev| {
//!         sink.lock().unwrap().push(ev.clone());
//!         Ok(())
//!     })?;
//!
//!     let echo = NodeFn::arc("echo", |input: Value| async move { Ok::<_, NodeError>(input) });
//!     let service = ServiceRuntime::builder(bus.clone(), echo)
//!         .with_health_interval(Duration::ZERO)
//!         .build();
//!     service.start()?;
//!
//!     let request = EventEnvelope::new("TOOL.INVOCATION", json!({"msg": "hi"}));
//!     let id = request.correlation_id();
//!     bus.publish(request)?;
//!
//!     service.stop(Duration::from_secs(1)).await;
//!
//!     let replies = replies.lock().unwrap();
//!     let reply: ResponsePayload = serde_json::from_value(replies[0].payload().clone())?;
//!     assert_eq!(reply.correlation_id, id);
//!     assert_eq!(reply.result, json!({"msg": "hi"}));
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod handlers;
mod nodes;

// ---- Public re-exports ----

pub use core::{
    RuntimeConfig, ServiceRuntime, ServiceRuntimeBuilder, ServiceState, ShutdownSignal,
    ShutdownSignals, wait_for_shutdown_signal,
};
pub use error::{BusError, HandlerError, NodeError, RuntimeError};
pub use events::{
    DEFAULT_HISTORY_CAPACITY, ErrorDescriptor, ErrorPayload, EventBus, EventEnvelope,
    HEALTH_SHUTDOWN, HEALTH_SNAPSHOT, HealthSnapshot, HistoryBuffer, Pattern, ResponsePayload,
    ServiceTopics, ShutdownReport, SubscriptionHandle, SubscriptionId,
};
pub use handlers::{Handler, HandlerFn, HandlerRef};
pub use nodes::{Node, NodeFn, NodeRef};

// Optional: expose a simple built-in tracing handler (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use handlers::LogWriter;
