//! Runtime core: service lifecycle and shutdown.
//!
//! The only public entry point from this module is [`ServiceRuntime`], which wraps a
//! node, serves its invocations over the event bus, and drains on shutdown.
//!
//! Internal modules:
//! - [`invocation`]: bus handler + per-invocation task (node call, response/error events);
//! - [`tracker`]: active invocation set and counters (shared by dispatch, drain, health);
//! - [`health`]: periodic `HEALTH.SNAPSHOT` timer;
//! - [`shutdown`]: cross-platform termination signal handling;
//! - [`runtime`]: state machine, start/stop protocol.

mod builder;
mod config;
mod health;
mod invocation;
mod runtime;
mod shutdown;
mod state;
mod tracker;

pub use builder::ServiceRuntimeBuilder;
pub use config::RuntimeConfig;
pub use runtime::ServiceRuntime;
pub use shutdown::{ShutdownSignal, ShutdownSignals, wait_for_shutdown_signal};
pub use state::ServiceState;
