//! Events: data model, routing and the in-process bus.
//!
//! ## Contents
//! - [`EventEnvelope`] immutable event record (type tag, payload, correlation id, timestamp)
//! - [`Pattern`] validated subscription pattern with `*` / `**` / prefix matching
//! - `SubscriptionRegistry` ordered pattern → handler table (internal to the bus)
//! - [`HistoryBuffer`] bounded ring of recent envelopes
//! - [`EventBus`] publish / subscribe / unsubscribe dispatcher
//! - payload types and well-known type tags used by the service runtime
//!
//! ## Quick reference
//! - **Publishers**: `ServiceRuntime` (responses, errors, health), user producers.
//! - **Consumers**: the runtime's invocation handler, user handlers.

mod bus;
mod envelope;
mod history;
mod pattern;
mod payload;
mod registry;
mod topics;

pub use bus::{DEFAULT_HISTORY_CAPACITY, EventBus, SubscriptionHandle};
pub use envelope::EventEnvelope;
pub use history::HistoryBuffer;
pub use pattern::Pattern;
pub use payload::{ErrorDescriptor, ErrorPayload, HealthSnapshot, ResponsePayload, ShutdownReport};
pub use registry::SubscriptionId;
pub use topics::{HEALTH_SHUTDOWN, HEALTH_SNAPSHOT, ServiceTopics};
