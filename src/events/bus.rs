//! # In-process event bus with pattern routing and bounded history.
//!
//! [`EventBus`] is a cheap-clone handle over shared state guarded by a mutex:
//! the subscription registry and the history ring. Producers call
//! [`publish`](EventBus::publish) from any thread; handlers run synchronously in the
//! publisher's context.
//!
//! ## Architecture
//! ```text
//! Producers (many):                     Handlers (registration order):
//!   Runtime ──┐                      ┌──► handler 1 ──► Err/panic → failures += 1
//!   Health  ──┼──► publish ──► lock ─┤    handler 2
//!   User    ──┘     │  (history,     └──► handler N
//!                   │   match set)        (called after the lock is released)
//!                   ▼
//!             HistoryBuffer (ring, oldest evicted)
//! ```
//!
//! ## Rules
//! - **Isolation**: a failing or panicking handler never stops dispatch and never
//!   reaches the publisher; it is counted in [`handler_failures`](EventBus::handler_failures).
//! - **Ordering**: handlers of one publish run in registration order. Concurrent
//!   publishes are ordered only by their arrival at the lock.
//! - **Lock scope**: the match set is computed under the lock, dispatch happens
//!   outside it, so handlers may publish/subscribe/unsubscribe re-entrantly.
//! - **At-most-once**: no persistence, no retries; an envelope published with no
//!   matching subscription is only recorded in history.
//! - **Closing**: after [`close`](EventBus::close) every subscription is dropped and
//!   `publish`/`subscribe` return [`BusError::Closed`].
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use nodevisor::{EventBus, EventEnvelope};
//! use serde_json::json;
//!
//! let bus = EventBus::new(16);
//! let hits = Arc::new(AtomicUsize::new(0));
//! let h = hits.clone();
//! bus.subscribe_fn("LOG.*", move |_ev| {
//!     h.fetch_add(1, Ordering::SeqCst);
//!     Ok(())
//! })
//! .unwrap();
//!
//! bus.publish(EventEnvelope::new("LOG.INFO", json!("hello"))).unwrap();
//! bus.publish(EventEnvelope::new("METRIC.CPU", json!(0.5))).unwrap();
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! assert_eq!(bus.history().len(), 2);
//! ```

use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::envelope::EventEnvelope;
use super::history::HistoryBuffer;
use super::pattern::Pattern;
use super::registry::{Subscription, SubscriptionId, SubscriptionRegistry};
use crate::error::{BusError, HandlerError, panic_message};
use crate::handlers::{HandlerFn, HandlerRef};

/// Default number of envelopes kept in history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Handle returned by `subscribe`, used for exact removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
}

impl SubscriptionHandle {
    /// Identity of the registration this handle removes.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

struct State {
    registry: SubscriptionRegistry,
    history: HistoryBuffer,
    closed: bool,
}

struct Inner {
    state: Mutex<State>,
    handler_failures: AtomicU64,
}

/// Publish/subscribe dispatcher shared by producers and the service runtime.
///
/// ### Properties
/// - **Cloneable**: clones share the same subscriptions and history.
/// - **Thread-safe**: `publish`, `subscribe`, `unsubscribe` may race freely.
/// - **Fail-isolated**: handler errors and panics are contained per handler.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    /// Creates a bus keeping the last `history_capacity` envelopes (min 1).
    pub fn new(history_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    registry: SubscriptionRegistry::new(),
                    history: HistoryBuffer::new(history_capacity),
                    closed: false,
                }),
                handler_failures: AtomicU64::new(0),
            }),
        }
    }

    /// Publishes an envelope to every matching subscription.
    ///
    /// - Records the envelope in history (evicting the oldest at capacity).
    /// - Invokes matching handlers in registration order, outside the lock.
    /// - Returns `Err(BusError::Closed)` only when the bus has been closed;
    ///   handler failures never surface here.
    pub fn publish(&self, envelope: EventEnvelope) -> Result<(), BusError> {
        let envelope = Arc::new(envelope);
        let targets = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(BusError::Closed);
            }
            state.history.push(Arc::clone(&envelope));
            state.registry.matching(envelope.event_type())
        };

        debug!(
            seq = envelope.seq(),
            event_type = envelope.event_type(),
            handlers = targets.len(),
            "dispatch"
        );
        for sub in &targets {
            self.dispatch_one(sub, &envelope);
        }
        Ok(())
    }

    fn dispatch_one(&self, sub: &Subscription, envelope: &EventEnvelope) {
        let handler = &sub.handler;
        let outcome =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler.handle(envelope)));

        let reason = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err.to_string(),
            Err(panic_err) => format!("panic: {}", panic_message(&*panic_err)),
        };

        self.inner
            .handler_failures
            .fetch_add(1, AtomicOrdering::Relaxed);
        warn!(
            handler = handler.name(),
            pattern = %sub.pattern,
            event_type = envelope.event_type(),
            correlation_id = %envelope.correlation_id(),
            reason = %reason,
            "handler failed"
        );
    }

    /// Registers `handler` for every event type matching `pattern`.
    ///
    /// Each call creates a new, independently removable registration.
    pub fn subscribe(
        &self,
        pattern: &str,
        handler: HandlerRef,
    ) -> Result<SubscriptionHandle, BusError> {
        let pattern = Pattern::parse(pattern)?;
        let mut state = self.inner.state.lock();
        if state.closed {
            return Err(BusError::Closed);
        }
        let id = state.registry.insert(pattern, handler);
        Ok(SubscriptionHandle { id })
    }

    /// Shorthand for subscribing a closure.
    pub fn subscribe_fn<F>(&self, pattern: &str, f: F) -> Result<SubscriptionHandle, BusError>
    where
        F: Fn(&EventEnvelope) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let name: Cow<'static, str> = Cow::Owned(format!("fn:{pattern}"));
        self.subscribe(pattern, HandlerFn::arc(name, f))
    }

    /// Removes exactly the registration behind `handle`.
    ///
    /// Unknown or already-removed handles are a no-op; returns whether anything was removed.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.inner.state.lock().registry.remove(handle.id)
    }

    /// Returns the recorded history, oldest first.
    pub fn history(&self) -> Vec<Arc<EventEnvelope>> {
        self.inner.state.lock().history.snapshot()
    }

    /// Number of handler invocations that returned an error or panicked.
    pub fn handler_failures(&self) -> u64 {
        self.inner.handler_failures.load(AtomicOrdering::Relaxed)
    }

    /// Number of live registrations.
    pub fn subscription_count(&self) -> usize {
        self.inner.state.lock().registry.len()
    }

    /// Closes the bus: drops every subscription and rejects further use.
    ///
    /// History stays readable.
    pub fn close(&self) {
        let mut state = self.inner.state.lock();
        state.closed = true;
        state.registry.clear();
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("EventBus")
            .field("subscriptions", &state.registry.len())
            .field("history", &state.history.len())
            .field("closed", &state.closed)
            .finish()
    }
}
