//! # Bus handler trait and closure adapter.
//!
//! Provides [`Handler`], the callback invoked by the [`EventBus`](crate::EventBus) for
//! every envelope whose type matches the handler's subscription pattern.
//!
//! ## Rules
//! - Handlers run **synchronously** inside `publish`, outside the bus lock.
//! - Handlers for one publish run in subscription-registration order.
//! - A handler that returns `Err` or panics is isolated: the bus counts the failure,
//!   logs it, and keeps dispatching to the remaining handlers.
//! - Handlers must not block; long work belongs on a spawned task.
//! - A handler that needs to reply publishes a new envelope.
//!
//! ## Example
//! ```rust
//! use nodevisor::{EventEnvelope, Handler, HandlerError};
//!
//! struct Audit;
//!
//! impl Handler for Audit {
//!     fn handle(&self, ev: &EventEnvelope) -> Result<(), HandlerError> {
//!         if ev.payload().is_null() {
//!             return Err("empty payload".into());
//!         }
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &str { "audit" }
//! }
//! ```

use std::borrow::Cow;
use std::sync::Arc;

use crate::error::HandlerError;
use crate::events::EventEnvelope;

/// Callback registered on the event bus.
pub trait Handler: Send + Sync + 'static {
    /// Processes one envelope.
    ///
    /// Called from the publisher's context; the envelope is shared and read-only.
    fn handle(&self, event: &EventEnvelope) -> Result<(), HandlerError>;

    /// Returns the handler name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Shared handle to a handler.
pub type HandlerRef = Arc<dyn Handler>;

/// Closure-backed handler.
#[derive(Debug)]
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F> {
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler and returns it as a shared handle.
    ///
    /// ## Example
    /// ```rust
    /// use nodevisor::{Handler, HandlerError, HandlerFn, HandlerRef};
    ///
    /// let h: HandlerRef = HandlerFn::arc("noop", |_ev: &nodevisor::EventEnvelope| {
    ///     Ok::<_, HandlerError>(())
    /// });
    /// assert_eq!(h.name(), "noop");
    /// ```
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&EventEnvelope) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    fn handle(&self, event: &EventEnvelope) -> Result<(), HandlerError> {
        (self.f)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Unnamed;

    impl Handler for Unnamed {
        fn handle(&self, _: &EventEnvelope) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    #[test]
    fn test_default_name_is_type_name() {
        assert!(Unnamed.name().ends_with("Unnamed"));
    }

    #[test]
    fn test_handler_fn_forwards_result() {
        let h = HandlerFn::new("reject-null", |ev: &EventEnvelope| {
            if ev.payload().is_null() {
                Err(HandlerError::new("null payload"))
            } else {
                Ok(())
            }
        });
        assert!(h.handle(&EventEnvelope::new("A", json!(1))).is_ok());
        let err = h.handle(&EventEnvelope::new("A", json!(null))).unwrap_err();
        assert_eq!(err.message(), "null payload");
        assert_eq!(h.name(), "reject-null");
    }
}
