//! Error types used by the bus, the service runtime and wrapped nodes.
//!
//! - [`BusError`]: routing and availability errors raised by the event bus.
//! - [`HandlerError`]: failure reported by a bus handler (isolated, never propagated).
//! - [`NodeError`]: failure of a single node invocation (converted into an error event).
//! - [`RuntimeError`]: lifecycle control-plane errors returned by `start()`.
//!
//! Every type provides `as_label` for logs/metrics.

use std::any::Any;
use std::time::Duration;
use thiserror::Error;

use crate::core::ServiceState;

/// # Errors produced by the event bus.
///
/// Only control-plane calls (`subscribe`, `publish` on a closed bus) return these;
/// handler failures are never surfaced through the bus API.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Subscription pattern is malformed (empty, empty segment, misplaced wildcard).
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The bus has been closed and no longer accepts subscriptions or events.
    #[error("event bus is closed")]
    Closed,
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use nodevisor::BusError;
    ///
    /// assert_eq!(BusError::Closed.as_label(), "bus_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::InvalidPattern { .. } => "bus_invalid_pattern",
            BusError::Closed => "bus_closed",
        }
    }
}

/// Failure reported by a bus handler.
///
/// The bus counts and logs it, then keeps dispatching to the remaining handlers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Creates a handler error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// # Errors produced by a node invocation.
///
/// The runtime turns each of these into a structured `{kind, message}` descriptor
/// carried by an error event; none of them is ever thrown back at the bus.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// Business failure reported by the node, with a caller-chosen kind.
    #[error("{kind}: {message}")]
    Fail {
        /// Short machine-readable classification (e.g. "not_found").
        kind: String,
        /// Human-readable details.
        message: String,
    },

    /// The invocation payload could not be turned into the node's input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the payload.
        message: String,
    },

    /// The invocation exceeded the configured per-invocation timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// The node panicked while running.
    #[error("node panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
}

impl NodeError {
    /// Shorthand for a generic business failure (`kind = "node_failed"`).
    pub fn fail(message: impl Into<String>) -> Self {
        NodeError::Fail {
            kind: "node_failed".to_string(),
            message: message.into(),
        }
    }

    /// Business failure with an explicit kind.
    pub fn with_kind(kind: impl Into<String>, message: impl Into<String>) -> Self {
        NodeError::Fail {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Returns the error kind carried by error events.
    ///
    /// # Example
    /// ```
    /// use nodevisor::NodeError;
    ///
    /// assert_eq!(NodeError::with_kind("not_found", "no such key").kind(), "not_found");
    /// assert_eq!(NodeError::fail("boom").kind(), "node_failed");
    /// ```
    pub fn kind(&self) -> &str {
        match self {
            NodeError::Fail { kind, .. } => kind,
            NodeError::InvalidInput { .. } => "invalid_input",
            NodeError::Timeout { .. } => "timeout",
            NodeError::Panicked { .. } => "panicked",
        }
    }

    /// Returns the human-readable message carried by error events.
    pub fn message(&self) -> String {
        match self {
            NodeError::Fail { message, .. } => message.clone(),
            NodeError::InvalidInput { message } => message.clone(),
            NodeError::Timeout { timeout } => format!("timed out after {timeout:?}"),
            NodeError::Panicked { message } => message.clone(),
        }
    }
}

/// # Errors produced by the service runtime control plane.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Registering the invocation handler with the bus failed.
    #[error("failed to subscribe invocation handler: {0}")]
    Subscribe(#[from] BusError),

    /// The requested transition is not allowed from the current state.
    #[error("operation not allowed in state {state:?}")]
    InvalidState {
        /// State observed when the call was made.
        state: ServiceState,
    },

    /// `start()` was called outside of a tokio runtime.
    #[error("no tokio runtime available to spawn invocations on")]
    NoExecutor,

    /// OS termination signal listeners could not be registered.
    #[error("failed to register termination signals: {0}")]
    Signal(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use nodevisor::{BusError, RuntimeError};
    ///
    /// let err = RuntimeError::from(BusError::Closed);
    /// assert_eq!(err.as_label(), "runtime_subscribe_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Subscribe(_) => "runtime_subscribe_failed",
            RuntimeError::InvalidState { .. } => "runtime_invalid_state",
            RuntimeError::NoExecutor => "runtime_no_executor",
            RuntimeError::Signal(_) => "runtime_signal_registration",
        }
    }
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
