//! # Bus handlers.
//!
//! This module provides the [`Handler`] trait invoked by the event bus, a closure
//! adapter ([`HandlerFn`]) and, behind the `logging` feature, a built-in tracer.
//!
//! ## Architecture
//! ```text
//! publish(envelope)
//!     │
//!     ├──► matching subscriptions (registration order)
//!     │        ├──► handler1.handle(&envelope) ── Err / panic → counted, logged
//!     │        ├──► handler2.handle(&envelope)
//!     │        └──► handlerN.handle(&envelope)
//!     └──► returns to publisher (never with a handler's error)
//! ```

mod handler;
#[cfg(feature = "logging")]
mod log;

pub use handler::{Handler, HandlerFn, HandlerRef};
#[cfg(feature = "logging")]
pub use log::LogWriter;
