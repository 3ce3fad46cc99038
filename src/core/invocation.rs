//! # Invocation handling: event → node call → response/error event.
//!
//! [`InvocationHandler`] is the bus handler a running service registers for
//! `{ns}.INVOCATION`. It does the bookkeeping synchronously and hands the node
//! call to a spawned task.
//!
//! ## Event flow
//! ```text
//! dispatch (sync):   admit(correlation_id) ── rejected (draining) → dropped
//!                        └─► spawn task
//! task (async):      node.run(payload) [catch_unwind, optional timeout]
//!                    claim(ticket) ── abandoned → discard
//!                        ├─ Ok(out)  → publish {ns}.RESPONSE {correlation_id, result}
//!                        └─ Err(e)   → publish {ns}.ERROR {correlation_id, error{kind,message}}
//!                    finish(ticket)  ← always last; wakes the drain waiter
//! ```
//!
//! ## Rules
//! - Publishes **at most one** terminal event per accepted invocation.
//! - A ticket abandoned at drain timeout publishes nothing and counts nothing.
//!   The ticket is claimed before publishing, so a result already being dispatched
//!   when the drain times out is counted, not abandoned.
//! - Node panics become `kind = "panicked"`; timeouts become `kind = "timeout"`.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::time;
use tracing::{debug, warn};
use uuid::Uuid;

use super::tracker::{InvocationTracker, Outcome, Ticket};
use crate::error::{HandlerError, NodeError, panic_message};
use crate::events::{
    ErrorDescriptor, ErrorPayload, EventBus, EventEnvelope, ResponsePayload, ServiceTopics,
};
use crate::handlers::Handler;
use crate::nodes::NodeRef;

/// Everything an invocation task needs, shared across tasks.
pub(crate) struct InvocationContext {
    pub bus: EventBus,
    pub node: NodeRef,
    pub topics: ServiceTopics,
    pub tracker: Arc<InvocationTracker>,
    pub timeout: Option<Duration>,
    pub executor: Handle,
}

impl InvocationContext {
    /// Runs one accepted invocation to completion.
    async fn run(&self, ticket: Ticket, correlation_id: Uuid, input: Value) {
        let res = self.call_node(input).await;

        if !self.tracker.claim(ticket) {
            debug!(
                node = self.node.name(),
                correlation_id = %correlation_id,
                "discarding result of abandoned invocation"
            );
            return;
        }

        let outcome = match res {
            Ok(result) => {
                let payload = ResponsePayload {
                    correlation_id,
                    result,
                };
                self.publish(&self.topics.response, correlation_id, &payload);
                Outcome::Succeeded
            }
            Err(err) => {
                let payload = ErrorPayload {
                    correlation_id,
                    error: ErrorDescriptor::from(&err),
                };
                debug!(
                    node = self.node.name(),
                    correlation_id = %correlation_id,
                    kind = err.kind(),
                    "invocation failed"
                );
                self.publish(&self.topics.error, correlation_id, &payload);
                Outcome::Failed
            }
        };

        if let Some(took) = self.tracker.finish(ticket, outcome) {
            debug!(
                node = self.node.name(),
                correlation_id = %correlation_id,
                outcome = ?outcome,
                took_ms = took.as_millis() as u64,
                "invocation finished"
            );
        }
    }

    async fn call_node(&self, input: Value) -> Result<Value, NodeError> {
        let call = AssertUnwindSafe(self.node.run(input)).catch_unwind();
        let caught = match self.timeout {
            Some(dur) => match time::timeout(dur, call).await {
                Ok(r) => r,
                Err(_elapsed) => return Err(NodeError::Timeout { timeout: dur }),
            },
            None => call.await,
        };
        caught.unwrap_or_else(|panic_err| {
            Err(NodeError::Panicked {
                message: panic_message(&*panic_err),
            })
        })
    }

    fn publish<T: Serialize>(&self, event_type: &str, correlation_id: Uuid, payload: &T) {
        let value = match serde_json::to_value(payload) {
            Ok(v) => v,
            Err(err) => {
                warn!(
                    event_type,
                    correlation_id = %correlation_id,
                    error = %err,
                    "failed to encode payload"
                );
                return;
            }
        };
        let envelope =
            EventEnvelope::new(event_type.to_string(), value).with_correlation_id(correlation_id);
        if let Err(err) = self.bus.publish(envelope) {
            warn!(
                event_type,
                correlation_id = %correlation_id,
                error = %err,
                "result not published"
            );
        }
    }
}

/// Bus handler bound to `{ns}.INVOCATION`.
pub(crate) struct InvocationHandler {
    ctx: Arc<InvocationContext>,
}

impl InvocationHandler {
    pub fn new(ctx: InvocationContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }
}

impl Handler for InvocationHandler {
    fn handle(&self, event: &EventEnvelope) -> Result<(), HandlerError> {
        let correlation_id = event.correlation_id();
        let Some(ticket) = self.ctx.tracker.admit(correlation_id) else {
            debug!(
                correlation_id = %correlation_id,
                "invocation rejected; service is not admitting work"
            );
            return Ok(());
        };

        let ctx = Arc::clone(&self.ctx);
        let input = event.payload().clone();
        self.ctx.executor.spawn(async move {
            ctx.run(ticket, correlation_id, input).await;
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "invocation"
    }
}
