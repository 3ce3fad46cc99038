//! Payload shapes published by the service runtime.
//!
//! All types are plain serde structs; consumers decode them from an envelope with
//! `serde_json::from_value(envelope.payload().clone())`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::NodeError;

/// Payload of a `{ns}.RESPONSE` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePayload {
    /// Echo of the invocation's correlation id.
    pub correlation_id: Uuid,
    /// Node output, forwarded untouched.
    pub result: Value,
}

/// Structured `{kind, message}` error description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub kind: String,
    pub message: String,
}

impl From<&NodeError> for ErrorDescriptor {
    fn from(err: &NodeError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.message(),
        }
    }
}

/// Payload of a `{ns}.ERROR` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Echo of the invocation's correlation id.
    pub correlation_id: Uuid,
    pub error: ErrorDescriptor,
}

/// Payload of a `HEALTH.SNAPSHOT` event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Seconds since the runtime entered `Running`.
    pub uptime_seconds: f64,
    /// Invocations currently in flight.
    pub active_count: usize,
    /// Invocations accepted since start.
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Payload of the final `HEALTH.SHUTDOWN` event, also returned by `stop()`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShutdownReport {
    pub uptime_seconds: f64,
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Invocations still running when the drain timeout elapsed.
    pub abandoned: usize,
    /// `true` if every in-flight invocation finished within the timeout.
    pub drained: bool,
    /// Time spent waiting for in-flight work.
    pub drain_millis: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_descriptor_from_node_error() {
        let d = ErrorDescriptor::from(&NodeError::with_kind("not_found", "missing key"));
        assert_eq!(d.kind, "not_found");
        assert_eq!(d.message, "missing key");
    }

    #[test]
    fn test_error_payload_shape() {
        let id = Uuid::nil();
        let p = ErrorPayload {
            correlation_id: id,
            error: ErrorDescriptor {
                kind: "timeout".into(),
                message: "slow".into(),
            },
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["error"], json!({"kind": "timeout", "message": "slow"}));
        assert_eq!(v["correlation_id"], json!(id.to_string()));
    }
}
