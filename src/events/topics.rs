//! Well-known event type tags.
//!
//! Service events live under a per-runtime namespace (`"TOOL"` by default):
//! `{ns}.INVOCATION`, `{ns}.RESPONSE`, `{ns}.ERROR`. Telemetry lives under `HEALTH`.

/// Periodic health telemetry published while a runtime is running.
pub const HEALTH_SNAPSHOT: &str = "HEALTH.SNAPSHOT";

/// Final report published once per runtime when shutdown completes.
pub const HEALTH_SHUTDOWN: &str = "HEALTH.SHUTDOWN";

const INVOCATION: &str = "INVOCATION";
const RESPONSE: &str = "RESPONSE";
const ERROR: &str = "ERROR";

/// Type tags used by one service runtime, derived from its namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTopics {
    /// Inbound work, e.g. `TOOL.INVOCATION`.
    pub invocation: String,
    /// Successful results, e.g. `TOOL.RESPONSE`.
    pub response: String,
    /// Failed invocations, e.g. `TOOL.ERROR`.
    pub error: String,
}

impl ServiceTopics {
    /// Builds the three tags for `namespace`.
    ///
    /// # Example
    /// ```
    /// use nodevisor::ServiceTopics;
    ///
    /// let t = ServiceTopics::new("TOOL");
    /// assert_eq!(t.invocation, "TOOL.INVOCATION");
    /// assert_eq!(t.response, "TOOL.RESPONSE");
    /// assert_eq!(t.error, "TOOL.ERROR");
    /// ```
    pub fn new(namespace: &str) -> Self {
        Self {
            invocation: format!("{namespace}.{INVOCATION}"),
            response: format!("{namespace}.{RESPONSE}"),
            error: format!("{namespace}.{ERROR}"),
        }
    }
}
