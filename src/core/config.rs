//! # Service runtime configuration.
//!
//! Provides [`RuntimeConfig`] centralized settings for one [`ServiceRuntime`](crate::ServiceRuntime).
//!
//! ## Sentinel values
//! - `health_interval = 0s` → no health timer
//! - `invocation_timeout = 0s` → node calls run without a timeout

use std::time::Duration;

/// Configuration for a service runtime.
///
/// ## Field semantics
/// - `namespace`: prefix of the service's event types (`{ns}.INVOCATION`, `{ns}.RESPONSE`, `{ns}.ERROR`)
/// - `drain_timeout`: default bound on waiting for in-flight work during `stop()`
/// - `health_interval`: period of `HEALTH.SNAPSHOT` events (`0s` = disabled)
/// - `invocation_timeout`: per-invocation bound on the node call (`0s` = none)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Event type namespace.
    pub namespace: String,

    /// Maximum time `stop()` waits for active invocations before abandoning them.
    ///
    /// Used by `stop_with_default_timeout()` and signal-driven shutdown.
    pub drain_timeout: Duration,

    /// Interval between health snapshots while running.
    pub health_interval: Duration,

    /// Per-invocation timeout for the node call.
    ///
    /// On expiry the invocation fails with kind `"timeout"`.
    pub invocation_timeout: Duration,
}

impl RuntimeConfig {
    /// Returns the health interval as an `Option` (`None` → timer disabled).
    #[inline]
    pub fn health_every(&self) -> Option<Duration> {
        if self.health_interval == Duration::ZERO {
            None
        } else {
            Some(self.health_interval)
        }
    }

    /// Returns the per-invocation timeout as an `Option` (`None` → no timeout).
    #[inline]
    pub fn node_timeout(&self) -> Option<Duration> {
        if self.invocation_timeout == Duration::ZERO {
            None
        } else {
            Some(self.invocation_timeout)
        }
    }
}

impl Default for RuntimeConfig {
    /// Default configuration:
    ///
    /// - `namespace = "TOOL"`
    /// - `drain_timeout = 30s`
    /// - `health_interval = 10s`
    /// - `invocation_timeout = 0s` (no timeout)
    fn default() -> Self {
        Self {
            namespace: "TOOL".to_string(),
            drain_timeout: Duration::from_secs(30),
            health_interval: Duration::from_secs(10),
            invocation_timeout: Duration::ZERO,
        }
    }
}
