//! Service lifecycle states.
//!
//! ```text
//! Stopped ──start()──► Starting ──subscribed──► Running ──stop()/signal──► Draining ──► Terminated
//!    ▲                    │                                                              (terminal)
//!    └──subscribe failed──┘
//! ```

/// Lifecycle state of a [`ServiceRuntime`](crate::ServiceRuntime).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceState {
    /// Constructed, not yet started.
    Stopped,
    /// Registering the invocation handler and arming the health timer.
    Starting,
    /// Accepting invocations.
    Running,
    /// No longer accepting invocations; waiting for in-flight work.
    Draining,
    /// Shutdown finished. Terminal.
    Terminated,
}

impl ServiceState {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceState::Stopped => "stopped",
            ServiceState::Starting => "starting",
            ServiceState::Running => "running",
            ServiceState::Draining => "draining",
            ServiceState::Terminated => "terminated",
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServiceState::Terminated)
    }
}
