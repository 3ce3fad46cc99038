use std::time::Duration;

use super::config::RuntimeConfig;
use super::runtime::ServiceRuntime;
use crate::events::EventBus;
use crate::nodes::NodeRef;

/// Builder for constructing a [`ServiceRuntime`].
pub struct ServiceRuntimeBuilder {
    bus: EventBus,
    node: NodeRef,
    cfg: RuntimeConfig,
}

impl ServiceRuntimeBuilder {
    /// Creates a new builder with the default configuration.
    pub fn new(bus: EventBus, node: NodeRef) -> Self {
        Self {
            bus,
            node,
            cfg: RuntimeConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, cfg: RuntimeConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets the event type namespace (`{ns}.INVOCATION`, ...).
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.cfg.namespace = namespace.into();
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.drain_timeout = timeout;
        self
    }

    /// Sets the health snapshot period (`Duration::ZERO` disables it).
    pub fn with_health_interval(mut self, every: Duration) -> Self {
        self.cfg.health_interval = every;
        self
    }

    /// Sets the per-invocation timeout (`Duration::ZERO` = none).
    pub fn with_invocation_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.invocation_timeout = timeout;
        self
    }

    /// Builds the runtime in the `Stopped` state.
    pub fn build(self) -> ServiceRuntime {
        ServiceRuntime::new(self.bus, self.node, self.cfg)
    }
}
