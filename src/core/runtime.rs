//! # ServiceRuntime: turns a node into an event-driven service.
//!
//! The [`ServiceRuntime`] holds a handle to a shared [`EventBus`] and a [`Node`](crate::Node).
//! Once started it answers `{ns}.INVOCATION` events with `{ns}.RESPONSE` /
//! `{ns}.ERROR` events, publishes health snapshots, and shuts down by draining
//! in-flight work under a timeout.
//!
//! ## High-level architecture
//! ```text
//! start():
//!   tracker.open()
//!   bus.subscribe("{ns}.INVOCATION", InvocationHandler) ─── Err → back to Stopped
//!   spawn health timer (CancellationToken)
//!   state = Running
//!
//! Event flow:
//!   producer ── publish(INVOCATION) ──► Bus ──► InvocationHandler::handle (sync)
//!                                                  ├─► tracker.admit()
//!                                                  └─► spawn(node.run) ──► publish(RESPONSE | ERROR)
//!                                                                          └─► tracker.finish()
//!
//! Shutdown path (stop() / signal):
//!   state = Draining
//!   tracker.close() + bus.unsubscribe()       → no new invocations from here on
//!   timeout(drain, tracker.wait_idle()):
//!       ├─ Ok          → drained, abandoned = 0
//!       └─ elapsed     → tracker.abandon_all() (late results discarded),
//!                        then wait for results already being published
//!   cancel health timer
//!   publish(HEALTH.SHUTDOWN, ShutdownReport)
//!   state = Terminated
//! ```
//!
//! ## Rules
//! - `start()` is only valid from `Stopped`; a subscribe failure leaves the runtime `Stopped`.
//! - `stop()` runs the shutdown protocol at most once; later calls return `None` immediately.
//! - `stop()` on a service that was never started is a no-op; it stays `Stopped`.
//! - Termination signals go through the same `stop()`; repeated signals are no-ops.
//! - The bus outlives the runtime and stays usable by other subscribers after shutdown.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use nodevisor::{EventBus, EventEnvelope, NodeError, NodeFn, ServiceRuntime};
//! use serde_json::{Value, json};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = EventBus::default();
//!     let node = NodeFn::arc("double", |input: Value| async move {
//!         let n = input.as_i64().ok_or_else(|| NodeError::fail("expected a number"))?;
//!         Ok::<_, NodeError>(json!(n * 2))
//!     });
//!
//!     let service = ServiceRuntime::builder(bus.clone(), node).build();
//!     service.start()?;
//!
//!     bus.publish(EventEnvelope::new("TOOL.INVOCATION", json!(21)))?;
//!
//!     let report = service.stop(Duration::from_secs(1)).await.expect("first stop runs");
//!     assert_eq!(report.succeeded, 1);
//!     assert!(report.drained);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::builder::ServiceRuntimeBuilder;
use super::config::RuntimeConfig;
use super::health;
use super::invocation::{InvocationContext, InvocationHandler};
use super::shutdown::{self, ShutdownSignal, ShutdownSignals};
use super::state::ServiceState;
use super::tracker::InvocationTracker;
use crate::error::RuntimeError;
use crate::events::{
    EventBus, EventEnvelope, HEALTH_SHUTDOWN, HealthSnapshot, ServiceTopics, ShutdownReport,
    SubscriptionHandle,
};
use crate::nodes::NodeRef;

/// Resources that only exist while the service is running.
#[derive(Default)]
struct Control {
    subscription: Option<SubscriptionHandle>,
    health: Option<(CancellationToken, JoinHandle<()>)>,
    report: Option<ShutdownReport>,
}

struct Inner {
    cfg: RuntimeConfig,
    bus: EventBus,
    node: NodeRef,
    topics: ServiceTopics,
    tracker: Arc<InvocationTracker>,
    state: watch::Sender<ServiceState>,
    control: Mutex<Control>,
}

/// Lifecycle manager wrapping one node.
///
/// Cheap to clone; clones control the same service.
#[derive(Clone)]
pub struct ServiceRuntime {
    inner: Arc<Inner>,
}

impl ServiceRuntime {
    /// Returns a builder for a service around `node`, using `bus` for all events.
    pub fn builder(bus: EventBus, node: NodeRef) -> ServiceRuntimeBuilder {
        ServiceRuntimeBuilder::new(bus, node)
    }

    /// Creates a service in the `Stopped` state.
    pub fn new(bus: EventBus, node: NodeRef, cfg: RuntimeConfig) -> Self {
        let topics = ServiceTopics::new(&cfg.namespace);
        let (state, _) = watch::channel(ServiceState::Stopped);
        Self {
            inner: Arc::new(Inner {
                cfg,
                bus,
                node,
                topics,
                tracker: Arc::new(InvocationTracker::new()),
                state,
                control: Mutex::new(Control::default()),
            }),
        }
    }

    /// Starts accepting invocations.
    ///
    /// Must be called from within a tokio runtime; invocation tasks and the health
    /// timer are spawned on it.
    pub fn start(&self) -> Result<(), RuntimeError> {
        let mut ctl = self.inner.control.lock();
        let state = self.state();
        if state != ServiceState::Stopped {
            return Err(RuntimeError::InvalidState { state });
        }
        let executor = Handle::try_current().map_err(|_| RuntimeError::NoExecutor)?;
        self.set_state(ServiceState::Starting);

        let tracker = &self.inner.tracker;
        tracker.open();
        let handler = InvocationHandler::new(InvocationContext {
            bus: self.inner.bus.clone(),
            node: Arc::clone(&self.inner.node),
            topics: self.inner.topics.clone(),
            tracker: Arc::clone(tracker),
            timeout: self.inner.cfg.node_timeout(),
            executor: executor.clone(),
        });
        let subscription = match self
            .inner
            .bus
            .subscribe(&self.inner.topics.invocation, Arc::new(handler))
        {
            Ok(h) => h,
            Err(err) => {
                tracker.close();
                self.set_state(ServiceState::Stopped);
                warn!(
                    node = self.inner.node.name(),
                    error = %err,
                    "failed to start service"
                );
                return Err(err.into());
            }
        };
        ctl.subscription = Some(subscription);

        if let Some(every) = self.inner.cfg.health_every() {
            let token = CancellationToken::new();
            let join = health::spawn_health_timer(
                &executor,
                self.inner.bus.clone(),
                Arc::clone(tracker),
                every,
                token.clone(),
            );
            ctl.health = Some((token, join));
        }

        self.set_state(ServiceState::Running);
        info!(
            node = self.inner.node.name(),
            topic = %self.inner.topics.invocation,
            "service running"
        );
        Ok(())
    }

    /// Stops the service, waiting at most `drain_timeout` for in-flight invocations.
    ///
    /// Returns the shutdown report when this call ran the shutdown protocol, `None` when
    /// the service was already draining/terminated or was never started. A service that
    /// was never started stays `Stopped` and can still be started.
    ///
    /// Invocations whose result is already being published when the timeout expires
    /// are not abandoned: `stop()` waits for their dispatch to finish and counts them.
    pub async fn stop(&self, drain_timeout: Duration) -> Option<ShutdownReport> {
        let (subscription, health) = {
            let mut ctl = self.inner.control.lock();
            match self.state() {
                ServiceState::Running => {}
                ServiceState::Stopped => {
                    debug!(node = self.inner.node.name(), "stop before start ignored");
                    return None;
                }
                ServiceState::Starting | ServiceState::Draining | ServiceState::Terminated => {
                    return None;
                }
            }
            self.set_state(ServiceState::Draining);
            self.inner.tracker.close();
            (ctl.subscription.take(), ctl.health.take())
        };

        if let Some(handle) = subscription {
            self.inner.bus.unsubscribe(handle);
        }
        info!(
            node = self.inner.node.name(),
            active = self.inner.tracker.active_count(),
            timeout_ms = drain_timeout.as_millis() as u64,
            "draining"
        );

        let started = Instant::now();
        let abandoned = match time::timeout(drain_timeout, self.inner.tracker.wait_idle()).await {
            Ok(()) => Vec::new(),
            Err(_elapsed) => {
                let oldest = self.inner.tracker.oldest_active();
                let ids = self.inner.tracker.abandon_all();
                warn!(
                    node = self.inner.node.name(),
                    abandoned = ids.len(),
                    oldest_ms = oldest.map(|d| d.as_millis() as u64),
                    correlation_ids = ?ids,
                    "drain timeout exceeded"
                );
                self.inner.tracker.wait_idle().await;
                ids
            }
        };

        if let Some((token, join)) = health {
            token.cancel();
            let _ = join.await;
        }

        let report = self
            .inner
            .tracker
            .report(abandoned.len(), started.elapsed());
        self.publish_report(&report);
        self.inner.control.lock().report = Some(report);
        self.set_state(ServiceState::Terminated);
        info!(
            node = self.inner.node.name(),
            drained = report.drained,
            abandoned = report.abandoned,
            total = report.total,
            "service stopped"
        );
        Some(report)
    }

    /// [`stop`](Self::stop) with the configured `drain_timeout`.
    pub async fn stop_with_default_timeout(&self) -> Option<ShutdownReport> {
        self.stop(self.inner.cfg.drain_timeout).await
    }

    fn publish_report(&self, report: &ShutdownReport) {
        match serde_json::to_value(report) {
            Ok(payload) => {
                if let Err(err) = self
                    .inner
                    .bus
                    .publish(EventEnvelope::new(HEALTH_SHUTDOWN, payload))
                {
                    warn!(error = %err, "shutdown report not published");
                }
            }
            Err(err) => warn!(error = %err, "shutdown report not encoded"),
        }
    }

    /// Calls `stop()` for every trigger received on `triggers`.
    ///
    /// The watcher ends when the service terminates or the channel closes. Extra
    /// triggers while draining are absorbed by `stop()`'s idempotency.
    pub fn stop_on(&self, mut triggers: mpsc::Receiver<ShutdownSignal>) -> JoinHandle<()> {
        let rt = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = rt.wait_terminated() => break,
                    trigger = triggers.recv() => match trigger {
                        Some(signal) => {
                            info!(
                                node = rt.inner.node.name(),
                                signal = signal.as_label(),
                                state = rt.state().as_label(),
                                "termination requested"
                            );
                            let me = rt.clone();
                            tokio::spawn(async move {
                                me.stop_with_default_timeout().await;
                            });
                        }
                        None => break,
                    },
                }
            }
        })
    }

    /// Wires SIGINT/SIGTERM (Ctrl-C elsewhere) to `stop()`.
    pub fn watch_signals(&self) -> Result<JoinHandle<()>, RuntimeError> {
        let signals = ShutdownSignals::new()?;
        Ok(self.watch(signals))
    }

    fn watch(&self, signals: ShutdownSignals) -> JoinHandle<()> {
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(shutdown::forward_signals(signals, tx));
        self.stop_on(rx)
    }

    /// Starts the service and runs until a termination signal has drained it.
    pub async fn run_until_signal(&self) -> Result<Option<ShutdownReport>, RuntimeError> {
        let signals = ShutdownSignals::new()?;
        self.start()?;
        let watcher = self.watch(signals);
        self.wait_terminated().await;
        let _ = watcher.await;
        Ok(self.last_report())
    }

    /// Completes once the service reaches `Terminated`.
    pub async fn wait_terminated(&self) {
        let mut rx = self.inner.state.subscribe();
        let _ = rx.wait_for(|s| s.is_terminal()).await;
    }

    /// Receiver observing every state transition.
    pub fn state_changes(&self) -> watch::Receiver<ServiceState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> ServiceState {
        *self.inner.state.borrow()
    }

    /// Current counters, as published in `HEALTH.SNAPSHOT`.
    pub fn snapshot(&self) -> HealthSnapshot {
        self.inner.tracker.snapshot()
    }

    pub fn active_count(&self) -> usize {
        self.inner.tracker.active_count()
    }

    /// Report of the completed shutdown, if any.
    pub fn last_report(&self) -> Option<ShutdownReport> {
        self.inner.control.lock().report
    }

    pub fn topics(&self) -> &ServiceTopics {
        &self.inner.topics
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.cfg
    }

    fn set_state(&self, next: ServiceState) {
        let prev = self.inner.state.send_replace(next);
        debug!(
            node = self.inner.node.name(),
            from = prev.as_label(),
            to = next.as_label(),
            "state transition"
        );
    }
}
