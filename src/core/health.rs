//! # Periodic health snapshots.
//!
//! While a service is running, a timer task publishes `HEALTH.SNAPSHOT` every
//! `health_interval`. The first snapshot goes out one interval after start.
//! A failed publish is logged and skipped for that tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::tracker::InvocationTracker;
use crate::events::{EventBus, EventEnvelope, HEALTH_SNAPSHOT};

/// Spawns the health timer; it stops when `token` is cancelled.
pub(crate) fn spawn_health_timer(
    executor: &Handle,
    bus: EventBus,
    tracker: Arc<InvocationTracker>,
    every: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    executor.spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => publish_snapshot(&bus, &tracker),
            }
        }
    })
}

/// Publishes one snapshot of `tracker`.
pub(crate) fn publish_snapshot(bus: &EventBus, tracker: &InvocationTracker) {
    let snapshot = tracker.snapshot();
    let payload = match serde_json::to_value(snapshot) {
        Ok(v) => v,
        Err(err) => {
            warn!(error = %err, "health snapshot skipped: encode failed");
            return;
        }
    };
    if let Err(err) = bus.publish(EventEnvelope::new(HEALTH_SNAPSHOT, payload)) {
        warn!(error = %err, label = err.as_label(), "health snapshot skipped");
    }
}
