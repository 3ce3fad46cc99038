//! # In-flight invocation tracker.
//!
//! Authoritative record of which invocations are running, plus the service counters.
//! Every mutation happens under one mutex; the drain waiter is woken through a
//! [`Notify`] when the active set becomes empty.
//!
//! ## Architecture
//! ```text
//! dispatch path ──► admit() ──► active[ticket] = {correlation_id, started_at}, total += 1
//! invocation task ─► claim() ─► Running → Completing (result will be published)
//!                  ─► finish() ─► remove ticket, succeeded/failed += 1 ─► notify if idle
//! stop() ─────────► close() ─► wait_idle() ─(timeout)─► abandon_all() ─► wait_idle()
//! health timer ───► snapshot()
//! ```
//!
//! ## Rules
//! - `admit` is synchronous and happens inside event dispatch, so `stop()` never
//!   misses an accepted invocation.
//! - Once closed, `admit` rejects everything.
//! - Tickets are keyed by an internal sequence number: invocations sharing a
//!   correlation id stay independent.
//! - `claim` and `abandon_all` race under the same lock: a ticket is either claimed
//!   (its result is published and counted) or abandoned (its result is discarded), never both.
//! - `abandon_all` only takes `Running` tickets; `Completing` ones stay until `finish`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::events::{HealthSnapshot, ShutdownReport};

/// Identity of one accepted invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Node call in progress.
    Running,
    /// Result claimed; publishing it.
    Completing,
}

#[derive(Debug)]
struct Active {
    correlation_id: Uuid,
    started_at: Instant,
    phase: Phase,
}

#[derive(Debug, Default)]
struct Ledger {
    admitting: bool,
    next_ticket: u64,
    active: HashMap<Ticket, Active>,
    started_at: Option<Instant>,
    total: u64,
    succeeded: u64,
    failed: u64,
}

impl Ledger {
    fn uptime(&self) -> f64 {
        self.started_at
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Thread-safe set of active invocations and service counters.
#[derive(Debug, Default)]
pub struct InvocationTracker {
    ledger: Mutex<Ledger>,
    idle: Notify,
}

impl InvocationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts admitting invocations and stamps the service start time.
    pub fn open(&self) {
        let mut ledger = self.ledger.lock();
        ledger.admitting = true;
        ledger.started_at = Some(Instant::now());
    }

    /// Stops admitting invocations. Already admitted ones keep running.
    pub fn close(&self) {
        self.ledger.lock().admitting = false;
    }

    /// Records a new invocation; `None` once the tracker is closed.
    pub fn admit(&self, correlation_id: Uuid) -> Option<Ticket> {
        let mut ledger = self.ledger.lock();
        if !ledger.admitting {
            return None;
        }
        ledger.next_ticket += 1;
        let ticket = Ticket(ledger.next_ticket);
        ledger.active.insert(
            ticket,
            Active {
                correlation_id,
                started_at: Instant::now(),
                phase: Phase::Running,
            },
        );
        ledger.total += 1;
        Some(ticket)
    }

    /// Marks a running invocation as completing so its result may be published.
    ///
    /// Returns `false` if the ticket was abandoned; the caller must then discard the result.
    pub fn claim(&self, ticket: Ticket) -> bool {
        let mut ledger = self.ledger.lock();
        match ledger.active.get_mut(&ticket) {
            Some(active) if active.phase == Phase::Running => {
                active.phase = Phase::Completing;
                true
            }
            _ => false,
        }
    }

    /// Removes a finished invocation and counts its outcome.
    ///
    /// Returns the time it spent in flight, or `None` if the ticket was no longer
    /// tracked.
    pub fn finish(&self, ticket: Ticket, outcome: Outcome) -> Option<Duration> {
        let mut ledger = self.ledger.lock();
        let active = ledger.active.remove(&ticket)?;
        match outcome {
            Outcome::Succeeded => ledger.succeeded += 1,
            Outcome::Failed => ledger.failed += 1,
        }
        let now_idle = ledger.active.is_empty();
        drop(ledger);

        if now_idle {
            self.idle.notify_waiters();
        }
        Some(active.started_at.elapsed())
    }

    /// Forgets every running invocation and returns their correlation ids.
    ///
    /// Completing invocations are kept; their results are already being published.
    pub fn abandon_all(&self) -> Vec<Uuid> {
        let mut ledger = self.ledger.lock();
        let mut abandoned = Vec::new();
        ledger.active.retain(|_, a| {
            if a.phase == Phase::Running {
                abandoned.push(a.correlation_id);
                false
            } else {
                true
            }
        });
        let now_idle = ledger.active.is_empty();
        drop(ledger);

        if now_idle {
            self.idle.notify_waiters();
        }
        abandoned
    }

    /// Completes when no invocation is active.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.ledger.lock().active.is_empty() {
                return;
            }
            notified.await;
        }
    }

    pub fn active_count(&self) -> usize {
        self.ledger.lock().active.len()
    }

    /// Age of the longest-running active invocation.
    pub fn oldest_active(&self) -> Option<Duration> {
        self.ledger
            .lock()
            .active
            .values()
            .map(|a| a.started_at.elapsed())
            .max()
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let ledger = self.ledger.lock();
        HealthSnapshot {
            uptime_seconds: ledger.uptime(),
            active_count: ledger.active.len(),
            total: ledger.total,
            succeeded: ledger.succeeded,
            failed: ledger.failed,
        }
    }

    /// Builds the final report for a drain that took `waited`.
    pub fn report(&self, abandoned: usize, waited: Duration) -> ShutdownReport {
        let ledger = self.ledger.lock();
        ShutdownReport {
            uptime_seconds: ledger.uptime(),
            total: ledger.total,
            succeeded: ledger.succeeded,
            failed: ledger.failed,
            abandoned,
            drained: abandoned == 0,
            drain_millis: waited.as_millis().min(u128::from(u64::MAX)) as u64,
        }
    }
}
