//! # Subscription registry: pattern → handler routing table.
//!
//! Keeps subscriptions in registration order so that handlers for a single publish
//! are invoked in the order they subscribed. Every registration gets its own
//! [`SubscriptionId`]; two subscriptions with the same pattern stay independent.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use super::pattern::Pattern;
use crate::handlers::HandlerRef;

static SUBSCRIPTION_SEQ: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        Self(SUBSCRIPTION_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

/// One registered pattern/handler pair.
#[derive(Clone)]
pub(crate) struct Subscription {
    pub id: SubscriptionId,
    pub pattern: Pattern,
    pub handler: HandlerRef,
}

/// Ordered table of subscriptions.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    subs: Vec<Subscription>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self { subs: Vec::new() }
    }

    /// Appends a subscription and returns its new id.
    pub fn insert(&mut self, pattern: Pattern, handler: HandlerRef) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.subs.push(Subscription {
            id,
            pattern,
            handler,
        });
        id
    }

    /// Removes exactly `id`. Returns `false` if it was not registered.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        match self.subs.iter().position(|s| s.id == id) {
            Some(idx) => {
                self.subs.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Subscriptions whose pattern matches `event_type`, in registration order.
    pub fn matching(&self, event_type: &str) -> Vec<Subscription> {
        self.subs
            .iter()
            .filter(|s| s.pattern.matches(event_type))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn clear(&mut self) {
        self.subs.clear();
    }
}
