//! Subscriber selection strategies
//!
//! A channel asks its strategy which subscribers of the current snapshot
//! receive a delivery:
//!
//! | Strategy | Names | Picks |
//! |----------|-------|-------|
//! | [`Broadcast`] | `broadcast`, `pubsub`, `all`, empty | every subscriber |
//! | [`Random`] | `random` | one, uniformly |
//! | [`RoundRobin`] | `round_robin`, `roundrobin`, `rr` | one, cyclically |
//!
//! Every strategy returns an empty selection for an empty snapshot.

use std::sync::Arc;

use courier_sinks::Subscriber;
use parking_lot::Mutex;
use rand::Rng;

use crate::{Result, RoutingError};

/// Strategy used when a channel is added without one
pub const DEFAULT_STRATEGY: &str = "broadcast";

/// Chooses the subscribers that receive one delivery
///
/// Shared by every partition of a channel, so implementations must be
/// `Send + Sync`.
pub trait SelectionStrategy: Send + Sync {
    fn select(&self, subscribers: &[Arc<Subscriber>]) -> Vec<Arc<Subscriber>>;

    /// Canonical name
    fn name(&self) -> &'static str;
}

/// Build a strategy from its name
///
/// # Errors
///
/// Returns [`RoutingError::UnknownStrategy`] for an unrecognized name.
pub fn strategy_from_name(name: &str) -> Result<Arc<dyn SelectionStrategy>> {
    match name.trim().to_ascii_lowercase().as_str() {
        "" | "broadcast" | "pubsub" | "all" => Ok(Arc::new(Broadcast)),
        "random" => Ok(Arc::new(Random)),
        "round_robin" | "roundrobin" | "rr" => Ok(Arc::new(RoundRobin::new())),
        _ => Err(RoutingError::unknown_strategy(name)),
    }
}

// =============================================================================
// Broadcast
// =============================================================================

/// Every subscriber receives every delivery
#[derive(Debug, Default, Clone, Copy)]
pub struct Broadcast;

impl SelectionStrategy for Broadcast {
    fn select(&self, subscribers: &[Arc<Subscriber>]) -> Vec<Arc<Subscriber>> {
        subscribers.to_vec()
    }

    fn name(&self) -> &'static str {
        "broadcast"
    }
}

// =============================================================================
// Random
// =============================================================================

/// One uniformly chosen subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct Random;

impl SelectionStrategy for Random {
    fn select(&self, subscribers: &[Arc<Subscriber>]) -> Vec<Arc<Subscriber>> {
        if subscribers.is_empty() {
            return Vec::new();
        }
        let index = rand::rng().random_range(0..subscribers.len());
        vec![Arc::clone(&subscribers[index])]
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

// =============================================================================
// RoundRobin
// =============================================================================

/// One subscriber per delivery, in snapshot order
///
/// The cursor holds the last selected index. When the snapshot shrinks below
/// it, selection wraps to the first subscriber.
#[derive(Debug, Default)]
pub struct RoundRobin {
    last: Mutex<Option<usize>>,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionStrategy for RoundRobin {
    fn select(&self, subscribers: &[Arc<Subscriber>]) -> Vec<Arc<Subscriber>> {
        if subscribers.is_empty() {
            return Vec::new();
        }

        let mut last = self.last.lock();
        let next = match *last {
            Some(i) if i + 1 < subscribers.len() => i + 1,
            _ => 0,
        };
        *last = Some(next);

        vec![Arc::clone(&subscribers[next])]
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}
