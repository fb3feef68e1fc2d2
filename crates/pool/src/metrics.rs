//! Pool metrics
//!
//! Lock-free counters, read through [`PoolMetrics::snapshot`].

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for pool activity
#[derive(Debug, Default)]
pub struct PoolMetrics {
    /// New connections established
    pub dials: AtomicU64,
    /// Dials that failed, timed out or were cancelled
    pub dial_failures: AtomicU64,
    /// Borrows served from the free list
    pub reuses: AtomicU64,
    /// Cached connections discarded as stale or closed by the peer
    pub evictions: AtomicU64,
    /// Connections closed on release (broken or free list full)
    pub discards: AtomicU64,
    /// Connections returned to the free list
    pub returns: AtomicU64,
}

impl PoolMetrics {
    pub const fn new() -> Self {
        Self {
            dials: AtomicU64::new(0),
            dial_failures: AtomicU64::new(0),
            reuses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            discards: AtomicU64::new(0),
            returns: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn dialed(&self) {
        self.dials.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn dial_failed(&self) {
        self.dial_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn reused(&self) {
        self.reuses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn evicted(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn discarded(&self) {
        self.discards.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn returned(&self) {
        self.returns.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of metrics
    pub fn snapshot(&self) -> PoolStats {
        PoolStats {
            dials: self.dials.load(Ordering::Relaxed),
            dial_failures: self.dial_failures.load(Ordering::Relaxed),
            reuses: self.reuses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            discards: self.discards.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`PoolMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub dials: u64,
    pub dial_failures: u64,
    pub reuses: u64,
    pub evictions: u64,
    pub discards: u64,
    pub returns: u64,
}
