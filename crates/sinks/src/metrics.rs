//! Per-subscriber counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Delivery counters for one subscriber
#[derive(Debug, Default)]
pub struct SubscriberMetrics {
    /// Delivery attempts
    pub attempts: AtomicU64,
    /// Payloads fully written
    pub delivered: AtomicU64,
    /// Attempts that failed to dial or write
    pub failed: AtomicU64,
    /// Payload bytes written (excluding the length prefix)
    pub bytes_sent: AtomicU64,
}

impl SubscriberMetrics {
    pub const fn new() -> Self {
        Self {
            attempts: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn delivered(&self, bytes: usize) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of metrics
    pub fn snapshot(&self) -> SubscriberStats {
        SubscriberStats {
            attempts: self.attempts.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SubscriberMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriberStats {
    pub attempts: u64,
    pub delivered: u64,
    pub failed: u64,
    pub bytes_sent: u64,
}
