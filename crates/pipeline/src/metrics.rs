//! Engine metrics
//!
//! Atomic counters for the broker and for each channel.
//! All operations use relaxed ordering; values are eventually consistent.

use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// Broker
// ============================================================================

/// Frame-level counters for the broker
#[derive(Debug, Default)]
pub struct BrokerMetrics {
    /// Frames handed to the broker
    frames: AtomicU64,
    /// Frames that failed to decode
    decode_errors: AtomicU64,
    /// Delivery frames accepted into a route
    deliveries: AtomicU64,
    /// Delivery frames dropped (route without channels or queue full)
    deliveries_dropped: AtomicU64,
    /// Topology commands that changed something
    topology_changes: AtomicU64,
    /// Runtime updates installed
    updates_applied: AtomicU64,
    /// Commands rejected (unknown, unauthorized, invalid, structural miss)
    rejected: AtomicU64,
}

impl BrokerMetrics {
    #[inline]
    pub const fn new() -> Self {
        Self {
            frames: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            deliveries_dropped: AtomicU64::new(0),
            topology_changes: AtomicU64::new(0),
            updates_applied: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_delivery(&self, queued: bool) {
        if queued {
            self.deliveries.fetch_add(1, Ordering::Relaxed);
        } else {
            self.deliveries_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_topology_change(&self) {
        self.topology_changes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_update(&self) {
        self.updates_applied.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> BrokerStats {
        BrokerStats {
            frames: self.frames.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            deliveries_dropped: self.deliveries_dropped.load(Ordering::Relaxed),
            topology_changes: self.topology_changes.load(Ordering::Relaxed),
            updates_applied: self.updates_applied.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of broker metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BrokerStats {
    pub frames: u64,
    pub decode_errors: u64,
    pub deliveries: u64,
    pub deliveries_dropped: u64,
    pub topology_changes: u64,
    pub updates_applied: u64,
    pub rejected: u64,
}

// ============================================================================
// Channel
// ============================================================================

/// Per-channel delivery counters
#[derive(Debug, Default)]
pub struct ChannelMetrics {
    /// Deliveries accepted into a partition queue
    enqueued: AtomicU64,
    /// Deliveries dropped at enqueue (queue full or closed)
    dropped: AtomicU64,
    /// Deliveries fully processed by a partition worker
    processed: AtomicU64,
    /// Transformer stages that produced output
    transforms_applied: AtomicU64,
    /// Transformer stages that failed and were bypassed
    transforms_skipped: AtomicU64,
    /// Subscriber writes that succeeded
    fanout_delivered: AtomicU64,
    /// Subscriber writes that failed
    fanout_failed: AtomicU64,
    /// Deliveries handed to the next channel of the route
    forwarded: AtomicU64,
}

impl ChannelMetrics {
    #[inline]
    pub const fn new() -> Self {
        Self {
            enqueued: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            transforms_applied: AtomicU64::new(0),
            transforms_skipped: AtomicU64::new(0),
            fanout_delivered: AtomicU64::new(0),
            fanout_failed: AtomicU64::new(0),
            forwarded: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_transforms(&self, applied: usize, skipped: usize) {
        self.transforms_applied
            .fetch_add(applied as u64, Ordering::Relaxed);
        self.transforms_skipped
            .fetch_add(skipped as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_fanout(&self, delivered: usize, failed: usize) {
        self.fanout_delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.fanout_failed.fetch_add(failed as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> ChannelStats {
        ChannelStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            transforms_applied: self.transforms_applied.load(Ordering::Relaxed),
            transforms_skipped: self.transforms_skipped.load(Ordering::Relaxed),
            fanout_delivered: self.fanout_delivered.load(Ordering::Relaxed),
            fanout_failed: self.fanout_failed.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of channel metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct ChannelStats {
    pub enqueued: u64,
    pub dropped: u64,
    pub processed: u64,
    pub transforms_applied: u64,
    pub transforms_skipped: u64,
    pub fanout_delivered: u64,
    pub fanout_failed: u64,
    pub forwarded: u64,
}

// ============================================================================
// Drop Tracker - Rate-limited logging for full partition queues
// ============================================================================

/// Aggregates enqueue drops and logs a summary at most once per second
///
/// - >0 drops/sec: WARN level
/// - >100 drops/sec: ERROR level (partitions cannot keep up)
pub struct DropTracker {
    /// Drops in current interval
    interval_drops: AtomicU64,
    /// Last log time (epoch milliseconds)
    last_log_ms: AtomicU64,
}

/// Log interval in milliseconds
const LOG_INTERVAL_MS: u64 = 1000;
/// Drops/sec that triggers ERROR level
const CRITICAL_DROP_THRESHOLD: u64 = 100;

impl DropTracker {
    pub fn new() -> Self {
        Self {
            interval_drops: AtomicU64::new(0),
            last_log_ms: AtomicU64::new(0),
        }
    }

    /// Record a drop; returns true if a summary was logged
    pub fn record_drop(&self, route: &str, channel: &str) -> bool {
        self.interval_drops.fetch_add(1, Ordering::Relaxed);

        let now = Self::now_ms();
        let last = self.last_log_ms.load(Ordering::Relaxed);
        if now.saturating_sub(last) < LOG_INTERVAL_MS {
            return false;
        }

        // Claim the log slot so concurrent callers don't log twice
        if self
            .last_log_ms
            .compare_exchange(last, now, Ordering::SeqCst, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }

        let drops = self.interval_drops.swap(0, Ordering::Relaxed);
        if drops == 0 {
            return false;
        }

        if drops > CRITICAL_DROP_THRESHOLD {
            tracing::error!(
                route,
                channel,
                dropped = drops,
                threshold = CRITICAL_DROP_THRESHOLD,
                "partitions cannot keep up, deliveries dropped"
            );
        } else {
            tracing::warn!(
                route,
                channel,
                dropped = drops,
                "partition queue full, deliveries dropped"
            );
        }

        true
    }

    #[inline]
    fn now_ms() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

impl Default for DropTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DropTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropTracker")
            .field(
                "interval_drops",
                &self.interval_drops.load(Ordering::Relaxed),
            )
            .finish()
    }
}
