//! TCP source counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by the accept loop and every connection handler
#[derive(Debug, Default)]
pub struct TcpSourceMetrics {
    connections_active: AtomicU64,
    connections_total: AtomicU64,
    bytes_received: AtomicU64,
    frames_received: AtomicU64,
    frames_empty: AtomicU64,
    frames_malformed: AtomicU64,
    frames_rejected: AtomicU64,
    oversized: AtomicU64,
    truncated: AtomicU64,
    errors: AtomicU64,
}

impl TcpSourceMetrics {
    pub const fn new() -> Self {
        Self {
            connections_active: AtomicU64::new(0),
            connections_total: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            frames_empty: AtomicU64::new(0),
            frames_malformed: AtomicU64::new(0),
            frames_rejected: AtomicU64::new(0),
            oversized: AtomicU64::new(0),
            truncated: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn connection_opened(&self) {
        self.connections_active.fetch_add(1, Ordering::Relaxed);
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn bytes_read(&self, n: usize) {
        self.bytes_received.fetch_add(n as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Zero-length frame, skipped without reaching the broker
    #[inline]
    pub fn frame_empty(&self) {
        self.frames_empty.fetch_add(1, Ordering::Relaxed);
    }

    /// Frame the broker could not decode
    #[inline]
    pub fn frame_malformed(&self) {
        self.frames_malformed.fetch_add(1, Ordering::Relaxed);
    }

    /// Frame that decoded but whose command was refused
    #[inline]
    pub fn frame_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn oversized(&self) {
        self.oversized.fetch_add(1, Ordering::Relaxed);
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn truncated(&self) {
        self.truncated.fetch_add(1, Ordering::Relaxed);
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TcpMetricsSnapshot {
        TcpMetricsSnapshot {
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_empty: self.frames_empty.load(Ordering::Relaxed),
            frames_malformed: self.frames_malformed.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            oversized: self.oversized.load(Ordering::Relaxed),
            truncated: self.truncated.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`TcpSourceMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TcpMetricsSnapshot {
    pub connections_active: u64,
    pub connections_total: u64,
    pub bytes_received: u64,
    pub frames_received: u64,
    pub frames_empty: u64,
    pub frames_malformed: u64,
    pub frames_rejected: u64,
    pub oversized: u64,
    pub truncated: u64,
    pub errors: u64,
}
