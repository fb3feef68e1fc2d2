//! Remote subscriber
//!
//! # Protocol
//!
//! ```text
//! → [4 bytes: length (big-endian)][payload]
//! ```
//!
//! No response is read. A connection goes back to the pool after a complete
//! write and is closed after a failed one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use courier_pool::ConnectionPool;
use courier_protocol::{Delivery, encode_frame};

use crate::{DeliveryError, SubscriberMetrics, SubscriberStats};

/// Default deadline for writing one payload
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Subscriber reached at a TCP address
///
/// Equality and hashing use the address only.
pub struct Subscriber {
    address: String,
    pool: ConnectionPool,
    cancel: CancellationToken,
    write_timeout: Duration,
    /// Set after the first successful write; diagnostic only
    resolved: AtomicBool,
    metrics: SubscriberMetrics,
}

impl Subscriber {
    pub fn new(
        address: impl Into<String>,
        pool: ConnectionPool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            address: address.into(),
            pool,
            cancel,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            resolved: AtomicBool::new(false),
            metrics: SubscriberMetrics::new(),
        }
    }

    /// Set the deadline for writing one payload
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    #[inline]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether any delivery has reached this subscriber
    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> SubscriberStats {
        self.metrics.snapshot()
    }

    /// Deliver the payload, logging and swallowing any failure
    ///
    /// Returns `true` if the payload was written.
    pub async fn deliver(&self, delivery: &Delivery) -> bool {
        match self.try_deliver(delivery).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    subscriber = %self.address,
                    uid = %delivery.uid(),
                    error = %e,
                    "delivery to subscriber failed"
                );
                false
            }
        }
    }

    /// Deliver the payload, returning the failure cause
    pub async fn try_deliver(&self, delivery: &Delivery) -> Result<(), DeliveryError> {
        self.metrics.attempt();
        let result = self.write(delivery).await;
        match &result {
            Ok(()) => {
                self.resolved.store(true, Ordering::Relaxed);
                self.metrics.delivered(delivery.payload().len());
            }
            Err(_) => self.metrics.failed(),
        }
        result
    }

    async fn write(&self, delivery: &Delivery) -> Result<(), DeliveryError> {
        let frame = encode_frame(delivery.payload())?;
        let mut conn = self.pool.borrow(&self.cancel, &self.address).await?;

        let written = timeout(self.write_timeout, conn.stream().write_all(&frame)).await;
        match written {
            Ok(Ok(())) => {
                conn.release(false);
                tracing::trace!(
                    subscriber = %self.address,
                    uid = %delivery.uid(),
                    bytes = frame.len(),
                    "delivered"
                );
                Ok(())
            }
            Ok(Err(e)) => {
                conn.release(true);
                Err(DeliveryError::write(&self.address, e))
            }
            Err(_) => {
                conn.release(true);
                Err(DeliveryError::timeout(&self.address, self.write_timeout))
            }
        }
    }
}

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Subscriber {}

impl std::hash::Hash for Subscriber {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("address", &self.address)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
