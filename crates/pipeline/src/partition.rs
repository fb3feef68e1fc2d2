//! Partition - one ordered lane of a channel
//!
//! Each partition owns a bounded FIFO queue and exactly one worker task.
//! Deliveries hashed to the same partition are processed strictly in arrival
//! order; different partitions run concurrently.
//!
//! ```text
//!            ┌──────────────── worker ────────────────┐
//! enqueue ──►│ queue ─► transform ─► select ─► fan-out │──► next channel
//!            └─────────────────────────────────────────┘
//! ```
//!
//! # States
//!
//! `idle` ⇄ `processing`, then `closed` once the queue is closed and drained.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::task::JoinHandle;

use courier_protocol::Delivery;

use crate::channel::ChannelCore;

const IDLE: u8 = 0;
const PROCESSING: u8 = 1;
const CLOSED: u8 = 2;

/// Observable partition state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionState {
    Idle,
    Processing,
    Closed,
}

/// Why an enqueue failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnqueueError {
    /// Queue stayed full for the whole enqueue timeout
    Full,
    /// Partition no longer accepts deliveries
    Closed,
}

impl EnqueueError {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Full => "queue full",
            Self::Closed => "partition closed",
        }
    }
}

pub(crate) struct Partition {
    sender: Mutex<Option<mpsc::Sender<Arc<Delivery>>>>,
    state: Arc<AtomicU8>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Partition {
    /// Create the queue and spawn the worker
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn spawn(index: usize, capacity: usize, core: Arc<ChannelCore>) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let state = Arc::new(AtomicU8::new(IDLE));
        let worker = tokio::spawn(run(index, rx, core, Arc::clone(&state)));

        Self {
            sender: Mutex::new(Some(tx)),
            state,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Push a delivery, waiting up to `wait` for queue space
    pub(crate) async fn enqueue(
        &self,
        delivery: Arc<Delivery>,
        wait: Duration,
    ) -> Result<(), EnqueueError> {
        // Clone out so the lock is not held across the await
        let Some(sender) = self.sender.lock().clone() else {
            return Err(EnqueueError::Closed);
        };

        match sender.send_timeout(delivery, wait).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(EnqueueError::Full),
            Err(SendTimeoutError::Closed(_)) => Err(EnqueueError::Closed),
        }
    }

    /// Stop accepting deliveries; the worker drains what is queued
    pub(crate) fn close(&self) {
        self.sender.lock().take();
    }

    /// Wait for the worker to drain and exit
    pub(crate) async fn join(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }

    pub(crate) fn state(&self) -> PartitionState {
        match self.state.load(Ordering::Acquire) {
            IDLE => PartitionState::Idle,
            PROCESSING => PartitionState::Processing,
            _ => PartitionState::Closed,
        }
    }

    /// Deliveries waiting in the queue
    pub(crate) fn queued(&self) -> usize {
        self.sender
            .lock()
            .as_ref()
            .map_or(0, |s| s.max_capacity() - s.capacity())
    }
}

async fn run(
    index: usize,
    mut queue: mpsc::Receiver<Arc<Delivery>>,
    core: Arc<ChannelCore>,
    state: Arc<AtomicU8>,
) {
    tracing::debug!(
        route = %core.route,
        channel = %core.name,
        partition = index,
        "partition worker started"
    );

    while let Some(delivery) = queue.recv().await {
        state.store(PROCESSING, Ordering::Release);
        process(&core, delivery).await;
        state.store(IDLE, Ordering::Release);
    }

    state.store(CLOSED, Ordering::Release);
    tracing::debug!(
        route = %core.route,
        channel = %core.name,
        partition = index,
        "partition closed"
    );
}

/// Transform, select, fan out, forward
async fn process(core: &ChannelCore, delivery: Arc<Delivery>) {
    let chain = core.transformers.load_full();
    let output = chain.apply(delivery).await;
    core.metrics.record_transforms(output.applied, output.skipped);
    let delivery = output.delivery;

    let subscribers = core.subscribers.load_full();
    let selected = core.strategy.select(&subscribers);
    if !selected.is_empty() {
        // Barrier: every attempt completes before the delivery moves on
        let results = join_all(selected.iter().map(|s| s.deliver(&delivery))).await;
        let delivered = results.iter().filter(|ok| **ok).count();
        core.metrics
            .record_fanout(delivered, results.len() - delivered);
    }
    core.metrics.record_processed();

    if let Some(route) = core.route_link.upgrade()
        && let Some(next) = route.next_channel(&core.name)
        && next.enqueue(delivery).await
    {
        core.metrics.record_forwarded();
    }
}
