//! Channel - a named pipeline stage
//!
//! A channel owns an ordered transformer chain, a deduplicated subscriber
//! set, a selection strategy and a fixed array of partitions.
//!
//! # Snapshots
//!
//! Edits take the channel's edit lock, build a new list and publish it with
//! an atomic pointer swap. Partition workers load the current snapshot per
//! delivery and never block on edits; a delivery in flight may see a list
//! that is one edit stale.

use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use courier_config::RuntimeConfig;
use courier_protocol::Delivery;
use courier_routing::{Broadcast, PartitionKey, SelectionStrategy, strategy_from_name};
use courier_sinks::Subscriber;
use courier_transform::{Chain, RemoteTransformer, Transformer};

use crate::context::BrokerContext;
use crate::error::{BrokerError, Result};
use crate::metrics::{ChannelMetrics, ChannelStats, DropTracker};
use crate::partition::{EnqueueError, Partition};
use crate::route::Route;
use crate::topology::{ChannelTopology, PartitionTopology, SubscriberTopology};

/// Upper bound for a per-channel partition count
pub const MAX_PARTITIONS: usize = 1024;

/// Settings fixed when a channel is created
#[derive(Clone)]
pub struct ChannelOptions {
    strategy: Arc<dyn SelectionStrategy>,
    partition_key: PartitionKey,
    partitions: usize,
    queue_size: usize,
}

impl ChannelOptions {
    /// Broadcast, correlation key, and the runtime partition defaults
    pub fn new(runtime: &RuntimeConfig) -> Self {
        Self {
            strategy: Arc::new(Broadcast),
            partition_key: PartitionKey::default(),
            partitions: runtime.partitions.clamp(1, MAX_PARTITIONS),
            queue_size: runtime.queue_size.max(1),
        }
    }

    /// Options carried by a channel-add command
    ///
    /// Arg3 names the strategy, arg4 the partition key and the payload an
    /// optional partition count. Empty fields keep the defaults.
    pub fn from_delivery(delivery: &Delivery, runtime: &RuntimeConfig) -> Result<Self> {
        let strategy = strategy_from_name(delivery.target())?;
        let partition_key = delivery.key().parse::<PartitionKey>()?;

        let mut options = Self::new(runtime)
            .with_strategy(strategy)
            .with_partition_key(partition_key);

        let count = delivery.payload_str();
        let count = count.trim();
        if !count.is_empty() {
            let partitions = count
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=MAX_PARTITIONS).contains(n))
                .ok_or_else(|| BrokerError::InvalidPartitions {
                    value: count.to_owned(),
                })?;
            options = options.with_partitions(partitions);
        }

        Ok(options)
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: Arc<dyn SelectionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_partition_key(mut self, key: PartitionKey) -> Self {
        self.partition_key = key;
        self
    }

    #[must_use]
    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions.clamp(1, MAX_PARTITIONS);
        self
    }

    #[must_use]
    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size.max(1);
        self
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn partition_key(&self) -> PartitionKey {
        self.partition_key
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }
}

impl std::fmt::Debug for ChannelOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelOptions")
            .field("strategy", &self.strategy.name())
            .field("partition_key", &self.partition_key)
            .field("partitions", &self.partitions)
            .field("queue_size", &self.queue_size)
            .finish()
    }
}

/// Outcome of adding a hop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HopEdit {
    Added,
    AlreadyPresent,
    /// The channel left its route; the caller must resolve it again
    Detached,
}

/// State shared between a channel and its partition workers
pub(crate) struct ChannelCore {
    pub(crate) route: String,
    pub(crate) name: String,
    pub(crate) route_link: Weak<Route>,
    pub(crate) transformers: ArcSwap<Chain>,
    pub(crate) subscribers: ArcSwap<Vec<Arc<Subscriber>>>,
    pub(crate) strategy: Arc<dyn SelectionStrategy>,
    pub(crate) metrics: ChannelMetrics,
}

/// Named pipeline stage within a route
pub struct Channel {
    core: Arc<ChannelCore>,
    partitions: Vec<Partition>,
    partition_key: PartitionKey,
    ctx: BrokerContext,
    /// Serializes hop edits; holds whether the channel left its route
    edit_lock: Mutex<bool>,
    drops: DropTracker,
}

impl Channel {
    /// Create a channel and spawn its partition workers
    pub(crate) fn new(
        route: &str,
        name: &str,
        route_link: Weak<Route>,
        options: ChannelOptions,
        ctx: BrokerContext,
    ) -> Self {
        let core = Arc::new(ChannelCore {
            route: route.to_owned(),
            name: name.to_owned(),
            route_link,
            transformers: ArcSwap::from_pointee(Chain::empty()),
            subscribers: ArcSwap::from_pointee(Vec::new()),
            strategy: options.strategy,
            metrics: ChannelMetrics::new(),
        });

        let partitions = (0..options.partitions)
            .map(|index| Partition::spawn(index, options.queue_size, Arc::clone(&core)))
            .collect();

        tracing::info!(
            route,
            channel = name,
            strategy = core.strategy.name(),
            partition_key = %options.partition_key,
            partitions = options.partitions,
            "channel created"
        );

        Self {
            core,
            partitions,
            partition_key: options.partition_key,
            ctx,
            edit_lock: Mutex::new(false),
            drops: DropTracker::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.core.name
    }

    #[inline]
    pub fn route_name(&self) -> &str {
        &self.core.route
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn partition_key(&self) -> PartitionKey {
        self.partition_key
    }

    pub fn strategy_name(&self) -> &'static str {
        self.core.strategy.name()
    }

    /// Partition a delivery hashes to
    #[inline]
    pub fn partition_for(&self, delivery: &Delivery) -> usize {
        self.partition_key
            .partition_for(delivery, self.partitions.len())
    }

    /// Queue a delivery on its partition
    ///
    /// Waits up to the live enqueue timeout for space. Returns `false` if the
    /// delivery was dropped.
    pub async fn enqueue(&self, delivery: Arc<Delivery>) -> bool {
        let index = self.partition_for(&delivery);
        let wait = self.ctx.runtime.load().enqueue_timeout;
        let Some(partition) = self.partitions.get(index) else {
            return false;
        };

        match partition.enqueue(Arc::clone(&delivery), wait).await {
            Ok(()) => {
                self.core.metrics.record_enqueued();
                true
            }
            Err(EnqueueError::Full) => {
                self.core.metrics.record_dropped();
                self.drops.record_drop(&self.core.route, &self.core.name);
                tracing::debug!(
                    route = %self.core.route,
                    channel = %self.core.name,
                    partition = index,
                    uid = %delivery.uid(),
                    reason = EnqueueError::Full.as_str(),
                    "delivery dropped"
                );
                false
            }
            Err(EnqueueError::Closed) => {
                self.core.metrics.record_dropped();
                tracing::warn!(
                    route = %self.core.route,
                    channel = %self.core.name,
                    partition = index,
                    uid = %delivery.uid(),
                    reason = EnqueueError::Closed.as_str(),
                    "delivery dropped"
                );
                false
            }
        }
    }

    // ========================================================================
    // Transformers
    // ========================================================================

    /// Append a remote transformer; no-op if the address is present
    pub fn add_transformer(&self, address: &str) -> bool {
        self.try_add_transformer(address) == HopEdit::Added
    }

    pub(crate) fn try_add_transformer(&self, address: &str) -> HopEdit {
        let transformer = RemoteTransformer::new(
            address,
            self.ctx.pool.clone(),
            self.ctx.runtime.clone(),
            self.ctx.cancel.clone(),
        );
        self.try_add_stage(Arc::new(transformer))
    }

    /// Append any transformer stage; no-op if its address is present
    pub fn add_transformer_stage(&self, transformer: Arc<dyn Transformer>) -> bool {
        self.try_add_stage(transformer) == HopEdit::Added
    }

    fn try_add_stage(&self, transformer: Arc<dyn Transformer>) -> HopEdit {
        let address = transformer.address().to_owned();
        let detached = self.edit_lock.lock();
        if *detached {
            return HopEdit::Detached;
        }

        let Some(next) = self.core.transformers.load().with(transformer) else {
            return HopEdit::AlreadyPresent;
        };
        let count = next.len();
        self.core.transformers.store(Arc::new(next));

        tracing::info!(
            route = %self.core.route,
            channel = %self.core.name,
            transformer = %address,
            transformers = count,
            "transformer added"
        );
        HopEdit::Added
    }

    /// Remove a transformer by address; no-op if absent
    pub fn remove_transformer(&self, address: &str) -> bool {
        let removed = {
            let detached = self.edit_lock.lock();
            if *detached {
                return false;
            }
            match self.core.transformers.load().without(address) {
                Some(next) => {
                    self.core.transformers.store(Arc::new(next));
                    true
                }
                None => false,
            }
        };

        if removed {
            tracing::info!(
                route = %self.core.route,
                channel = %self.core.name,
                transformer = address,
                "transformer removed"
            );
            self.consolidate();
        }
        removed
    }

    /// Transformer addresses in application order
    pub fn transformers(&self) -> Vec<String> {
        self.core
            .transformers
            .load()
            .addresses()
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    // ========================================================================
    // Subscribers
    // ========================================================================

    /// Add a subscriber; no-op if the address is present
    pub fn add_subscriber(&self, address: &str) -> bool {
        self.try_add_subscriber(address) == HopEdit::Added
    }

    pub(crate) fn try_add_subscriber(&self, address: &str) -> HopEdit {
        let detached = self.edit_lock.lock();
        if *detached {
            return HopEdit::Detached;
        }

        let current = self.core.subscribers.load();
        if current.iter().any(|s| s.address() == address) {
            return HopEdit::AlreadyPresent;
        }

        let subscriber = Subscriber::new(address, self.ctx.pool.clone(), self.ctx.cancel.clone());
        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(Arc::new(subscriber));
        let count = next.len();
        self.core.subscribers.store(Arc::new(next));

        tracing::info!(
            route = %self.core.route,
            channel = %self.core.name,
            subscriber = address,
            subscribers = count,
            "subscriber added"
        );
        HopEdit::Added
    }

    /// Remove a subscriber by address; no-op if absent
    pub fn remove_subscriber(&self, address: &str) -> bool {
        let removed = {
            let detached = self.edit_lock.lock();
            if *detached {
                return false;
            }
            let current = self.core.subscribers.load();
            if current.iter().any(|s| s.address() == address) {
                let next: Vec<_> = current
                    .iter()
                    .filter(|s| s.address() != address)
                    .cloned()
                    .collect();
                self.core.subscribers.store(Arc::new(next));
                true
            } else {
                false
            }
        };

        if removed {
            tracing::info!(
                route = %self.core.route,
                channel = %self.core.name,
                subscriber = address,
                "subscriber removed"
            );
            self.consolidate();
        }
        removed
    }

    /// Subscriber addresses in insertion order
    pub fn subscribers(&self) -> Vec<String> {
        self.core
            .subscribers
            .load()
            .iter()
            .map(|s| s.address().to_owned())
            .collect()
    }

    /// Current subscriber snapshot
    pub fn subscriber_snapshot(&self) -> Arc<Vec<Arc<Subscriber>>> {
        self.core.subscribers.load_full()
    }

    /// No transformers and no subscribers
    pub fn is_empty(&self) -> bool {
        self.core.transformers.load().is_empty() && self.core.subscribers.load().is_empty()
    }

    /// Ask the route to drop this channel once it has nothing left
    fn consolidate(&self) {
        if !self.ctx.runtime.load().auto_consolidate || !self.is_empty() {
            return;
        }
        if let Some(route) = self.core.route_link.upgrade() {
            route.consolidate_channel(self);
        }
    }

    /// Whether the channel has left its route
    pub fn is_detached(&self) -> bool {
        *self.edit_lock.lock()
    }

    /// Mark the channel as removed from its route; later adds are refused
    pub(crate) fn detach(&self) {
        *self.edit_lock.lock() = true;
    }

    /// Detach only if no hops are left
    ///
    /// Called by the route with its channel list locked.
    pub(crate) fn detach_if_empty(&self) -> bool {
        let mut detached = self.edit_lock.lock();
        if !self.is_empty() {
            return false;
        }
        *detached = true;
        true
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Stop accepting deliveries; queued ones are still processed
    pub fn close(&self) {
        for partition in &self.partitions {
            partition.close();
        }
    }

    /// Wait until every partition worker has drained and exited
    pub async fn drain(&self) {
        for partition in &self.partitions {
            partition.join().await;
        }
    }

    pub fn stats(&self) -> ChannelStats {
        self.core.metrics.snapshot()
    }

    pub fn topology(&self) -> ChannelTopology {
        ChannelTopology {
            name: self.core.name.clone(),
            strategy: self.core.strategy.name(),
            partition_key: self.partition_key.as_str(),
            transformers: self.transformers(),
            subscribers: self
                .core
                .subscribers
                .load()
                .iter()
                .map(|s| SubscriberTopology {
                    address: s.address().to_owned(),
                    resolved: s.is_resolved(),
                })
                .collect(),
            partitions: self
                .partitions
                .iter()
                .enumerate()
                .map(|(index, p)| PartitionTopology {
                    index,
                    state: p.state(),
                    queued: p.queued(),
                })
                .collect(),
            stats: self.stats(),
        }
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("route", &self.core.route)
            .field("name", &self.core.name)
            .field("partitions", &self.partitions.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "channel_test.rs"]
mod tests;
