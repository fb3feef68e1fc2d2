//! Broker - frame dispatch and route registry
//!
//! # Dispatch
//!
//! | Object | Command | Action |
//! |--------|---------|--------|
//! | delivery | send | get-or-create route, enqueue into its first channel |
//! | transformer / subscriber | add | get-or-create route and channel, add by address (arg3) |
//! | transformer / subscriber | remove | existing route and channel required |
//! | channel | add | get-or-create; arg3 strategy, arg4 partition key, payload partition count |
//! | channel | remove | existing route required |
//! | route | add / remove | get-or-create / remove and close |
//! | runtime_update | update | arg4 token, arg3 setting, payload value |
//!
//! Anything else is [`BrokerError::UnknownCommand`].
//!
//! # Consolidation
//!
//! Removing the last hop of a channel may remove the channel, and removing
//! the last channel may remove the route. A removed route or channel is
//! marked detached under the same lock that takes it out of its parent, so
//! an add that resolved it beforehand is refused and resolves again.

use std::sync::{Arc, Weak};

use bytes::Bytes;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use courier_auth::SharedTokenStore;
use courier_config::{ConfigError, RuntimeConfig, RuntimeHandle};
use courier_pool::ConnectionPool;
use courier_protocol::{CommandType, Delivery, ObjectType, decode};

use crate::channel::{Channel, ChannelOptions, HopEdit};
use crate::context::BrokerContext;
use crate::error::{BrokerError, Result};
use crate::metrics::{BrokerMetrics, BrokerStats};
use crate::route::Route;
use crate::topology::Topology;

/// What a handled frame did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Delivery accepted into a partition queue
    Queued,
    /// Delivery dropped (no channels, queue full or closed)
    Dropped,
    /// Topology command changed the topology
    Changed,
    /// Topology command was a no-op (duplicate add, absent remove)
    Unchanged,
    /// Runtime update installed this snapshot
    Updated(Arc<RuntimeConfig>),
}

/// Top-level registry of routes
pub struct Broker {
    this: Weak<Broker>,
    routes: RwLock<IndexMap<String, Arc<Route>>>,
    ctx: BrokerContext,
    tokens: SharedTokenStore,
    metrics: BrokerMetrics,
}

impl Broker {
    /// Create a broker
    ///
    /// Must be called from within a tokio runtime once channels are added.
    pub fn new(
        runtime: RuntimeHandle,
        pool: ConnectionPool,
        tokens: SharedTokenStore,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            routes: RwLock::new(IndexMap::new()),
            ctx: BrokerContext {
                runtime,
                pool,
                cancel: CancellationToken::new(),
            },
            tokens,
            metrics: BrokerMetrics::new(),
        })
    }

    #[inline]
    pub fn runtime(&self) -> &RuntimeHandle {
        &self.ctx.runtime
    }

    #[inline]
    pub fn pool(&self) -> &ConnectionPool {
        &self.ctx.pool
    }

    pub fn stats(&self) -> BrokerStats {
        self.metrics.snapshot()
    }

    // ========================================================================
    // Routes
    // ========================================================================

    /// Get or create a route
    pub fn route(&self, name: &str) -> Arc<Route> {
        self.route_entry(name).0
    }

    /// Get or create a route, reporting whether it was created
    fn route_entry(&self, name: &str) -> (Arc<Route>, bool) {
        if let Some(route) = self.get_route(name) {
            return (route, false);
        }

        let mut routes = self.routes.write();
        if let Some(route) = routes.get(name) {
            return (Arc::clone(route), false);
        }

        let route = Route::new(name, self.this.clone(), self.ctx.clone());
        routes.insert(name.to_owned(), Arc::clone(&route));
        tracing::info!(route = name, "route created");
        (route, true)
    }

    pub fn get_route(&self, name: &str) -> Option<Arc<Route>> {
        self.routes.read().get(name).cloned()
    }

    /// Route names in creation order
    pub fn route_names(&self) -> Vec<String> {
        self.routes.read().keys().cloned().collect()
    }

    /// Remove a route and close its channels
    pub fn remove_route(&self, name: &str) -> bool {
        let removed = self.routes.write().shift_remove(name);
        let Some(route) = removed else {
            return false;
        };
        route.close();
        tracing::info!(route = name, "route removed");
        true
    }

    /// Remove `route` only if it is still registered and has no channels
    ///
    /// A newer route registered under the same name is left alone.
    pub(crate) fn consolidate_route(&self, route: &Route) {
        let name = route.name();
        let removed = {
            let mut routes = self.routes.write();
            let current = routes
                .get(name)
                .is_some_and(|r| std::ptr::eq(Arc::as_ptr(r), route));
            if current && route.detach_if_empty() {
                routes.shift_remove(name)
            } else {
                None
            }
        };
        if removed.is_some() {
            tracing::info!(route = name, "empty route removed");
        }
    }

    fn existing_channel(&self, route: &str, channel: &str) -> Result<Arc<Channel>> {
        self.get_route(route)
            .ok_or_else(|| BrokerError::route_miss(route))?
            .channel(channel)
            .ok_or_else(|| BrokerError::channel_miss(route, channel))
    }

    // ========================================================================
    // Frames
    // ========================================================================

    /// Decode and dispatch one frame
    ///
    /// Errors are logged and counted here; callers only need the result to
    /// decide what to report.
    pub async fn handle_frame(&self, frame: Bytes) -> Result<Dispatch> {
        self.metrics.record_frame();

        let delivery = match decode(frame) {
            Ok(delivery) => Arc::new(delivery),
            Err(e) => {
                self.metrics.record_decode_error();
                tracing::warn!(error = %e, "dropping malformed frame");
                return Err(e.into());
            }
        };

        let result = self.dispatch(Arc::clone(&delivery)).await;
        match &result {
            Ok(Dispatch::Changed) => self.metrics.record_topology_change(),
            Ok(Dispatch::Updated(_)) => self.metrics.record_update(),
            Ok(_) => {}
            Err(e) => {
                self.metrics.record_rejected();
                tracing::warn!(
                    object = %delivery.object(),
                    command = %delivery.command(),
                    uid = %delivery.uid(),
                    error = %e,
                    "command rejected"
                );
            }
        }
        result
    }

    /// Dispatch a decoded delivery
    pub async fn dispatch(&self, delivery: Arc<Delivery>) -> Result<Dispatch> {
        let object = delivery.object();
        let command = delivery.command();

        match (object, command) {
            (ObjectType::Delivery, CommandType::Send) => {
                require(&delivery, "route", delivery.route())?;
                let route = self.route(delivery.route());
                let queued = route.process_delivery(delivery).await;
                self.metrics.record_delivery(queued);
                Ok(if queued {
                    Dispatch::Queued
                } else {
                    Dispatch::Dropped
                })
            }

            (ObjectType::Transformer | ObjectType::Subscriber, CommandType::Add) => {
                self.add_hop(&delivery, object == ObjectType::Transformer)
            }

            (ObjectType::Transformer | ObjectType::Subscriber, CommandType::Remove) => {
                require(&delivery, "route", delivery.route())?;
                require(&delivery, "channel", delivery.channel())?;
                require(&delivery, "address", delivery.target())?;
                let channel = self.existing_channel(delivery.route(), delivery.channel())?;
                let address = delivery.target();
                let removed = if object == ObjectType::Transformer {
                    channel.remove_transformer(address)
                } else {
                    channel.remove_subscriber(address)
                };
                Ok(changed(removed))
            }

            (ObjectType::Channel, CommandType::Add) => {
                require(&delivery, "route", delivery.route())?;
                require(&delivery, "channel", delivery.channel())?;
                let options = ChannelOptions::from_delivery(&delivery, &self.ctx.runtime.load())?;
                let (_, created) =
                    self.channel_entry(delivery.route(), delivery.channel(), options);
                Ok(changed(created))
            }

            (ObjectType::Channel, CommandType::Remove) => {
                require(&delivery, "route", delivery.route())?;
                require(&delivery, "channel", delivery.channel())?;
                let route = self
                    .get_route(delivery.route())
                    .ok_or_else(|| BrokerError::route_miss(delivery.route()))?;
                Ok(changed(route.remove_channel(delivery.channel())))
            }

            (ObjectType::Route, CommandType::Add) => {
                require(&delivery, "route", delivery.route())?;
                Ok(changed(self.route_entry(delivery.route()).1))
            }

            (ObjectType::Route, CommandType::Remove) => {
                require(&delivery, "route", delivery.route())?;
                Ok(changed(self.remove_route(delivery.route())))
            }

            (ObjectType::RuntimeUpdate, CommandType::Update) => self.apply_update(&delivery),

            _ => Err(BrokerError::UnknownCommand { object, command }),
        }
    }

    /// Get or create a route and channel, reporting whether either was created
    ///
    /// Retries while a concurrent removal detaches the route it resolved.
    fn channel_entry(
        &self,
        route: &str,
        channel: &str,
        options: ChannelOptions,
    ) -> (Arc<Channel>, bool) {
        loop {
            let (entry, route_created) = self.route_entry(route);
            if let Some((resolved, created)) = entry.add_channel(channel, options.clone()) {
                return (resolved, route_created || created);
            }
            tracing::debug!(route, channel, "route detached during add, resolving again");
        }
    }

    /// Add a transformer or subscriber, creating the route and channel with
    /// default options if needed
    fn add_hop(&self, delivery: &Delivery, transformer: bool) -> Result<Dispatch> {
        require(delivery, "route", delivery.route())?;
        require(delivery, "channel", delivery.channel())?;
        require(delivery, "address", delivery.target())?;

        let address = delivery.target();
        loop {
            let options = ChannelOptions::new(&self.ctx.runtime.load());
            let (channel, _) = self.channel_entry(delivery.route(), delivery.channel(), options);
            let edit = if transformer {
                channel.try_add_transformer(address)
            } else {
                channel.try_add_subscriber(address)
            };
            match edit {
                HopEdit::Added => return Ok(Dispatch::Changed),
                HopEdit::AlreadyPresent => return Ok(Dispatch::Unchanged),
                HopEdit::Detached => tracing::debug!(
                    route = delivery.route(),
                    channel = delivery.channel(),
                    "channel detached during add, resolving again"
                ),
            }
        }
    }

    /// Validate the token, then install the new snapshot
    fn apply_update(&self, delivery: &Delivery) -> Result<Dispatch> {
        let setting = delivery.target();
        if !self.tokens.validate(delivery.key()) {
            return Err(BrokerError::unauthorized(setting));
        }

        let value = std::str::from_utf8(delivery.payload()).map_err(|_| {
            ConfigError::invalid_value("runtime", "value", "setting value is not valid UTF-8")
        })?;

        let snapshot = self.ctx.runtime.apply_update(setting, value)?;
        Ok(Dispatch::Updated(snapshot))
    }

    // ========================================================================
    // Diagnostics and lifecycle
    // ========================================================================

    /// Read-only walk of routes, channels and hops
    pub fn topology(&self) -> Topology {
        let routes: Vec<Arc<Route>> = self.routes.read().values().cloned().collect();
        Topology {
            routes: routes.iter().map(|r| r.topology()).collect(),
        }
    }

    /// Close every route and wait for queued deliveries to drain
    ///
    /// Pending dials are cancelled once draining is done.
    pub async fn shutdown(&self) {
        let routes: Vec<Arc<Route>> = self.routes.read().values().cloned().collect();
        tracing::info!(routes = routes.len(), "broker draining");

        for route in &routes {
            route.shutdown().await;
        }
        self.routes.write().clear();
        self.ctx.cancel.cancel();

        let stats = self.stats();
        let pool = self.ctx.pool.stats();
        tracing::info!(
            frames = stats.frames,
            decode_errors = stats.decode_errors,
            deliveries = stats.deliveries,
            deliveries_dropped = stats.deliveries_dropped,
            topology_changes = stats.topology_changes,
            updates_applied = stats.updates_applied,
            rejected = stats.rejected,
            pool_dials = pool.dials,
            pool_reuses = pool.reuses,
            pool_evictions = pool.evictions,
            pool_discards = pool.discards,
            "broker stopped"
        );
    }
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("routes", &self.route_names())
            .finish()
    }
}

#[inline]
fn changed(did_change: bool) -> Dispatch {
    if did_change {
        Dispatch::Changed
    } else {
        Dispatch::Unchanged
    }
}

fn require(delivery: &Delivery, field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(BrokerError::MissingField {
            object: delivery.object(),
            command: delivery.command(),
            field,
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "broker_test.rs"]
mod tests;
