//! Route - ordered sequence of channels
//!
//! Insertion order is pipeline order. A delivery enters the first channel;
//! each partition worker forwards it to the channel after its own, so the
//! route never loops over channels itself.

use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;

use courier_protocol::Delivery;

use crate::broker::Broker;
use crate::channel::{Channel, ChannelOptions};
use crate::context::BrokerContext;
use crate::topology::RouteTopology;

/// Channel sequence plus whether the route has left its broker
#[derive(Default)]
struct Channels {
    map: IndexMap<String, Arc<Channel>>,
    detached: bool,
}

/// Named channel pipeline
pub struct Route {
    name: String,
    this: Weak<Route>,
    broker: Weak<Broker>,
    ctx: BrokerContext,
    channels: RwLock<Channels>,
}

impl Route {
    pub(crate) fn new(name: &str, broker: Weak<Broker>, ctx: BrokerContext) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            name: name.to_owned(),
            this: this.clone(),
            broker,
            ctx,
            channels: RwLock::new(Channels::default()),
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get or create a channel, appending it if new
    ///
    /// `options` only apply when the channel is created. Returns the channel
    /// and whether it was created, or `None` once the route has been removed
    /// from its broker.
    pub fn add_channel(
        &self,
        name: &str,
        options: ChannelOptions,
    ) -> Option<(Arc<Channel>, bool)> {
        {
            let channels = self.channels.read();
            if channels.detached {
                return None;
            }
            if let Some(channel) = channels.map.get(name) {
                return Some((Arc::clone(channel), false));
            }
        }

        let mut channels = self.channels.write();
        if channels.detached {
            return None;
        }
        if let Some(channel) = channels.map.get(name) {
            return Some((Arc::clone(channel), false));
        }

        let channel = Arc::new(Channel::new(
            &self.name,
            name,
            self.this.clone(),
            options,
            self.ctx.clone(),
        ));
        channels.map.insert(name.to_owned(), Arc::clone(&channel));
        Some((channel, true))
    }

    pub fn channel(&self, name: &str) -> Option<Arc<Channel>> {
        self.channels.read().map.get(name).cloned()
    }

    /// Channels in pipeline order
    pub fn channels(&self) -> Vec<Arc<Channel>> {
        self.channels.read().map.values().cloned().collect()
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.read().map.keys().cloned().collect()
    }

    /// The channel after `name`, if any
    pub fn next_channel(&self, name: &str) -> Option<Arc<Channel>> {
        let channels = self.channels.read();
        let index = channels.map.get_index_of(name)?;
        channels.map.get_index(index + 1).map(|(_, c)| Arc::clone(c))
    }

    pub fn len(&self) -> usize {
        self.channels.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.read().map.is_empty()
    }

    /// Whether the route has been removed from its broker
    pub fn is_detached(&self) -> bool {
        self.channels.read().detached
    }

    /// Hand a delivery to the first channel
    ///
    /// Returns `false` if the route has no channels or the delivery was
    /// dropped at enqueue.
    pub async fn process_delivery(&self, delivery: Arc<Delivery>) -> bool {
        let first = self.channels.read().map.first().map(|(_, c)| Arc::clone(c));
        match first {
            Some(channel) => channel.enqueue(delivery).await,
            None => {
                tracing::warn!(
                    route = %self.name,
                    uid = %delivery.uid(),
                    "route has no channels, delivery dropped"
                );
                false
            }
        }
    }

    /// Remove a channel and close its partitions
    ///
    /// With auto-consolidation on, removing the last channel also removes
    /// the route from the broker.
    pub fn remove_channel(&self, name: &str) -> bool {
        let (removed, now_empty) = {
            let mut channels = self.channels.write();
            let removed = channels.map.shift_remove(name);
            if let Some(channel) = &removed {
                channel.detach();
            }
            (removed, channels.map.is_empty())
        };

        let Some(channel) = removed else {
            return false;
        };
        self.retire(&channel, name, now_empty);
        true
    }

    /// Remove `channel` if it is still this route's and still empty
    ///
    /// Emptiness is checked and the channel detached under the route's write
    /// lock, so an add racing the removal either lands first and keeps the
    /// channel or sees it detached and re-resolves.
    pub(crate) fn consolidate_channel(&self, channel: &Channel) {
        let name = channel.name();
        let (removed, now_empty) = {
            let mut channels = self.channels.write();
            let empty = channels
                .map
                .get(name)
                .is_some_and(|c| std::ptr::eq(Arc::as_ptr(c), channel) && c.detach_if_empty());
            if !empty {
                return;
            }
            let removed = channels.map.shift_remove(name);
            (removed, channels.map.is_empty())
        };

        if let Some(channel) = removed {
            tracing::debug!(route = %self.name, channel = name, "consolidating empty channel");
            self.retire(&channel, name, now_empty);
        }
    }

    /// Close a detached channel that has left the sequence
    fn retire(&self, channel: &Channel, name: &str, now_empty: bool) {
        channel.close();
        tracing::info!(route = %self.name, channel = name, "channel removed");

        if now_empty
            && self.ctx.runtime.load().auto_consolidate
            && let Some(broker) = self.broker.upgrade()
        {
            broker.consolidate_route(self);
        }
    }

    /// Mark the route removed if it has no channels
    ///
    /// Called by the broker with its route map locked.
    pub(crate) fn detach_if_empty(&self) -> bool {
        let mut channels = self.channels.write();
        if !channels.map.is_empty() {
            return false;
        }
        channels.detached = true;
        true
    }

    /// Detach and close every channel without waiting
    pub(crate) fn close(&self) {
        let channels = {
            let mut channels = self.channels.write();
            channels.detached = true;
            std::mem::take(&mut channels.map)
        };
        for channel in channels.values() {
            channel.detach();
            channel.close();
        }
    }

    /// Close every channel in pipeline order and wait for each to drain
    ///
    /// Upstream channels drain first so their forwards still find the
    /// downstream channel open.
    pub(crate) async fn shutdown(&self) {
        let channels = self.channels();
        for channel in &channels {
            channel.close();
            channel.drain().await;
        }
        self.channels.write().map.clear();
    }

    pub fn topology(&self) -> RouteTopology {
        RouteTopology {
            name: self.name.clone(),
            channels: self.channels().iter().map(|c| c.topology()).collect(),
        }
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("channels", &self.channel_names())
            .finish()
    }
}

#[cfg(test)]
#[path = "route_test.rs"]
mod tests;
