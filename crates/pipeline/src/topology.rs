//! Read-only topology snapshot
//!
//! A serializable walk of broker → route → channel, used for diagnostics
//! and the shutdown report. Building one never blocks delivery processing.

use serde::Serialize;

use crate::metrics::ChannelStats;
use crate::partition::PartitionState;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Topology {
    pub routes: Vec<RouteTopology>,
}

impl Topology {
    /// Find a route by name
    pub fn route(&self, name: &str) -> Option<&RouteTopology> {
        self.routes.iter().find(|r| r.name == name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteTopology {
    pub name: String,
    /// In pipeline order
    pub channels: Vec<ChannelTopology>,
}

impl RouteTopology {
    pub fn channel(&self, name: &str) -> Option<&ChannelTopology> {
        self.channels.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelTopology {
    pub name: String,
    pub strategy: &'static str,
    pub partition_key: &'static str,
    /// In application order
    pub transformers: Vec<String>,
    pub subscribers: Vec<SubscriberTopology>,
    pub partitions: Vec<PartitionTopology>,
    pub stats: ChannelStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriberTopology {
    pub address: String,
    pub resolved: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionTopology {
    pub index: usize,
    pub state: PartitionState,
    pub queued: usize,
}
