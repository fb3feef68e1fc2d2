//! Courier - Pipeline
//!
//! The delivery engine: a broker of routes, each an ordered sequence of
//! channels, each channel a set of partition workers.
//!
//! # Architecture
//!
//! ```text
//!                          Route "orders"
//! [TCP source]          ┌──────────────────────────────────────────────┐
//!   frame ──► Broker ──►│ Channel "primary"        Channel "audit"     │
//!             decode    │  ├ P0 ─┐                  ├ P0 ─┐            │
//!             dispatch  │  ├ P1 ─┼─ forward ──────► ├ P1 ─┼─ ...       │
//!                       │  └ Pn ─┘                  └ Pn ─┘            │
//!                       └──────────────────────────────────────────────┘
//!                          each Pk: transform → select → fan-out
//! ```
//!
//! # Key Design
//!
//! - **One worker per partition**: total concurrency is channels ×
//!   partitions, independent of connection count
//! - **Strict FIFO per partition**: equal partition keys keep their order
//! - **Snapshot reads**: transformer and subscriber lists are swapped
//!   atomically; workers never wait on topology edits
//! - **Ordered topology**: routes and channels keep insertion order, and
//!   channel order is pipeline order
//! - **Best effort**: failed transformers are skipped and failed subscriber
//!   writes are logged; nothing is retried
//!
//! # Example
//!
//! ```ignore
//! let broker = Broker::new(runtime, pool, tokens);
//!
//! // From a connection handler
//! match broker.handle_frame(frame).await {
//!     Ok(Dispatch::Queued) => {}
//!     Ok(other) => tracing::debug!(?other, "handled"),
//!     Err(_) => {} // already logged
//! }
//!
//! // On shutdown
//! broker.shutdown().await;
//! ```

mod broker;
mod channel;
mod context;
mod error;
mod metrics;
mod partition;
mod route;
mod topology;

pub use broker::{Broker, Dispatch};
pub use channel::{Channel, ChannelOptions, MAX_PARTITIONS};
pub use error::{BrokerError, Result};
pub use metrics::{BrokerMetrics, BrokerStats, ChannelMetrics, ChannelStats, DropTracker};
pub use partition::PartitionState;
pub use route::Route;
pub use topology::{
    ChannelTopology, PartitionTopology, RouteTopology, SubscriberTopology, Topology,
};

#[cfg(test)]
mod test_util;
