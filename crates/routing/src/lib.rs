//! Courier - Routing
//!
//! Per-delivery routing decisions made inside a channel:
//!
//! - [`SelectionStrategy`] - which subscribers of a snapshot receive a delivery
//! - [`PartitionKey`] - which delivery field decides the partition
//!
//! # Example
//!
//! ```
//! use courier_routing::{PartitionKey, strategy_from_name};
//! use courier_protocol::{CommandType, Delivery, ObjectType};
//!
//! let strategy = strategy_from_name("rr").unwrap();
//! assert_eq!(strategy.name(), "round_robin");
//!
//! let delivery = Delivery::builder(ObjectType::Delivery, CommandType::Send)
//!     .uid("u-1")
//!     .key("customer-42")
//!     .build();
//!
//! // Same key, same partition
//! let p = PartitionKey::Correlation.partition_for(&delivery, 8);
//! assert_eq!(p, PartitionKey::Correlation.partition_for(&delivery, 8));
//! assert!(p < 8);
//! ```

mod error;
mod partition_key;
mod strategy;


pub use error::{Result, RoutingError};
pub use partition_key::PartitionKey;
pub use strategy::{
    Broadcast, DEFAULT_STRATEGY, Random, RoundRobin, SelectionStrategy, strategy_from_name,
};
