//! Courier - Sinks
//!
//! Subscribers are the terminal hop of a channel: remote TCP endpoints that
//! receive a delivery's payload once it has been through the transform
//! chain.
//!
//! # Delivery Contract
//!
//! ```text
//! [Partition] --&Delivery--> [Subscriber] --[len][payload]--> [Endpoint]
//! ```
//!
//! One-way and best-effort. The subscriber never waits for a reply, never
//! retries, and a failure is logged and counted rather than returned to the
//! partition. A delivery reaches each selected subscriber at most once.

mod error;
mod metrics;
mod subscriber;

pub use error::DeliveryError;
pub use metrics::{SubscriberMetrics, SubscriberStats};
pub use subscriber::Subscriber;
