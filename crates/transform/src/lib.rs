//! Courier - Transform
//!
//! Transform stages applied to deliveries before fan-out.
//!
//! # Overview
//!
//! A transformer is a remote service: the broker sends it a delivery's
//! payload and the reply becomes the new payload. Transformers on a channel
//! run in sequence, each receiving the previous one's output.
//!
//! ```text
//! [Delivery] → [Transformer 1] → [Transformer 2] → ... → [Delivery']
//! ```
//!
//! # Failure Model
//!
//! A failing transformer (dial, write, read or timeout) is skipped: the chain
//! continues with the delivery it had before that stage. Nothing is retried.
//! Skips are detectable by pointer identity on the `Arc<Delivery>`.
//!
//! # Modules
//!
//! - `chain` - Ordered, copy-on-write transformer list with skip-on-failure
//! - `remote` - TCP transformer reached through the connection pool

mod chain;
mod error;
mod remote;

pub use chain::{Chain, ChainOutput};
pub use error::TransformError;
pub use remote::RemoteTransformer;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use courier_protocol::Delivery;

/// Result type for transformer operations
pub type TransformResult<T> = Result<T, TransformError>;

/// Boxed future returned by [`Transformer::apply`]
pub type TransformFuture<'a> =
    Pin<Box<dyn Future<Output = TransformResult<Arc<Delivery>>> + Send + 'a>>;

/// Trait for transform stages
///
/// Implementors must be `Send + Sync`; one transformer is shared by every
/// partition of its channel. Identity is the address: two transformers with
/// the same address are the same stage.
///
/// # Example
///
/// ```ignore
/// struct Upper;
///
/// impl Transformer for Upper {
///     fn apply<'a>(&'a self, delivery: &'a Arc<Delivery>) -> TransformFuture<'a> {
///         Box::pin(async move {
///             let body = delivery.payload().to_ascii_uppercase();
///             Ok(Arc::new(delivery.with_payload(body.into())))
///         })
///     }
///
///     fn address(&self) -> &str {
///         "local:upper"
///     }
/// }
/// ```
pub trait Transformer: Send + Sync {
    /// Transform a delivery, returning a new delivery on success
    ///
    /// Must not mutate `delivery`. On error the caller keeps using it.
    fn apply<'a>(&'a self, delivery: &'a Arc<Delivery>) -> TransformFuture<'a>;

    /// Address identifying this stage
    fn address(&self) -> &str;
}
