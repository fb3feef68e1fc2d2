//! Courier - Sources
//!
//! Network listeners that read command frames and hand them to the broker.
//!
//! # Available Sources
//!
//! - **TCP** - length-prefixed command frames over plain TCP
//!
//! # Example
//!
//! ```ignore
//! use courier_sources::{TcpSource, TcpSourceConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = TcpSourceConfig {
//!     address: "127.0.0.1".into(),
//!     port: 7070,
//!     ..Default::default()
//! };
//!
//! let source = TcpSource::bind(config, broker).await?;
//! source.run(CancellationToken::new()).await?;
//! ```

mod error;
mod metrics;
pub mod tcp;

pub use error::TcpSourceError;
pub use metrics::{TcpMetricsSnapshot, TcpSourceMetrics};
pub use tcp::{TcpSource, TcpSourceConfig, TcpSourceMetricsHandle};

#[cfg(test)]
mod tcp_test;
