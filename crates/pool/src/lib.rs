//! Courier Pool - shared outbound connections
//!
//! Transformers and subscribers are plain TCP endpoints. Rather than dialing
//! per delivery, every hop borrows a connection from one process-wide
//! [`ConnectionPool`] keyed by address and hands it back when done.
//!
//! # Lifecycle
//!
//! ```text
//! borrow(addr) ──► cached & fresh? ──yes──► PooledConnection
//!                     │ no
//!                     ▼
//!                   dial (timeout, cancellable)
//!
//! release(false) ──► free list has room? ──yes──► cached
//!                                          no ──► closed
//! release(true)  ──► closed
//! ```
//!
//! Idle eviction is lazy: a cached connection that sat unused longer than
//! `idle_timeout`, or that the peer has closed, is discarded the next time
//! someone borrows for its address.
//! There is no background sweeper.

mod config;
mod error;
mod metrics;
mod pool;

pub use config::PoolConfig;
pub use error::PoolError;
pub use metrics::{PoolMetrics, PoolStats};
pub use pool::{ConnectionPool, PooledConnection};
