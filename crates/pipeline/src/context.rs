//! Handles every engine component needs to build hops

use courier_config::RuntimeHandle;
use courier_pool::ConnectionPool;
use tokio_util::sync::CancellationToken;

/// Shared by the broker, its routes and their channels
#[derive(Clone)]
pub(crate) struct BrokerContext {
    pub(crate) runtime: RuntimeHandle,
    pub(crate) pool: ConnectionPool,
    /// Cancels pending dials once the broker has drained
    pub(crate) cancel: CancellationToken,
}
