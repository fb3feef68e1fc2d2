//! Subscriber delivery errors
//!
//! These never leave [`crate::Subscriber::deliver`]; they surface through
//! [`crate::Subscriber::try_deliver`] for callers that want the cause.

use std::time::Duration;

use courier_pool::PoolError;
use courier_protocol::ProtocolError;
use thiserror::Error;

/// Errors from one delivery attempt
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Could not obtain a connection
    #[error(transparent)]
    Dial(#[from] PoolError),

    /// Writing the payload failed
    #[error("write to subscriber {address} failed: {source}")]
    Write {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Write did not complete within the deadline
    #[error("write to subscriber {address} timed out after {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    /// Payload could not be framed
    #[error("cannot frame payload: {0}")]
    Frame(#[from] ProtocolError),
}

impl DeliveryError {
    pub fn write(address: impl Into<String>, source: std::io::Error) -> Self {
        Self::Write {
            address: address.into(),
            source,
        }
    }

    pub fn timeout(address: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            address: address.into(),
            timeout,
        }
    }
}
