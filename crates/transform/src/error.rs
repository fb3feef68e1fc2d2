//! Transform error types
//!
//! Every variant is local to one hop: the chain logs it and moves on.

use std::time::Duration;

use courier_pool::PoolError;
use courier_protocol::ProtocolError;
use thiserror::Error;

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

/// Errors that can occur while applying one transformer
#[derive(Debug, Error)]
pub enum TransformError {
    /// Could not obtain a connection
    #[error(transparent)]
    Dial(#[from] PoolError),

    /// Writing the request failed
    #[error("write to transformer {address} failed: {source}")]
    Write {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading the response failed
    #[error("read from transformer {address} failed: {source}")]
    Read {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Exchange exceeded the transform timeout
    #[error("transformer {address} timed out after {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    /// Response declared a length above the payload limit
    #[error("transformer {address} response of {size} bytes exceeds maximum {max}")]
    ResponseTooLarge {
        address: String,
        size: usize,
        max: usize,
    },

    /// Payload could not be framed
    #[error("cannot frame payload: {0}")]
    Frame(#[from] ProtocolError),
}

impl TransformError {
    /// Create a write error
    pub fn write(address: impl Into<String>, source: std::io::Error) -> Self {
        Self::Write {
            address: address.into(),
            source,
        }
    }

    /// Create a read error
    pub fn read(address: impl Into<String>, source: std::io::Error) -> Self {
        Self::Read {
            address: address.into(),
            source,
        }
    }

    /// Create a timeout error
    pub fn timeout(address: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            address: address.into(),
            timeout,
        }
    }

    /// Check if the failure happened before any bytes were exchanged
    pub fn is_dial(&self) -> bool {
        matches!(self, Self::Dial(_))
    }
}
