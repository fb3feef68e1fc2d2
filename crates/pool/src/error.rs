//! Pool error types

use std::time::Duration;

use thiserror::Error;

/// Errors from borrowing a connection
#[derive(Debug, Error)]
pub enum PoolError {
    /// Connection attempt failed
    #[error("failed to dial {address}: {source}")]
    Dial {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Connection attempt exceeded the dial timeout
    #[error("dial to {address} timed out after {timeout:?}")]
    DialTimeout { address: String, timeout: Duration },

    /// Caller cancelled while the dial was in flight
    #[error("dial to {address} cancelled")]
    Cancelled { address: String },
}

impl PoolError {
    /// Address the failed borrow was for
    pub fn address(&self) -> &str {
        match self {
            Self::Dial { address, .. }
            | Self::DialTimeout { address, .. }
            | Self::Cancelled { address } => address,
        }
    }
}
