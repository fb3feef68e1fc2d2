//! Client error types

use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors from building or sending frames
#[derive(Debug, Error)]
pub enum ClientError {
    /// Frame could not be encoded
    #[error("encode failed: {0}")]
    Encode(#[from] courier_protocol::ProtocolError),

    /// Socket error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
