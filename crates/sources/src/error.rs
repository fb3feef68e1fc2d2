//! TCP source errors

use courier_protocol::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TcpSourceError {
    /// Listener could not be bound
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Declared transport length above the frame limit
    #[error("transport frame rejected: {0}")]
    Frame(#[from] ProtocolError),

    /// Peer closed the stream in the middle of a frame
    #[error("connection closed with {pending} bytes of an incomplete frame")]
    Truncated { pending: usize },
}

impl TcpSourceError {
    /// Peer went away without a protocol fault
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Self::Io(e) if matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::BrokenPipe
            )
        )
    }
}
