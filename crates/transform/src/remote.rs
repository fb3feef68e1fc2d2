//! Remote transformer over TCP
//!
//! # Protocol
//!
//! One request/response exchange per delivery on a pooled connection:
//! ```text
//! → [4 bytes: length (big-endian)][payload]
//! ← [4 bytes: length (big-endian)][new payload]
//! ```
//!
//! The whole exchange is bounded by the live `transform_timeout`. A
//! connection is returned to the pool only after a clean exchange. A reused
//! connection that fails before any reply byte is retried once on a freshly
//! dialed connection.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use courier_config::RuntimeHandle;
use courier_pool::{ConnectionPool, PooledConnection};
use courier_protocol::{Delivery, LENGTH_PREFIX_SIZE, MAX_PAYLOAD_SIZE, encode_frame};

use crate::{TransformError, TransformFuture, TransformResult, Transformer};

#[cfg(test)]
#[path = "remote_test.rs"]
mod tests;

/// Transformer reached at a TCP address
///
/// Equality and hashing use the address only.
pub struct RemoteTransformer {
    address: String,
    pool: ConnectionPool,
    runtime: RuntimeHandle,
    cancel: CancellationToken,
}

impl RemoteTransformer {
    /// Create a transformer for `address`
    ///
    /// `cancel` aborts pending dials when the broker shuts down.
    pub fn new(
        address: impl Into<String>,
        pool: ConnectionPool,
        runtime: RuntimeHandle,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            address: address.into(),
            pool,
            runtime,
            cancel,
        }
    }

    async fn exchange(&self, payload: &[u8]) -> TransformResult<Bytes> {
        let deadline = self.runtime.load().transform_timeout;
        let frame = encode_frame(payload)?;
        let started = Instant::now();

        let conn = self.pool.borrow(&self.cancel, &self.address).await?;
        let reused = conn.is_reused();

        match self.attempt(conn, &frame, deadline).await {
            // A cached connection the peer dropped between checks; one fresh try
            Err(Failure::BeforeReply(e)) if reused => {
                tracing::debug!(
                    transformer = %self.address,
                    error = %e,
                    "cached connection failed before reply, redialing"
                );
                let remaining = deadline.saturating_sub(started.elapsed());
                let conn = self.pool.connect(&self.cancel, &self.address).await?;
                self.attempt(conn, &frame, remaining)
                    .await
                    .map_err(Failure::into_error)
            }
            result => result.map_err(Failure::into_error),
        }
    }

    async fn attempt(
        &self,
        mut conn: PooledConnection,
        frame: &[u8],
        deadline: Duration,
    ) -> Result<Bytes, Failure> {
        let result = timeout(deadline, round_trip(conn.stream(), frame, &self.address)).await;
        match result {
            Ok(Ok(body)) => {
                conn.release(false);
                Ok(body)
            }
            Ok(Err(failure)) => {
                conn.release(true);
                Err(failure)
            }
            Err(_) => {
                conn.release(true);
                Err(Failure::Other(TransformError::timeout(
                    &self.address,
                    deadline,
                )))
            }
        }
    }
}

/// Where an exchange broke off
enum Failure {
    /// Nothing came back: the write failed or the peer closed before replying
    BeforeReply(TransformError),
    Other(TransformError),
}

impl Failure {
    fn into_error(self) -> TransformError {
        match self {
            Self::BeforeReply(e) | Self::Other(e) => e,
        }
    }
}

async fn round_trip(stream: &mut TcpStream, frame: &[u8], address: &str) -> Result<Bytes, Failure> {
    stream
        .write_all(frame)
        .await
        .map_err(|e| Failure::BeforeReply(TransformError::write(address, e)))?;

    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    let first = stream
        .read(&mut prefix)
        .await
        .map_err(|e| Failure::BeforeReply(TransformError::read(address, e)))?;
    if first == 0 {
        let eof = io::Error::from(io::ErrorKind::UnexpectedEof);
        return Err(Failure::BeforeReply(TransformError::read(address, eof)));
    }
    stream
        .read_exact(&mut prefix[first..])
        .await
        .map_err(|e| Failure::Other(TransformError::read(address, e)))?;

    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_PAYLOAD_SIZE {
        return Err(Failure::Other(TransformError::ResponseTooLarge {
            address: address.to_owned(),
            size: len,
            max: MAX_PAYLOAD_SIZE,
        }));
    }

    let mut body = BytesMut::zeroed(len);
    stream
        .read_exact(&mut body)
        .await
        .map_err(|e| Failure::Other(TransformError::read(address, e)))?;

    Ok(body.freeze())
}

impl Transformer for RemoteTransformer {
    fn apply<'a>(&'a self, delivery: &'a Arc<Delivery>) -> TransformFuture<'a> {
        Box::pin(async move {
            let body = self.exchange(delivery.payload()).await?;
            tracing::trace!(
                transformer = %self.address,
                uid = %delivery.uid(),
                bytes = body.len(),
                "transformed"
            );
            Ok(Arc::new(delivery.with_payload(body)))
        })
    }

    fn address(&self) -> &str {
        &self.address
    }
}

impl PartialEq for RemoteTransformer {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for RemoteTransformer {}

impl std::hash::Hash for RemoteTransformer {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl std::fmt::Debug for RemoteTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTransformer")
            .field("address", &self.address)
            .finish()
    }
}
