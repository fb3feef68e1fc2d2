//! TCP Source - command frames into the broker
//!
//! # Protocol
//!
//! Each frame is prefixed with a 4-byte big-endian length:
//! ```text
//! [4 bytes: length (big-endian)][N bytes: command frame]
//! ```
//!
//! A zero length is an empty frame and is skipped. A declared length above
//! the frame limit closes the connection as soon as the prefix is read, and so
//! does EOF in the middle of a frame. A frame that fails to decode or whose
//! command is refused is logged by the broker; the connection keeps reading.
//!
//! # Design
//!
//! - **Bounded workers**: a semaphore of `workers` permits gates how many
//!   connections are served at once; further peers wait in the accept queue
//! - **Buffered reads**: `BytesMut` accumulates reads and frames are split off
//!   without copying
//! - **In-order dispatch**: frames from one connection reach the broker in
//!   the order they were written
//!
//! # Example
//!
//! ```ignore
//! let config = TcpSourceConfig::from_server(&config.server);
//! let source = TcpSource::bind(config, Arc::clone(&broker)).await?;
//! source.run(cancel.clone()).await?;
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use socket2::{SockRef, TcpKeepalive};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use courier_config::ServerConfig;
use courier_pipeline::Broker;
use courier_protocol::{LENGTH_PREFIX_SIZE, MAX_FRAME_SIZE, peek_frame_len};

use crate::error::TcpSourceError;
use crate::metrics::{TcpMetricsSnapshot, TcpSourceMetrics};

/// Default read buffer size (256KB)
const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// Default concurrently served connections
const DEFAULT_WORKERS: usize = 64;

/// TCP source configuration
#[derive(Debug, Clone)]
pub struct TcpSourceConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub address: String,

    /// Listen port; 0 picks an ephemeral port
    pub port: u16,

    /// Maximum connections served at once
    pub workers: usize,

    /// Initial read buffer size per connection
    pub buffer_size: usize,

    /// TCP nodelay (disable Nagle's algorithm)
    pub nodelay: bool,

    /// TCP keepalive enabled
    pub keepalive: bool,

    /// Idle time before keepalive starts
    pub keepalive_interval: Duration,

    /// SO_RCVBUF, kernel default when unset
    pub socket_buffer_size: Option<usize>,

    /// Largest transport frame accepted
    pub max_frame_size: usize,
}

impl Default for TcpSourceConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 7070,
            workers: DEFAULT_WORKERS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            nodelay: true,
            keepalive: true,
            keepalive_interval: Duration::from_secs(60),
            socket_buffer_size: None,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

impl TcpSourceConfig {
    /// Listener settings from the `[server]` section
    pub fn from_server(server: &ServerConfig) -> Self {
        Self {
            address: server.address.clone(),
            port: server.port,
            workers: server.workers,
            buffer_size: server.buffer_size,
            nodelay: server.no_delay,
            keepalive: server.keepalive,
            keepalive_interval: server.keepalive_interval,
            socket_buffer_size: server.socket_buffer_size,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    /// Get the socket address to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Handle for reading source metrics after `run()` consumed the source
#[derive(Clone)]
pub struct TcpSourceMetricsHandle {
    metrics: Arc<TcpSourceMetrics>,
}

impl TcpSourceMetricsHandle {
    pub fn snapshot(&self) -> TcpMetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// State shared by every connection handler
struct Connections {
    config: TcpSourceConfig,
    broker: Arc<Broker>,
    metrics: Arc<TcpSourceMetrics>,
}

/// Bound TCP listener feeding one broker
pub struct TcpSource {
    listener: TcpListener,
    local_addr: SocketAddr,
    connections: Arc<Connections>,
}

impl TcpSource {
    /// Bind the configured address
    pub async fn bind(
        config: TcpSourceConfig,
        broker: Arc<Broker>,
    ) -> Result<Self, TcpSourceError> {
        let bind_addr = config.bind_address();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| TcpSourceError::Bind {
                address: bind_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener,
            local_addr,
            connections: Arc::new(Connections {
                config,
                broker,
                metrics: Arc::new(TcpSourceMetrics::new()),
            }),
        })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn metrics_handle(&self) -> TcpSourceMetricsHandle {
        TcpSourceMetricsHandle {
            metrics: Arc::clone(&self.connections.metrics),
        }
    }

    /// Accept connections until `cancel` fires
    ///
    /// Returns once the listener is closed and every connection handler has
    /// exited.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), TcpSourceError> {
        let Self {
            listener,
            local_addr,
            connections,
        } = self;

        let workers = connections
            .config
            .workers
            .clamp(1, Semaphore::MAX_PERMITS.min(u32::MAX as usize));
        let permits = Arc::new(Semaphore::new(workers));

        tracing::info!(address = %local_addr, workers, "TCP source listening");

        loop {
            // Hold a worker slot before accepting so excess peers stay queued
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (stream, peer) = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept error");
                        connections.metrics.error();
                        continue;
                    }
                },
            };

            let connections = Arc::clone(&connections);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let _permit = permit;
                connections.metrics.connection_opened();
                tracing::debug!(peer = %peer, "connection accepted");

                match connections.serve(stream, &cancel).await {
                    Ok(()) => tracing::debug!(peer = %peer, "connection closed"),
                    Err(e) if e.is_disconnect() => {
                        tracing::debug!(peer = %peer, error = %e, "peer disconnected");
                    }
                    Err(e) => {
                        tracing::warn!(peer = %peer, error = %e, "connection dropped");
                    }
                }
                connections.metrics.connection_closed();
            });
        }

        drop(listener);

        // Every handler holds a permit until it exits
        let _ = permits
            .acquire_many(u32::try_from(workers).unwrap_or(u32::MAX))
            .await;

        let stats = connections.metrics.snapshot();
        tracing::info!(
            address = %local_addr,
            connections = stats.connections_total,
            frames = stats.frames_received,
            frames_malformed = stats.frames_malformed,
            frames_rejected = stats.frames_rejected,
            errors = stats.errors,
            "TCP source stopped"
        );
        Ok(())
    }
}

impl Connections {
    /// Read frames from one peer until EOF, a framing fault or cancellation
    async fn serve(
        &self,
        mut stream: TcpStream,
        cancel: &CancellationToken,
    ) -> Result<(), TcpSourceError> {
        self.configure_socket(&stream);

        let mut buf = BytesMut::with_capacity(self.config.buffer_size);
        loop {
            self.dispatch_frames(&mut buf).await?;

            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                read = stream.read_buf(&mut buf) => read?,
            };

            if read == 0 {
                if buf.is_empty() {
                    return Ok(());
                }
                self.metrics.truncated();
                return Err(TcpSourceError::Truncated { pending: buf.len() });
            }
            self.metrics.bytes_read(read);
        }
    }

    /// Hand every complete frame in `buf` to the broker, in order
    async fn dispatch_frames(&self, buf: &mut BytesMut) -> Result<(), TcpSourceError> {
        loop {
            let len = match peek_frame_len(buf, self.config.max_frame_size) {
                Ok(Some(len)) => len,
                Ok(None) => return Ok(()),
                Err(e) => {
                    self.metrics.oversized();
                    return Err(e.into());
                }
            };

            buf.advance(LENGTH_PREFIX_SIZE);
            if len == 0 {
                self.metrics.frame_empty();
                continue;
            }

            let frame = buf.split_to(len).freeze();
            self.metrics.frame_received();
            match self.broker.handle_frame(frame).await {
                Ok(_) => {}
                Err(e) if e.is_decode() => self.metrics.frame_malformed(),
                Err(_) => self.metrics.frame_rejected(),
            }
        }
    }

    /// Apply socket options tokio does not expose
    fn configure_socket(&self, stream: &TcpStream) {
        if self.config.nodelay
            && let Err(e) = stream.set_nodelay(true)
        {
            tracing::debug!(error = %e, "failed to set TCP_NODELAY");
        }

        let socket = SockRef::from(stream);

        if let Some(size) = self.config.socket_buffer_size
            && let Err(e) = socket.set_recv_buffer_size(size)
        {
            tracing::debug!(error = %e, "failed to set SO_RCVBUF");
        }

        if self.config.keepalive {
            let keepalive = TcpKeepalive::new().with_time(self.config.keepalive_interval);
            if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
                tracing::debug!(error = %e, "failed to set TCP keepalive");
            }
        }
    }
}
