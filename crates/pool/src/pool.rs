//! Connection pool and borrowed connections

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::{PoolConfig, PoolError, PoolMetrics, PoolStats};

/// A cached connection and when it was last handed back
struct IdleConnection {
    stream: TcpStream,
    last_used: Instant,
}

struct Shared {
    config: PoolConfig,
    idle: Mutex<HashMap<String, Vec<IdleConnection>>>,
    metrics: PoolMetrics,
}

/// Process-wide cache of outbound TCP connections keyed by address
///
/// Cheap to clone; clones share the same free lists.
#[derive(Clone)]
pub struct ConnectionPool {
    shared: Arc<Shared>,
}

impl ConnectionPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                idle: Mutex::new(HashMap::new()),
                metrics: PoolMetrics::new(),
            }),
        }
    }

    /// Pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Get metrics snapshot
    pub fn stats(&self) -> PoolStats {
        self.shared.metrics.snapshot()
    }

    /// Number of cached connections for an address
    pub fn idle_count(&self, address: &str) -> usize {
        self.shared.idle.lock().get(address).map_or(0, Vec::len)
    }

    /// Borrow a connection to `address`
    ///
    /// Serves from the free list when a fresh, still-open cached connection
    /// exists, otherwise dials. `cancel` only affects the dial.
    pub async fn borrow(
        &self,
        cancel: &CancellationToken,
        address: &str,
    ) -> Result<PooledConnection, PoolError> {
        if let Some(stream) = self.take_idle(address) {
            self.shared.metrics.reused();
            return Ok(PooledConnection {
                stream,
                address: address.to_owned(),
                reused: true,
                shared: Arc::clone(&self.shared),
            });
        }

        self.connect(cancel, address).await
    }

    /// Dial a new connection to `address`, bypassing the free list
    ///
    /// The connection can still be released into the pool afterwards.
    pub async fn connect(
        &self,
        cancel: &CancellationToken,
        address: &str,
    ) -> Result<PooledConnection, PoolError> {
        let stream = match self.dial(cancel, address).await {
            Ok(stream) => stream,
            Err(e) => {
                self.shared.metrics.dial_failed();
                return Err(e);
            }
        };
        self.shared.metrics.dialed();

        Ok(PooledConnection {
            stream,
            address: address.to_owned(),
            reused: false,
            shared: Arc::clone(&self.shared),
        })
    }

    /// Pop the most recently used usable connection
    ///
    /// Stale or peer-closed connections are evicted on the way. An address
    /// whose list drains is removed from the map.
    fn take_idle(&self, address: &str) -> Option<TcpStream> {
        let mut idle = self.shared.idle.lock();
        let list = idle.get_mut(address)?;

        let mut found = None;
        while let Some(conn) = list.pop() {
            if conn.last_used.elapsed() > self.shared.config.idle_timeout {
                self.shared.metrics.evicted();
                tracing::trace!(address, "evicted idle connection");
                continue;
            }
            if !is_open(&conn.stream) {
                self.shared.metrics.evicted();
                tracing::debug!(address, "evicted connection closed by peer");
                continue;
            }
            found = Some(conn.stream);
            break;
        }

        if list.is_empty() {
            idle.remove(address);
        }
        found
    }

    /// Number of addresses with at least one cached connection
    pub fn idle_addresses(&self) -> usize {
        self.shared.idle.lock().len()
    }

    async fn dial(
        &self,
        cancel: &CancellationToken,
        address: &str,
    ) -> Result<TcpStream, PoolError> {
        let dial_timeout = self.shared.config.dial_timeout;

        // The dial runs in its own task: cancellation discards its result but
        // does not abort it. A late stream is dropped when the task finishes.
        let target = address.to_owned();
        let dial =
            tokio::spawn(async move { timeout(dial_timeout, TcpStream::connect(target)).await });

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(PoolError::Cancelled { address: address.to_owned() });
            }
            result = dial => result,
        };

        let stream = match result {
            Ok(Ok(Ok(stream))) => stream,
            Ok(Ok(Err(e))) => {
                return Err(PoolError::Dial {
                    address: address.to_owned(),
                    source: e,
                });
            }
            Ok(Err(_)) => {
                return Err(PoolError::DialTimeout {
                    address: address.to_owned(),
                    timeout: dial_timeout,
                });
            }
            Err(join) => {
                return Err(PoolError::Dial {
                    address: address.to_owned(),
                    source: std::io::Error::other(join.to_string()),
                });
            }
        };

        self.configure(&stream, address);
        tracing::debug!(address, "dialed new connection");
        Ok(stream)
    }

    /// Apply socket options (non-fatal if any fail)
    fn configure(&self, stream: &TcpStream, address: &str) {
        let config = &self.shared.config;

        if config.nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!(address, error = %e, "failed to set TCP_NODELAY");
            }
        }

        if config.tcp_keepalive {
            let sock_ref = SockRef::from(stream);
            let keepalive = TcpKeepalive::new().with_time(config.tcp_keepalive_interval);

            // On Linux, also set the retry interval
            #[cfg(target_os = "linux")]
            let keepalive = keepalive.with_interval(config.tcp_keepalive_interval);

            if let Err(e) = sock_ref.set_tcp_keepalive(&keepalive) {
                tracing::debug!(address, error = %e, "failed to set TCP keep-alive");
            }
        }
    }
}

/// Whether a cached stream can still carry a request
///
/// An idle connection has nothing to read, so anything but `WouldBlock`
/// means it is closed or out of step.
fn is_open(stream: &TcpStream) -> bool {
    let mut byte = [0u8; 1];
    match stream.try_read(&mut byte) {
        Err(e) => e.kind() == std::io::ErrorKind::WouldBlock,
        Ok(_) => false,
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("config", &self.shared.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// A connection on loan from the pool
///
/// Hand it back with [`release`](Self::release). Dropping it without
/// releasing closes the socket, the same as releasing it as broken.
pub struct PooledConnection {
    stream: TcpStream,
    address: String,
    reused: bool,
    shared: Arc<Shared>,
}

impl PooledConnection {
    /// Address this connection is for
    pub fn address(&self) -> &str {
        &self.address
    }

    /// True when served from the free list rather than freshly dialed
    pub fn is_reused(&self) -> bool {
        self.reused
    }

    /// Underlying stream
    pub fn stream(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    /// Return the connection to the pool, or close it if `broken`
    ///
    /// A healthy connection is closed anyway when the address's free list
    /// is already full.
    pub fn release(self, broken: bool) {
        let Self {
            stream,
            address,
            shared,
            ..
        } = self;

        if broken {
            shared.metrics.discarded();
            return;
        }

        let mut idle = shared.idle.lock();
        let list = idle.entry(address).or_default();
        if list.len() >= shared.config.max_idle_per_address {
            shared.metrics.discarded();
            return;
        }

        list.push(IdleConnection {
            stream,
            last_used: Instant::now(),
        });
        shared.metrics.returned();
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("address", &self.address)
            .field("reused", &self.reused)
            .finish()
    }
}
