//! Server (TCP listener) configuration

use std::time::Duration;

use serde::Deserialize;

/// TCP listener configuration
///
/// # Example
///
/// ```toml
/// [server]
/// address = "0.0.0.0"
/// port = 7070
/// workers = 64
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    /// Default: "0.0.0.0"
    pub address: String,

    /// Listen port
    /// Default: 7070
    pub port: u16,

    /// Maximum concurrently served connections
    /// Default: 64
    pub workers: usize,

    /// Buffer size for reads (bytes)
    /// Default: 262144 (256KB)
    pub buffer_size: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    /// Default: true
    pub no_delay: bool,

    /// Enable TCP keep-alive on accepted connections
    /// Default: true
    pub keepalive: bool,

    /// Keep-alive interval
    /// Default: 60s
    #[serde(with = "humantime_serde")]
    pub keepalive_interval: Duration,

    /// Socket receive buffer size (SO_RCVBUF), kernel default when unset
    pub socket_buffer_size: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 7070,
            workers: 64,
            buffer_size: 256 * 1024, // 256KB
            no_delay: true,
            keepalive: true,
            keepalive_interval: Duration::from_secs(60),
            socket_buffer_size: None,
        }
    }
}
