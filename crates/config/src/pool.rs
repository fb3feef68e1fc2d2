//! Outbound connection pool configuration

use std::time::Duration;

use serde::Deserialize;

/// Settings for connections to transformers and subscribers
///
/// # Example
///
/// ```toml
/// [pool]
/// dial_timeout = "2s"
/// idle_timeout = "90s"
/// max_idle_per_address = 16
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Upper bound on establishing a connection
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub dial_timeout: Duration,

    /// Cached connections idle longer than this are discarded
    /// Default: 90s
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,

    /// Cached connections kept per address
    /// Default: 16
    pub max_idle_per_address: usize,

    /// Enable TCP keep-alive on dialed connections
    /// Default: true
    pub keepalive: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(90),
            max_idle_per_address: 16,
            keepalive: true,
        }
    }
}
