//! Broker engine configuration

use std::time::Duration;

use serde::Deserialize;

/// Routing engine settings
///
/// # Example
///
/// ```toml
/// [broker]
/// transform_timeout = "2s"
/// partitions = 8
/// auto_consolidate = true
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Deadline for one transformer exchange
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub transform_timeout: Duration,

    /// Partitions per channel when a channel add does not specify one
    /// Default: 4
    pub partitions: usize,

    /// Queue capacity per partition
    /// Default: 1024
    pub queue_size: usize,

    /// How long an enqueue waits on a full partition before dropping
    /// Default: 100ms
    #[serde(with = "humantime_serde")]
    pub enqueue_timeout: Duration,

    /// Remove channels and routes once they become empty
    /// Default: true
    pub auto_consolidate: bool,

    /// Print the topology as JSON at startup and shutdown
    /// Default: false
    pub print_topology: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            transform_timeout: Duration::from_secs(5),
            partitions: 4,
            queue_size: 1024,
            enqueue_timeout: Duration::from_millis(100),
            auto_consolidate: true,
            print_topology: false,
        }
    }
}
