//! Pool configuration

use std::time::Duration;

/// Default maximum cached connections per address
pub const DEFAULT_MAX_IDLE_PER_ADDRESS: usize = 16;

/// Default idle timeout before a cached connection is discarded
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Default dial timeout
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the connection pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum cached (idle) connections per address
    pub max_idle_per_address: usize,

    /// Cached connections idle longer than this are discarded on borrow
    pub idle_timeout: Duration,

    /// Upper bound on establishing a new connection
    pub dial_timeout: Duration,

    /// Disable Nagle's algorithm on dialed connections
    pub nodelay: bool,

    /// TCP keep-alive enabled
    pub tcp_keepalive: bool,

    /// TCP keep-alive interval (only used if tcp_keepalive is true)
    pub tcp_keepalive_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_address: DEFAULT_MAX_IDLE_PER_ADDRESS,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            nodelay: true,
            tcp_keepalive: true,
            tcp_keepalive_interval: Duration::from_secs(30),
        }
    }
}

impl PoolConfig {
    /// Set maximum cached connections per address
    #[must_use]
    pub fn with_max_idle_per_address(mut self, max: usize) -> Self {
        self.max_idle_per_address = max;
        self
    }

    /// Set idle timeout
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set dial timeout
    #[must_use]
    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// Enable or disable TCP keep-alive
    #[must_use]
    pub fn with_tcp_keepalive(mut self, enabled: bool) -> Self {
        self.tcp_keepalive = enabled;
        self
    }
}
