//! Runtime configuration snapshots
//!
//! Components never share mutable settings. They read an immutable
//! [`RuntimeConfig`] through a [`RuntimeHandle`]; a runtime update builds a
//! validated copy and swaps it in atomically, so readers see either the old
//! snapshot or the new one and never a mix.
//!
//! ```text
//! apply_update("transform_timeout", "2s")
//!     │
//!     ├─ parse + validate ──(error)──► rejected, nothing changes
//!     │
//!     └─ ArcSwap::store(new) ──► watch::send_replace(new)
//! ```

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::{ConfigError, Result};
use crate::{Config, LogLevel};

/// Settings that may be changed by a runtime-update command
pub const RUNTIME_SETTINGS: &[&str] = &[
    "address",
    "port",
    "verbosity",
    "transform_timeout",
    "enqueue_timeout",
    "auto_consolidate",
    "print_topology",
];

/// Runtime settings that are recorded but only read when the listener binds
///
/// Updating one changes the snapshot for this process; the running listener
/// keeps the address it bound at start.
pub const STARTUP_SETTINGS: &[&str] = &["address", "port"];

/// Immutable snapshot of the settings the broker reads while running
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Listener bind address, read once at start
    pub address: String,
    /// Listener port, read once at start
    pub port: u16,
    /// Log verbosity
    pub verbosity: LogLevel,
    /// Deadline for one transformer exchange
    pub transform_timeout: Duration,
    /// How long an enqueue waits on a full partition
    pub enqueue_timeout: Duration,
    /// Default partitions per channel
    pub partitions: usize,
    /// Queue capacity per partition
    pub queue_size: usize,
    /// Remove channels and routes once they become empty
    pub auto_consolidate: bool,
    /// Connection worker count
    pub workers: usize,
    /// Print topology at startup and shutdown
    pub print_topology: bool,
}

impl RuntimeConfig {
    /// Build the initial snapshot from a loaded config
    pub fn from_config(config: &Config) -> Self {
        Self {
            address: config.server.address.clone(),
            port: config.server.port,
            verbosity: config.log.level,
            transform_timeout: config.broker.transform_timeout,
            enqueue_timeout: config.broker.enqueue_timeout,
            partitions: config.broker.partitions,
            queue_size: config.broker.queue_size,
            auto_consolidate: config.broker.auto_consolidate,
            workers: config.server.workers,
            print_topology: config.broker.print_topology,
        }
    }

    /// `address:port` for binding the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Copy of this snapshot with one setting changed
    ///
    /// The value is parsed and validated; on error `self` is unaffected.
    pub fn with_setting(&self, key: &str, value: &str) -> Result<Self> {
        let mut next = self.clone();
        let value = value.trim();

        match key {
            "address" => {
                if value.is_empty() {
                    return Err(invalid("address", "must not be empty"));
                }
                next.address = value.to_owned();
            }
            "port" => {
                let port: u16 = value
                    .parse()
                    .map_err(|_| invalid("port", format!("'{value}' is not a port number")))?;
                if port == 0 {
                    return Err(invalid("port", "must not be 0"));
                }
                next.port = port;
            }
            "verbosity" => {
                next.verbosity = value.parse().map_err(|e: String| invalid("verbosity", e))?;
            }
            "transform_timeout" => {
                next.transform_timeout = parse_timeout("transform_timeout", value)?;
            }
            "enqueue_timeout" => {
                next.enqueue_timeout = parse_timeout("enqueue_timeout", value)?;
            }
            "auto_consolidate" => {
                next.auto_consolidate = parse_bool("auto_consolidate", value)?;
            }
            "print_topology" => {
                next.print_topology = parse_bool("print_topology", value)?;
            }
            other => return Err(ConfigError::unknown_setting(other)),
        }

        Ok(next)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::invalid_value("runtime", field, message)
}

fn parse_timeout(field: &'static str, value: &str) -> Result<Duration> {
    let duration = humantime::parse_duration(value)
        .map_err(|e| invalid(field, format!("'{value}': {e}")))?;
    if duration.is_zero() {
        return Err(invalid(field, "must be greater than zero"));
    }
    Ok(duration)
}

fn parse_bool(field: &'static str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        _ => Err(invalid(field, format!("'{value}' is not a boolean"))),
    }
}

/// Shared handle to the current runtime snapshot
///
/// Cheap to clone. Reads are lock-free; updates are serialized so two
/// concurrent updates cannot lose each other's change.
#[derive(Clone)]
pub struct RuntimeHandle {
    inner: Arc<Inner>,
}

struct Inner {
    current: ArcSwap<RuntimeConfig>,
    update_lock: Mutex<()>,
    changes: watch::Sender<Arc<RuntimeConfig>>,
}

impl RuntimeHandle {
    pub fn new(initial: RuntimeConfig) -> Self {
        let initial = Arc::new(initial);
        let (changes, _) = watch::channel(Arc::clone(&initial));
        Self {
            inner: Arc::new(Inner {
                current: ArcSwap::new(initial),
                update_lock: Mutex::new(()),
                changes,
            }),
        }
    }

    /// Current snapshot
    #[inline]
    pub fn load(&self) -> Arc<RuntimeConfig> {
        self.inner.current.load_full()
    }

    /// Validate and install a new snapshot with one setting changed
    pub fn apply_update(&self, key: &str, value: &str) -> Result<Arc<RuntimeConfig>> {
        let _guard = self.inner.update_lock.lock();

        let next = Arc::new(self.inner.current.load().with_setting(key, value)?);
        self.inner.current.store(Arc::clone(&next));
        self.inner.changes.send_replace(Arc::clone(&next));

        if STARTUP_SETTINGS.contains(&key) {
            tracing::warn!(
                setting = key,
                value,
                "startup setting recorded, the listener keeps its bound address"
            );
        } else {
            tracing::info!(setting = key, value, "runtime setting updated");
        }
        Ok(next)
    }

    /// Receive every snapshot installed after this call
    pub fn subscribe(&self) -> watch::Receiver<Arc<RuntimeConfig>> {
        self.inner.changes.subscribe()
    }
}

impl Default for RuntimeHandle {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl std::fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RuntimeHandle").field(&self.load()).finish()
    }
}

#[cfg(test)]
#[path = "runtime_test.rs"]
mod tests;
