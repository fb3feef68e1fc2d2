//! Courier Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use courier_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[server]\nport = 7070").unwrap();
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [server]
//! address = "0.0.0.0"
//! port = 7070
//! workers = 64
//!
//! [broker]
//! transform_timeout = "5s"
//! partitions = 4
//! auto_consolidate = true
//!
//! [pool]
//! dial_timeout = "5s"
//! idle_timeout = "90s"
//!
//! [security]
//! tokens = ["change-me"]
//!
//! [log]
//! level = "info"
//! ```
//!
//! # Runtime Settings
//!
//! The settings the broker consults while running are exposed as an
//! immutable [`RuntimeConfig`] snapshot behind a [`RuntimeHandle`].

mod broker;
mod error;
mod logging;
mod pool;
mod runtime;
mod security;
mod server;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use broker::BrokerConfig;
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogLevel};
pub use pool::PoolConfig;
pub use runtime::{RUNTIME_SETTINGS, RuntimeConfig, RuntimeHandle, STARTUP_SETTINGS};
pub use security::SecurityConfig;
pub use server::ServerConfig;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TCP listener
    pub server: ServerConfig,

    /// Routing engine
    pub broker: BrokerConfig,

    /// Outbound connections to transformers and subscribers
    pub pool: PoolConfig,

    /// Runtime-update tokens
    pub security: SecurityConfig,

    /// Logging configuration
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or fails
    /// validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Initial runtime snapshot
    pub fn runtime(&self) -> RuntimeConfig {
        RuntimeConfig::from_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
