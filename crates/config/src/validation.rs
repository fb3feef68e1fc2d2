//! Configuration validation
//!
//! Rejects values the broker cannot run with:
//! - Zero-sized pools, queues or partition counts
//! - Zero timeouts
//! - Empty security tokens

use std::time::Duration;

use crate::Config;
use crate::error::{ConfigError, Result};

/// Upper bound for partitions per channel
const MAX_PARTITIONS: usize = 1024;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server(config)?;
    validate_broker(config)?;
    validate_pool(config)?;
    validate_security(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<()> {
    let server = &config.server;
    if server.address.trim().is_empty() {
        return Err(ConfigError::invalid_value("server", "address", "must not be empty"));
    }
    if server.workers == 0 {
        return Err(ConfigError::invalid_value("server", "workers", "must be at least 1"));
    }
    if server.buffer_size == 0 {
        return Err(ConfigError::invalid_value("server", "buffer_size", "must be at least 1"));
    }
    Ok(())
}

fn validate_broker(config: &Config) -> Result<()> {
    let broker = &config.broker;
    if broker.partitions == 0 {
        return Err(ConfigError::invalid_value("broker", "partitions", "must be at least 1"));
    }
    if broker.partitions > MAX_PARTITIONS {
        return Err(ConfigError::invalid_value(
            "broker",
            "partitions",
            format!("must be at most {MAX_PARTITIONS}"),
        ));
    }
    if broker.queue_size == 0 {
        return Err(ConfigError::invalid_value("broker", "queue_size", "must be at least 1"));
    }
    non_zero("broker", "transform_timeout", broker.transform_timeout)?;
    non_zero("broker", "enqueue_timeout", broker.enqueue_timeout)?;
    Ok(())
}

fn validate_pool(config: &Config) -> Result<()> {
    non_zero("pool", "dial_timeout", config.pool.dial_timeout)?;
    non_zero("pool", "idle_timeout", config.pool.idle_timeout)?;
    Ok(())
}

fn validate_security(config: &Config) -> Result<()> {
    if config.security.tokens.iter().any(|t| t.trim().is_empty()) {
        return Err(ConfigError::invalid_value("security", "tokens", "tokens must not be empty"));
    }
    Ok(())
}

fn non_zero(section: &'static str, field: &'static str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(ConfigError::invalid_value(section, field, "must be greater than zero"));
    }
    Ok(())
}
