//! Routing error types

use thiserror::Error;

/// Result type for routing operations
pub type Result<T> = std::result::Result<T, RoutingError>;

/// Errors from parsing channel routing options
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    /// Strategy name not recognized
    #[error("unknown selection strategy '{name}'")]
    UnknownStrategy { name: String },

    /// Partition-key selector not recognized
    #[error("unknown partition key '{name}'")]
    UnknownPartitionKey { name: String },
}

impl RoutingError {
    #[inline]
    pub fn unknown_strategy(name: impl Into<String>) -> Self {
        Self::UnknownStrategy { name: name.into() }
    }

    #[inline]
    pub fn unknown_partition_key(name: impl Into<String>) -> Self {
        Self::UnknownPartitionKey { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_strategy_error() {
        let err = RoutingError::unknown_strategy("fastest");
        assert!(err.to_string().contains("fastest"));
        assert!(err.to_string().contains("selection strategy"));
    }

    #[test]
    fn test_unknown_partition_key_error() {
        let err = RoutingError::unknown_partition_key("payload");
        assert!(err.to_string().contains("payload"));
        assert!(err.to_string().contains("partition key"));
    }
}
