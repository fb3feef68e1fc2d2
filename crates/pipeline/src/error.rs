//! Broker error types
//!
//! Every error aborts one frame only. The broker logs it and the connection
//! keeps reading.

use courier_config::ConfigError;
use courier_protocol::{CommandType, ObjectType, ProtocolError};
use courier_routing::RoutingError;
use thiserror::Error;

/// Result type for broker operations
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Errors from handling one frame
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Frame could not be decoded
    #[error("decode failed: {0}")]
    Decode(#[from] ProtocolError),

    /// Object/command pair has no meaning
    #[error("unknown command '{command}' for object '{object}'")]
    UnknownCommand {
        object: ObjectType,
        command: CommandType,
    },

    /// Runtime update without a valid security token
    #[error("unauthorized runtime update of '{setting}'")]
    Unauthorized { setting: String },

    /// Runtime update value rejected
    #[error("invalid runtime update: {0}")]
    InvalidUpdate(#[from] ConfigError),

    /// Remove referenced a route or channel that does not exist
    #[error("{kind} '{name}' not found")]
    StructuralMiss { kind: &'static str, name: String },

    /// Channel add named an unknown strategy or partition key
    #[error(transparent)]
    InvalidStrategy(#[from] RoutingError),

    /// Channel add carried an unusable partition count
    #[error("invalid partition count '{value}'")]
    InvalidPartitions { value: String },

    /// Required argument was empty
    #[error("{object} {command} requires a non-empty {field}")]
    MissingField {
        object: ObjectType,
        command: CommandType,
        field: &'static str,
    },
}

impl BrokerError {
    pub fn route_miss(route: impl Into<String>) -> Self {
        Self::StructuralMiss {
            kind: "route",
            name: route.into(),
        }
    }

    pub fn channel_miss(route: &str, channel: &str) -> Self {
        Self::StructuralMiss {
            kind: "channel",
            name: format!("{route}/{channel}"),
        }
    }

    pub fn unauthorized(setting: impl Into<String>) -> Self {
        Self::Unauthorized {
            setting: setting.into(),
        }
    }

    /// Check if the frame itself was malformed
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_miss_display() {
        assert_eq!(
            BrokerError::route_miss("orders").to_string(),
            "route 'orders' not found"
        );
        assert_eq!(
            BrokerError::channel_miss("orders", "primary").to_string(),
            "channel 'orders/primary' not found"
        );
    }

    #[test]
    fn test_unknown_command_display() {
        let err = BrokerError::UnknownCommand {
            object: ObjectType::Route,
            command: CommandType::Send,
        };
        let msg = err.to_string();
        assert!(msg.contains("route"));
        assert!(msg.contains("send"));
    }

    #[test]
    fn test_unauthorized_display() {
        let err = BrokerError::unauthorized("verbosity");
        assert!(err.to_string().contains("verbosity"));
        assert!(!err.is_decode());
    }

    #[test]
    fn test_decode_from_protocol_error() {
        let err: BrokerError = ProtocolError::UnsupportedVersion(9).into();
        assert!(err.is_decode());
    }
}
