//! Wire tags for command frames
//!
//! The object type selects what a frame acts on and the command type
//! selects the verb. The broker dispatches on the pair.

use crate::ProtocolError;

/// What a command frame targets
///
/// NOTE: These values are used on the wire and must not be renumbered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ObjectType {
    /// Data delivery routed through a pipeline
    Delivery = 0,
    /// Remote transform stage on a channel
    Transformer = 1,
    /// Remote sink on a channel
    Subscriber = 2,
    /// Channel within a route
    Channel = 3,
    /// Route owned by the broker
    Route = 4,
    /// Broker runtime configuration
    RuntimeUpdate = 5,
}

impl ObjectType {
    /// Parse object type from raw byte value
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Delivery),
            1 => Some(Self::Transformer),
            2 => Some(Self::Subscriber),
            3 => Some(Self::Channel),
            4 => Some(Self::Route),
            5 => Some(Self::RuntimeUpdate),
            _ => None,
        }
    }

    /// Convert to raw byte value
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get the string name of this object type
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delivery => "delivery",
            Self::Transformer => "transformer",
            Self::Subscriber => "subscriber",
            Self::Channel => "channel",
            Self::Route => "route",
            Self::RuntimeUpdate => "runtime_update",
        }
    }
}

impl TryFrom<u8> for ObjectType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(ProtocolError::InvalidObjectType(value))
    }
}

impl std::str::FromStr for ObjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "delivery" => Ok(Self::Delivery),
            "transformer" => Ok(Self::Transformer),
            "subscriber" => Ok(Self::Subscriber),
            "channel" => Ok(Self::Channel),
            "route" => Ok(Self::Route),
            "runtime_update" | "runtime" | "update" => Ok(Self::RuntimeUpdate),
            other => Err(format!("unknown object type '{other}'")),
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Verb applied to the target object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandType {
    Add = 0,
    Remove = 1,
    Send = 2,
    Update = 3,
}

impl CommandType {
    /// Parse command type from raw byte value
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Add),
            1 => Some(Self::Remove),
            2 => Some(Self::Send),
            3 => Some(Self::Update),
            _ => None,
        }
    }

    /// Convert to raw byte value
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get the string name of this command type
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Send => "send",
            Self::Update => "update",
        }
    }
}

impl TryFrom<u8> for CommandType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(ProtocolError::InvalidCommandType(value))
    }
}

impl std::str::FromStr for CommandType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "remove" | "rm" => Ok(Self::Remove),
            "send" => Ok(Self::Send),
            "update" => Ok(Self::Update),
            other => Err(format!("unknown command type '{other}'")),
        }
    }
}

impl std::fmt::Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
