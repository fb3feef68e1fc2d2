//! Courier Protocol - command frames for the courier broker
//!
//! This crate provides the types that flow from the TCP source into the broker:
//! - `Delivery` - Immutable decoded command (admin or data)
//! - `ObjectType` / `CommandType` - Wire tags selecting the broker action
//! - `decode` / `encode` - Versioned binary codec
//! - `encode_frame` / `peek_frame_len` - Transport-level length prefixing
//!
//! # Frame Layout (v1)
//!
//! ```text
//! [version:u8][object:u8][command:u8]
//! [uid: u8-len string][sender: u16-len string]
//! [arg1..arg4: u8-len strings]
//! [payload: u32-len bytes]
//! ```
//!
//! All length fields are big-endian. Every declared length is checked against
//! its limit before anything is allocated, and trailing bytes are rejected.

mod decode;
mod delivery;
mod encode;
mod error;
mod frame;
mod schema;

pub use decode::decode;
pub use delivery::{Delivery, DeliveryBuilder};
pub use encode::{encode, encoded_len};
pub use error::ProtocolError;
pub use frame::{encode_frame, peek_frame_len};
pub use schema::{CommandType, ObjectType};

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Current protocol version written by `encode`
pub const PROTOCOL_VERSION: u8 = 1;

/// Maximum length of a u16-prefixed string (64 KiB)
pub const MAX_SHORT_STRING: usize = 64 * 1024;

/// Maximum payload length (64 MiB)
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

/// Transport length prefix size in bytes
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Smallest possible v1 frame: header plus every length field at zero
pub const MIN_FRAME_SIZE: usize = 3 + 1 + 2 + 4 + 4;

/// Largest possible v1 frame (all fields at their limits)
pub const MAX_FRAME_SIZE: usize = MIN_FRAME_SIZE + 255 * 5 + MAX_SHORT_STRING + MAX_PAYLOAD_SIZE;

#[cfg(test)]
mod delivery_test;
#[cfg(test)]
mod frame_test;
