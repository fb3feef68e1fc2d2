//! Protocol error types
//!
//! Errors that can occur when decoding or framing command frames.
//! A protocol error rejects a single frame; the connection keeps reading.

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame ended before a field could be read
    #[error("truncated frame: {field} needs {expected} bytes, {actual} remaining")]
    Truncated {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Declared length exceeds the field limit
    #[error("{field} length {size} exceeds maximum {max}")]
    TooLarge {
        field: &'static str,
        size: usize,
        max: usize,
    },

    /// Version byte not understood by this decoder
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Invalid object type tag
    #[error("invalid object type: {0}")]
    InvalidObjectType(u8),

    /// Invalid command type tag
    #[error("invalid command type: {0}")]
    InvalidCommandType(u8),

    /// String field is not valid UTF-8
    #[error("{0} is not valid utf-8")]
    InvalidUtf8(&'static str),

    /// Bytes left over after the payload
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),

    /// Value cannot be represented in its length field when encoding
    #[error("{field} length {size} exceeds maximum {max} for encoding")]
    Unencodable {
        field: &'static str,
        size: usize,
        max: usize,
    },
}

impl ProtocolError {
    /// Create a truncated frame error
    #[inline]
    pub fn truncated(field: &'static str, expected: usize, actual: usize) -> Self {
        Self::Truncated {
            field,
            expected,
            actual,
        }
    }

    /// Create a declared-length-too-large error
    #[inline]
    pub fn too_large(field: &'static str, size: usize, max: usize) -> Self {
        Self::TooLarge { field, size, max }
    }

    /// Create an encode-side length error
    #[inline]
    pub fn unencodable(field: &'static str, size: usize, max: usize) -> Self {
        Self::Unencodable { field, size, max }
    }

    /// Check if the frame was rejected because of a hostile or oversized length
    pub fn is_oversize(&self) -> bool {
        matches!(self, Self::TooLarge { .. })
    }
}
