//! Authentication error types

use thiserror::Error;

/// Result type for auth operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while building the token list
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token is empty after trimming
    #[error("empty token at entry {entry}")]
    EmptyToken {
        /// Entry number (1-based)
        entry: usize,
    },

    /// Same token listed twice
    #[error("duplicate token at entry {entry}")]
    DuplicateToken {
        /// Entry number (1-based)
        entry: usize,
    },
}
