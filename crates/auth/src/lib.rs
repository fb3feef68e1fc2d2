//! Courier - Authentication
//!
//! Runtime-update commands change broker-wide settings, so they must carry a
//! token from an allow-list. This crate holds that list.
//!
//! Tokens come from the `[security]` section of the config file and are
//! fixed for the life of the process.
//!
//! # Security
//!
//! Validation compares against every stored token in constant time and
//! never exits early on a match.

mod error;
mod store;


pub use error::{AuthError, Result};
pub use store::{SharedTokenStore, TokenStore};
