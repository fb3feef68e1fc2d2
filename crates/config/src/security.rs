//! Security configuration

use serde::Deserialize;

/// Tokens accepted on runtime-update commands
///
/// An empty list rejects every runtime update.
///
/// ```toml
/// [security]
/// tokens = ["3f9a0c..."]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub tokens: Vec<String>,
}
