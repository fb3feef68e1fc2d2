//! Token allow-list
//!
//! The `TokenStore` answers one question: is this token allowed to change
//! runtime settings? The list is fixed when the broker starts.

use std::sync::Arc;

use subtle::ConstantTimeEq;

use crate::error::{AuthError, Result};

/// Token allow-list
///
/// # Example
///
/// ```
/// use courier_auth::TokenStore;
///
/// let store = TokenStore::from_tokens(["alpha", "beta"]).unwrap();
/// assert!(store.validate("beta"));
/// assert!(!store.validate("gamma"));
/// ```
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: Vec<Box<[u8]>>,
}

/// Shared reference to a token store
pub type SharedTokenStore = Arc<TokenStore>;

impl TokenStore {
    /// Create an empty store (rejects everything)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a list of tokens
    ///
    /// # Errors
    ///
    /// Returns error on empty or duplicate tokens.
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stored: Vec<Box<[u8]>> = Vec::new();

        for (index, token) in tokens.into_iter().enumerate() {
            let entry = index + 1;
            let token = token.as_ref().trim();
            if token.is_empty() {
                return Err(AuthError::EmptyToken { entry });
            }
            if stored.iter().any(|t| t.as_ref() == token.as_bytes()) {
                return Err(AuthError::DuplicateToken { entry });
            }
            stored.push(token.as_bytes().into());
        }

        Ok(Self { tokens: stored })
    }

    /// Check a presented token
    ///
    /// Compares against every stored token without short-circuiting.
    #[inline]
    pub fn validate(&self, token: &str) -> bool {
        let presented = token.as_bytes();

        let mut matched = 0u8;
        for stored in &self.tokens {
            matched |= stored.ct_eq(presented).unwrap_u8();
        }

        matched == 1
    }

    /// Number of tokens
    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check if store is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
