//! Per-instance session tokens.
//!
//! Each embedded viewer identifies itself to the host with a token it
//! generates once, at attach time.  The host echoes the token back in the
//! `target` field to address that one instance when several viewers share a
//! page.
//!
//! The token is [`TOKEN_BYTES`] bytes from the operating system's
//! cryptographic random source, rendered as lowercase hex, so it is always
//! exactly `2 * TOKEN_BYTES` characters long.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type of the OS random source.
pub use getrandom::Error as RandomSourceError;

/// Number of random bytes behind each token.
pub const TOKEN_BYTES: usize = 10;

/// The random source could not supply bytes.
///
/// There is no retry: an instance without an identity cannot take part in
/// the protocol, so construction fails.
#[derive(Debug, Error)]
#[error("random source unavailable: {0}")]
pub struct SessionError(#[from] pub RandomSourceError);

/// Opaque identifier for one embedded instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generates a fresh token from the OS random source.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the random source fails.
    ///
    /// # Example
    ///
    /// ```rust
    /// use frame_core::session::SessionToken;
    ///
    /// let token = SessionToken::generate().unwrap();
    /// assert_eq!(token.as_str().len(), 20);
    /// ```
    pub fn generate() -> Result<Self, SessionError> {
        Self::generate_with(getrandom::getrandom)
    }

    /// Generates a token using `fill` as the random source.
    ///
    /// # Errors
    ///
    /// Propagates any error returned by `fill`.
    pub fn generate_with<F>(fill: F) -> Result<Self, SessionError>
    where
        F: FnOnce(&mut [u8]) -> Result<(), RandomSourceError>,
    {
        let mut bytes = [0u8; TOKEN_BYTES];
        fill(&mut bytes)?;
        Ok(Self(hex::encode(bytes)))
    }

    /// The token as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
