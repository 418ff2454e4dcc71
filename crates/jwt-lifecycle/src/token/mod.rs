//! Compact tokens and the signers that produce them.

pub mod keys;
pub mod signer;

use std::fmt;
use std::str::FromStr;

use crate::error::SigningError;

pub use keys::KeyMaterial;
pub use signer::{JwtSigner, Signer, SigningAlgorithm};

/// A compact, three segment signed token (`header.payload.signature`).
///
/// Construction only checks the shape. Whether the signature verifies is the
/// signer's call.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Wraps a compact token string.
    ///
    /// # Errors
    /// Returns `SigningError::Malformed` unless the value has exactly three
    /// dot separated segments, the first two non-empty, all made of base64url
    /// characters.
    pub fn new(value: impl Into<String>) -> Result<Self, SigningError> {
        let value = value.into();
        check_format(&value)?;
        Ok(Self(value))
    }

    /// The compact token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the token, returning the compact string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

fn check_format(value: &str) -> Result<(), SigningError> {
    let segments: Vec<&str> = value.split('.').collect();
    if segments.len() != 3 {
        return Err(SigningError::malformed(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }

    for (index, segment) in segments.iter().enumerate() {
        // The signature segment is empty for unsigned tokens
        if index < 2 && segment.is_empty() {
            return Err(SigningError::malformed("empty header or payload segment"));
        }
        if !segment.bytes().all(is_base64url) {
            return Err(SigningError::malformed(
                "segments must be base64url encoded",
            ));
        }
    }

    Ok(())
}

fn is_base64url(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_'
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Tokens are credentials; keep them out of debug logs.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&"[REDACTED]").finish()
    }
}

impl FromStr for Token {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
