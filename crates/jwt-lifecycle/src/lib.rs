//! # jwt-lifecycle
//!
//! Issuance, validation, refresh and revocation of signed JSON claim tokens.
//!
//! This crate provides:
//! - Ordered claim sets with per-claim type rules
//! - A payload builder that fills in default claims and a unique `jti`
//! - Standard and refresh-mode validation with leeway
//! - A refresh flow that revokes the old token before issuing the new one
//! - A blacklist with grace period on top of a pluggable revocation store
//!
//! ## Overview
//!
//! The engine owns the token lifecycle only. Signature algorithms sit behind
//! the [`Signer`] trait ([`JwtSigner`] covers HMAC, RSA and ECDSA through
//! `jsonwebtoken`), and revoked identities live in a [`RevocationStore`]
//! provided by a separate crate.
//!
//! ## Modules
//!
//! - [`claims`] - Claims, claim sets and default claim generation
//! - [`payload`] - Payload builder and validator
//! - [`token`] - Compact tokens, signers and key material
//! - [`revocation`] - Revocation store contract and blacklist
//! - [`manager`] - Encode, decode, refresh and invalidate
//! - [`config`] - Lifecycle configuration
//! - [`clock`] - Time sources

pub mod claims;
pub mod clock;
pub mod config;
pub mod error;
pub mod manager;
pub mod payload;
pub mod revocation;
pub mod token;

pub use claims::{Claim, ClaimFactory, ClaimKind, ClaimSet};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, DEFAULT_CLAIMS, REQUIRED_CLAIMS, TokenConfig};
pub use error::{ErrorCategory, RevocationError, SigningError, TokenError, ValidationError};
pub use manager::TokenManager;
pub use payload::{Payload, PayloadBuilder, PayloadValidator, ValidationMode};
pub use revocation::{Blacklist, RevocationEntry, RevocationStore};
pub use token::{JwtSigner, KeyMaterial, Signer, SigningAlgorithm, Token};

/// Type alias for token lifecycle results.
pub type TokenResult<T> = Result<T, TokenError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use jwt_lifecycle::prelude::*;
/// ```
pub mod prelude {
    pub use crate::TokenResult;
    pub use crate::claims::{Claim, ClaimSet};
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::config::{ConfigError, TokenConfig};
    pub use crate::error::{
        ErrorCategory, RevocationError, SigningError, TokenError, ValidationError,
    };
    pub use crate::manager::TokenManager;
    pub use crate::payload::{Payload, PayloadBuilder, ValidationMode};
    pub use crate::revocation::{Blacklist, RevocationEntry, RevocationStore};
    pub use crate::token::{JwtSigner, KeyMaterial, Signer, SigningAlgorithm, Token};
}
