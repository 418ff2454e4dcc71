//! Signing backends.
//!
//! The lifecycle engine only talks to the [`Signer`] trait. [`JwtSigner`] is
//! the `jsonwebtoken` backed implementation supporting the HMAC, RSA and ECDSA
//! families.

use std::fmt;
use std::str::FromStr;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_json::{Map, Value};

use crate::config::TokenConfig;
use crate::error::SigningError;
use crate::token::KeyMaterial;

// ============================================================================
// Signer Trait
// ============================================================================

/// Turns claim maps into compact tokens and back.
///
/// Implementations must fail with `SigningError::SecretMissing` when they are
/// constructed without the key material their algorithm needs.
pub trait Signer: Send + Sync + fmt::Debug {
    /// The algorithm this signer produces and accepts.
    fn algorithm(&self) -> SigningAlgorithm;

    /// Signs a claim map, returning the compact token string.
    ///
    /// # Errors
    /// Returns `SigningError` if the key cannot sign or the backend fails.
    fn sign(&self, claims: &Map<String, Value>) -> Result<String, SigningError>;

    /// Verifies a compact token and returns its claims in their encoded order.
    ///
    /// Temporal claims are not checked here.
    ///
    /// # Errors
    /// Returns `SigningError::InvalidSignature` or `SigningError::Malformed`.
    fn verify(&self, token: &str) -> Result<Map<String, Value>, SigningError>;
}

// ============================================================================
// Signing Algorithm
// ============================================================================

/// Supported signing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256.
    HS256,
    /// HMAC with SHA-384.
    HS384,
    /// HMAC with SHA-512.
    HS512,
    /// RSA PKCS#1 v1.5 with SHA-256.
    RS256,
    /// RSA PKCS#1 v1.5 with SHA-384.
    RS384,
    /// RSA PKCS#1 v1.5 with SHA-512.
    RS512,
    /// ECDSA with P-256 and SHA-256.
    ES256,
    /// ECDSA with P-384 and SHA-384.
    ES384,
}

impl SigningAlgorithm {
    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::HS256 => Algorithm::HS256,
            Self::HS384 => Algorithm::HS384,
            Self::HS512 => Algorithm::HS512,
            Self::RS256 => Algorithm::RS256,
            Self::RS384 => Algorithm::RS384,
            Self::RS512 => Algorithm::RS512,
            Self::ES256 => Algorithm::ES256,
            Self::ES384 => Algorithm::ES384,
        }
    }

    /// Returns the algorithm name as used in JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
        }
    }

    /// Returns `true` for the HMAC family.
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        matches!(self, Self::HS256 | Self::HS384 | Self::HS512)
    }

    /// Returns `true` if this is an RSA-based algorithm.
    #[must_use]
    pub fn is_rsa(&self) -> bool {
        matches!(self, Self::RS256 | Self::RS384 | Self::RS512)
    }

    /// Returns `true` if this is an EC-based algorithm.
    #[must_use]
    pub fn is_ec(&self) -> bool {
        matches!(self, Self::ES256 | Self::ES384)
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "RS512" => Ok(Self::RS512),
            "ES256" => Ok(Self::ES256),
            "ES384" => Ok(Self::ES384),
            other => Err(SigningError::unsupported_algorithm(other)),
        }
    }
}

// ============================================================================
// JWT Signer
// ============================================================================

/// `jsonwebtoken` backed signer.
///
/// Key material is checked when the signer is built. A signer for an
/// asymmetric algorithm without a private key can still verify tokens.
pub struct JwtSigner {
    algorithm: SigningAlgorithm,
    encoding_key: Option<EncodingKey>,
    decoding_key: DecodingKey,
}

impl JwtSigner {
    /// Creates a signer.
    ///
    /// # Errors
    /// - `SigningError::SecretMissing` if the secret (HMAC) or the public key
    ///   (RSA, ECDSA) is absent or empty
    /// - `SigningError::InvalidKey` if a PEM key cannot be parsed
    pub fn new(algorithm: SigningAlgorithm, keys: &KeyMaterial) -> Result<Self, SigningError> {
        if algorithm.is_symmetric() {
            let secret = keys
                .secret_value()
                .ok_or_else(|| SigningError::secret_missing(algorithm.as_str()))?;

            return Ok(Self {
                algorithm,
                encoding_key: Some(EncodingKey::from_secret(secret.as_bytes())),
                decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            });
        }

        let public_pem = keys
            .public_key()
            .ok_or_else(|| SigningError::secret_missing(algorithm.as_str()))?;

        let (encoding_key, decoding_key) = if algorithm.is_rsa() {
            let encoding_key = keys
                .private_key()
                .map(|pem| EncodingKey::from_rsa_pem(pem.as_bytes()))
                .transpose()?;
            (encoding_key, DecodingKey::from_rsa_pem(public_pem.as_bytes())?)
        } else {
            let encoding_key = keys
                .private_key()
                .map(|pem| EncodingKey::from_ec_pem(pem.as_bytes()))
                .transpose()?;
            (encoding_key, DecodingKey::from_ec_pem(public_pem.as_bytes())?)
        };

        Ok(Self {
            algorithm,
            encoding_key,
            decoding_key,
        })
    }

    /// Creates an HMAC signer from a shared secret.
    ///
    /// # Errors
    /// Returns `SigningError::SecretMissing` if the secret is empty, or
    /// `SigningError::UnsupportedAlgorithm` if `algorithm` is not HMAC.
    pub fn hmac(algorithm: SigningAlgorithm, secret: &str) -> Result<Self, SigningError> {
        if !algorithm.is_symmetric() {
            return Err(SigningError::unsupported_algorithm(format!(
                "{} is not an HMAC algorithm",
                algorithm
            )));
        }
        Self::new(algorithm, &KeyMaterial::secret(secret))
    }

    /// Creates a signer for the algorithm named in the configuration.
    ///
    /// # Errors
    /// Returns `SigningError::UnsupportedAlgorithm` for unknown names, plus
    /// the errors of [`JwtSigner::new`].
    pub fn from_config(config: &TokenConfig, keys: &KeyMaterial) -> Result<Self, SigningError> {
        let algorithm: SigningAlgorithm = config.algorithm.parse()?;
        Self::new(algorithm, keys)
    }

    /// Returns `true` if the signer holds a key it can sign with.
    #[must_use]
    pub fn can_sign(&self) -> bool {
        self.encoding_key.is_some()
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm.to_jwt_algorithm());
        // Temporal and registered claims are the payload validator's job
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation
    }
}

impl Signer for JwtSigner {
    fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    fn sign(&self, claims: &Map<String, Value>) -> Result<String, SigningError> {
        let encoding_key = self
            .encoding_key
            .as_ref()
            .ok_or_else(|| SigningError::secret_missing(self.algorithm.as_str()))?;

        let header = Header::new(self.algorithm.to_jwt_algorithm());
        encode(&header, claims, encoding_key).map_err(|e| SigningError::signing(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<Map<String, Value>, SigningError> {
        let data = decode::<Map<String, Value>>(token, &self.decoding_key, &self.validation())?;
        Ok(data.claims)
    }
}

impl fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSigner")
            .field("algorithm", &self.algorithm)
            .field("can_sign", &self.can_sign())
            .finish_non_exhaustive()
    }
}
