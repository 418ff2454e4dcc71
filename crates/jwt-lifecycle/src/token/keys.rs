//! Key material for [`JwtSigner`](super::JwtSigner).

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use p384::SecretKey as EcSecretKey;
use p384::pkcs8::EncodePrivateKey as EcEncodePrivateKey;
use rand::RngCore;
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs8::{EncodePublicKey, LineEnding};

use crate::error::SigningError;

/// Number of random bytes in a generated HMAC secret.
const SECRET_BYTES: usize = 32;

/// Keys handed to a signer.
///
/// HMAC algorithms read `secret`. RSA and ECDSA algorithms read the PEM
/// encoded `public_key` (SPKI) and `private_key` (PKCS#8); the private key may
/// be left out to get a verify-only signer.
#[derive(Clone, Default)]
pub struct KeyMaterial {
    secret: Option<String>,
    public_key: Option<String>,
    private_key: Option<String>,
}

impl KeyMaterial {
    /// Shared secret for HMAC algorithms.
    #[must_use]
    pub fn secret(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
            ..Self::default()
        }
    }

    /// PEM encoded key pair for RSA or ECDSA algorithms.
    #[must_use]
    pub fn key_pair(private_pem: impl Into<String>, public_pem: impl Into<String>) -> Self {
        Self {
            private_key: Some(private_pem.into()),
            public_key: Some(public_pem.into()),
            ..Self::default()
        }
    }

    /// PEM encoded public key only. Signers built from it can only verify.
    #[must_use]
    pub fn public_only(public_pem: impl Into<String>) -> Self {
        Self {
            public_key: Some(public_pem.into()),
            ..Self::default()
        }
    }

    /// Replaces the private key.
    #[must_use]
    pub fn with_private_key(mut self, private_pem: impl Into<String>) -> Self {
        self.private_key = Some(private_pem.into());
        self
    }

    /// Drops the private key, keeping everything else.
    #[must_use]
    pub fn without_private_key(mut self) -> Self {
        self.private_key = None;
        self
    }

    /// The HMAC secret, if set and non-empty.
    #[must_use]
    pub fn secret_value(&self) -> Option<&str> {
        non_empty(self.secret.as_deref())
    }

    /// The public key PEM, if set and non-empty.
    #[must_use]
    pub fn public_key(&self) -> Option<&str> {
        non_empty(self.public_key.as_deref())
    }

    /// The private key PEM, if set and non-empty.
    #[must_use]
    pub fn private_key(&self) -> Option<&str> {
        non_empty(self.private_key.as_deref())
    }

    /// Generates a random HMAC secret (32 bytes, base64url encoded).
    #[must_use]
    pub fn generate_secret() -> Self {
        let mut bytes = [0u8; SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self::secret(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Generates an RSA key pair usable with RS256, RS384 and RS512.
    ///
    /// # Errors
    /// Returns `SigningError::InvalidKey` if key generation or PEM export fails.
    pub fn generate_rsa(bits: usize) -> Result<Self, SigningError> {
        let private_key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| SigningError::invalid_key(e.to_string()))?;

        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| SigningError::invalid_key(e.to_string()))?;

        let public_pem = private_key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| SigningError::invalid_key(e.to_string()))?;

        Ok(Self::key_pair(private_pem.as_str(), public_pem))
    }

    /// Generates a P-384 key pair usable with ES384.
    ///
    /// # Errors
    /// Returns `SigningError::InvalidKey` if PEM export fails.
    pub fn generate_ec384() -> Result<Self, SigningError> {
        let secret_key = EcSecretKey::random(&mut OsRng);

        let private_pem = secret_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| SigningError::invalid_key(e.to_string()))?;

        let public_pem = secret_key
            .public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| SigningError::invalid_key(e.to_string()))?;

        Ok(Self::key_pair(private_pem.as_str(), public_pem))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// Never print key bytes.
impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("secret", &self.secret_value().map(|_| "[REDACTED]"))
            .field("public_key", &self.public_key().is_some())
            .field("private_key", &self.private_key().map(|_| "[REDACTED]"))
            .finish()
    }
}
