//! Field-level encryption policy for persisted PII
//!
//! Repositories pass designated string fields through a [`FieldCipher`]
//! on the way in and out of storage. Rows written before encryption was
//! introduced still hold plaintext, so decryption failures can optionally
//! fall back to returning the stored value unchanged.

use std::str::FromStr;

use crate::crypto::aes::{self, CryptoError, EncryptionKey};

/// What [`FieldCipher::reveal`] does with a value it cannot authenticate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptFallback {
    /// Return the stored value as-is. Migration accommodation for rows
    /// written before field encryption was enabled; turn off once the
    /// backfill is done.
    LegacyPlaintext,
    /// Propagate the decryption error
    Reject,
}

impl FromStr for DecryptFallback {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy-plaintext" => Ok(Self::LegacyPlaintext),
            "reject" => Ok(Self::Reject),
            other => Err(CryptoError::UnknownFallbackMode(other.to_string())),
        }
    }
}

/// Transparent string transform applied to sensitive fields at the
/// repository boundary
#[derive(Clone)]
pub struct FieldCipher {
    key: EncryptionKey,
    fallback: DecryptFallback,
}

impl FieldCipher {
    pub fn new(key: EncryptionKey, fallback: DecryptFallback) -> Self {
        Self { key, fallback }
    }

    /// Encrypt a field value for storage. Empty values pass through
    /// unchanged. Failures are fatal and propagate.
    pub fn protect(&self, value: &str) -> Result<String, CryptoError> {
        if value.is_empty() {
            return Ok(String::new());
        }
        aes::encrypt(&self.key, value)
    }

    /// Decrypt a stored field value. Empty values pass through unchanged.
    /// Unauthenticatable values are handled per the configured fallback.
    pub fn reveal(&self, stored: &str) -> Result<String, CryptoError> {
        if stored.is_empty() {
            return Ok(String::new());
        }
        match aes::decrypt(&self.key, stored) {
            Ok(plaintext) => Ok(plaintext),
            Err(err) => match self.fallback {
                DecryptFallback::LegacyPlaintext => {
                    tracing::debug!("Field decrypt fell back to stored value: {}", err);
                    Ok(stored.to_string())
                }
                DecryptFallback::Reject => Err(err),
            },
        }
    }
}
