//! AES-256-GCM envelope encryption for sensitive field data
//!
//! This module provides the raw encrypt/decrypt primitives for
//! personally-identifiable fields (patient names, registration numbers)
//! stored by the records layer. [`crate::crypto::field::FieldCipher`]
//! layers the empty-value and legacy-fallback policy on top.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::Rng;
use thiserror::Error;

/// GCM nonce size in bytes (96 bits)
const NONCE_LEN: usize = 12;

/// Encryption key for AES-256-GCM
#[derive(Clone)]
pub struct EncryptionKey {
    key: [u8; 32],
}

/// Encryption error types
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid key: must be exactly 32 bytes (256 bits)")]
    InvalidKeyLength,

    #[error("Invalid base64 encoding: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed: invalid ciphertext or wrong key")]
    DecryptionFailed,

    #[error("Invalid envelope format")]
    InvalidEnvelopeFormat,

    #[error("Unknown decrypt fallback mode: {0}")]
    UnknownFallbackMode(String),
}

impl EncryptionKey {
    /// Create a new encryption key from a 32-byte array
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Create encryption key from a base64-encoded string
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = BASE64.decode(encoded)?;
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKeyLength);
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        Ok(Self { key })
    }

    /// Create encryption key from environment variable
    pub fn from_env() -> Result<Self, CryptoError> {
        let encoded = std::env::var("FIELD_ENCRYPTION_KEY")
            .map_err(|_| CryptoError::InvalidKeyLength)?;
        Self::from_base64(&encoded)
    }

    /// Get the raw key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

/// Encrypt plaintext using AES-256-GCM
///
/// Returns a single base64 envelope of `nonce || ciphertext` where the
/// nonce is 12 random bytes and the ciphertext carries GCM's 128-bit tag.
pub fn encrypt(key: &EncryptionKey, plaintext: &str) -> Result<String, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(&key.key).map_err(|_| CryptoError::EncryptionFailed)?;

    // Fresh random nonce per call; never reused under the same key
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut envelope = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    envelope.extend_from_slice(&nonce_bytes);
    envelope.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(envelope))
}

/// Decrypt an envelope produced by [encrypt]
pub fn decrypt(key: &EncryptionKey, envelope: &str) -> Result<String, CryptoError> {
    let bytes = BASE64.decode(envelope)?;
    if bytes.len() <= NONCE_LEN {
        return Err(CryptoError::InvalidEnvelopeFormat);
    }

    let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);

    let cipher = Aes256Gcm::new_from_slice(&key.key).map_err(|_| CryptoError::DecryptionFailed)?;

    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
}
