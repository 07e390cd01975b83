//! Cryptographic utilities for CliniGate

pub mod aes;
pub mod field;

pub use aes::{decrypt, encrypt, CryptoError, EncryptionKey};
pub use field::{DecryptFallback, FieldCipher};
