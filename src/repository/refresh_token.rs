//! Refresh token store
//!
//! Stores an HMAC-SHA256 digest of each refresh token (never the raw
//! value), dual-keyed so validate-by-token and logout-by-user are both
//! single lookups. One live refresh token per user: storing a new one
//! rotates the old one out.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

use crate::error::{AppError, Result};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Store the user's current refresh token, replacing any previous one
    async fn store(&self, user_id: i64, token: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Resolve an unexpired stored token back to its user
    async fn find_user_by_token(&self, token: &str) -> Result<Option<i64>>;

    /// Drop the user's stored token (logout)
    async fn delete_by_user(&self, user_id: i64) -> Result<()>;
}

struct TokenEntry {
    user_id: i64,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct Store {
    by_digest: HashMap<String, TokenEntry>,
    digest_by_user: HashMap<i64, String>,
}

/// Process-local refresh token store
pub struct InMemoryRefreshTokenRepository {
    mac_key: [u8; 32],
    store: RwLock<Store>,
}

impl InMemoryRefreshTokenRepository {
    pub fn new() -> Self {
        // Digests only need to be stable within this process
        let mut mac_key = [0u8; 32];
        rand::thread_rng().fill(&mut mac_key);
        Self {
            mac_key,
            store: RwLock::new(Store::default()),
        }
    }

    fn digest(&self, token: &str) -> Result<String> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.mac_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init error: {}", e)))?;
        mac.update(token.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl Default for InMemoryRefreshTokenRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    async fn store(&self, user_id: i64, token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let digest = self.digest(token)?;
        let mut store = self.store.write().unwrap();

        if let Some(old_digest) = store.digest_by_user.remove(&user_id) {
            store.by_digest.remove(&old_digest);
        }
        store.by_digest.insert(
            digest.clone(),
            TokenEntry {
                user_id,
                expires_at,
            },
        );
        store.digest_by_user.insert(user_id, digest);
        Ok(())
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<i64>> {
        let digest = self.digest(token)?;
        let store = self.store.read().unwrap();

        Ok(store
            .by_digest
            .get(&digest)
            .filter(|entry| entry.expires_at > Utc::now())
            .map(|entry| entry.user_id))
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<()> {
        let mut store = self.store.write().unwrap();
        if let Some(digest) = store.digest_by_user.remove(&user_id) {
            store.by_digest.remove(&digest);
        }
        Ok(())
    }
}
