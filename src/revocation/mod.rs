//! Access token revocation registry
//!
//! Logout must invalidate an access token ahead of its natural expiry.
//! The registry stores a SHA-256 digest of the token (never the raw value)
//! together with that expiry, so entries can be dropped once the token
//! would have died anyway. The trait boundary lets a shared external store
//! replace the in-memory map without touching the pipeline.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::error::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RevocationRegistry: Send + Sync {
    /// Mark a token invalid until its natural expiry
    async fn revoke(&self, token: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Whether a token has been revoked and is still within its expiry
    async fn is_revoked(&self, token: &str) -> Result<bool>;

    /// Drop entries whose tokens have expired anyway; returns how many
    async fn prune_expired(&self) -> Result<usize>;
}

/// Process-local registry backed by a digest-keyed map
#[derive(Default)]
pub struct InMemoryRevocationRegistry {
    entries: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryRevocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn digest(token: &str) -> String {
        hex::encode(Sha256::digest(token.as_bytes()))
    }
}

#[async_trait]
impl RevocationRegistry for InMemoryRevocationRegistry {
    async fn revoke(&self, token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let now = Utc::now();
        let mut entries = self.entries.write().unwrap();
        // Opportunistic prune keeps the map bounded by live-token count
        entries.retain(|_, expiry| *expiry > now);
        entries.insert(Self::digest(token), expires_at);
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool> {
        let entries = self.entries.read().unwrap();
        let revoked = entries
            .get(&Self::digest(token))
            .is_some_and(|expiry| *expiry > Utc::now());
        Ok(revoked)
    }

    async fn prune_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|_, expiry| *expiry > now);
        Ok(before - entries.len())
    }
}
