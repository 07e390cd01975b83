//! User-institution membership repository
//!
//! The authentication pipeline consults this on every authenticated
//! request, so implementations are expected to be fast local reads.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::TenantMembership;
use crate::error::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Every institution code the user belongs to, in storage order
    async fn tenant_codes_for_user(&self, user_id: i64) -> Result<Vec<String>>;

    /// The membership flagged primary, falling back to the first one
    async fn primary_tenant_for_user(&self, user_id: i64) -> Result<Option<String>>;
}

/// Seedable in-memory membership store
#[derive(Default)]
pub struct InMemoryMembershipRepository {
    memberships: RwLock<Vec<TenantMembership>>,
}

impl InMemoryMembershipRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memberships(memberships: Vec<TenantMembership>) -> Self {
        Self {
            memberships: RwLock::new(memberships),
        }
    }

    pub fn add(&self, membership: TenantMembership) {
        self.memberships.write().unwrap().push(membership);
    }
}

#[async_trait]
impl MembershipRepository for InMemoryMembershipRepository {
    async fn tenant_codes_for_user(&self, user_id: i64) -> Result<Vec<String>> {
        let memberships = self.memberships.read().unwrap();
        Ok(memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.tenant_code.clone())
            .collect())
    }

    async fn primary_tenant_for_user(&self, user_id: i64) -> Result<Option<String>> {
        let memberships = self.memberships.read().unwrap();
        let mine: Vec<_> = memberships.iter().filter(|m| m.user_id == user_id).collect();

        Ok(mine
            .iter()
            .find(|m| m.is_primary)
            .or_else(|| mine.first())
            .map(|m| m.tenant_code.clone()))
    }
}
