//! User account repository

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::UserAccount;
use crate::error::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserAccount>>;
    async fn find_by_login_id(&self, login_id: &str) -> Result<Option<UserAccount>>;
}

/// Seedable in-memory user store
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<i64, UserAccount>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<UserAccount>) -> Self {
        let repo = Self::new();
        {
            let mut map = repo.users.write().unwrap();
            for user in users {
                map.insert(user.id, user);
            }
        }
        repo
    }

    pub fn add(&self, user: UserAccount) {
        self.users.write().unwrap().insert(user.id, user);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserAccount>> {
        Ok(self.users.read().unwrap().get(&id).cloned())
    }

    async fn find_by_login_id(&self, login_id: &str) -> Result<Option<UserAccount>> {
        let users = self.users.read().unwrap();
        Ok(users.values().find(|u| u.login_id == login_id).cloned())
    }
}
