//! Authentication business logic
//!
//! Login, logout, and refresh orchestration on top of the token, lockout,
//! revocation, and refresh-store collaborators. Credential failures all
//! surface as the same generic 401 so account existence never leaks.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use validator::Validate;

use crate::domain::{LoginInput, RefreshInput, Role, UserAccount};
use crate::error::{AppError, Result};
use crate::jwt::JwtManager;
use crate::repository::{MembershipRepository, RefreshTokenRepository, UserRepository};
use crate::revocation::RevocationRegistry;
use crate::service::lockout::LockoutTracker;
use crate::token::TokenPair;

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    memberships: Arc<dyn MembershipRepository>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    revocations: Arc<dyn RevocationRegistry>,
    jwt: Arc<JwtManager>,
    lockout: Arc<LockoutTracker>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        memberships: Arc<dyn MembershipRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        revocations: Arc<dyn RevocationRegistry>,
        jwt: Arc<JwtManager>,
        lockout: Arc<LockoutTracker>,
    ) -> Self {
        Self {
            users,
            memberships,
            refresh_tokens,
            revocations,
            jwt,
            lockout,
        }
    }

    /// Authenticate a user and issue a token pair
    pub async fn login(&self, input: LoginInput) -> Result<TokenPair> {
        input.validate()?;
        self.lockout.check(&input.login_id)?;

        let user = match self.users.find_by_login_id(&input.login_id).await? {
            Some(user) if user.active => user,
            _ => {
                self.lockout.record_failure(&input.login_id);
                metrics::counter!("clinigate_auth_failures_total").increment(1);
                return Err(AppError::Unauthorized("Invalid credentials".to_string()));
            }
        };

        if !verify_password(&input.password, &user.password_hash)? {
            self.lockout.record_failure(&input.login_id);
            metrics::counter!("clinigate_auth_failures_total").increment(1);
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }

        self.lockout.clear(&input.login_id);

        let home = self.resolve_home_tenant(&user).await?;
        let pair = self.jwt.issue_pair(user.id, user.role, home.as_deref())?;
        self.refresh_tokens
            .store(user.id, pair.refresh.value(), pair.refresh.expires_at())
            .await?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok(pair)
    }

    /// Invalidate the caller's credentials ahead of their expiry
    pub async fn logout(&self, access_token: &str) -> Result<()> {
        let access = self.jwt.verify_access(access_token)?;

        self.refresh_tokens.delete_by_user(access.user_id()).await?;
        self.revocations
            .revoke(access_token, access.expires_at())
            .await?;

        tracing::info!(user_id = access.user_id(), "User logged out");
        Ok(())
    }

    /// Exchange a refresh token for a new pair, rotating the stored token
    pub async fn refresh(&self, input: RefreshInput) -> Result<TokenPair> {
        input.validate()?;

        let presented = self.jwt.verify_refresh(&input.refresh_token)?;

        // Rotation means a once-used (or rotated-out) token no longer resolves
        let stored_user = self
            .refresh_tokens
            .find_user_by_token(presented.value())
            .await?;
        if stored_user != Some(presented.user_id()) {
            return Err(AppError::Unauthorized(
                "Refresh token not recognized".to_string(),
            ));
        }

        let user = match self.users.find_by_id(presented.user_id()).await? {
            Some(user) if user.active => user,
            _ => {
                return Err(AppError::Unauthorized(
                    "Account is no longer active".to_string(),
                ))
            }
        };

        let home = self.resolve_home_tenant(&user).await?;
        let pair = self.jwt.issue_pair(user.id, user.role, home.as_deref())?;
        self.refresh_tokens
            .store(user.id, pair.refresh.value(), pair.refresh.expires_at())
            .await?;

        Ok(pair)
    }

    /// Home tenant claim for a freshly issued access token: admins carry
    /// none; everyone else gets their flagged-primary membership, or the
    /// code on their account row while membership rows are still missing.
    async fn resolve_home_tenant(&self, user: &UserAccount) -> Result<Option<String>> {
        if user.role == Role::Admin {
            return Ok(None);
        }
        let primary = self.memberships.primary_tenant_for_user(user.id).await?;
        Ok(primary.or_else(|| user.tenant_code.clone()))
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against its hash
fn verify_password(password: &str, hash: &str) -> Result<bool> {
    use argon2::{PasswordHash, PasswordVerifier};

    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
