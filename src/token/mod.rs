//! Credential value objects
//!
//! [`AccessToken`] and [`RefreshToken`] are immutable values: constructed
//! once (by [`crate::jwt::JwtManager`] at issuance or verification), then
//! only read. Equality and hashing go by the opaque token value. Debug
//! output redacts it so tokens never land in logs.

use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};

use crate::domain::Role;
use crate::error::{AppError, Result};

/// Scheme prefix used on the Authorization header
const BEARER_PREFIX: &str = "Bearer ";

/// Short-lived credential attached to each request
#[derive(Clone)]
pub struct AccessToken {
    value: String,
    user_id: i64,
    role: Role,
    tenant_code: Option<String>,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Longer-lived credential scoped to re-issuing an access token
#[derive(Clone)]
pub struct RefreshToken {
    value: String,
    user_id: i64,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// One access token and its paired refresh token
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: AccessToken,
    pub refresh: RefreshToken,
}

fn check_window(
    value: &str,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation("Token value must not be blank".to_string()));
    }
    if expires_at <= issued_at {
        return Err(AppError::Validation(
            "Token expiry must be after issuance".to_string(),
        ));
    }
    Ok(())
}

impl AccessToken {
    pub fn new(
        value: String,
        user_id: i64,
        role: Role,
        tenant_code: Option<String>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Self> {
        check_window(&value, issued_at, expires_at)?;
        Ok(Self {
            value,
            user_id,
            role,
            tenant_code,
            issued_at,
            expires_at,
        })
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn tenant_code(&self) -> Option<&str> {
        self.tenant_code.as_deref()
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        !self.is_expired()
    }

    /// Render as an Authorization header value
    pub fn to_bearer(&self) -> String {
        format!("{}{}", BEARER_PREFIX, self.value)
    }
}

impl RefreshToken {
    pub fn new(
        value: String,
        user_id: i64,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Self> {
        check_window(&value, issued_at, expires_at)?;
        Ok(Self {
            value,
            user_id,
            issued_at,
            expires_at,
        })
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        !self.is_expired()
    }
}

/// Strip the bearer scheme from an Authorization header value.
/// Returns `None` for absent schemes or a blank remainder.
pub fn strip_bearer(header_value: &str) -> Option<&str> {
    let token = header_value.strip_prefix(BEARER_PREFIX)?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

impl PartialEq for AccessToken {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for AccessToken {}

impl Hash for AccessToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl PartialEq for RefreshToken {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for RefreshToken {}

impl Hash for RefreshToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("role", &self.role)
            .field("tenant_code", &self.tenant_code)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl std::fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshToken")
            .field("value", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
