//! User account domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::role::Role;

/// User account entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub login_id: String,
    /// Argon2 hash, never the raw password
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: String,
    pub role: Role,
    /// Home institution code, if the user belongs to one
    pub tenant_code: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User-institution membership row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantMembership {
    pub user_id: i64,
    pub tenant_code: String,
    /// At most one membership per user is flagged primary
    pub is_primary: bool,
}

/// Input for the login endpoint
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(length(min = 1, max = 100))]
    pub login_id: String,
    #[validate(length(min = 1, max = 255))]
    pub password: String,
}

/// Input for the refresh endpoint
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshInput {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

/// Token pair handed out by login and refresh
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Response for the authenticated-identity endpoint
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub user_id: i64,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_code: Option<String>,
    pub tenant_codes: Vec<String>,
}
