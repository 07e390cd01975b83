//! JWT token handling
//!
//! Signs and verifies the two credential kinds as HS512 JWTs and converts
//! between wire strings and the [`crate::token`] value objects.

use crate::config::JwtConfig;
use crate::domain::Role;
use crate::error::{AppError, Result};
use crate::token::{AccessToken, RefreshToken, TokenPair};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Role at issuance time
    pub role: Role,
    /// Home institution code, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_code: Option<String>,
    /// Issuer
    pub iss: String,
    /// Token type discriminator (prevents token confusion attacks)
    #[serde(default)]
    pub token_type: String,
    /// Token ID (uniqueness, so two tokens in the same second differ)
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Refresh token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Token type discriminator (prevents token confusion attacks)
    #[serde(default)]
    pub token_type: String,
    /// Token ID
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// JWT token manager
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl JwtManager {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
            algorithm: Algorithm::HS512,
        }
    }

    /// Create a Validation with a strict leeway (5 seconds) instead of the default 60 seconds.
    /// This ensures tokens expire promptly while still tolerating minor clock skew.
    fn strict_validation(&self) -> Validation {
        let mut v = Validation::new(self.algorithm);
        v.leeway = 5;
        v.validate_aud = false;
        v.set_issuer(&[&self.config.issuer]);
        v
    }

    /// Issue an access token for a user
    pub fn issue_access(
        &self,
        user_id: i64,
        role: Role,
        tenant_code: Option<&str>,
    ) -> Result<AccessToken> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.access_token_ttl_secs);

        let claims = AccessClaims {
            sub: user_id.to_string(),
            role,
            tenant_code: tenant_code.map(String::from),
            iss: self.config.issuer.clone(),
            token_type: "access".to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        let header = Header::new(self.algorithm);
        let value =
            encode(&header, &claims, &self.encoding_key).map_err(|e| AppError::Internal(e.into()))?;

        AccessToken::new(value, user_id, role, claims.tenant_code, now, exp)
    }

    /// Issue a refresh token for a user
    pub fn issue_refresh(&self, user_id: i64) -> Result<RefreshToken> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.refresh_token_ttl_secs);

        let claims = RefreshClaims {
            sub: user_id.to_string(),
            iss: self.config.issuer.clone(),
            token_type: "refresh".to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        let header = Header::new(self.algorithm);
        let value =
            encode(&header, &claims, &self.encoding_key).map_err(|e| AppError::Internal(e.into()))?;

        RefreshToken::new(value, user_id, now, exp)
    }

    /// Issue a matched access + refresh pair
    pub fn issue_pair(
        &self,
        user_id: i64,
        role: Role,
        tenant_code: Option<&str>,
    ) -> Result<TokenPair> {
        Ok(TokenPair {
            access: self.issue_access(user_id, role, tenant_code)?,
            refresh: self.issue_refresh(user_id)?,
        })
    }

    /// Verify signature and expiry of an access token and rebuild its value object
    pub fn verify_access(&self, token: &str) -> Result<AccessToken> {
        let token_data = decode::<AccessClaims>(token, &self.decoding_key, &self.strict_validation())?;
        let claims = token_data.claims;

        if claims.token_type != "access" {
            return Err(AppError::Unauthorized("Invalid token type".to_string()));
        }

        let user_id = parse_subject(&claims.sub)?;
        let (issued_at, expires_at) = parse_window(claims.iat, claims.exp)?;

        AccessToken::new(
            token.to_string(),
            user_id,
            claims.role,
            claims.tenant_code,
            issued_at,
            expires_at,
        )
    }

    /// Verify signature and expiry of a refresh token and rebuild its value object
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshToken> {
        let token_data =
            decode::<RefreshClaims>(token, &self.decoding_key, &self.strict_validation())?;
        let claims = token_data.claims;

        if claims.token_type != "refresh" {
            return Err(AppError::Unauthorized("Invalid token type".to_string()));
        }

        let user_id = parse_subject(&claims.sub)?;
        let (issued_at, expires_at) = parse_window(claims.iat, claims.exp)?;

        RefreshToken::new(token.to_string(), user_id, issued_at, expires_at)
    }

    /// Get access token TTL in seconds
    pub fn access_token_ttl(&self) -> i64 {
        self.config.access_token_ttl_secs
    }
}

fn parse_subject(sub: &str) -> Result<i64> {
    sub.parse()
        .map_err(|_| AppError::Unauthorized("Invalid subject claim".to_string()))
}

fn parse_window(iat: i64, exp: i64) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let issued_at = DateTime::from_timestamp(iat, 0)
        .ok_or_else(|| AppError::Unauthorized("Invalid iat claim".to_string()))?;
    let expires_at = DateTime::from_timestamp(exp, 0)
        .ok_or_else(|| AppError::Unauthorized("Invalid exp claim".to_string()))?;
    Ok((issued_at, expires_at))
}
