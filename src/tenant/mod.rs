//! Request-scoped tenant context
//!
//! The authentication pipeline resolves each caller's institution
//! memberships into a [`TenantContext`] and attaches it to the request's
//! extensions. Because the context is a plain request-scoped value (not a
//! task-local or a global), it cannot leak into the next request served by
//! a reused worker: it is dropped with the request on every exit path.

pub mod scope;

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// The caller's tenant visibility for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    /// Admins see every tenant; no codes are tracked for them
    is_admin: bool,
    /// The institution writes are attributed to
    primary: Option<String>,
    /// Every institution the caller may read
    tenant_codes: Vec<String>,
}

impl TenantContext {
    /// Context for a platform operator: unrestricted
    pub fn admin() -> Self {
        Self {
            is_admin: true,
            primary: None,
            tenant_codes: Vec::new(),
        }
    }

    /// Resolve a non-admin caller's context from the home code carried in
    /// the token and the membership set looked up from storage.
    ///
    /// The home code wins as primary only when it is actually in the
    /// membership set; a stale token claim otherwise falls back to the
    /// first membership. A caller with no memberships keeps the home code
    /// alone.
    pub fn resolve(home_code: Option<&str>, memberships: Vec<String>) -> Self {
        let primary = if memberships.is_empty() {
            home_code.map(String::from)
        } else {
            match home_code {
                Some(home) if memberships.iter().any(|m| m == home) => Some(home.to_string()),
                _ => memberships.first().cloned(),
            }
        };

        Self {
            is_admin: false,
            primary,
            tenant_codes: memberships,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn primary(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    pub fn tenant_codes(&self) -> &[String] {
        &self.tenant_codes
    }

    /// Whether reads for this caller must be filtered by tenant
    pub fn is_scoped(&self) -> bool {
        !self.is_admin && (self.primary.is_some() || !self.tenant_codes.is_empty())
    }

    /// Whether this caller may see data belonging to `code`
    pub fn allows(&self, code: &str) -> bool {
        if self.is_admin {
            return true;
        }
        if !self.tenant_codes.is_empty() {
            return self.tenant_codes.iter().any(|c| c == code);
        }
        self.primary.as_deref() == Some(code)
    }
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}
