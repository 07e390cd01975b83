//! Authentication pipeline middleware and extractors
//!
//! Every inbound request passes through [`authenticate`]: bearer
//! extraction, revocation check, signature/expiry verification, principal
//! decoding, membership lookup, and tenant-context population. A request
//! without a credential continues anonymously; the role gate decides
//! whether that is acceptable for the target route. Principal and context
//! travel as request extensions, so they are released with the request on
//! every exit path.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::domain::Role;
use crate::error::AppError;
use crate::jwt::JwtManager;
use crate::repository::MembershipRepository;
use crate::revocation::RevocationRegistry;
use crate::tenant::TenantContext;
use crate::token::strip_bearer;

/// Authenticated principal attached to the request
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub user_id: i64,
    pub role: Role,
    /// Home institution code carried in the token, if any
    pub tenant_code: Option<String>,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

/// Collaborators the pipeline needs, shared across requests
#[derive(Clone)]
pub struct AuthState {
    jwt: Arc<JwtManager>,
    revocations: Arc<dyn RevocationRegistry>,
    memberships: Arc<dyn MembershipRepository>,
}

impl AuthState {
    pub fn new(
        jwt: Arc<JwtManager>,
        revocations: Arc<dyn RevocationRegistry>,
        memberships: Arc<dyn MembershipRepository>,
    ) -> Self {
        Self {
            jwt,
            revocations,
            memberships,
        }
    }
}

/// Authentication pipeline middleware
///
/// Registered with `axum::middleware::from_fn_with_state`. Short-circuits
/// to a 401 JSON response on a revoked or unverifiable token; otherwise
/// inserts [`CurrentUser`] and [`TenantContext`] extensions and proceeds.
pub async fn authenticate(
    State(auth): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    // Absent or non-Bearer header means "no credential"; the role gate
    // rejects anonymous callers on routes that require one.
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(strip_bearer)
        .map(str::to_owned);

    let Some(token) = token else {
        return next.run(request).await;
    };

    match resolve(&auth, &token).await {
        Ok((user, context)) => {
            request.extensions_mut().insert(user);
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(err) => {
            metrics::counter!("clinigate_auth_rejected_total").increment(1);
            tracing::debug!("Request authentication failed: {}", err);
            unauthorized_response("Invalid or expired token")
        }
    }
}

/// Token -> principal + tenant context, or an authentication error
async fn resolve(auth: &AuthState, token: &str) -> crate::error::Result<(CurrentUser, TenantContext)> {
    // Revocation wins over an otherwise valid signature: a logged-out
    // token must die before its natural expiry.
    if auth.revocations.is_revoked(token).await? {
        return Err(AppError::Unauthorized("Token has been revoked".to_string()));
    }

    let access = auth.jwt.verify_access(token)?;

    let user = CurrentUser {
        user_id: access.user_id(),
        role: access.role(),
        tenant_code: access.tenant_code().map(String::from),
    };

    let context = if access.role().is_admin() {
        TenantContext::admin()
    } else {
        let memberships = auth.memberships.tenant_codes_for_user(access.user_id()).await?;
        TenantContext::resolve(access.tenant_code(), memberships)
    };

    Ok((user, context))
}

/// Generate a 401 Unauthorized response
fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "unauthorized",
            "message": message,
        })),
    )
        .into_response()
}
