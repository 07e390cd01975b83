//! Per-route role gate
//!
//! Applied with `route_layer` after the authentication pipeline. The gate
//! is purely role-based: data-level isolation is the tenant scope's job.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domain::Role;
use crate::middleware::auth::CurrentUser;

/// Allow-list of roles for a protected route
#[derive(Debug, Clone)]
pub struct RoleGate {
    allowed: Vec<Role>,
}

impl RoleGate {
    /// Only the listed roles may pass
    pub fn allow(roles: &[Role]) -> Self {
        Self {
            allowed: roles.to_vec(),
        }
    }

    /// Any authenticated caller may pass
    pub fn any_authenticated() -> Self {
        Self { allowed: Vec::new() }
    }

    fn permits(&self, role: Role) -> bool {
        self.allowed.is_empty() || self.allowed.contains(&role)
    }
}

/// Role gate middleware
///
/// No principal attached means authentication is required; a principal
/// with a role outside the allow-list is denied.
pub async fn require_role(
    State(gate): State<RoleGate>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(user) = request.extensions().get::<CurrentUser>() else {
        return rejection(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "Authentication required",
        );
    };

    if !gate.permits(user.role) {
        return rejection(StatusCode::FORBIDDEN, "forbidden", "Access denied");
    }

    next.run(request).await
}

fn rejection(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "error": error,
            "message": message,
        })),
    )
        .into_response()
}
