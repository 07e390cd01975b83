//! Authentication API handlers

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;

use crate::domain::{LoginInput, MeResponse, RefreshInput, TokenResponse};
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::server::AppState;
use crate::tenant::TenantContext;
use crate::token::TokenPair;

fn token_response(pair: TokenPair, expires_in: i64) -> TokenResponse {
    TokenResponse {
        access_token: pair.access.value().to_string(),
        refresh_token: pair.refresh.value().to_string(),
        token_type: "Bearer".to_string(),
        expires_in,
    }
}

/// Authenticate and issue a token pair
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<Json<TokenResponse>> {
    let pair = state.auth_service.login(input).await?;
    Ok(Json(token_response(pair, state.jwt.access_token_ttl())))
}

/// Invalidate the caller's credentials ahead of expiry
pub async fn logout(
    State(state): State<AppState>,
    TypedHeader(bearer): TypedHeader<Authorization<Bearer>>,
) -> Result<StatusCode> {
    state.auth_service.logout(bearer.token()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Exchange a refresh token for a new pair
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshInput>,
) -> Result<Json<TokenResponse>> {
    let pair = state.auth_service.refresh(input).await?;
    Ok(Json(token_response(pair, state.jwt.access_token_ttl())))
}

/// The caller's resolved identity and tenant visibility
pub async fn me(user: CurrentUser, ctx: TenantContext) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: user.user_id,
        role: user.role,
        tenant_code: ctx.primary().map(String::from),
        tenant_codes: ctx.tenant_codes().to_vec(),
    })
}
