//! Patient record API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::domain::{CreateRecordInput, PatientRecord, UpdateRecordInput};
use crate::error::Result;
use crate::server::AppState;
use crate::tenant::TenantContext;

/// List records visible to the caller
pub async fn list(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<Json<Vec<PatientRecord>>> {
    Ok(Json(state.record_service.list(&ctx).await?))
}

/// Fetch one record within the caller's tenants
pub async fn get(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<i64>,
) -> Result<Json<PatientRecord>> {
    Ok(Json(state.record_service.get(&ctx, id).await?))
}

/// Create a record attributed to the caller's institution
pub async fn create(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(input): Json<CreateRecordInput>,
) -> Result<(StatusCode, Json<PatientRecord>)> {
    let created = state.record_service.create(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a record the caller's institution owns
pub async fn update(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<i64>,
    Json(input): Json<UpdateRecordInput>,
) -> Result<Json<PatientRecord>> {
    Ok(Json(state.record_service.update(&ctx, id, input).await?))
}
