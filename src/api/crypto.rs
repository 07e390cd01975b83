//! Field encryption API handlers
//!
//! Operational endpoints for the persistence-mapping teams: encrypt is
//! admin-only, decrypt is open to any authenticated caller.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;
use crate::server::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct FieldValueInput {
    #[validate(length(max = 65536))]
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct FieldValueResponse {
    pub value: String,
}

/// Encrypt a field value into its storage envelope
pub async fn encrypt(
    State(state): State<AppState>,
    Json(input): Json<FieldValueInput>,
) -> Result<Json<FieldValueResponse>> {
    input.validate()?;
    let value = state.cipher.protect(&input.value)?;
    Ok(Json(FieldValueResponse { value }))
}

/// Decrypt a stored envelope back to its field value
pub async fn decrypt(
    State(state): State<AppState>,
    Json(input): Json<FieldValueInput>,
) -> Result<Json<FieldValueResponse>> {
    input.validate()?;
    let value = state.cipher.reveal(&input.value)?;
    Ok(Json(FieldValueResponse { value }))
}
