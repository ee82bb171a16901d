//! Folder registration handler.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::registry::RegistrationRequest;
use crate::web::dto::{ApiJson, RegisterFolderRequest, RegisterFolderResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// POST /api/add-folder - Register a folder and issue a token.
pub async fn register_folder(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterFolderRequest>,
) -> Result<Json<RegisterFolderResponse>, ApiError> {
    let request = RegistrationRequest::from(req);
    let entry = state
        .registry
        .register(&request)
        .await
        .map_err(|e| ApiError::from_gate(e, "Failed to update folder map"))?;

    Ok(Json(RegisterFolderResponse::from(&entry)))
}
