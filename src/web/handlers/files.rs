//! File listing and archive download handlers.

use axum::{
    body::Body,
    extract::{Query, State},
    http::header,
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::archive::{content_disposition, ArchiveRequest, ARCHIVE_CONTENT_TYPE};
use crate::drive::FileDescriptor;
use crate::web::dto::{ApiJson, DownloadRequest, TokenQuery};
use crate::web::error::{ApiError, INVALID_TOKEN};
use crate::web::handlers::AppState;

/// Message for download requests without a token or files.
pub const MISSING_DOWNLOAD_FIELDS: &str = "Missing token or file IDs";

/// GET /api/list-files?token= - List the files of a token's folder.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<Vec<FileDescriptor>>, ApiError> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::forbidden(INVALID_TOKEN))?;

    let entry = state
        .registry
        .resolve(&token)
        .await
        .map_err(|e| ApiError::from_gate(e, "Failed to fetch files"))?;

    let files = state
        .drive
        .list_children(&entry.folder_id)
        .await
        .map_err(|e| ApiError::from_gate(e, "Failed to fetch files"))?;

    tracing::debug!(folder_id = %entry.folder_id, count = files.len(), "Listed folder");
    Ok(Json(files))
}

/// POST /api/download-zip - Stream the selected files as a ZIP archive.
pub async fn download_zip(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<DownloadRequest>,
) -> Result<Response, ApiError> {
    let request = ArchiveRequest::try_from(req)
        .map_err(|_| ApiError::bad_request(MISSING_DOWNLOAD_FIELDS))?;

    let archive = state
        .archive
        .stream_archive(request)
        .await
        .map_err(|e| ApiError::from_gate(e, "Failed to create archive"))?;

    let disposition = content_disposition(archive.filename());
    Response::builder()
        .header(header::CONTENT_TYPE, ARCHIVE_CONTENT_TYPE)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from_stream(archive.into_stream()))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to create archive")
        })
}
