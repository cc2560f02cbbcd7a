//! Recording upload endpoint

use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use neurotempo_common::events::NeuroEvent;
use serde::Serialize;
use tracing::info;

/// Largest accepted recording
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Multipart field carrying the recording
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub path: String,
}

/// POST /upload
///
/// Stores the `file` part under the upload directory and makes it the
/// recording used by `/api/recommend` and `/api/stress`.
pub async fn upload_recording(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("No selected file".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;

        let stored = state.uploads.store(&filename, &bytes).await?;

        info!(file = %stored.filename, "Recording uploaded");
        state.event_bus.emit_lossy(NeuroEvent::UploadRegistered {
            filename: stored.filename.clone(),
            timestamp: Utc::now(),
        });

        return Ok(Json(UploadResponse {
            filename: stored.filename,
            path: stored.path.display().to_string(),
        }));
    }

    Err(ApiError::BadRequest("No file part".to_string()))
}

pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_recording))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
