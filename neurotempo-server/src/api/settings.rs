//! Provider key settings endpoints
//!
//! `POST /api/settings/gemini_api_key` and `POST /api/settings/youtube_api_key`
//! take `{"api_key": "..."}`, write the database (authoritative), apply the
//! key to the running service and sync the TOML file best-effort.

use crate::services::GeminiClient;
use crate::api::extract::ApiJson;
use crate::{ApiError, ApiResult, AppState};
use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct SetApiKeyRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct SetApiKeyResponse {
    pub success: bool,
    pub message: String,
}

fn validated(payload: &SetApiKeyRequest) -> ApiResult<String> {
    if !crate::config::is_valid_key(&payload.api_key) {
        return Err(ApiError::BadRequest(
            "API key cannot be empty or whitespace-only".to_string(),
        ));
    }
    Ok(payload.api_key.trim().to_string())
}

async fn sync_to_toml(state: &AppState, setting: &str, key: String) {
    let mut settings = HashMap::new();
    settings.insert(setting.to_string(), key);

    if let Err(e) = crate::config::sync_settings_to_toml(settings, &state.toml_path).await {
        warn!("TOML sync failed (database write succeeded): {}", e);
    }
}

/// POST /api/settings/gemini_api_key
///
/// The gateway is rebuilt with the new key; requests already in flight finish
/// on the previous client.
pub async fn set_gemini_api_key(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): ApiJson<SetApiKeyRequest>,
) -> ApiResult<Json<SetApiKeyResponse>> {
    let key = validated(&payload)?;

    crate::db::settings::set_gemini_api_key(&state.db, key.clone())
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to save API key to database: {}", e)))?;

    let client = GeminiClient::new(Some(key.clone()), &state.gateway_config)
        .map_err(|e| ApiError::Internal(format!("Failed to build gateway client: {}", e)))?;
    state.gateway.replace(Arc::new(client)).await;

    info!("Gemini API key configured via API");
    sync_to_toml(&state, crate::db::settings::GEMINI_API_KEY, key).await;

    Ok(Json(SetApiKeyResponse {
        success: true,
        message: "Gemini API key configured successfully".to_string(),
    }))
}

/// POST /api/settings/youtube_api_key
pub async fn set_youtube_api_key(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): ApiJson<SetApiKeyRequest>,
) -> ApiResult<Json<SetApiKeyResponse>> {
    let key = validated(&payload)?;

    crate::db::settings::set_youtube_api_key(&state.db, key.clone())
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to save API key to database: {}", e)))?;

    state.youtube.set_api_key(Some(key.clone())).await;

    info!("YouTube API key configured via API");
    sync_to_toml(&state, crate::db::settings::YOUTUBE_API_KEY, key).await;

    Ok(Json(SetApiKeyResponse {
        success: true,
        message: "YouTube API key configured successfully".to_string(),
    }))
}

/// Build settings routes
pub fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/api/settings/gemini_api_key", post(set_gemini_api_key))
        .route("/api/settings/youtube_api_key", post(set_youtube_api_key))
}
