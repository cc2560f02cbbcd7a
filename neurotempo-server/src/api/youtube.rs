//! YouTube lookup endpoint

use crate::services::VideoLookup;
use crate::api::extract::ApiJson;
use crate::{ApiError, ApiResult, AppState};
use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct VideoLookupRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
}

/// POST /api/youtube-url
///
/// 400 without title and artist, 404 when the search finds nothing.
pub async fn youtube_url(
    State(state): State<AppState>,
    WithRejection(Json(request), _): ApiJson<VideoLookupRequest>,
) -> ApiResult<Json<VideoLookup>> {
    let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    let (Some(title), Some(artist)) = (non_blank(request.title), non_blank(request.artist)) else {
        return Err(ApiError::BadRequest("Missing song title or artist".to_string()));
    };

    let lookup = state.youtube.lookup(&title, &artist).await?;
    Ok(Json(lookup))
}

pub fn youtube_routes() -> Router<AppState> {
    Router::new().route("/api/youtube-url", post(youtube_url))
}
