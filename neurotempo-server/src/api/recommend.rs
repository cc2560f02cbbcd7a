//! Recommendation and stress endpoints

use crate::api::extract::{ApiJson, OptionalJson};
use crate::models::{BandPowers, Recommendation, StressAssessment};
use crate::services::RecommendError;
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

/// Optional body of `POST /api/recommend`
#[derive(Debug, Default, Deserialize)]
pub struct RecommendRequest {
    /// Number of songs to request; `0` skips the song lookup
    #[serde(default)]
    pub songs: Option<usize>,
}

/// Convert and remember server-side failures for `/health`
async fn tracked<T>(state: &AppState, result: Result<T, RecommendError>) -> ApiResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) => {
            let err = ApiError::from(e);
            if err.status().is_server_error() {
                state.record_error(err.to_string()).await;
            }
            Err(err)
        }
    }
}

/// POST /api/recommend
///
/// Recommendation for the current upload. The body may be omitted.
pub async fn recommend(
    State(state): State<AppState>,
    OptionalJson(body): OptionalJson<RecommendRequest>,
) -> ApiResult<Json<Recommendation>> {
    let request = body.unwrap_or_default();
    let result = state.recommender.recommend(request.songs).await;
    tracked(&state, result).await.map(Json)
}

/// POST /api/recommend-from-eeg
///
/// Band powers posted directly; missing or null bands count as zero.
pub async fn recommend_from_eeg(
    State(state): State<AppState>,
    WithRejection(Json(bands), _): ApiJson<BandPowers>,
) -> ApiResult<Json<Recommendation>> {
    let result = state.recommender.recommend_from_bands(&bands, None).await;
    tracked(&state, result).await.map(Json)
}

/// GET /api/stress
pub async fn stress(State(state): State<AppState>) -> ApiResult<Json<StressAssessment>> {
    let result = state.recommender.stress_assessment().await;
    tracked(&state, result).await.map(Json)
}

pub fn recommend_routes() -> Router<AppState> {
    Router::new()
        .route("/api/recommend", post(recommend))
        .route("/api/recommend-from-eeg", post(recommend_from_eeg))
        .route("/api/stress", get(stress))
}
