//! Analysis session endpoints

use crate::api::extract::{ApiJson, OptionalJson};
use crate::models::{AnalysisResult, MentalState, SessionSnapshot};
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    pub session_id: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub status: &'static str,
}

/// Text and optional image snippet to classify
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub text: Option<String>,
    /// Base64 image; accepted but not sent to the model
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MentalStateResponse {
    pub mental_state: Option<MentalState>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<MentalState>,
}

/// POST /api/session/start
///
/// 409 while another session is running.
pub async fn start_session(
    State(state): State<AppState>,
    OptionalJson(body): OptionalJson<StartSessionRequest>,
) -> ApiResult<Json<StartSessionResponse>> {
    let request = body.unwrap_or_default();
    let session = state.sessions.start(request.session_id).await?;
    Ok(Json(StartSessionResponse {
        session_id: session.id,
        status: "started",
    }))
}

/// POST /api/session/stop
///
/// Succeeds whether or not a session was running.
pub async fn stop_session(State(state): State<AppState>) -> Json<StopSessionResponse> {
    state.sessions.stop().await;
    Json(StopSessionResponse { status: "stopped" })
}

/// POST /api/analyze
pub async fn analyze(
    State(state): State<AppState>,
    WithRejection(Json(request), _): ApiJson<AnalyzeRequest>,
) -> ApiResult<Json<AnalysisResult>> {
    match state
        .sessions
        .analyze_input(request.text.as_deref(), request.image.as_deref())
        .await
    {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            let err = ApiError::from(e);
            if err.status().is_server_error() {
                state.record_error(err.to_string()).await;
            }
            Err(err)
        }
    }
}

/// GET /api/mental-state
pub async fn mental_state(State(state): State<AppState>) -> Json<MentalStateResponse> {
    Json(MentalStateResponse {
        mental_state: state.sessions.current_state().await,
    })
}

/// GET /api/mental-state/history
pub async fn mental_state_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        history: state.sessions.history().await,
    })
}

/// GET /api/session
pub async fn session_status(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.sessions.snapshot().await)
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/api/session", get(session_status))
        .route("/api/session/start", post(start_session))
        .route("/api/session/stop", post(stop_session))
        .route("/api/analyze", post(analyze))
        .route("/api/mental-state", get(mental_state))
        .route("/api/mental-state/history", get(mental_state_history))
}
