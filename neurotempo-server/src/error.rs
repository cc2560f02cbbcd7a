//! Error types for neurotempo-server
//!
//! Every handler failure becomes `{"error": {"code", "message", "raw"?}}`.

use crate::services::{
    FeatureError, GatewayError, RecommendError, SessionError, UploadError, YoutubeError,
};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// No recording uploaded yet (400)
    #[error("No recording has been uploaded")]
    NoUpload,

    /// Conflict (409) - session already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Analyze without a running session (409)
    #[error("No active session")]
    SessionNotActive,

    /// Recording lacks required columns (422)
    #[error("Missing feature: {0}")]
    MissingFeature(String),

    /// Recording could not be read as a table (422)
    #[error("Unreadable recording: {0}")]
    Unreadable(String),

    /// Genre step failed (502)
    #[error("Genre unavailable: {message}")]
    GenreUnavailable { message: String, raw: String },

    /// Upstream reply could not be parsed (502)
    #[error("Malformed upstream response: {message}")]
    MalformedUpstream { message: String, raw: String },

    /// Gateway failure other than a timeout (502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Gateway call exceeded its deadline (504)
    #[error("Gateway timeout: {0}")]
    GatewayTimeout(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// neurotempo-common error
    #[error("Common error: {0}")]
    Common(#[from] neurotempo_common::Error),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Timeout(_) => ApiError::GatewayTimeout(err.to_string()),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<FeatureError> for ApiError {
    fn from(err: FeatureError) -> Self {
        match err {
            FeatureError::MissingFeature(msg) => ApiError::MissingFeature(msg),
            FeatureError::Unreadable(msg) => ApiError::Unreadable(msg),
        }
    }
}

impl From<RecommendError> for ApiError {
    fn from(err: RecommendError) -> Self {
        match err {
            RecommendError::NoUpload => ApiError::NoUpload,
            RecommendError::Feature(e) => e.into(),
            RecommendError::GenreUnavailable { reason, raw } => ApiError::GenreUnavailable {
                message: reason,
                raw,
            },
            RecommendError::MalformedUpstream { reason, raw } => ApiError::MalformedUpstream {
                message: reason,
                raw,
            },
            RecommendError::Gateway(e) => e.into(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::AlreadyRunning(id) => {
                ApiError::Conflict(format!("Session {} is already running", id))
            }
            SessionError::NotActive => ApiError::SessionNotActive,
            SessionError::Capture(msg) => ApiError::Internal(msg),
            SessionError::Gateway(e) => e.into(),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::InvalidFilename(_) => ApiError::BadRequest(err.to_string()),
            UploadError::Io(e) => ApiError::Io(e),
        }
    }
}

impl From<YoutubeError> for ApiError {
    fn from(err: YoutubeError) -> Self {
        match err {
            YoutubeError::NotFound => ApiError::NotFound(err.to_string()),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl ApiError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NoUpload => "NO_UPLOAD",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::SessionNotActive => "SESSION_NOT_ACTIVE",
            ApiError::MissingFeature(_) => "MISSING_FEATURE",
            ApiError::Unreadable(_) => "UNREADABLE_RECORDING",
            ApiError::GenreUnavailable { .. } => "GENRE_UNAVAILABLE",
            ApiError::MalformedUpstream { .. } => "MALFORMED_UPSTREAM",
            ApiError::Upstream(_) => "UPSTREAM_ERROR",
            ApiError::GatewayTimeout(_) => "GATEWAY_TIMEOUT",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Io(_) => "IO_ERROR",
            ApiError::Common(_) => "COMMON_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::NoUpload => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) | ApiError::SessionNotActive => StatusCode::CONFLICT,
            ApiError::MissingFeature(_) | ApiError::Unreadable(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::GenreUnavailable { .. }
            | ApiError::MalformedUpstream { .. }
            | ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) | ApiError::Io(_) | ApiError::Common(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = self.to_string();

        let body = match self {
            ApiError::GenreUnavailable { raw, .. } | ApiError::MalformedUpstream { raw, .. } => {
                json!({ "error": { "code": code, "message": message, "raw": raw } })
            }
            _ => json!({ "error": { "code": code, "message": message } }),
        };

        if status.is_server_error() {
            tracing::warn!(code, %message, "Request failed");
        }

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
