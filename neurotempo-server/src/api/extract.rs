//! JSON body extractors that fail with the structured error shape

use crate::ApiError;
use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::Json;
use axum_extra::extract::WithRejection;
use serde::de::DeserializeOwned;

/// Required JSON body; rejections become `400 BAD_REQUEST`
pub type ApiJson<T> = WithRejection<Json<T>, ApiError>;

/// JSON body that may be omitted
///
/// An empty (or whitespace-only) body yields `None`. Anything else must
/// parse as `T`, otherwise the request is rejected with `400 BAD_REQUEST`.
#[derive(Debug)]
pub struct OptionalJson<T>(pub Option<T>);

#[async_trait]
impl<T, S> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(None));
        }

        serde_json::from_slice(&bytes)
            .map(|value| Self(Some(value)))
            .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
    }
}
