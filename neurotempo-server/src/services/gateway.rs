//! Generative model gateway seam
//!
//! The recommendation pipeline and the session manager only see this trait.
//! The production implementation is [`crate::services::GeminiClient`]; tests
//! substitute a scripted double.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors that can occur when talking to the generative model
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Gateway not configured: {0}")]
    NotConfigured(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

/// Text/classification round trips to a hosted generative model
#[async_trait]
pub trait AnalysisGateway: Send + Sync {
    /// Provider name for logs (e.g. "gemini")
    fn name(&self) -> &str;

    /// False when calls would fail with [`GatewayError::NotConfigured`]
    fn is_configured(&self) -> bool {
        true
    }

    /// Generate free text; `model` overrides the configured text model
    ///
    /// Streamed chunks are concatenated before returning.
    async fn generate_text(&self, prompt: &str, model: Option<&str>) -> Result<String, GatewayError>;

    /// Generate a mental-state classification reply with the classification model
    async fn generate_classification(&self, prompt: &str) -> Result<String, GatewayError>;
}

/// Swappable gateway shared by the pipeline and the session manager
///
/// Replaced when the provider key changes at runtime; in-flight calls keep
/// the instance they started with.
#[derive(Clone)]
pub struct SharedGateway {
    inner: Arc<RwLock<Arc<dyn AnalysisGateway>>>,
}

impl SharedGateway {
    pub fn new(gateway: Arc<dyn AnalysisGateway>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(gateway)),
        }
    }

    pub async fn current(&self) -> Arc<dyn AnalysisGateway> {
        self.inner.read().await.clone()
    }

    pub async fn replace(&self, gateway: Arc<dyn AnalysisGateway>) {
        let mut slot = self.inner.write().await;
        tracing::info!(from = %slot.name(), to = %gateway.name(), "Gateway replaced");
        *slot = gateway;
    }
}

/// Join streamed text chunks, skipping absent and empty ones
pub fn concat_chunks<I, S>(chunks: I) -> String
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    chunks
        .into_iter()
        .flatten()
        .fold(String::new(), |mut acc, chunk| {
            acc.push_str(chunk.as_ref());
            acc
        })
}

/// Bound a gateway call; expiry becomes [`GatewayError::Timeout`]
pub async fn call_with_timeout<F, T>(limit: Duration, call: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout = ?limit, "Gateway call timed out");
            Err(GatewayError::Timeout(limit))
        }
    }
}
