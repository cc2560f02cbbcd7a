//! Gemini generative language client
//!
//! Uses the streaming endpoint (`streamGenerateContent?alt=sse`) and joins
//! the text parts of every `data:` chunk into one reply.

use crate::services::gateway::{concat_chunks, AnalysisGateway, GatewayError};
use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use neurotempo_common::config::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("neurotempo/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ChunkContent>,
}

#[derive(Debug, Deserialize)]
struct ChunkContent {
    #[serde(default)]
    parts: Vec<ChunkPart>,
}

#[derive(Debug, Deserialize)]
struct ChunkPart {
    text: Option<String>,
}

impl GenerateChunk {
    /// Text of the first candidate, if any
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text = concat_chunks(content.parts.into_iter().map(|p| p.text));
        (!text.is_empty()).then_some(text)
    }
}

/// Join the text of every chunk in an SSE (or plain JSON) response body
///
/// Undecodable `data:` lines are skipped. A body without any `data:` line is
/// parsed as a single non-streamed response.
pub fn parse_stream_body(body: &str) -> Result<String, GatewayError> {
    let data_lines: Vec<&str> = body
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .filter(|data| !data.is_empty() && *data != "[DONE]")
        .collect();

    if data_lines.is_empty() {
        let chunk: GenerateChunk = serde_json::from_str(body.trim())
            .map_err(|e| GatewayError::InvalidResponse(format!("not a generate response: {}", e)))?;
        return Ok(chunk.text().unwrap_or_default());
    }

    let texts = data_lines.into_iter().map(|data| {
        match serde_json::from_str::<GenerateChunk>(data) {
            Ok(chunk) => chunk.text(),
            Err(e) => {
                debug!("Skipping undecodable stream chunk: {}", e);
                None
            }
        }
    });
    Ok(concat_chunks(texts))
}

/// Gemini API client
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    text_model: String,
    classification_model: String,
    timeout: Duration,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl GeminiClient {
    /// Build a client; a `None` key yields a client whose calls fail with
    /// [`GatewayError::NotConfigured`]
    pub fn new(api_key: Option<String>, config: &GatewayConfig) -> Result<Self, GatewayError> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Connection(e.to_string()))?;

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            http_client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            classification_model: config.classification_model.clone(),
            timeout,
            rate_limiter,
        })
    }

    async fn stream_generate(&self, model: &str, prompt: &str) -> Result<String, GatewayError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            GatewayError::NotConfigured(
                "Gemini API key not set (settings, GEMINI_API_KEY or TOML)".to_string(),
            )
        })?;

        self.rate_limiter.until_ready().await;

        let url = format!("{}/models/{}:streamGenerateContent", self.base_url, model);
        let request = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!(model = %model, prompt_chars = prompt.len(), "Calling Gemini");

        let response = self
            .http_client
            .post(&url)
            .query(&[("alt", "sse"), ("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout(self.timeout)
                } else {
                    GatewayError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(GatewayError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Connection(e.to_string()))?;
        let text = parse_stream_body(&body)?;

        info!(model = %model, reply_chars = text.len(), "Gemini reply received");
        Ok(text)
    }
}

#[async_trait]
impl AnalysisGateway for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate_text(&self, prompt: &str, model: Option<&str>) -> Result<String, GatewayError> {
        let model = model.unwrap_or(self.text_model.as_str());
        self.stream_generate(model, prompt).await
    }

    async fn generate_classification(&self, prompt: &str) -> Result<String, GatewayError> {
        self.stream_generate(&self.classification_model, prompt).await
    }
}
