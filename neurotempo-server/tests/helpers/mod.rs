//! Shared test utilities
//!
//! - `ScriptedGateway`: canned gateway replies with a call counter
//! - `TestApp`: AppState over an in-memory database and a temp root folder
//! - request/response helpers for router tests
//! - EEG CSV fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use neurotempo_common::config::TomlConfig;
use neurotempo_common::events::EventBus;
use neurotempo_server::services::{
    AnalysisGateway, CaptureHandle, CaptureLoop, GatewayError, SharedGateway, YoutubeClient,
};
use neurotempo_server::AppState;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Two channels per band; alpha 0.4, beta 0.2, theta 0.3 on the first row
pub const RELATIVE_POWER_CSV: &str = "\
timestamp,ch0_delta_rel_power,ch1_delta_rel_power,ch0_theta_rel_power,ch1_theta_rel_power,ch0_alpha_rel_power,ch1_alpha_rel_power,ch0_beta_rel_power,ch1_beta_rel_power,ch0_gamma_rel_power,ch1_gamma_rel_power
0,0.5,0.5,0.2,0.4,0.3,0.5,0.1,0.3,0.1,0.1
1,0.9,0.9,0.9,0.9,0.9,0.9,0.9,0.9,0.9,0.9
";

/// Calmness-sigmoid tempo for [`RELATIVE_POWER_CSV`]
pub const RELATIVE_POWER_BPM: f64 = 124.47;

/// Per-channel PSD layout: beta 1.5 and gamma 0.5 on each of 8 channels
pub fn psd_csv() -> String {
    let header: Vec<String> = (0..8)
        .flat_map(|ch| [format!("{}.psd_beta", ch), format!("{}.psd_gamma", ch)])
        .collect();
    let row: Vec<&str> = (0..8).flat_map(|_| ["1.5", "0.5"]).collect();
    format!("{}\n{}\n", header.join(","), row.join(","))
}

/// Gateway double replaying queued replies
///
/// When the queue is empty, the repeat reply (if any) is returned; otherwise
/// the call fails with `InvalidResponse`.
pub struct ScriptedGateway {
    script: Mutex<VecDeque<Result<String, GatewayError>>>,
    repeat: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String, GatewayError>>,
    {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            repeat: None,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Successful text replies, in order
    pub fn replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|r| Ok(r.into())))
    }

    /// Same reply for every call
    pub fn repeating(reply: &str) -> Self {
        Self {
            repeat: Some(reply.to_string()),
            ..Self::new(Vec::<Result<String, GatewayError>>::new())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    async fn next(&self, prompt: &str) -> Result<String, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        match (scripted, &self.repeat) {
            (Some(reply), _) => reply,
            (None, Some(reply)) => Ok(reply.clone()),
            (None, None) => Err(GatewayError::InvalidResponse("script exhausted".to_string())),
        }
    }
}

#[async_trait]
impl AnalysisGateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate_text(&self, prompt: &str, _model: Option<&str>) -> Result<String, GatewayError> {
        self.next(prompt).await
    }

    async fn generate_classification(&self, prompt: &str) -> Result<String, GatewayError> {
        self.next(prompt).await
    }
}

/// Capture loop that starts nothing
pub struct NoCapture;

impl CaptureLoop for NoCapture {
    fn spawn(&self, _session_id: &str, cancel: CancellationToken) -> std::io::Result<CaptureHandle> {
        Ok(CaptureHandle::new(cancel, None))
    }
}

/// Application under test
pub struct TestApp {
    pub state: AppState,
    pub gateway: Arc<ScriptedGateway>,
    pub root: TempDir,
}

impl TestApp {
    pub fn router(&self) -> axum::Router {
        neurotempo_server::build_router(self.state.clone())
    }

    /// Write `contents` into the upload directory and make it current
    pub async fn upload(&self, name: &str, contents: &str) {
        self.state
            .uploads
            .store(name, contents.as_bytes())
            .await
            .unwrap();
    }
}

/// Single-connection in-memory database with the settings table
pub async fn test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    neurotempo_common::db::create_settings_table(&pool).await.unwrap();
    pool
}

pub async fn test_app(gateway: ScriptedGateway) -> TestApp {
    test_app_with_config(gateway, TomlConfig::default()).await
}

pub async fn test_app_with_config(gateway: ScriptedGateway, config: TomlConfig) -> TestApp {
    let root = TempDir::new().unwrap();
    let gateway = Arc::new(gateway);

    let state = AppState::with_capture(
        test_db().await,
        EventBus::new(100),
        SharedGateway::new(gateway.clone()),
        YoutubeClient::new(None).unwrap(),
        &config,
        root.path().join("uploads"),
        root.path().join("neurotempo.toml"),
        Arc::new(NoCapture),
    );

    TestApp {
        state,
        gateway,
        root,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// POST with a raw body and an optional content type
pub fn post_raw(uri: &str, content_type: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Multipart POST with one part named `field`
pub fn post_multipart(uri: &str, field: &str, filename: &str, contents: &str) -> Request<Body> {
    let boundary = "neurotempo-test-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: text/csv\r\n\r\n{contents}\r\n--{b}--\r\n",
        b = boundary,
    );
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
