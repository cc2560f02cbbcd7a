//! neurotempo-server library interface
//!
//! Exposes the services and the router for integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use neurotempo_common::config::{GatewayConfig, TomlConfig};
use neurotempo_common::events::EventBus;
use services::{
    CaptureLoop, HeartbeatCapture, RecommendationOrchestrator, RecommendationSettings,
    SessionManager, SessionSettings, SharedGateway, UploadRegistry, YoutubeClient,
};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Settings database
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Generative model gateway, swapped when the key changes
    pub gateway: SharedGateway,
    /// Used to rebuild the gateway client on key changes
    pub gateway_config: GatewayConfig,
    pub uploads: Arc<UploadRegistry>,
    pub recommender: Arc<RecommendationOrchestrator>,
    pub sessions: Arc<SessionManager>,
    pub youtube: Arc<YoutubeClient>,
    /// TOML file receiving best-effort key write-back
    pub toml_path: PathBuf,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    /// Wire the services from bootstrap configuration
    ///
    /// The capture loop defaults to [`HeartbeatCapture`] at the configured
    /// interval; see [`AppState::with_capture`] to supply another.
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        gateway: SharedGateway,
        youtube: YoutubeClient,
        config: &TomlConfig,
        upload_dir: PathBuf,
        toml_path: PathBuf,
    ) -> Self {
        let capture = Arc::new(HeartbeatCapture::new(
            event_bus.clone(),
            Duration::from_millis(config.session.capture_interval_ms),
        ));
        Self::with_capture(db, event_bus, gateway, youtube, config, upload_dir, toml_path, capture)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_capture(
        db: SqlitePool,
        event_bus: EventBus,
        gateway: SharedGateway,
        youtube: YoutubeClient,
        config: &TomlConfig,
        upload_dir: PathBuf,
        toml_path: PathBuf,
        capture: Arc<dyn CaptureLoop>,
    ) -> Self {
        let gateway_timeout = Duration::from_secs(config.gateway.timeout_secs.max(1));
        let uploads = Arc::new(UploadRegistry::new(upload_dir));

        let recommender = Arc::new(RecommendationOrchestrator::new(
            gateway.clone(),
            Arc::clone(&uploads),
            event_bus.clone(),
            RecommendationSettings::from_config(&config.recommendation, gateway_timeout),
        ));

        let sessions = Arc::new(SessionManager::new(
            gateway.clone(),
            capture,
            event_bus.clone(),
            SessionSettings {
                history_capacity: config.session.history_capacity,
                gateway_timeout,
            },
        ));

        Self {
            db,
            event_bus,
            gateway,
            gateway_config: config.gateway.clone(),
            uploads,
            recommender,
            sessions,
            youtube: Arc::new(youtube),
            toml_path,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember a failure for `/health`
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::upload_routes())
        .merge(api::recommend_routes())
        .merge(api::session_routes())
        .merge(api::youtube_routes())
        .merge(api::settings_routes())
        .merge(api::health_routes())
        .route("/ws", axum::routing::get(api::ws_handler))
        .route("/events", axum::routing::get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
