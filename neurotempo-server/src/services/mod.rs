//! Service modules for the recommendation pipeline and analysis sessions
//!
//! Leaf to root: feature extraction, scoring, tempo mapping, the generative
//! model gateway, then the recommendation orchestrator and session manager.

pub mod capture;
pub mod classifier;
pub mod feature_extractor;
pub mod gateway;
pub mod gemini_client;
pub mod json_extract;
pub mod prompts;
pub mod recommendation;
pub mod score_engine;
pub mod session_manager;
pub mod tempo_mapper;
pub mod upload_registry;
pub mod youtube;

pub use capture::{CaptureHandle, CaptureLoop, HeartbeatCapture};
pub use feature_extractor::{EegTable, FeatureError};
pub use gateway::{AnalysisGateway, GatewayError, SharedGateway};
pub use gemini_client::GeminiClient;
pub use recommendation::{RecommendError, RecommendationOrchestrator, RecommendationSettings};
pub use session_manager::{SessionError, SessionManager, SessionSettings};
pub use tempo_mapper::TempoStrategy;
pub use upload_registry::{StoredUpload, UploadError, UploadRegistry};
pub use youtube::{VideoLookup, YoutubeClient, YoutubeError};
