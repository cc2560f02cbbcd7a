//! EEG recording → tempo → genre → songs
//!
//! Fail-fast sequence per request:
//! 1. Load the current upload and extract band means
//! 2. Score calmness and map to BPM with the configured strategy
//! 3. Ask the gateway for one genre
//! 4. Ask for song batches, each parsed strictly
//!
//! Holds no state between requests besides the shared collaborators.

use crate::models::{BandPowers, Bpm, Recommendation, Song, StressAssessment, WaveSummary};
use crate::services::feature_extractor::{self, EegTable, FeatureError};
use crate::services::gateway::{call_with_timeout, GatewayError, SharedGateway};
use crate::services::prompts;
use crate::services::score_engine::{self, CalmnessWeights};
use crate::services::tempo_mapper::{self, BandWeights, Baseline, TempoStrategy};
use crate::services::upload_registry::UploadRegistry;
use chrono::Utc;
use neurotempo_common::config::RecommendationConfig;
use neurotempo_common::events::{EventBus, NeuroEvent};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Upper bound on batches per request regardless of the requested count
pub const MAX_SONG_BATCHES: usize = 10;

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("No recording has been uploaded")]
    NoUpload,

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error("Genre unavailable: {reason}")]
    GenreUnavailable { reason: String, raw: String },

    #[error("Malformed upstream response: {reason}")]
    MalformedUpstream { reason: String, raw: String },

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Tunables for [`RecommendationOrchestrator`]
#[derive(Debug, Clone)]
pub struct RecommendationSettings {
    pub strategy: TempoStrategy,
    pub song_batch_size: usize,
    pub song_batches: usize,
    pub gateway_timeout: Duration,
    pub calmness_weights: CalmnessWeights,
    pub band_weights: BandWeights,
    pub baseline: Baseline,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self::from_config(&RecommendationConfig::default(), Duration::from_secs(60))
    }
}

impl RecommendationSettings {
    pub fn from_config(config: &RecommendationConfig, gateway_timeout: Duration) -> Self {
        Self {
            strategy: config.tempo_strategy.into(),
            song_batch_size: config.song_batch_size.max(1),
            song_batches: config.song_batches,
            gateway_timeout,
            calmness_weights: CalmnessWeights::default(),
            band_weights: BandWeights::default(),
            baseline: Baseline::default(),
        }
    }

    /// Batches to request for an optional explicit song count
    pub fn batches_for(&self, songs: Option<usize>) -> usize {
        let batches = match songs {
            Some(n) => n.div_ceil(self.song_batch_size),
            None => self.song_batches,
        };
        batches.min(MAX_SONG_BATCHES)
    }
}

pub struct RecommendationOrchestrator {
    gateway: SharedGateway,
    uploads: Arc<UploadRegistry>,
    event_bus: EventBus,
    settings: RecommendationSettings,
}

impl RecommendationOrchestrator {
    pub fn new(
        gateway: SharedGateway,
        uploads: Arc<UploadRegistry>,
        event_bus: EventBus,
        settings: RecommendationSettings,
    ) -> Self {
        Self {
            gateway,
            uploads,
            event_bus,
            settings,
        }
    }

    pub fn settings(&self) -> &RecommendationSettings {
        &self.settings
    }

    async fn current_upload(&self) -> Result<PathBuf, RecommendError> {
        self.uploads
            .current_upload_path()
            .await
            .ok_or(RecommendError::NoUpload)
    }

    async fn load_table(path: PathBuf) -> Result<EegTable, RecommendError> {
        tokio::task::spawn_blocking(move || EegTable::from_path(&path))
            .await
            .map_err(|e| FeatureError::Unreadable(format!("table load task failed: {}", e)))?
            .map_err(RecommendError::from)
    }

    /// Recommendation for the current upload
    ///
    /// `songs` overrides how many songs are requested; `Some(0)` skips the
    /// song lookup.
    pub async fn recommend(&self, songs: Option<usize>) -> Result<Recommendation, RecommendError> {
        let path = self.current_upload().await?;
        let table = Self::load_table(path.clone()).await?;

        let raw_means = feature_extractor::relative_power_means(&table)?;
        let normalized = feature_extractor::normalize(&raw_means);
        let calmness = score_engine::calmness_score(&normalized, &self.settings.calmness_weights);
        let wave = WaveSummary::from_normalized(&normalized, calmness);

        let bpm = match self.settings.strategy {
            TempoStrategy::CalmnessSigmoid => tempo_mapper::calmness_sigmoid_bpm(calmness),
            TempoStrategy::WeightedZscore => tempo_mapper::weighted_zscore_bpm(
                &raw_means,
                &self.settings.baseline,
                &self.settings.band_weights,
            ),
        };

        info!(
            file = %path.display(),
            strategy = ?self.settings.strategy,
            calmness,
            bpm = %bpm,
            "Computed target tempo"
        );

        self.complete(bpm, wave, songs).await
    }

    /// Recommendation for posted band powers, using the weighted z-score mapping
    pub async fn recommend_from_bands(
        &self,
        bands: &BandPowers,
        songs: Option<usize>,
    ) -> Result<Recommendation, RecommendError> {
        let normalized = feature_extractor::normalize(bands);
        let calmness = score_engine::calmness_score(&normalized, &self.settings.calmness_weights);
        let wave = WaveSummary::from_normalized(&normalized, calmness);
        let bpm = tempo_mapper::weighted_zscore_bpm(
            bands,
            &self.settings.baseline,
            &self.settings.band_weights,
        );

        info!(bpm = %bpm, "Computed target tempo from posted band powers");
        self.complete(bpm, wave, songs).await
    }

    /// Legacy beta/gamma stress assessment of the current upload
    pub async fn stress_assessment(&self) -> Result<StressAssessment, RecommendError> {
        let path = self.current_upload().await?;
        let table = Self::load_table(path).await?;
        let sums = feature_extractor::channel_sums(&table)?;
        let assessment = score_engine::assess_stress(&sums);
        debug!(
            score = assessment.stress_score,
            level = ?assessment.stress_level,
            "Stress assessed"
        );
        Ok(assessment)
    }

    async fn complete(
        &self,
        bpm: Bpm,
        wave: WaveSummary,
        songs: Option<usize>,
    ) -> Result<Recommendation, RecommendError> {
        let genre = self.request_genre(bpm, &wave).await?;
        let songs = self.request_songs(bpm, &genre, songs).await?;

        info!(bpm = %bpm, genre = %genre, songs = songs.len(), "Recommendation ready");
        self.event_bus.emit_lossy(NeuroEvent::RecommendationReady {
            bpm: bpm.value(),
            genre: genre.clone(),
            song_count: songs.len(),
            timestamp: Utc::now(),
        });

        Ok(Recommendation {
            bpm,
            genre,
            wave_data: wave,
            songs,
        })
    }

    async fn request_genre(&self, bpm: Bpm, wave: &WaveSummary) -> Result<String, RecommendError> {
        let prompt = prompts::genre_prompt(bpm, wave);
        let gateway = self.gateway.current().await;

        let reply = match call_with_timeout(
            self.settings.gateway_timeout,
            gateway.generate_text(&prompt, None),
        )
        .await
        {
            Ok(reply) => reply,
            Err(e @ GatewayError::Timeout(_)) => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "Genre request failed");
                return Err(RecommendError::GenreUnavailable {
                    reason: e.to_string(),
                    raw: String::new(),
                });
            }
        };

        prompts::parse_genre(&reply).ok_or_else(|| RecommendError::GenreUnavailable {
            reason: "empty genre reply".to_string(),
            raw: reply,
        })
    }

    async fn request_songs(
        &self,
        bpm: Bpm,
        genre: &str,
        requested: Option<usize>,
    ) -> Result<Vec<Song>, RecommendError> {
        let batches = self.settings.batches_for(requested);
        let batch_size = self.settings.song_batch_size;
        let mut songs: Vec<Song> = Vec::new();

        for batch in 0..batches {
            let prompt = prompts::songs_prompt(bpm, genre, batch_size, &songs);
            let gateway = self.gateway.current().await;
            let reply = call_with_timeout(
                self.settings.gateway_timeout,
                gateway.generate_text(&prompt, None),
            )
            .await?;

            let parsed = prompts::parse_songs(&reply).map_err(|reason| {
                warn!(batch, reason = %reason, "Song batch reply was malformed");
                RecommendError::MalformedUpstream {
                    reason,
                    raw: reply.clone(),
                }
            })?;
            debug!(batch, received = parsed.len(), "Song batch parsed");
            songs.extend(parsed);
        }

        if let Some(limit) = requested {
            songs.truncate(limit);
        }
        Ok(songs)
    }
}
