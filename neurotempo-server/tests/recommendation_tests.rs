//! Recommendation pipeline tests against the orchestrator

mod helpers;

use helpers::*;
use neurotempo_common::config::{RecommendationConfig, TempoStrategyName, TomlConfig};
use neurotempo_common::events::NeuroEvent;
use neurotempo_server::models::{BandPowers, Bpm};
use neurotempo_server::services::tempo_mapper::{
    calmness_bpm_raw, zscore_bpm_raw, CALMNESS_BPM_MAX, CALMNESS_BPM_MIN, ZSCORE_BPM_MAX,
    ZSCORE_BPM_MIN,
};
use neurotempo_server::services::{EegTable, FeatureError, RecommendError};
use std::io::Write;
use std::time::Duration;

fn song_batch(prefix: &str) -> String {
    let songs: Vec<serde_json::Value> = (0..4)
        .map(|i| serde_json::json!({"title": format!("{} {}", prefix, i), "artist": "Artist"}))
        .collect();
    serde_json::Value::Array(songs).to_string()
}

#[tokio::test]
async fn song_count_requests_ceil_batches() {
    let app = test_app(ScriptedGateway::replies([
        "Ambient".to_string(),
        song_batch("a"),
        song_batch("b"),
    ]))
    .await;
    app.upload("rec.csv", RELATIVE_POWER_CSV).await;

    let recommendation = app.state.recommender.recommend(Some(6)).await.unwrap();

    assert_eq!(app.gateway.calls(), 3);
    assert_eq!(recommendation.songs.len(), 6);
    assert_eq!(recommendation.songs[4].title.as_deref(), Some("b 0"));

    let prompts = app.gateway.prompts();
    assert!(prompts[2].contains("Do not repeat any of these"));
    assert!(prompts[2].contains("a 3 by Artist"));
}

#[tokio::test]
async fn later_batch_failure_aborts_whole_request() {
    let app = test_app(ScriptedGateway::replies([
        "Ambient".to_string(),
        song_batch("a"),
        "no json here".to_string(),
    ]))
    .await;
    app.upload("rec.csv", RELATIVE_POWER_CSV).await;

    let err = app.state.recommender.recommend(Some(8)).await.unwrap_err();
    match err {
        RecommendError::MalformedUpstream { raw, .. } => assert_eq!(raw, "no json here"),
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn weighted_zscore_strategy_from_config() {
    let config = TomlConfig {
        recommendation: RecommendationConfig {
            tempo_strategy: TempoStrategyName::WeightedZscore,
            ..Default::default()
        },
        ..Default::default()
    };
    let app = test_app_with_config(ScriptedGateway::replies(["House", "[]"]), config).await;
    app.upload("rec.csv", RELATIVE_POWER_CSV).await;

    let recommendation = app.state.recommender.recommend(None).await.unwrap();
    // Relative powers are far below the baseline of 20, so the score is negative
    match recommendation.bpm {
        Bpm::Whole(bpm) => assert!((60..120).contains(&bpm)),
        other => panic!("expected whole BPM, got {:?}", other),
    }
}

#[tokio::test]
async fn recommendation_ready_event_is_emitted() {
    let app = test_app(ScriptedGateway::replies(["Jazz".to_string(), song_batch("j")])).await;
    let mut rx = app.state.event_bus.subscribe();

    let bands = BandPowers {
        delta: 20.0,
        theta: 20.0,
        alpha: 20.0,
        beta: 20.0,
        gamma: 20.0,
    };
    app.state
        .recommender
        .recommend_from_bands(&bands, None)
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        NeuroEvent::RecommendationReady {
            bpm,
            genre,
            song_count,
            ..
        } => {
            assert_eq!(bpm, 120.0);
            assert_eq!(genre, "Jazz");
            assert_eq!(song_count, 4);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn unreadable_file_is_reported() {
    let app = test_app(ScriptedGateway::repeating("Ambient")).await;
    app.state
        .uploads
        .register(app.root.path().join("missing.csv"))
        .await;

    let err = app.state.recommender.recommend(None).await.unwrap_err();
    assert!(matches!(err, RecommendError::Feature(FeatureError::Unreadable(_))));
}

#[test]
fn table_with_blank_and_text_cells_reads_as_zero() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "ch0_alpha_rel_power,ch1_alpha_rel_power,ch0_beta_rel_power\n,n/a,0.6\n"
    )
    .unwrap();

    let table = EegTable::from_path(file.path()).unwrap();
    let means = neurotempo_server::services::feature_extractor::relative_power_means(&table).unwrap();
    assert_eq!(means.alpha, 0.0);
    assert!((means.beta - 0.6).abs() < 1e-12);
    assert_eq!(means.theta, 0.0);
}

#[test]
fn both_tempo_mappings_are_monotonic_and_bounded() {
    let scores: Vec<f64> = (-400..=400).map(|i| i as f64 / 20.0).collect();

    for pair in scores.windows(2) {
        let (lo, hi) = (zscore_bpm_raw(pair[0]), zscore_bpm_raw(pair[1]));
        assert!(lo <= hi);
        assert!((ZSCORE_BPM_MIN..=ZSCORE_BPM_MAX).contains(&lo));

        let (lo, hi) = (calmness_bpm_raw(pair[0]), calmness_bpm_raw(pair[1]));
        assert!(lo <= hi);
        assert!((CALMNESS_BPM_MIN..=CALMNESS_BPM_MAX).contains(&lo));
    }

    // Strict increase where the curve is not saturated
    assert!(zscore_bpm_raw(0.1) > zscore_bpm_raw(0.0));
    assert!(calmness_bpm_raw(1.1) > calmness_bpm_raw(1.0));
}
