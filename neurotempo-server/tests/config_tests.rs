//! Provider key resolution: Database → ENV → TOML
//!
//! Tests touching GEMINI_API_KEY / YOUTUBE_API_KEY run under #[serial] so
//! environment changes do not race.

mod helpers;

use helpers::test_db;
use neurotempo_common::config::TomlConfig;
use neurotempo_server::config::{
    resolve_gemini_api_key, resolve_youtube_api_key, GEMINI_API_KEY_ENV, YOUTUBE_API_KEY_ENV,
};
use neurotempo_server::db::settings::{set_gemini_api_key, set_youtube_api_key};
use serial_test::serial;

fn toml_with_keys(gemini: Option<&str>, youtube: Option<&str>) -> TomlConfig {
    TomlConfig {
        gemini_api_key: gemini.map(str::to_string),
        youtube_api_key: youtube.map(str::to_string),
        ..Default::default()
    }
}

#[tokio::test]
#[serial]
async fn database_overrides_env_and_toml() {
    let pool = test_db().await;
    set_gemini_api_key(&pool, "db-key".to_string()).await.unwrap();
    std::env::set_var(GEMINI_API_KEY_ENV, "env-key");

    let key = resolve_gemini_api_key(&pool, &toml_with_keys(Some("toml-key"), None))
        .await
        .unwrap();
    assert_eq!(key.as_deref(), Some("db-key"));

    std::env::remove_var(GEMINI_API_KEY_ENV);
}

#[tokio::test]
#[serial]
async fn env_used_when_database_empty() {
    let pool = test_db().await;
    std::env::set_var(GEMINI_API_KEY_ENV, "env-key");

    let key = resolve_gemini_api_key(&pool, &toml_with_keys(Some("toml-key"), None))
        .await
        .unwrap();
    assert_eq!(key.as_deref(), Some("env-key"));

    std::env::remove_var(GEMINI_API_KEY_ENV);
}

#[tokio::test]
#[serial]
async fn toml_used_when_database_and_env_empty() {
    let pool = test_db().await;
    std::env::remove_var(YOUTUBE_API_KEY_ENV);

    let key = resolve_youtube_api_key(&pool, &toml_with_keys(None, Some("toml-yt")))
        .await
        .unwrap();
    assert_eq!(key.as_deref(), Some("toml-yt"));
}

#[tokio::test]
#[serial]
async fn blank_values_are_skipped() {
    let pool = test_db().await;
    set_youtube_api_key(&pool, "   ".to_string()).await.unwrap();
    std::env::set_var(YOUTUBE_API_KEY_ENV, "");

    let key = resolve_youtube_api_key(&pool, &toml_with_keys(None, Some("toml-yt")))
        .await
        .unwrap();
    assert_eq!(key.as_deref(), Some("toml-yt"));

    std::env::remove_var(YOUTUBE_API_KEY_ENV);
}

#[tokio::test]
#[serial]
async fn missing_everywhere_is_none() {
    let pool = test_db().await;
    std::env::remove_var(GEMINI_API_KEY_ENV);
    std::env::remove_var(YOUTUBE_API_KEY_ENV);

    let config = TomlConfig::default();
    assert!(resolve_gemini_api_key(&pool, &config).await.unwrap().is_none());
    assert!(resolve_youtube_api_key(&pool, &config).await.unwrap().is_none());
}
