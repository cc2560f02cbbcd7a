//! Settings API: POST provider keys

mod helpers;

use axum::http::StatusCode;
use helpers::*;
use neurotempo_common::config::load_toml_config;
use neurotempo_server::db::settings::{get_gemini_api_key, get_youtube_api_key};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn gemini_key_is_saved_applied_and_synced() {
    let app = test_app(ScriptedGateway::replies(Vec::<String>::new())).await;
    assert_eq!(app.state.gateway.current().await.name(), "scripted");

    let response = app
        .router()
        .oneshot(post_json(
            "/api/settings/gemini_api_key",
            json!({"api_key": "  gm-123  "}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);

    assert_eq!(
        get_gemini_api_key(&app.state.db).await.unwrap().as_deref(),
        Some("gm-123")
    );

    let gateway = app.state.gateway.current().await;
    assert_eq!(gateway.name(), "gemini");
    assert!(gateway.is_configured());

    let toml = load_toml_config(&app.state.toml_path).unwrap();
    assert_eq!(toml.gemini_api_key.as_deref(), Some("gm-123"));
}

#[tokio::test]
async fn youtube_key_is_saved_and_applied() {
    let app = test_app(ScriptedGateway::replies(Vec::<String>::new())).await;
    assert!(!app.state.youtube.is_configured().await);

    let response = app
        .router()
        .oneshot(post_json(
            "/api/settings/youtube_api_key",
            json!({"api_key": "yt-456"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        get_youtube_api_key(&app.state.db).await.unwrap().as_deref(),
        Some("yt-456")
    );
    assert!(app.state.youtube.is_configured().await);

    let toml = load_toml_config(&app.state.toml_path).unwrap();
    assert_eq!(toml.youtube_api_key.as_deref(), Some("yt-456"));
    assert!(toml.gemini_api_key.is_none());
}

#[tokio::test]
async fn existing_toml_settings_survive_sync() {
    let app = test_app(ScriptedGateway::replies(Vec::<String>::new())).await;
    std::fs::write(&app.state.toml_path, "port = 9100\n\n[logging]\nlevel = \"debug\"\n").unwrap();

    let response = app
        .router()
        .oneshot(post_json(
            "/api/settings/youtube_api_key",
            json!({"api_key": "yt-789"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let toml = load_toml_config(&app.state.toml_path).unwrap();
    assert_eq!(toml.port, Some(9100));
    assert_eq!(toml.logging.level, "debug");
    assert_eq!(toml.youtube_api_key.as_deref(), Some("yt-789"));
}

#[tokio::test]
async fn blank_key_is_rejected() {
    let app = test_app(ScriptedGateway::replies(Vec::<String>::new())).await;

    for uri in ["/api/settings/gemini_api_key", "/api/settings/youtube_api_key"] {
        let response = app
            .router()
            .oneshot(post_json(uri, json!({"api_key": " \t "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
    }

    assert!(get_gemini_api_key(&app.state.db).await.unwrap().is_none());
    assert!(!app.state.toml_path.exists());
    assert_eq!(app.state.gateway.current().await.name(), "scripted");
}
