//! Session state machine and analysis history tests

mod helpers;

use axum::http::StatusCode;
use helpers::*;
use neurotempo_common::events::NeuroEvent;
use neurotempo_server::models::{MentalStateKind, SessionState};
use neurotempo_server::services::{GatewayError, SessionError};
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use tokio::task::JoinSet;
use tower::ServiceExt;

const RELAXED_REPLY: &str =
    r#"```json
{"mentalState": "Relaxed", "confidence": 88, "analysis": "Slow breathing, calm language."}
```"#;

#[tokio::test]
async fn concurrent_starts_yield_one_running_session() {
    let app = test_app(ScriptedGateway::repeating(RELAXED_REPLY)).await;
    let sessions = app.state.sessions.clone();

    let mut tasks = JoinSet::new();
    for i in 0..16 {
        let sessions = sessions.clone();
        tasks.spawn(async move { sessions.start(Some(format!("s{}", i))).await });
    }

    let mut started = Vec::new();
    let mut rejected = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(session) => started.push(session.id),
            Err(SessionError::AlreadyRunning(_)) => rejected += 1,
            Err(other) => panic!("unexpected error {:?}", other),
        }
    }

    assert_eq!(started.len(), 1);
    assert_eq!(rejected, 15);

    let snapshot = sessions.snapshot().await;
    assert_eq!(snapshot.state, SessionState::Running);
    assert_eq!(snapshot.session_id.as_deref(), Some(started[0].as_str()));
}

#[tokio::test]
async fn stop_twice_is_idle_both_times() {
    let app = test_app(ScriptedGateway::repeating(RELAXED_REPLY)).await;
    let sessions = &app.state.sessions;

    sessions.start(None).await.unwrap();
    assert!(sessions.stop().await.is_some());
    assert!(!sessions.is_running().await);

    assert!(sessions.stop().await.is_none());
    assert!(!sessions.is_running().await);
}

#[tokio::test]
async fn analyze_while_idle_leaves_history_unchanged() {
    let app = test_app(ScriptedGateway::repeating(RELAXED_REPLY)).await;
    let sessions = &app.state.sessions;

    let err = sessions.analyze_input(Some("hello"), None).await.unwrap_err();
    assert!(matches!(err, SessionError::NotActive));
    assert!(sessions.history().await.is_empty());
    assert!(sessions.current_state().await.is_none());
    assert_eq!(app.gateway.calls(), 0);
}

#[tokio::test]
async fn history_keeps_twenty_most_recent() {
    let replies: Vec<String> = (0..25)
        .map(|i| {
            json!({"mentalState": "Focused", "confidence": i, "analysis": format!("entry {}", i)})
                .to_string()
        })
        .collect();
    let app = test_app(ScriptedGateway::replies(replies)).await;
    let sessions = &app.state.sessions;

    sessions.start(None).await.unwrap();
    for i in 0..25 {
        sessions
            .analyze_input(Some(&format!("input {}", i)), None)
            .await
            .unwrap();
    }

    let history = sessions.history().await;
    assert_eq!(history.len(), 20);
    let confidences: Vec<u8> = history.iter().map(|s| s.confidence).collect();
    assert_eq!(confidences, (5..25).collect::<Vec<u8>>());

    let current = sessions.current_state().await.unwrap();
    assert_eq!(current.confidence, 24);
    assert_eq!(current.description, "entry 24");
}

#[tokio::test]
async fn concurrent_analyze_calls_are_serialized() {
    let gateway = ScriptedGateway::repeating(RELAXED_REPLY).with_delay(Duration::from_millis(20));
    let app = test_app(gateway).await;
    let sessions = app.state.sessions.clone();
    sessions.start(None).await.unwrap();

    let mut tasks = JoinSet::new();
    for i in 0..8 {
        let sessions = sessions.clone();
        tasks.spawn(async move {
            sessions
                .analyze_input(Some(&format!("snippet {}", i)), None)
                .await
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    assert_eq!(app.gateway.calls(), 8);
    let history = sessions.history().await;
    assert_eq!(history.len(), 8);

    let timestamps: HashSet<&str> = history.iter().map(|s| s.timestamp.as_str()).collect();
    assert_eq!(timestamps.len(), 8);
    let mut sorted: Vec<&str> = history.iter().map(|s| s.timestamp.as_str()).collect();
    sorted.sort();
    assert_eq!(
        sorted,
        history.iter().map(|s| s.timestamp.as_str()).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn fallback_prefers_distress_keywords() {
    let reply = "The writer sounds calm on the surface but mentions stress about deadlines.";
    let app = test_app(ScriptedGateway::replies([reply])).await;
    let sessions = &app.state.sessions;
    sessions.start(None).await.unwrap();

    let result = sessions.analyze_input(Some("deadlines"), None).await.unwrap();
    let state = result.mental_state.unwrap();
    assert_eq!(state.kind, MentalStateKind::Distressed);
    assert_eq!(state.confidence, 75);
    assert_eq!(result.confidence, 75);
    assert!(state.description.ends_with("..."));
    assert_eq!(result.analysis, reply);
}

#[tokio::test]
async fn gateway_failure_surfaces_and_keeps_history() {
    let app = test_app(ScriptedGateway::new([
        Ok(RELAXED_REPLY.to_string()),
        Err(GatewayError::Connection("reset by peer".to_string())),
    ]))
    .await;
    let sessions = &app.state.sessions;
    sessions.start(None).await.unwrap();

    sessions.analyze_input(Some("first"), None).await.unwrap();
    let err = sessions.analyze_input(Some("second"), None).await.unwrap_err();
    assert!(matches!(err, SessionError::Gateway(_)));

    assert_eq!(sessions.history().await.len(), 1);
    assert!(sessions.is_running().await);
}

#[tokio::test]
async fn stop_if_ignores_other_sessions() {
    let app = test_app(ScriptedGateway::repeating(RELAXED_REPLY)).await;
    let sessions = &app.state.sessions;

    sessions.start(Some("first".to_string())).await.unwrap();
    sessions.stop().await;
    sessions.start(Some("second".to_string())).await.unwrap();

    assert!(!sessions.stop_if("first").await);
    assert!(sessions.is_running().await);
    assert!(sessions.stop_if("second").await);
    assert!(!sessions.is_running().await);
}

#[tokio::test]
async fn lifecycle_events_are_broadcast() {
    let app = test_app(ScriptedGateway::repeating(RELAXED_REPLY)).await;
    let mut rx = app.state.event_bus.subscribe();
    let sessions = &app.state.sessions;

    sessions.start(Some("evt".to_string())).await.unwrap();
    sessions.analyze_input(Some("hi"), None).await.unwrap();
    sessions.stop().await;

    let mut kinds = Vec::new();
    for _ in 0..3 {
        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        kinds.push(event.event_type());
        if let NeuroEvent::MentalStateUpdated { state, confidence, .. } = &event {
            assert_eq!(state, "Relaxed");
            assert_eq!(*confidence, 88);
        }
    }
    assert_eq!(kinds, vec!["SessionStarted", "MentalStateUpdated", "SessionStopped"]);
}

#[tokio::test]
async fn session_endpoints_round_trip() {
    let app = test_app(ScriptedGateway::repeating(RELAXED_REPLY)).await;
    let router = app.router();

    let body = body_json(router.clone().oneshot(get("/api/mental-state")).await.unwrap()).await;
    assert_eq!(body, json!({"mentalState": null}));

    let response = router
        .clone()
        .oneshot(post_json("/api/analyze", json!({"text": "hello"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"]["code"], "SESSION_NOT_ACTIVE");

    let response = router
        .clone()
        .oneshot(post_json("/api/session/start", json!({"sessionId": "web-1"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"sessionId": "web-1", "status": "started"})
    );

    let response = router
        .clone()
        .oneshot(post_empty("/api/session/start"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(router.clone().oneshot(get("/api/session")).await.unwrap()).await;
    assert_eq!(body, json!({"sessionId": "web-1", "state": "running"}));

    let response = router
        .clone()
        .oneshot(post_json("/api/analyze", json!({"text": "I feel calm", "image": "aGk="})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["mentalState"]["type"], "Relaxed");
    assert_eq!(body["confidence"], 88);
    assert_eq!(body["analysis"], "Slow breathing, calm language.");

    let body = body_json(router.clone().oneshot(get("/api/mental-state/history")).await.unwrap()).await;
    assert_eq!(body["history"].as_array().unwrap().len(), 1);

    for _ in 0..2 {
        let response = router
            .clone()
            .oneshot(post_empty("/api/session/stop"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "stopped"}));
    }

    let body = body_json(router.oneshot(get("/api/session")).await.unwrap()).await;
    assert_eq!(body, json!({"sessionId": null, "state": "idle"}));
}

#[tokio::test]
async fn malformed_start_body_is_rejected_without_starting() {
    let app = test_app(ScriptedGateway::repeating(RELAXED_REPLY)).await;
    let router = app.router();

    for body in [r#"{"sessionId": "#, r#"{"sessionId": 42}"#, "start please"] {
        let response = router
            .clone()
            .oneshot(post_raw("/api/session/start", Some("application/json"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
    }

    let body = body_json(router.clone().oneshot(get("/api/session")).await.unwrap()).await;
    assert_eq!(body, json!({"sessionId": null, "state": "idle"}));

    let response = router
        .oneshot(post_raw("/api/session/start", None, "  \n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.state.sessions.is_running().await);
}
