//! Single-flight analysis session and mental-state history
//!
//! One `SessionManager` owns all session state for the process:
//! - the active session (at most one; `None` means Idle)
//! - the latest `MentalState` and a bounded FIFO history
//!
//! Start/stop check-and-set happens under one mutex, so concurrent starts
//! yield exactly one Running transition. Analyze calls are serialized by a
//! second lock held across the gateway round trip; history append, eviction
//! and the current-state update commit together.

use crate::models::{AnalysisResult, MentalState, Session, SessionSnapshot, SessionState};
use crate::services::capture::{CaptureHandle, CaptureLoop};
use crate::services::classifier::{build_prompt, classify_reply, ParsePath};
use crate::services::gateway::{call_with_timeout, GatewayError, SharedGateway};
use chrono::Utc;
use neurotempo_common::events::{EventBus, NeuroEvent};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Start requested while a session is Running
    #[error("Session already running: {0}")]
    AlreadyRunning(String),

    /// Analyze requested while Idle
    #[error("No active session")]
    NotActive,

    #[error("Capture loop failed to start: {0}")]
    Capture(String),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Tunables for [`SessionManager`]
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub history_capacity: usize,
    pub gateway_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            history_capacity: 20,
            gateway_timeout: Duration::from_secs(60),
        }
    }
}

struct ActiveSession {
    id: String,
    capture: Option<CaptureHandle>,
}

#[derive(Default)]
struct Inner {
    session: Option<ActiveSession>,
    current: Option<MentalState>,
    history: VecDeque<MentalState>,
}

pub struct SessionManager {
    inner: Mutex<Inner>,
    analysis_lock: Mutex<()>,
    gateway: SharedGateway,
    capture: Arc<dyn CaptureLoop>,
    event_bus: EventBus,
    settings: SessionSettings,
}

impl SessionManager {
    pub fn new(
        gateway: SharedGateway,
        capture: Arc<dyn CaptureLoop>,
        event_bus: EventBus,
        settings: SessionSettings,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            analysis_lock: Mutex::new(()),
            gateway,
            capture,
            event_bus,
            settings: SessionSettings {
                history_capacity: settings.history_capacity.max(1),
                ..settings
            },
        }
    }

    /// Idle → Running
    ///
    /// A blank or missing id is replaced by a fresh UUID. Fails with
    /// `AlreadyRunning` (and changes nothing) if a session is active.
    pub async fn start(&self, requested_id: Option<String>) -> Result<Session, SessionError> {
        let mut inner = self.inner.lock().await;

        if let Some(active) = &inner.session {
            debug!(session_id = %active.id, "Start rejected, session already running");
            return Err(SessionError::AlreadyRunning(active.id.clone()));
        }

        let id = requested_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let capture = self
            .capture
            .spawn(&id, CancellationToken::new())
            .map_err(|e| SessionError::Capture(e.to_string()))?;

        inner.session = Some(ActiveSession {
            id: id.clone(),
            capture: Some(capture),
        });
        drop(inner);

        info!(session_id = %id, "Session started");
        self.event_bus.emit_lossy(NeuroEvent::SessionStarted {
            session_id: id.clone(),
            timestamp: Utc::now(),
        });

        Ok(Session {
            id,
            state: SessionState::Running,
        })
    }

    /// Running → Idle; a no-op while Idle
    ///
    /// Returns the id of the session that was stopped, if any.
    pub async fn stop(&self) -> Option<String> {
        let active = self.inner.lock().await.session.take();
        self.finish(active)
    }

    /// Stop only if `session_id` is still the active session
    ///
    /// Used on connection teardown so a disconnect cannot end a session
    /// some other client started later.
    pub async fn stop_if(&self, session_id: &str) -> bool {
        let active = {
            let mut inner = self.inner.lock().await;
            let owned = inner
                .session
                .as_ref()
                .is_some_and(|active| active.id == session_id);
            if owned {
                inner.session.take()
            } else {
                None
            }
        };
        self.finish(active).is_some()
    }

    fn finish(&self, active: Option<ActiveSession>) -> Option<String> {
        let Some(mut active) = active else {
            debug!("Stop requested while idle");
            return None;
        };

        if let Some(capture) = active.capture.take() {
            capture.stop();
        }

        info!(session_id = %active.id, "Session stopped");
        self.event_bus.emit_lossy(NeuroEvent::SessionStopped {
            session_id: active.id.clone(),
            timestamp: Utc::now(),
        });
        Some(active.id)
    }

    /// Classify `text` (and optionally `image`) while Running
    ///
    /// Calls are serialized. A call admitted while Running commits its
    /// result even if the session stops during the gateway round trip.
    pub async fn analyze_input(
        &self,
        text: Option<&str>,
        image: Option<&str>,
    ) -> Result<AnalysisResult, SessionError> {
        let _serialized = self.analysis_lock.lock().await;

        let session_id = self
            .inner
            .lock()
            .await
            .session
            .as_ref()
            .map(|s| s.id.clone())
            .ok_or(SessionError::NotActive)?;

        if image.is_some() {
            debug!(session_id = %session_id, "Image attached; classification uses text only");
        }

        let prompt = build_prompt(text);
        let gateway = self.gateway.current().await;
        let reply = call_with_timeout(
            self.settings.gateway_timeout,
            gateway.generate_classification(&prompt),
        )
        .await?;

        let classification = classify_reply(&reply);
        if classification.path == ParsePath::Keyword {
            warn!(session_id = %session_id, "Classification reply was not JSON, used keyword fallback");
        }

        let state = MentalState {
            kind: classification.kind,
            confidence: classification.confidence,
            description: classification.description,
            timestamp: neurotempo_common::time::now_iso8601(),
        };

        {
            let mut inner = self.inner.lock().await;
            inner.history.push_back(state.clone());
            while inner.history.len() > self.settings.history_capacity {
                inner.history.pop_front();
            }
            inner.current = Some(state.clone());
        }

        info!(
            session_id = %session_id,
            state = %state.kind,
            confidence = state.confidence,
            "Mental state updated"
        );
        self.event_bus.emit_lossy(NeuroEvent::MentalStateUpdated {
            state: state.kind.to_string(),
            confidence: state.confidence,
            description: state.description.clone(),
            timestamp: Utc::now(),
        });

        Ok(AnalysisResult {
            confidence: state.confidence,
            mental_state: Some(state),
            analysis: classification.analysis,
        })
    }

    /// Latest mental state, `None` before the first analysis
    pub async fn current_state(&self) -> Option<MentalState> {
        self.inner.lock().await.current.clone()
    }

    /// History, oldest first
    pub async fn history(&self) -> Vec<MentalState> {
        self.inner.lock().await.history.iter().cloned().collect()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        match &self.inner.lock().await.session {
            Some(active) => SessionSnapshot {
                session_id: Some(active.id.clone()),
                state: SessionState::Running,
            },
            None => SessionSnapshot::idle(),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.session.is_some()
    }

    pub fn history_capacity(&self) -> usize {
        self.settings.history_capacity
    }
}
