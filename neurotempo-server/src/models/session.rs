//! Analysis session lifecycle

use serde::{Deserialize, Serialize};

/// Session state machine
///
/// Idle → Running via start, Running → Idle via stop or owner disconnect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Idle,
    Running,
}

/// The single process-wide session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub state: SessionState,
}

/// Read-only view returned by `GET /api/session`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Option<String>,
    pub state: SessionState,
}

impl SessionSnapshot {
    pub fn idle() -> Self {
        Self {
            session_id: None,
            state: SessionState::Idle,
        }
    }
}
