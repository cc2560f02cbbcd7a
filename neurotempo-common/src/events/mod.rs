//! Event types for the NeuroTempo event system
//!
//! Provides shared event definitions and the broadcast EventBus that feeds
//! the SSE stream and any in-process listeners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// NeuroTempo event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum NeuroEvent {
    /// An analysis session transitioned Idle → Running
    SessionStarted {
        session_id: String,
        timestamp: DateTime<Utc>,
    },

    /// An analysis session transitioned Running → Idle
    SessionStopped {
        session_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A new mental state was appended to history
    ///
    /// Triggers:
    /// - SSE: Update the live mental-state panel
    MentalStateUpdated {
        /// Classified state (e.g. "Relaxed")
        state: String,
        /// Confidence 0-100
        confidence: u8,
        /// Short description or truncated raw analysis
        description: String,
        timestamp: DateTime<Utc>,
    },

    /// A recommendation finished successfully
    RecommendationReady {
        bpm: f64,
        genre: String,
        song_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A recording was uploaded and became the current upload
    UploadRegistered {
        filename: String,
        timestamp: DateTime<Utc>,
    },

    /// Capture loop liveness tick (emitted from the capture thread)
    CaptureHeartbeat {
        session_id: String,
        tick: u64,
        timestamp: DateTime<Utc>,
    },
}

impl NeuroEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            NeuroEvent::SessionStarted { .. } => "SessionStarted",
            NeuroEvent::SessionStopped { .. } => "SessionStopped",
            NeuroEvent::MentalStateUpdated { .. } => "MentalStateUpdated",
            NeuroEvent::RecommendationReady { .. } => "RecommendationReady",
            NeuroEvent::UploadRegistered { .. } => "UploadRegistered",
            NeuroEvent::CaptureHeartbeat { .. } => "CaptureHeartbeat",
        }
    }

    /// Whether the event belongs to the live analysis session stream
    pub fn is_session_event(&self) -> bool {
        matches!(
            self,
            NeuroEvent::SessionStarted { .. }
                | NeuroEvent::SessionStopped { .. }
                | NeuroEvent::MentalStateUpdated { .. }
                | NeuroEvent::CaptureHeartbeat { .. }
        )
    }
}

/// Central event distribution bus
///
/// Wraps `tokio::sync::broadcast`:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// Cloning is cheap; clones publish into the same channel.
///
/// # Examples
///
/// ```
/// use neurotempo_common::events::{EventBus, NeuroEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(NeuroEvent::SessionStarted {
///     session_id: "abc".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<NeuroEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<NeuroEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: NeuroEvent,
    ) -> Result<usize, broadcast::error::SendError<NeuroEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: NeuroEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
