//! Live capture loop run alongside an analysis session
//!
//! The loop runs on its own OS thread so a long capture never occupies the
//! async runtime. It stops contributing as soon as its token is cancelled.

use chrono::Utc;
use neurotempo_common::events::{EventBus, NeuroEvent};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Longest single sleep, bounding how late a cancellation is noticed
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Something that can run for the lifetime of a session
pub trait CaptureLoop: Send + Sync {
    /// Start capturing for `session_id` until `cancel` fires
    fn spawn(&self, session_id: &str, cancel: CancellationToken) -> std::io::Result<CaptureHandle>;
}

/// Running capture loop
pub struct CaptureHandle {
    cancel: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl CaptureHandle {
    pub fn new(cancel: CancellationToken, thread: Option<JoinHandle<()>>) -> Self {
        Self { cancel, thread }
    }

    /// Cancel and detach; never blocks and never fails
    pub fn stop(mut self) {
        self.cancel.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.is_finished() {
                if thread.join().is_err() {
                    warn!("Capture thread had panicked before stop");
                }
            } else {
                debug!("Capture thread detached, exits on next poll");
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Emits a `CaptureHeartbeat` event every interval
pub struct HeartbeatCapture {
    event_bus: EventBus,
    interval: Duration,
}

impl HeartbeatCapture {
    pub fn new(event_bus: EventBus, interval: Duration) -> Self {
        Self {
            event_bus,
            interval: interval.max(Duration::from_millis(1)),
        }
    }
}

/// Sleep for `total`, waking early on cancellation; true if cancelled
fn sleep_unless_cancelled(total: Duration, cancel: &CancellationToken) -> bool {
    let mut remaining = total;
    while !remaining.is_zero() {
        if cancel.is_cancelled() {
            return true;
        }
        let step = remaining.min(CANCEL_POLL);
        std::thread::sleep(step);
        remaining -= step;
    }
    cancel.is_cancelled()
}

impl CaptureLoop for HeartbeatCapture {
    fn spawn(&self, session_id: &str, cancel: CancellationToken) -> std::io::Result<CaptureHandle> {
        let event_bus = self.event_bus.clone();
        let interval = self.interval;
        let session_id = session_id.to_string();
        let thread_cancel = cancel.clone();

        let thread = std::thread::Builder::new()
            .name(format!("capture-{}", session_id))
            .spawn(move || {
                info!(session_id = %session_id, "Capture loop started");
                let mut tick: u64 = 0;
                while !sleep_unless_cancelled(interval, &thread_cancel) {
                    tick += 1;
                    event_bus.emit_lossy(NeuroEvent::CaptureHeartbeat {
                        session_id: session_id.clone(),
                        tick,
                        timestamp: Utc::now(),
                    });
                }
                info!(session_id = %session_id, ticks = tick, "Capture loop stopped");
            })?;

        Ok(CaptureHandle::new(cancel, Some(thread)))
    }
}
