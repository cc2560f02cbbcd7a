//! Server-Sent Events stream of service events

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /events
///
/// Streams every `NeuroEvent`: session lifecycle, mental-state updates,
/// finished recommendations, uploads and capture heartbeats.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    neurotempo_common::sse::create_event_sse_stream("neurotempo-server", &state.event_bus, |_| true)
}
