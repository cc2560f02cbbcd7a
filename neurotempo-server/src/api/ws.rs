//! WebSocket push channel for analysis sessions
//!
//! Clients send JSON messages tagged by `type`:
//! - `{"type":"analyze","text"?,"image"?}` → analysis result
//! - `{"type":"startSession","sessionId"?}` → `{"status":"started","sessionId"}`
//! - `{"type":"stopSession"}` → `{"status":"stopped"}`
//!
//! Failures reply `{"status":"error","error":...}` and the connection stays
//! open. A connection that started a session stops it on disconnect, unless
//! the session has since been replaced.

use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Outgoing queue depth per connection
const OUTGOING_BUFFER: usize = 32;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Analyze {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        image: Option<String>,
    },
    StartSession {
        #[serde(default, rename = "sessionId")]
        session_id: Option<String>,
    },
    StopSession,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReply {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl StatusReply {
    fn ok(status: &'static str) -> Self {
        Self {
            status,
            session_id: None,
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            session_id: None,
            error: Some(message.into()),
        }
    }
}

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    debug!("WebSocket connected");

    let (ws_sink, ws_stream) = socket.split();
    let (outgoing_tx, outgoing_rx) = mpsc::channel::<Value>(OUTGOING_BUFFER);
    let outgoing_handle = tokio::spawn(forward_outgoing(ws_sink, outgoing_rx));

    let owned_session = process_incoming(ws_stream, &outgoing_tx, &state).await;

    debug!("WebSocket disconnected");
    drop(outgoing_tx);
    outgoing_handle.abort();

    if let Some(session_id) = owned_session {
        if state.sessions.stop_if(&session_id).await {
            info!(session_id = %session_id, "Session stopped after its connection closed");
        }
    }
}

/// Forward queued replies to the socket
async fn forward_outgoing(
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outgoing_rx: mpsc::Receiver<Value>,
) {
    while let Some(reply) = outgoing_rx.recv().await {
        match serde_json::to_string(&reply) {
            Ok(json) => {
                if ws_sink.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            Err(e) => error!("Failed to serialize WebSocket reply: {}", e),
        }
    }
}

/// Handle frames until the client goes away
///
/// Returns the id of the session this connection started, if it is
/// still considered the owner.
async fn process_incoming(
    mut ws_stream: SplitStream<WebSocket>,
    outgoing: &mpsc::Sender<Value>,
    state: &AppState,
) -> Option<String> {
    let mut owned_session: Option<String> = None;

    while let Some(result) = ws_stream.next().await {
        let reply = match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => handle_client_message(msg, state, &mut owned_session).await,
                Err(e) => {
                    debug!("Failed to parse client message: {}", e);
                    to_value(StatusReply::error(format!("Invalid message format: {}", e)))
                }
            },
            Ok(Message::Binary(_)) => {
                debug!("Received binary message, ignoring");
                continue;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => {
                debug!("Received close frame");
                break;
            }
            Err(e) => {
                debug!("WebSocket error: {}", e);
                break;
            }
        };

        if outgoing.send(reply).await.is_err() {
            break;
        }
    }

    owned_session
}

async fn handle_client_message(
    msg: ClientMessage,
    state: &AppState,
    owned_session: &mut Option<String>,
) -> Value {
    match msg {
        ClientMessage::Analyze { text, image } => {
            match state
                .sessions
                .analyze_input(text.as_deref(), image.as_deref())
                .await
            {
                Ok(result) => to_value(result),
                Err(e) => to_value(StatusReply::error(e.to_string())),
            }
        }
        ClientMessage::StartSession { session_id } => match state.sessions.start(session_id).await {
            Ok(session) => {
                *owned_session = Some(session.id.clone());
                to_value(StatusReply {
                    session_id: Some(session.id),
                    ..StatusReply::ok("started")
                })
            }
            Err(e) => to_value(StatusReply::error(e.to_string())),
        },
        ClientMessage::StopSession => {
            state.sessions.stop().await;
            *owned_session = None;
            to_value(StatusReply::ok("stopped"))
        }
    }
}

fn to_value<T: Serialize>(reply: T) -> Value {
    serde_json::to_value(reply).unwrap_or_else(|e| {
        error!("Failed to encode WebSocket reply: {}", e);
        serde_json::json!({ "status": "error", "error": "internal error" })
    })
}
