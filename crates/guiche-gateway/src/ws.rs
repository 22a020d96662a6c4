// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket feed for wall displays.
//!
//! Server -> Client (JSON), one frame per call announcement:
//! ```json
//! {"event_id": "...", "emitted_at": "...", "topic": "ticketCalled",
//!  "event": {"class": "EN", "number": 12, "station": {"room": "3", "desk": "1"}}}
//! ```
//!
//! The feed is one-way. Client frames are ignored apart from Close. A
//! display that falls behind the broadcast channel skips the missed
//! announcements and resumes with the next one.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use guiche_bus::CallEnvelope;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::server::AppState;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle an individual display connection.
///
/// A forwarding task drains the broadcast feed into the socket while the
/// main loop waits for the client to hang up.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let conn_id = uuid::Uuid::new_v4().to_string();
    let mut feed = state.service.subscribe();
    debug!(conn_id = conn_id.as_str(), "display connected");

    let forward_id = conn_id.clone();
    let sender_task = tokio::spawn(async move {
        loop {
            match feed.recv().await {
                Ok(envelope) => {
                    let Some(frame) = encode(&envelope) else { continue };
                    if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(
                        conn_id = forward_id.as_str(),
                        missed, "display feed lagged, skipping announcements"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Displays only listen; drain client frames until they close.
    while let Some(Ok(msg)) = ws_receiver.next().await {
        if let Message::Close(_) = msg {
            break;
        }
    }

    sender_task.abort();
    debug!(conn_id = conn_id.as_str(), "display disconnected");
}

fn encode(envelope: &CallEnvelope) -> Option<String> {
    match serde_json::to_string(envelope) {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!(error = %e, "failed to encode announcement");
            None
        }
    }
}
