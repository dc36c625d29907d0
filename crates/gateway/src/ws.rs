//! WebSocket endpoint - the bidirectional advisor channel.
//!
//! Protocol:
//! - Client → Server: `{"type":"ping"}` and
//!   `{"type":"submit_request","client_id":"...","text":"..."}`
//! - Server → Client: [`OutboundEvent`] JSON frames
//!
//! Frame validation runs before any business logic; every rejection is a
//! typed `error` event and the channel stays open. A valid `submit_request`
//! spawns the pipeline fire-and-forget so the receive loop never blocks on
//! provider work.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use wealthdesk_core::event::{EventSink, InboundFrame, OutboundEvent};
use wealthdesk_core::request::RequestEnvelope;

use crate::SharedState;
use crate::sessions::SessionSink;

/// Outbound queue depth per session.
const SESSION_QUEUE: usize = 64;

/// `GET /ws` - upgrade to the bidirectional channel.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: SharedState) {
    let session_id = Uuid::new_v4().to_string();
    info!(session = %session_id, "WebSocket connection established");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel::<OutboundEvent>(SESSION_QUEUE);
    state.sessions.register(&session_id, tx).await;

    // Writer task: drains the session queue onto the socket. Ends when the
    // registry drops the sender (unregistration) or the socket dies.
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = serde_json::to_string(&event).unwrap_or_default();
            if ws_tx.send(WsMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Receive loop: validate frames, answer pings, launch request cycles.
    while let Some(frame) = ws_rx.next().await {
        let raw = match frame {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue, // ignore binary, ping, pong
            Err(_) => break,
        };

        match InboundFrame::parse(&raw) {
            Ok(InboundFrame::Ping) => {
                state.sessions.send_to(&session_id, OutboundEvent::Pong).await;
            }
            Ok(InboundFrame::SubmitRequest { client_id, text }) => {
                let envelope = RequestEnvelope::new(client_id, text);
                debug!(
                    session = %session_id,
                    correlation = %envelope.correlation_id,
                    "Request accepted"
                );

                // Fire-and-forget: the receive loop stays free while the
                // pipeline runs. A disconnect mid-cycle only drops events;
                // the backing work still persists its results.
                let orchestrator = state.orchestrator.clone();
                let sink: Arc<dyn EventSink> =
                    Arc::new(SessionSink::new(state.sessions.clone(), &session_id));
                tokio::spawn(async move {
                    orchestrator.handle_request(envelope, sink).await;
                });
            }
            Err(rejection) => {
                state
                    .sessions
                    .send_to(&session_id, OutboundEvent::error(rejection.to_string()))
                    .await;
            }
        }
    }

    state.sessions.unregister(&session_id).await;
    writer.abort();
    info!(session = %session_id, "WebSocket connection closed");
}
