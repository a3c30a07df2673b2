//! `WebSocket` handler for observer connections.
//!
//! Observers connect to `GET /ws/positions`. On upgrade the connection
//! is registered with the relay state, which queues a full snapshot
//! ahead of any incremental update; from then on the handler drains the
//! connection's outbound queue into the socket while routing inbound
//! frames ([`ClientMessage`]) to their handlers.
//!
//! An unrecognized inbound message kind is logged and ignored, never
//! fatal; a send failure or close frame tears the connection down and
//! unregisters it so the registry never retains a closed transport.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tracing::{debug, warn};

use geotrace_types::{ClientMessage, ServerMessage};

use crate::registry::ConnectionId;
use crate::state::RelayState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin the
/// observer session.
///
/// # Route
///
/// `GET /ws/positions`
pub async fn ws_positions(
    ws: WebSocketUpgrade,
    State(state): State<Arc<RelayState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: register, pump the outbound queue,
/// route inbound messages, unregister on any exit path.
async fn handle_ws(mut socket: WebSocket, state: Arc<RelayState>) {
    let (id, mut rx) = state.register().await;
    debug!(connection = %id, "WebSocket observer connected");

    loop {
        tokio::select! {
            // Drain the outbound queue (snapshot first, then updates).
            queued = rx.recv() => {
                match queued {
                    Some(message) => {
                        if send_message(&mut socket, &message).await.is_err() {
                            debug!(connection = %id, "observer disconnected (send failed)");
                            break;
                        }
                    }
                    None => {
                        // The registry dropped us (queue overflow).
                        debug!(connection = %id, "outbound queue closed, shutting down");
                        break;
                    }
                }
            }
            // Route inbound frames from the observer.
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&state, id, text.as_str(), &mut socket).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let pong = Message::Pong(data);
                        if socket.send(pong).await.is_err() {
                            debug!(connection = %id, "observer disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(connection = %id, "observer disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(connection = %id, "WebSocket error: {e}");
                        break;
                    }
                    _ => {
                        // Ignore binary and pong frames from observers.
                    }
                }
            }
        }
    }

    state.unregister(id).await;
}

/// Serialize and send one server message as a text frame.
///
/// A serialization failure is not a transport failure: the message is
/// skipped with a warning and the connection stays up.
async fn send_message(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            warn!("failed to serialize server message: {e}");
            return Ok(());
        }
    };
    socket.send(Message::Text(json.into())).await
}

/// Route one inbound text frame by message kind.
async fn handle_client_message(
    state: &Arc<RelayState>,
    id: ConnectionId,
    text: &str,
    socket: &mut WebSocket,
) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Hello { client_id }) => {
            debug!(connection = %id, client_id = %client_id, "observer identified");
        }
        Ok(ClientMessage::KeepaliveProbe) => {
            if send_message(socket, &ServerMessage::KeepaliveAck).await.is_err() {
                debug!(connection = %id, "keepalive ack send failed");
            }
        }
        Ok(ClientMessage::TrailQuery { entity_id }) => {
            // Point query against the store, independent of broadcast.
            // Unknown entities answer with an empty trail.
            let trail = state.trail(&entity_id).await.unwrap_or_default();
            let response = ServerMessage::TrailResponse { entity_id, trail };
            if send_message(socket, &response).await.is_err() {
                debug!(connection = %id, "trail response send failed");
            }
        }
        Err(e) => {
            warn!(connection = %id, error = %e, "unrecognized client message ignored");
        }
    }
}
