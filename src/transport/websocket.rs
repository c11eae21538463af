//! WebSocket endpoint
//!
//! Each socket gets its own task. The task owns the socket, registers an
//! outbound queue with the coordinator and pumps frames in both directions
//! until either side goes away.

use crate::coordinator::CoordinatorHandle;
use crate::metrics::MetricsCollector;
use crate::protocol::{ClientMessage, ErrorCode, ServerMessage};
use crate::types::ConnectionId;
use crate::utils::generate_connection_id;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Shared state for socket tasks
#[derive(Clone)]
pub struct TransportState {
    pub coordinator: CoordinatorHandle,
    pub metrics: Arc<MetricsCollector>,
}

/// Router exposing the `/ws` endpoint
pub fn router(state: TransportState) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(state)
}

async fn ws_upgrade(
    State(state): State<TransportState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

/// Drive one connection until the socket closes
pub async fn handle_socket(state: TransportState, mut socket: WebSocket) {
    let connection_id = generate_connection_id();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    if let Err(e) = state.coordinator.connect(connection_id, tx.clone()).await {
        error!(
            "Failed to register connection - connection_id: {}, error: {}",
            connection_id, e
        );
        return;
    }

    loop {
        tokio::select! {
            Some(message) = rx.recv() => {
                match serde_json::to_string(&message) {
                    Ok(json) => {
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!(
                            "Failed to serialize {} - connection_id: {}, error: {}",
                            message.event_name(), connection_id, e
                        );
                    }
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if !forward(&state, connection_id, &tx, text.as_str()).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!("Socket error - connection_id: {}, error: {}", connection_id, e);
                        break;
                    }
                    // Ping/pong are answered by axum; binary frames are not part of the protocol
                    Some(Ok(_)) => continue,
                }
            }
        }
    }

    if let Err(e) = state.coordinator.disconnect(connection_id).await {
        warn!(
            "Failed to report disconnect - connection_id: {}, error: {}",
            connection_id, e
        );
    }
}

/// Parse one text frame and hand it to the coordinator. Returns `false` once
/// the coordinator is gone.
async fn forward(
    state: &TransportState,
    connection_id: ConnectionId,
    tx: &mpsc::UnboundedSender<ServerMessage>,
    text: &str,
) -> bool {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            state.metrics.record_malformed_message();
            debug!(
                "Malformed frame - connection_id: {}, error: {}",
                connection_id, e
            );
            let _ = tx.send(ServerMessage::error(
                ErrorCode::MalformedMessage,
                format!("Invalid message: {}", e),
            ));
            return true;
        }
    };

    match state.coordinator.submit(connection_id, message).await {
        Ok(()) => true,
        Err(e) => {
            error!(
                "Coordinator unavailable - connection_id: {}, error: {}",
                connection_id, e
            );
            false
        }
    }
}
