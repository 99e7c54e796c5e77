//! WebSocket connection handler
//!
//! A connection starts unassigned, joins groups through `client_ready`
//! handshakes and is removed from every group when it closes. A connection
//! the hub evicts after a failed delivery is closed as well.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::Response,
};

use super::events::{parse_message, Inbound};
use super::state::ListenerState;
use crate::hub::ConnectionHandle;

/// Lifecycle of one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Unassigned,
    Joined,
    Closed,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<Arc<ListenerState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, peer, state))
}

/// Handle an individual WebSocket connection
async fn handle_socket(mut socket: WebSocket, peer: SocketAddr, state: Arc<ListenerState>) {
    let (handle, mut outbound) = state.open_connection(peer);
    let mut shutdown = state.shutdown_signal();
    let mut phase = ConnectionPhase::Unassigned;
    tracing::info!(conn = handle.id(), peer = %peer, "New WebSocket connection");

    loop {
        tokio::select! {
            // Payloads fanned out by the hub
            Some(text) = outbound.recv() => {
                if socket.send(Message::Text(text.to_string())).await.is_err() {
                    break; // Client disconnected
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(msg)) => {
                        if !handle_client_message(msg, &mut socket, &handle, &state, &mut phase).await {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        tracing::debug!(conn = handle.id(), error = %e, "WebSocket read error");
                        break;
                    }
                    None => break,
                }
            }

            // The hub dropped this connection after a failed delivery
            _ = handle.evicted() => {
                tracing::warn!(conn = handle.id(), "Evicted by hub, closing");
                let _ = socket.send(Message::Close(None)).await;
                break;
            }

            _ = shutdown.changed() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
        }
    }

    phase = ConnectionPhase::Closed;
    state.hub.leave(handle.id());
    tracing::info!(conn = handle.id(), phase = ?phase, "WebSocket disconnected");
}

/// Handle a message from the client
/// Returns false if the connection should be closed
async fn handle_client_message(
    msg: Message,
    socket: &mut WebSocket,
    handle: &ConnectionHandle,
    state: &ListenerState,
    phase: &mut ConnectionPhase,
) -> bool {
    match msg {
        Message::Text(text) => {
            match parse_message(&text) {
                Ok(Inbound::Ready { group }) => {
                    state.hub.join(handle, &group);
                    *phase = ConnectionPhase::Joined;
                }
                Ok(Inbound::Ignored) if *phase == ConnectionPhase::Unassigned => {
                    tracing::warn!(conn = handle.id(), "Message before handshake ignored");
                }
                Ok(Inbound::Ignored) => {
                    tracing::debug!(conn = handle.id(), "Unrecognized message ignored");
                }
                Err(e) => {
                    tracing::warn!(conn = handle.id(), error = %e, message = %text, "Invalid JSON received");
                }
            }
            true
        }
        Message::Binary(_) => true, // Ignore binary messages
        Message::Ping(data) => {
            let _ = socket.send(Message::Pong(data)).await;
            true
        }
        Message::Pong(_) => true,
        Message::Close(_) => false, // Client requested close
    }
}
