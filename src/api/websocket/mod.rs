//! WebSocket listener
//!
//! Subscribers connect at `/` or `/ws`, send a `client_ready` handshake
//! naming their group, then receive every payload published to it.

pub mod events;
pub mod handler;
pub mod state;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;

use handler::ws_handler;
use state::ListenerState;

/// Router exposing the WebSocket endpoint
pub fn create_router(state: Arc<ListenerState>) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Serve WebSocket connections on `listener` until `shutdown` resolves
///
/// Stops accepting once `shutdown` completes; open connections observe the
/// listener state's shutdown flag and close themselves.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<ListenerState>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!(addr = ?listener.local_addr().ok(), "WebSocket listener started");
    axum::serve(
        listener,
        create_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}
