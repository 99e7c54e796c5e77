//! Status service
//!
//! Read-only view of the hub and the loaded plugins, served from its own
//! thread with its own runtime so it never competes with the relay.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;

use axum::{extract::State, Json};
use serde::Serialize;
use tokio::sync::watch;

use super::http::create_router;
use crate::error::{RelayError, RelayResult};
use crate::hub::BroadcastHub;
use crate::server::wait_for_shutdown;
use crate::types::{GroupSummary, HubStats, PluginSummary};

/// State shared by the status handlers
pub struct StatusState {
    pub hub: Arc<BroadcastHub>,
    pub plugins: Vec<PluginSummary>,
}

#[derive(Debug, Serialize)]
pub struct GroupsResponse {
    pub groups: Vec<GroupSummary>,
    pub stats: HubStats,
}

#[derive(Debug, Serialize)]
pub struct PluginsResponse {
    pub plugins: Vec<PluginSummary>,
}

/// GET /api/groups
pub async fn list_groups(State(state): State<Arc<StatusState>>) -> Json<GroupsResponse> {
    Json(GroupsResponse {
        groups: state.hub.groups(),
        stats: state.hub.stats(),
    })
}

/// GET /api/plugins
pub async fn list_plugins(State(state): State<Arc<StatusState>>) -> Json<PluginsResponse> {
    Json(PluginsResponse {
        plugins: state.plugins.clone(),
    })
}

/// Handle to the running status thread
pub struct StatusService {
    addr: SocketAddr,
    stop: watch::Sender<bool>,
    thread: JoinHandle<()>,
}

impl StatusService {
    /// Bind `addr` and serve status requests until `shutdown` flips or
    /// [`stop`](Self::stop) is called
    ///
    /// The socket is bound on the calling thread so a busy port is reported
    /// before anything else starts.
    pub fn spawn(
        addr: SocketAddr,
        state: Arc<StatusState>,
        shutdown: watch::Receiver<bool>,
    ) -> RelayResult<Self> {
        let std_listener =
            std::net::TcpListener::bind(addr).map_err(|source| RelayError::Bind { addr, source })?;
        std_listener.set_nonblocking(true)?;
        let addr = std_listener.local_addr()?;
        let (stop, stopped) = watch::channel(false);

        let thread = std::thread::Builder::new()
            .name("status-service".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to build status runtime");
                        return;
                    }
                };

                runtime.block_on(async move {
                    let listener = match tokio::net::TcpListener::from_std(std_listener) {
                        Ok(l) => l,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to adopt status listener");
                            return;
                        }
                    };
                    tracing::info!(addr = %addr, "Status service started");

                    let signal = async move {
                        tokio::select! {
                            _ = wait_for_shutdown(shutdown) => {}
                            _ = wait_for_shutdown(stopped) => {}
                        }
                    };
                    if let Err(e) = axum::serve(listener, create_router(state))
                        .with_graceful_shutdown(signal)
                        .await
                    {
                        tracing::error!(error = %e, "Status service failed");
                    }
                    tracing::info!("Status service stopped");
                });
            })?;

        Ok(Self { addr, stop, thread })
    }

    /// Address actually bound
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop serving and wait for the status thread to exit
    pub fn stop(self) {
        self.stop.send_replace(true);
        if self.thread.join().is_err() {
            tracing::error!("Status thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_service_stops_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        let state = Arc::new(StatusState {
            hub: Arc::new(BroadcastHub::new()),
            plugins: Vec::new(),
        });
        let service = StatusService::spawn("127.0.0.1:0".parse().unwrap(), state, rx).unwrap();
        assert_ne!(service.local_addr().port(), 0);

        std::thread::sleep(Duration::from_millis(50));
        std::net::TcpStream::connect(service.local_addr()).unwrap();

        tx.send(true).unwrap();
        service.stop();
    }

    #[test]
    fn test_stop_without_shutdown_signal() {
        let (_tx, rx) = watch::channel(false);
        let state = Arc::new(StatusState {
            hub: Arc::new(BroadcastHub::new()),
            plugins: Vec::new(),
        });
        let service = StatusService::spawn("127.0.0.1:0".parse().unwrap(), state, rx).unwrap();
        let addr = service.local_addr();

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            service.stop();
            let _ = done_tx.send(());
        });
        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("status thread did not stop");

        std::thread::sleep(Duration::from_millis(50));
        assert!(std::net::TcpStream::connect(addr).is_err());
    }

    #[test]
    fn test_busy_port_is_bind_error() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();
        let (_tx, rx) = watch::channel(false);
        let state = Arc::new(StatusState {
            hub: Arc::new(BroadcastHub::new()),
            plugins: Vec::new(),
        });

        let err = StatusService::spawn(addr, state, rx).err().unwrap();
        assert!(matches!(err, RelayError::Bind { .. }));
    }
}
