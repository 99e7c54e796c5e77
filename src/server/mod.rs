//! Relay server
//!
//! Owns the two runtimes: a multi-threaded one for the WebSocket listener
//! and the plugin tasks, and the status service's own thread. The broadcast
//! hub is the only thing they share.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::api::status::{StatusService, StatusState};
use crate::api::websocket::{self, state::ListenerState};
use crate::config::Config;
use crate::error::{RelayError, RelayResult};
use crate::hub::{BroadcastHub, PayloadSink};
use crate::plugins::PluginRegistry;
use crate::scheduler::Scheduler;

/// Time given to blocking producers once the relay runtime stops
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Flip the returned flag to true on Ctrl+C or SIGTERM
pub fn shutdown_on_signal() -> RelayResult<watch::Receiver<bool>> {
    let (tx, rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        tracing::info!("Shutdown requested");
        let _ = tx.send(true);
    })?;
    Ok(rx)
}

/// Resolves once `shutdown` is true or its sender is gone
pub async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// The plugin relay: scheduler, WebSocket listener and status service
pub struct RelayServer {
    config: Config,
    registry: PluginRegistry,
    hub: Arc<BroadcastHub>,
}

impl RelayServer {
    pub fn new(config: Config, registry: PluginRegistry) -> Self {
        let hub = Arc::new(BroadcastHub::with_delivery_timeout(config.delivery_timeout()));
        Self { config, registry, hub }
    }

    pub fn hub(&self) -> Arc<BroadcastHub> {
        Arc::clone(&self.hub)
    }

    /// Run until `shutdown` flips (blocking)
    pub fn run(self, shutdown: watch::Receiver<bool>) -> RelayResult<()> {
        let relay_addr = self.config.relay_addr();
        let std_listener = std::net::TcpListener::bind(relay_addr)
            .map_err(|source| RelayError::Bind { addr: relay_addr, source })?;
        std_listener.set_nonblocking(true)?;

        let status = if self.config.no_status {
            None
        } else {
            let state = Arc::new(StatusState {
                hub: self.hub(),
                plugins: self.registry.summaries(&self.config.publish_group),
            });
            let service = StatusService::spawn(self.config.status_addr(), state, shutdown.clone())?;
            Some(service)
        };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("relay-worker")
            .build()?;

        let result = runtime.block_on(async {
            let listener = TcpListener::from_std(std_listener)?;
            self.serve(listener, shutdown).await
        });
        runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

        // Also reached when the relay failed without a shutdown signal
        if let Some(status) = status {
            status.stop();
        }
        tracing::info!("Relay stopped");
        result
    }

    /// Start the plugin tasks and serve WebSocket connections on `listener`
    ///
    /// Returns once `shutdown` flips and connections have drained, or after
    /// the configured grace period.
    pub async fn serve(self, listener: TcpListener, shutdown: watch::Receiver<bool>) -> RelayResult<()> {
        let sink: Arc<dyn PayloadSink> = self.hub();
        let tasks = Scheduler::new(sink, self.config.publish_group.clone()).spawn_all(&self.registry);
        tracing::info!(plugins = tasks.len(), names = ?tasks.names(), "Plugins scheduled");

        let state = Arc::new(ListenerState::new(
            self.hub(),
            self.config.outbound_capacity,
            shutdown.clone(),
        ));
        let mut server = tokio::spawn(websocket::serve(
            listener,
            state,
            wait_for_shutdown(shutdown.clone()),
        ));

        let early = tokio::select! {
            res = &mut server => Some(res),
            _ = wait_for_shutdown(shutdown) => None,
        };
        tasks.abort_all();

        let finished = match early {
            Some(res) => res,
            None => match tokio::time::timeout(self.config.shutdown_grace(), &mut server).await {
                Ok(res) => res,
                Err(_) => {
                    tracing::warn!(grace = ?self.config.shutdown_grace(), "Connections did not drain in time");
                    server.abort();
                    return Ok(());
                }
            },
        };

        match finished {
            Ok(io_result) => io_result.map_err(RelayError::from),
            Err(e) => Err(RelayError::Io(std::io::Error::other(e))),
        }
    }
}
