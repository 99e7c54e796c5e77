//! WebSocket listener state

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::hub::{BroadcastHub, ConnectionHandle, Outbound};

/// Default number of queued messages per connection
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

/// Shared state for WebSocket connections
pub struct ListenerState {
    /// The hub connections join and leave
    pub hub: Arc<BroadcastHub>,

    /// Source of connection ids
    next_id: AtomicU64,

    /// Queue depth for each connection's outbound messages
    outbound_capacity: usize,

    /// Flips to true when the process is shutting down
    shutdown: watch::Receiver<bool>,
}

impl ListenerState {
    pub fn new(hub: Arc<BroadcastHub>, outbound_capacity: usize, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            hub,
            next_id: AtomicU64::new(1),
            outbound_capacity,
            shutdown,
        }
    }

    /// Allocate a handle for a freshly accepted connection
    pub fn open_connection(&self, peer: SocketAddr) -> (ConnectionHandle, mpsc::Receiver<Outbound>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (handle, rx) = ConnectionHandle::new(id, self.outbound_capacity);
        (handle.with_peer(peer), rx)
    }

    /// A fresh receiver for the shutdown flag
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_ids_are_unique() {
        let (_tx, rx) = watch::channel(false);
        let state = ListenerState::new(Arc::new(BroadcastHub::new()), 4, rx);
        let peer: SocketAddr = "127.0.0.1:9000".parse().unwrap();

        let (a, _rx_a) = state.open_connection(peer);
        let (b, _rx_b) = state.open_connection(peer);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.peer(), Some(peer));
    }
}
