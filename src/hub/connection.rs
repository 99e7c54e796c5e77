//! Connection handles held by the hub

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::error::SendError;

/// Identifier assigned to each accepted connection
pub type ConnectionId = u64;

/// Serialized message queued for a connection's writer
pub type Outbound = Arc<str>;

/// Cheap, cloneable handle to a live connection
///
/// The hub only ever sees this handle; the transport itself stays with the
/// task that owns the socket and drains the receiving half of the queue.
/// When the hub gives up on a connection it flips the shared eviction flag
/// and that task closes the socket.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    tx: mpsc::Sender<Outbound>,
    evicted: Arc<watch::Sender<bool>>,
}

impl ConnectionHandle {
    /// Create a handle and the receiver its writer should drain
    pub fn new(id: ConnectionId, capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (evicted, _) = watch::channel(false);
        let handle = Self {
            id,
            peer: None,
            tx,
            evicted: Arc::new(evicted),
        };
        (handle, rx)
    }

    /// Attach the remote address for logging
    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Wait at most `timeout` for a free slot in the queue
    ///
    /// Nothing is queued until the permit is used; dropping it releases the
    /// slot.
    pub async fn reserve(&self, timeout: Duration) -> Result<mpsc::Permit<'_, Outbound>, SendError> {
        match tokio::time::timeout(timeout, self.tx.reserve()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(SendError::Closed(self.id)),
            Err(_) => Err(SendError::TimedOut {
                id: self.id,
                timeout,
            }),
        }
    }

    /// Mark the connection as dropped by the hub
    pub fn evict(&self) {
        self.evicted.send_replace(true);
    }

    pub fn is_evicted(&self) -> bool {
        *self.evicted.borrow()
    }

    /// Resolves once [`evict`](Self::evict) has been called on any clone
    pub async fn evicted(&self) {
        let mut rx = self.evicted.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
