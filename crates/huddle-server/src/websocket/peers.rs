//! Live sockets keyed by connection ID, and the [`PeerSender`] over them.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use huddle_core::ConnectionId;
use huddle_relay::{PeerSender, SendError};
use tokio::sync::RwLock;

use super::connection::PeerConnection;

/// Every open socket, participant or not.
#[derive(Default)]
pub struct PeerTable {
    connections: RwLock<HashMap<ConnectionId, Arc<PeerConnection>>>,
}

impl PeerTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection.
    pub async fn add(&self, connection: Arc<PeerConnection>) {
        let mut conns = self.connections.write().await;
        let _ = conns.insert(connection.id.clone(), connection);
    }

    /// Remove a connection. Returns whether it was present.
    pub async fn remove(&self, id: &ConnectionId) -> bool {
        self.connections.write().await.remove(id).is_some()
    }

    /// Look up a connection.
    pub async fn get(&self, id: &ConnectionId) -> Option<Arc<PeerConnection>> {
        self.connections.read().await.get(id).cloned()
    }

    /// Number of open sockets.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Whether no sockets are open.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

/// Delivers payloads by enqueueing on the target socket's outbound queue.
///
/// An ID with no socket behind it is [`SendError::Gone`].
#[derive(Clone)]
pub struct WsPeerSender {
    peers: Arc<PeerTable>,
}

impl WsPeerSender {
    /// Deliver through `peers`.
    pub fn new(peers: Arc<PeerTable>) -> Self {
        Self { peers }
    }
}

#[async_trait]
impl PeerSender for WsPeerSender {
    async fn send(&self, id: &ConnectionId, payload: Arc<String>) -> Result<(), SendError> {
        let Some(conn) = self.peers.get(id).await else {
            return Err(SendError::Gone);
        };
        conn.enqueue(payload)
    }
}
