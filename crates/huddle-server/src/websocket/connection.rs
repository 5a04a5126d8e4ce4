//! Per-socket outbound state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use huddle_core::ConnectionId;
use huddle_relay::SendError;
use metrics::counter;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::metrics::WS_SEND_DROPS_TOTAL;

/// A connected socket as seen by the delivery path.
///
/// Holds the sending half of the socket's outbound queue; the session's
/// writer task owns the receiving half. Once the writer stops, every
/// enqueue reports [`SendError::Gone`].
pub struct PeerConnection {
    /// Connection identity.
    pub id: ConnectionId,
    tx: mpsc::Sender<Arc<String>>,
    last_seen: Mutex<Instant>,
    dropped: AtomicU64,
}

impl PeerConnection {
    /// Wrap the outbound queue of socket `id`.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id,
            tx,
            last_seen: Mutex::new(Instant::now()),
            dropped: AtomicU64::new(0),
        }
    }

    /// Queue `payload` for the writer without waiting.
    ///
    /// A full queue drops the payload ([`SendError::Transient`]); a closed
    /// one means the socket is gone.
    pub fn enqueue(&self, payload: Arc<String>) -> Result<(), SendError> {
        match self.tx.try_send(payload) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
                counter!(WS_SEND_DROPS_TOTAL).increment(1);
                Err(SendError::transient("outbound queue full"))
            }
            Err(TrySendError::Closed(_)) => Err(SendError::Gone),
        }
    }

    /// Messages dropped on a full queue.
    pub fn drop_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Record inbound activity (any frame, including pongs).
    pub fn mark_alive(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the last inbound frame, or since accept.
    pub fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }
}
