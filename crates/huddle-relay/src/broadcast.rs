//! Message fan-out with stale-peer eviction.
//!
//! [`BroadcastEngine::send_to_all`] snapshots the current participant IDs,
//! spawns one delivery task per recipient, and waits for all of them. A
//! failure for one recipient never affects the others. Permanent failures
//! ([`SendError::Gone`]) remove the recipient from the registry; since each
//! eviction touches a distinct key, completion order does not matter.

use std::sync::Arc;

use huddle_core::{ConnectionId, OutboundMessage};
use metrics::{counter, gauge};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::metrics::{
    RELAY_DELIVERIES_TOTAL, RELAY_DELIVERY_FAILURES_TOTAL, RELAY_EVICTIONS_TOTAL,
    RELAY_PARTICIPANTS,
};
use crate::peer::{PeerSender, SendError};
use crate::registry::ConnectionRegistry;

/// Outcome of one delivery attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The transport accepted the payload.
    Delivered,
    /// Delivery failed; the participant stays registered.
    Failed {
        /// Transport-supplied reason.
        reason: String,
    },
    /// The peer is gone and was removed from the registry.
    Evicted,
    /// The message could not be serialized; nothing was sent.
    Unencodable,
}

/// Per-recipient results of a fan-out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Recipients that received the message.
    pub delivered: Vec<ConnectionId>,
    /// Recipients with a transient failure.
    pub failed: Vec<ConnectionId>,
    /// Recipients evicted as stale.
    pub evicted: Vec<ConnectionId>,
}

impl FanoutReport {
    /// Number of recipients attempted.
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len() + self.evicted.len()
    }

    fn record(&mut self, id: ConnectionId, delivery: Delivery) {
        match delivery {
            Delivery::Delivered => self.delivered.push(id),
            Delivery::Failed { .. } | Delivery::Unencodable => self.failed.push(id),
            Delivery::Evicted => self.evicted.push(id),
        }
    }
}

/// Sends messages to one or all participants through a [`PeerSender`].
#[derive(Clone)]
pub struct BroadcastEngine {
    registry: Arc<ConnectionRegistry>,
    sender: Arc<dyn PeerSender>,
}

impl BroadcastEngine {
    /// Create an engine over a shared registry.
    pub fn new(registry: Arc<ConnectionRegistry>, sender: Arc<dyn PeerSender>) -> Self {
        Self { registry, sender }
    }

    /// The registry this engine evicts from.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Deliver `message` to a single connection.
    ///
    /// On [`SendError::Gone`] the connection is evicted; transient failures
    /// are logged and left alone. No retry.
    pub async fn send_to_one(&self, id: &ConnectionId, message: &OutboundMessage) -> Delivery {
        let Some(payload) = encode(message) else {
            return Delivery::Unencodable;
        };
        deliver(&self.registry, self.sender.as_ref(), id, payload).await
    }

    /// Deliver `message` to every current participant concurrently.
    ///
    /// Returns once every recipient's attempt has completed.
    pub async fn send_to_all(&self, message: &OutboundMessage) -> FanoutReport {
        debug_assert!(message.is_broadcast(), "{} is never fanned out", message.kind());
        let mut report = FanoutReport::default();
        let Some(payload) = encode(message) else {
            return report;
        };

        let recipients = self.registry.connection_ids();
        debug!(
            kind = message.kind(),
            recipients = recipients.len(),
            "broadcast message"
        );

        let mut tasks = JoinSet::new();
        for id in recipients {
            let registry = Arc::clone(&self.registry);
            let sender = Arc::clone(&self.sender);
            let payload = Arc::clone(&payload);
            let _ = tasks.spawn(async move {
                let delivery = deliver(&registry, sender.as_ref(), &id, payload).await;
                (id, delivery)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, delivery)) => report.record(id, delivery),
                Err(e) => warn!(error = %e, "delivery task panicked"),
            }
        }

        if !report.evicted.is_empty() {
            gauge!(RELAY_PARTICIPANTS).set(self.registry.len() as f64);
        }
        report
    }
}

fn encode(message: &OutboundMessage) -> Option<Arc<String>> {
    match message.to_json() {
        Ok(json) => Some(Arc::new(json)),
        Err(e) => {
            warn!(kind = message.kind(), error = %e, "failed to serialize message");
            None
        }
    }
}

async fn deliver(
    registry: &ConnectionRegistry,
    sender: &dyn PeerSender,
    id: &ConnectionId,
    payload: Arc<String>,
) -> Delivery {
    match sender.send(id, payload).await {
        Ok(()) => {
            debug!(conn_id = %id, "message delivered");
            counter!(RELAY_DELIVERIES_TOTAL).increment(1);
            Delivery::Delivered
        }
        Err(SendError::Gone) => {
            let removed = registry.remove(id);
            info!(conn_id = %id, removed, "connection is stale, evicted");
            counter!(RELAY_EVICTIONS_TOTAL).increment(1);
            Delivery::Evicted
        }
        Err(SendError::Transient { reason }) => {
            warn!(conn_id = %id, reason = %reason, "failed to deliver message");
            counter!(RELAY_DELIVERY_FAILURES_TOTAL).increment(1);
            Delivery::Failed { reason }
        }
    }
}
