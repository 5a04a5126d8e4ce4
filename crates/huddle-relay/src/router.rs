//! Chat event state machine.
//!
//! Per-connection state is just registry membership plus a display name.
//! The router applies one validated [`ChatCommand`] at a time, mutating the
//! registry and driving the broadcast engine. Missing preconditions
//! (unregistered sender, unknown recipient) degrade to no-ops.

use std::sync::Arc;

use huddle_core::{ChatCommand, ConnectionId, OutboundMessage};
use metrics::gauge;
use tracing::{debug, info};

use crate::broadcast::{BroadcastEngine, Delivery, FanoutReport};
use crate::metrics::RELAY_PARTICIPANTS;
use crate::peer::PeerSender;
use crate::registry::ConnectionRegistry;

/// What a dispatched command ended up doing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Connection observed; not yet a participant.
    Observed,
    /// Participant registered or renamed; roster and notice broadcast.
    Joined {
        /// Roster fan-out results.
        roster: FanoutReport,
        /// Joined-notice fan-out results.
        notice: FanoutReport,
    },
    /// Participant left; notice and roster broadcast.
    Left {
        /// Left-notice fan-out results.
        notice: FanoutReport,
        /// Roster fan-out results.
        roster: FanoutReport,
    },
    /// Public chat line broadcast.
    Broadcast(FanoutReport),
    /// Private chat line sent.
    Direct {
        /// Resolved recipient.
        recipient: ConnectionId,
        /// Delivery result.
        delivery: Delivery,
    },
    /// Precondition missing; nothing happened.
    Skipped(SkipReason),
}

/// Why a command was a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The originating connection is not a participant.
    NotRegistered,
    /// No participant carries the requested name.
    RecipientNotFound,
}

/// Drives the registry and broadcast engine from chat commands.
#[derive(Clone)]
pub struct EventRouter {
    registry: Arc<ConnectionRegistry>,
    engine: BroadcastEngine,
}

impl EventRouter {
    /// Create a router sharing `registry` with its broadcast engine.
    pub fn new(registry: Arc<ConnectionRegistry>, sender: Arc<dyn PeerSender>) -> Self {
        let engine = BroadcastEngine::new(Arc::clone(&registry), sender);
        Self { registry, engine }
    }

    /// The participant registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Apply `command` on behalf of connection `id`.
    pub async fn dispatch(&self, id: &ConnectionId, command: ChatCommand) -> RouteOutcome {
        match command {
            ChatCommand::Connect => {
                info!(conn_id = %id, "connection opened");
                RouteOutcome::Observed
            }
            ChatCommand::Disconnect => self.disconnect(id).await,
            ChatCommand::SetName { name } => self.set_name(id, name).await,
            ChatCommand::SendPublic { message } => self.send_public(id, message).await,
            ChatCommand::SendPrivate { to, message } => self.send_private(id, to, message).await,
        }
    }

    async fn disconnect(&self, id: &ConnectionId) -> RouteOutcome {
        let Some(name) = self.registry.lookup(id) else {
            debug!(conn_id = %id, "disconnect from non-participant");
            return RouteOutcome::Skipped(SkipReason::NotRegistered);
        };
        let notice = self
            .engine
            .send_to_all(&OutboundMessage::left(name.as_deref()))
            .await;
        let _ = self.registry.remove(id);
        self.record_participants();
        let roster = self.engine.send_to_all(&self.roster()).await;
        info!(conn_id = %id, name = ?name, "participant left");
        RouteOutcome::Left { notice, roster }
    }

    async fn set_name(&self, id: &ConnectionId, name: Option<String>) -> RouteOutcome {
        self.registry.upsert(id.clone(), name.clone());
        self.record_participants();
        info!(conn_id = %id, name = ?name, "participant named");
        let roster = self.engine.send_to_all(&self.roster()).await;
        let notice = self
            .engine
            .send_to_all(&OutboundMessage::joined(name.as_deref()))
            .await;
        RouteOutcome::Joined { roster, notice }
    }

    async fn send_public(&self, id: &ConnectionId, message: String) -> RouteOutcome {
        let Some(sender) = self.registry.lookup(id) else {
            debug!(conn_id = %id, "public message from non-participant dropped");
            return RouteOutcome::Skipped(SkipReason::NotRegistered);
        };
        let report = self
            .engine
            .send_to_all(&OutboundMessage::PublicChat {
                sender,
                text: message,
            })
            .await;
        RouteOutcome::Broadcast(report)
    }

    async fn send_private(
        &self,
        id: &ConnectionId,
        to: Option<String>,
        message: String,
    ) -> RouteOutcome {
        let Some(recipient) = to.as_deref().and_then(|to| self.registry.find_by_name(to)) else {
            debug!(conn_id = %id, to = ?to, "private message recipient not found, dropped");
            return RouteOutcome::Skipped(SkipReason::RecipientNotFound);
        };
        let Some(sender) = self.registry.lookup(id) else {
            debug!(conn_id = %id, "private message from non-participant dropped");
            return RouteOutcome::Skipped(SkipReason::NotRegistered);
        };
        let delivery = self
            .engine
            .send_to_one(
                &recipient,
                &OutboundMessage::PrivateChat {
                    sender,
                    text: message,
                },
            )
            .await;
        RouteOutcome::Direct {
            recipient,
            delivery,
        }
    }

    fn roster(&self) -> OutboundMessage {
        OutboundMessage::RosterUpdate {
            members: self.registry.snapshot(),
        }
    }

    fn record_participants(&self) {
        gauge!(RELAY_PARTICIPANTS).set(self.registry.len() as f64);
    }
}
