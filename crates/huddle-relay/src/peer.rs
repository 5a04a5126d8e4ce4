//! Outbound delivery capability.
//!
//! The relay never touches sockets. It hands a serialized payload to a
//! [`PeerSender`] and reacts to the outcome: success, a transient failure
//! (logged, nothing else), or [`SendError::Gone`] (the peer is evicted).

use std::sync::Arc;

use async_trait::async_trait;
use huddle_core::ConnectionId;
use thiserror::Error;

/// Why a single delivery attempt failed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// Delivery failed but the endpoint may still be valid.
    #[error("transient delivery failure: {reason}")]
    Transient {
        /// What went wrong.
        reason: String,
    },
    /// The endpoint no longer exists; retrying can never succeed.
    #[error("peer is gone")]
    Gone,
}

impl SendError {
    /// Shorthand for [`SendError::Transient`].
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient {
            reason: reason.into(),
        }
    }

    /// Whether this failure is permanent.
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Gone)
    }
}

/// Delivers a payload to one connection.
///
/// Implementations must be safe to call concurrently for different IDs.
/// No retry or ordering is expected of them.
#[async_trait]
pub trait PeerSender: Send + Sync {
    /// Attempt delivery of `payload` to `id`.
    async fn send(&self, id: &ConnectionId, payload: Arc<String>) -> Result<(), SendError>;
}
