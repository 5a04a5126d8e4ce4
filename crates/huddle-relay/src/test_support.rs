//! Fake [`PeerSender`] for unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use huddle_core::ConnectionId;
use parking_lot::Mutex;
use serde_json::Value;

use crate::peer::{PeerSender, SendError};

/// Records every successful delivery and fails on demand.
#[derive(Default)]
pub(crate) struct RecordingSender {
    delivered: Mutex<Vec<(ConnectionId, Value)>>,
    failures: Mutex<HashMap<ConnectionId, SendError>>,
    delays: Mutex<HashMap<ConnectionId, Duration>>,
    attempts: Mutex<Vec<ConnectionId>>,
}

impl RecordingSender {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every send to `id` fail with `err`.
    pub(crate) fn fail(&self, id: &str, err: SendError) {
        let _ = self.failures.lock().insert(ConnectionId::from(id), err);
    }

    /// Hold sends to `id` for `delay` before resolving.
    pub(crate) fn delay(&self, id: &str, delay: Duration) {
        let _ = self.delays.lock().insert(ConnectionId::from(id), delay);
    }

    /// Payloads successfully delivered to `id`, in order.
    pub(crate) fn received(&self, id: &str) -> Vec<Value> {
        self.delivered
            .lock()
            .iter()
            .filter(|(to, _)| to.as_str() == id)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Every successful delivery as `(recipient, payload)`.
    pub(crate) fn all_delivered(&self) -> Vec<(ConnectionId, Value)> {
        self.delivered.lock().clone()
    }

    /// Number of send attempts, successful or not.
    pub(crate) fn attempt_count(&self) -> usize {
        self.attempts.lock().len()
    }
}

#[async_trait]
impl PeerSender for RecordingSender {
    async fn send(&self, id: &ConnectionId, payload: Arc<String>) -> Result<(), SendError> {
        self.attempts.lock().push(id.clone());
        let delay = self.delays.lock().get(id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failures.lock().get(id).cloned();
        if let Some(err) = failure {
            return Err(err);
        }
        let value: Value = serde_json::from_str(&payload)
            .map_err(|e| SendError::transient(format!("payload is not JSON: {e}")))?;
        self.delivered.lock().push((id.clone(), value));
        Ok(())
    }
}
