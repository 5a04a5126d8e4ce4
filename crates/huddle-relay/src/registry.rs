//! Authoritative map of active participants.
//!
//! Entries live in an insertion-ordered map so roster snapshots and
//! name lookups follow join order. Renaming keeps a participant's position;
//! removal closes the gap. Each operation takes the lock once, so every
//! mutation is linearizable even when many sessions drive the registry
//! concurrently.

use huddle_core::ConnectionId;
use indexmap::IndexMap;
use parking_lot::RwLock;

/// Display name as stored: `None` when the participant registered without one.
pub type DisplayName = Option<String>;

/// Mapping of connection identity to display name.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: RwLock<IndexMap<ConnectionId, DisplayName>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `id` or overwrite its display name.
    pub fn upsert(&self, id: ConnectionId, name: DisplayName) {
        let _ = self.entries.write().insert(id, name);
    }

    /// Remove `id`. Returns whether an entry was present.
    pub fn remove(&self, id: &ConnectionId) -> bool {
        self.entries.write().shift_remove(id).is_some()
    }

    /// Display name for `id`; the outer `None` means "not a participant".
    pub fn lookup(&self, id: &ConnectionId) -> Option<DisplayName> {
        self.entries.read().get(id).cloned()
    }

    /// Whether `id` is a current participant.
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.entries.read().contains_key(id)
    }

    /// First connection (in join order) whose name equals `name`.
    ///
    /// Display names are not unique; later holders of a shared name are
    /// unreachable by name.
    pub fn find_by_name(&self, name: &str) -> Option<ConnectionId> {
        self.entries
            .read()
            .iter()
            .find(|(_, stored)| stored.as_deref() == Some(name))
            .map(|(id, _)| id.clone())
    }

    /// Point-in-time roster, unnamed entries included as `None`.
    pub fn snapshot(&self) -> Vec<DisplayName> {
        self.entries.read().values().cloned().collect()
    }

    /// Point-in-time list of participant IDs.
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.entries.read().keys().cloned().collect()
    }

    /// Number of participants.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether there are no participants.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
