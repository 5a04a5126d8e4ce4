//! Outbound message variants and their wire encoding.
//!
//! Every payload the relay delivers to a peer is a single-key JSON object.
//! The key names the message class:
//!
//! | Variant | Wire shape |
//! |---|---|
//! | [`OutboundMessage::SystemNotice`] | `{"systemMessage": "alice has joined the chat"}` |
//! | [`OutboundMessage::RosterUpdate`] | `{"members": ["alice", null, "bob"]}` |
//! | [`OutboundMessage::PublicChat`] | `{"publicMessage": "alice: hi"}` |
//! | [`OutboundMessage::PrivateChat`] | `{"privateMessage": "alice: hi"}` |
//!
//! Roster entries for participants that registered without a name are kept
//! as `null` rather than filtered.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Placeholder used when rendering text for a participant without a name.
pub const UNNAMED_PARTICIPANT: &str = "anonymous";

/// Wire key for [`OutboundMessage::SystemNotice`].
pub const SYSTEM_MESSAGE_KEY: &str = "systemMessage";
/// Wire key for [`OutboundMessage::RosterUpdate`].
pub const MEMBERS_KEY: &str = "members";
/// Wire key for [`OutboundMessage::PublicChat`].
pub const PUBLIC_MESSAGE_KEY: &str = "publicMessage";
/// Wire key for [`OutboundMessage::PrivateChat`].
pub const PRIVATE_MESSAGE_KEY: &str = "privateMessage";

/// A message delivered to one or more peers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Informational notice, broadcast only.
    SystemNotice {
        /// Notice text.
        text: String,
    },
    /// Full roster snapshot in registry iteration order, broadcast only.
    RosterUpdate {
        /// Display names; `None` for participants that never set one.
        members: Vec<Option<String>>,
    },
    /// Chat line visible to everyone.
    PublicChat {
        /// Sender display name.
        sender: Option<String>,
        /// Message body.
        text: String,
    },
    /// Chat line delivered to a single recipient.
    PrivateChat {
        /// Sender display name.
        sender: Option<String>,
        /// Message body.
        text: String,
    },
}

impl OutboundMessage {
    /// `"<name> has joined the chat"`.
    pub fn joined(name: Option<&str>) -> Self {
        Self::SystemNotice {
            text: format!("{} has joined the chat", display_name(name)),
        }
    }

    /// `"<name> has left the chat"`.
    pub fn left(name: Option<&str>) -> Self {
        Self::SystemNotice {
            text: format!("{} has left the chat", display_name(name)),
        }
    }

    /// The wire key this variant is encoded under.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SystemNotice { .. } => SYSTEM_MESSAGE_KEY,
            Self::RosterUpdate { .. } => MEMBERS_KEY,
            Self::PublicChat { .. } => PUBLIC_MESSAGE_KEY,
            Self::PrivateChat { .. } => PRIVATE_MESSAGE_KEY,
        }
    }

    /// Whether this variant is meant for fan-out rather than a single recipient.
    pub fn is_broadcast(&self) -> bool {
        !matches!(self, Self::PrivateChat { .. })
    }

    /// Serialize to the JSON text sent over the transport.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Serialize for OutboundMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::SystemNotice { text } => map.serialize_entry(SYSTEM_MESSAGE_KEY, text)?,
            Self::RosterUpdate { members } => map.serialize_entry(MEMBERS_KEY, members)?,
            Self::PublicChat { sender, text } => {
                map.serialize_entry(PUBLIC_MESSAGE_KEY, &chat_line(sender.as_deref(), text))?;
            }
            Self::PrivateChat { sender, text } => {
                map.serialize_entry(PRIVATE_MESSAGE_KEY, &chat_line(sender.as_deref(), text))?;
            }
        }
        map.end()
    }
}

/// Resolve a possibly-missing display name for rendering.
pub fn display_name(name: Option<&str>) -> &str {
    name.unwrap_or(UNNAMED_PARTICIPANT)
}

fn chat_line(sender: Option<&str>, text: &str) -> String {
    format!("{}: {text}", display_name(sender))
}
