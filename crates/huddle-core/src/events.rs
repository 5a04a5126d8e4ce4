//! Inbound event shapes.
//!
//! An [`InboundEvent`] is what the transport hands the relay: a request
//! context naming the connection and route, plus an optional raw JSON body.
//! [`InboundEvent::parse`] validates it at the boundary and yields the closed
//! set of [`ChatCommand`]s the router understands.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::RequestError;
use crate::ids::ConnectionId;

/// Identity and route of an inbound event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    /// Connection the event originated from.
    pub connection_id: ConnectionId,
    /// Route selector (`$connect`, `setName`, ...).
    pub route_key: String,
}

/// Raw event as received from the transport.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    /// Absent when the transport could not attribute the event to a connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_context: Option<RequestContext>,
    /// UTF-8 JSON document, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl InboundEvent {
    /// Build an event for `route_key` on `connection_id`.
    pub fn new(
        connection_id: impl Into<ConnectionId>,
        route_key: impl Into<String>,
        body: Option<String>,
    ) -> Self {
        Self {
            request_context: Some(RequestContext {
                connection_id: connection_id.into(),
                route_key: route_key.into(),
            }),
            body,
        }
    }

    /// Validate the event and decode it into a command.
    ///
    /// Checks run in a fixed order: context, then body, then route. A body
    /// that is absent or empty counts as an empty object.
    pub fn parse(&self) -> Result<(ConnectionId, ChatCommand), RequestError> {
        let ctx = self
            .request_context
            .as_ref()
            .ok_or(RequestError::MissingContext)?;
        let body = match self.body.as_deref() {
            Some(raw) if !raw.is_empty() => {
                serde_json::from_str(raw).map_err(RequestError::MalformedBody)?
            }
            _ => Value::Object(Map::new()),
        };
        let route = RouteKey::parse(&ctx.route_key).ok_or_else(|| RequestError::UnknownRoute {
            route_key: ctx.route_key.clone(),
        })?;
        Ok((ctx.connection_id.clone(), ChatCommand::from_body(route, &body)))
    }
}

/// Recognized route keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RouteKey {
    /// Transport accepted a new socket.
    Connect,
    /// Transport lost a socket.
    Disconnect,
    /// Participant sets (or changes) their display name.
    SetName,
    /// Chat line to everyone.
    SendPublic,
    /// Chat line to one named participant.
    SendPrivate,
}

impl RouteKey {
    /// Parse a wire route key. `connect`/`disconnect` are accepted without the `$`.
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "$connect" | "connect" => Some(Self::Connect),
            "$disconnect" | "disconnect" => Some(Self::Disconnect),
            "setName" => Some(Self::SetName),
            "sendPublic" => Some(Self::SendPublic),
            "sendPrivate" => Some(Self::SendPrivate),
            _ => None,
        }
    }

    /// Canonical wire form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "$connect",
            Self::Disconnect => "$disconnect",
            Self::SetName => "setName",
            Self::SendPublic => "sendPublic",
            Self::SendPrivate => "sendPrivate",
        }
    }
}

impl std::fmt::Display for RouteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated inbound command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatCommand {
    /// Socket opened; not yet a participant.
    Connect,
    /// Socket closed.
    Disconnect,
    /// Register or rename the sender.
    SetName {
        /// New display name; `None` when the body carried no string `name`.
        name: Option<String>,
    },
    /// Broadcast a chat line.
    SendPublic {
        /// Message body.
        message: String,
    },
    /// Deliver a chat line to the participant named `to`.
    SendPrivate {
        /// Recipient display name.
        to: Option<String>,
        /// Message body.
        message: String,
    },
}

impl ChatCommand {
    /// Extract the fields `route` needs from a parsed body.
    ///
    /// Fields are read leniently: a body that is not an object simply has no
    /// fields.
    pub fn from_body(route: RouteKey, body: &Value) -> Self {
        match route {
            RouteKey::Connect => Self::Connect,
            RouteKey::Disconnect => Self::Disconnect,
            RouteKey::SetName => Self::SetName {
                name: string_field(body, "name"),
            },
            RouteKey::SendPublic => Self::SendPublic {
                message: text_field(body, "message"),
            },
            RouteKey::SendPrivate => Self::SendPrivate {
                to: string_field(body, "to"),
                message: text_field(body, "message"),
            },
        }
    }

    /// Route this command was decoded from.
    pub fn route(&self) -> RouteKey {
        match self {
            Self::Connect => RouteKey::Connect,
            Self::Disconnect => RouteKey::Disconnect,
            Self::SetName { .. } => RouteKey::SetName,
            Self::SendPublic { .. } => RouteKey::SendPublic,
            Self::SendPrivate { .. } => RouteKey::SendPrivate,
        }
    }
}

fn string_field(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_owned)
}

// Scalars other than strings are rendered with their JSON text.
fn text_field(body: &Value, key: &str) -> String {
    match body.get(key) {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    }
}
