//! # huddle-relay
//!
//! Transport-agnostic core of the chat relay.
//!
//! - [`ConnectionRegistry`]: who is present and under what display name
//! - [`PeerSender`]: the outbound delivery capability supplied by a transport
//! - [`BroadcastEngine`]: concurrent fan-out that evicts peers reported gone
//! - [`EventRouter`]: applies chat commands to the registry
//! - [`RelayHandler`]: validates raw events and maps outcomes to responses

#![deny(unsafe_code)]

pub mod broadcast;
pub mod handler;
pub mod metrics;
pub mod peer;
pub mod registry;
pub mod router;

#[cfg(test)]
mod test_support;

pub use broadcast::{BroadcastEngine, Delivery, FanoutReport};
pub use handler::{ACK_BODY, HandlerResponse, RelayHandler};
pub use peer::{PeerSender, SendError};
pub use registry::{ConnectionRegistry, DisplayName};
pub use router::{EventRouter, RouteOutcome, SkipReason};
