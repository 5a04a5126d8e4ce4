//! # huddle-core
//!
//! Shared vocabulary for the huddle chat relay:
//!
//! - **IDs**: [`ConnectionId`], the opaque per-socket identity
//! - **Messages**: [`OutboundMessage`] and its single-key JSON wire encoding
//! - **Events**: [`InboundEvent`] validation into a closed set of [`ChatCommand`]s
//! - **Errors**: [`RequestError`], the boundary failures reported to callers
//! - **Logging**: `tracing` subscriber setup and test-time log capture

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod ids;
pub mod logging;
pub mod messages;

pub use errors::RequestError;
pub use events::{ChatCommand, InboundEvent, RequestContext, RouteKey};
pub use ids::ConnectionId;
pub use messages::OutboundMessage;
