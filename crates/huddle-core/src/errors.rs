//! Request-boundary errors.
//!
//! These are the only failures reported back to whoever submitted an event.
//! Delivery failures never surface here; they are handled inside the relay.

use thiserror::Error;

/// `400`: the event carried no connection context.
pub const INVALID_CONTEXT_MESSAGE: &str = "Invalid request context";
/// `400`: the event body was present but not valid JSON.
pub const MALFORMED_BODY_MESSAGE: &str = "Bad request: Error parsing JSON";
/// `404`: the route key is not one the relay understands.
pub const ROUTE_NOT_FOUND_MESSAGE: &str = "Route not found";

/// Why an inbound event was rejected before or during dispatch.
#[derive(Debug, Error)]
pub enum RequestError {
    /// No request context (connection identity + route key) was supplied.
    #[error("{}", INVALID_CONTEXT_MESSAGE)]
    MissingContext,

    /// Body present but not parseable as JSON.
    #[error("{}", MALFORMED_BODY_MESSAGE)]
    MalformedBody(#[source] serde_json::Error),

    /// Route key not recognized.
    #[error("{}", ROUTE_NOT_FOUND_MESSAGE)]
    UnknownRoute {
        /// The route key as received.
        route_key: String,
    },
}

impl RequestError {
    /// Result code reported to the caller.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingContext | Self::MalformedBody(_) => 400,
            Self::UnknownRoute { .. } => 404,
        }
    }
}
