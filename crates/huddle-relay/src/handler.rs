//! Request-level entry point.
//!
//! [`RelayHandler::handle`] validates one [`InboundEvent`], dispatches it
//! through the [`EventRouter`], and maps the result to a status code and a
//! plain-text body. Delivery failures never change the response.

use huddle_core::{InboundEvent, RequestError};
use metrics::counter;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::metrics::RELAY_EVENTS_TOTAL;
use crate::router::EventRouter;

/// Body returned for every successfully dispatched event.
pub const ACK_BODY: &str = "Hello from Lambda!";

/// Result code plus plain-text body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    status_code: u16,
    body: String,
}

impl HandlerResponse {
    /// The success acknowledgement.
    pub fn ok() -> Self {
        Self {
            status_code: 200,
            body: ACK_BODY.to_owned(),
        }
    }

    /// Map a rejection to its response.
    pub fn from_error(err: &RequestError) -> Self {
        Self {
            status_code: err.status_code(),
            body: err.to_string(),
        }
    }

    /// `200`, `400`, or `404`.
    pub fn status(&self) -> u16 {
        self.status_code
    }

    /// Human-readable outcome.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Whether the event was dispatched.
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    /// `{"statusCode":..,"body":..}`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<RequestError> for HandlerResponse {
    fn from(err: RequestError) -> Self {
        Self::from_error(&err)
    }
}

/// Validates inbound events and drives the router.
#[derive(Clone)]
pub struct RelayHandler {
    router: EventRouter,
}

impl RelayHandler {
    /// Wrap a router.
    pub fn new(router: EventRouter) -> Self {
        Self { router }
    }

    /// The underlying router.
    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Handle one event to completion, including every broadcast it triggers.
    #[instrument(skip_all, fields(conn_id, route))]
    pub async fn handle(&self, event: &InboundEvent) -> HandlerResponse {
        if let Some(ctx) = &event.request_context {
            let span = tracing::Span::current();
            let _ = span.record("conn_id", ctx.connection_id.as_str());
            let _ = span.record("route", ctx.route_key.as_str());
        }

        let (id, command) = match event.parse() {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(error = %err, status = err.status_code(), "rejected event");
                counter!(RELAY_EVENTS_TOTAL, "route" => "invalid", "status" => err.status_code().to_string())
                    .increment(1);
                return HandlerResponse::from_error(&err);
            }
        };

        let route = command.route().as_str();
        let outcome = self.router.dispatch(&id, command).await;
        debug!(?outcome, "event dispatched");
        counter!(RELAY_EVENTS_TOTAL, "route" => route, "status" => "200").increment(1);
        HandlerResponse::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ConnectionRegistry;
    use crate::test_support::RecordingSender;
    use huddle_core::errors::{
        INVALID_CONTEXT_MESSAGE, MALFORMED_BODY_MESSAGE, ROUTE_NOT_FOUND_MESSAGE,
    };
    use huddle_core::logging::capture_logs;
    use serde_json::json;
    use std::sync::Arc;
    use tracing::Level;

    fn setup() -> (RelayHandler, Arc<RecordingSender>) {
        let registry = Arc::new(ConnectionRegistry::new());
        let sender = RecordingSender::new();
        let router = EventRouter::new(registry, sender.clone());
        (RelayHandler::new(router), sender)
    }

    fn event(id: &str, route: &str, body: Option<&str>) -> InboundEvent {
        InboundEvent::new(id, route, body.map(str::to_owned))
    }

    #[tokio::test]
    async fn set_name_acknowledged() {
        let (handler, sender) = setup();
        let resp = handler
            .handle(&event("c1", "setName", Some(r#"{"name":"alice"}"#)))
            .await;
        assert_eq!(resp, HandlerResponse::ok());
        assert_eq!(resp.body(), ACK_BODY);
        assert_eq!(sender.received("c1").len(), 2);
    }

    #[tokio::test]
    async fn connect_and_disconnect_acknowledged() {
        let (handler, _) = setup();
        assert!(handler.handle(&event("c1", "$connect", None)).await.is_success());
        assert!(handler.handle(&event("c1", "$disconnect", None)).await.is_success());
    }

    #[tokio::test]
    async fn unknown_route_is_404_without_side_effects() {
        let (handler, sender) = setup();
        let resp = handler.handle(&event("c1", "pingpong", Some("{}"))).await;
        assert_eq!(resp.status(), 404);
        assert_eq!(resp.body(), ROUTE_NOT_FOUND_MESSAGE);
        assert!(handler.router().registry().is_empty());
        assert_eq!(sender.attempt_count(), 0);
    }

    #[tokio::test]
    async fn malformed_body_is_400_without_side_effects() {
        let (handler, sender) = setup();
        let resp = handler.handle(&event("c1", "setName", Some("{not json"))).await;
        assert_eq!(resp.status(), 400);
        assert_eq!(resp.body(), MALFORMED_BODY_MESSAGE);
        assert!(handler.router().registry().is_empty());
        assert_eq!(sender.attempt_count(), 0);
    }

    #[tokio::test]
    async fn empty_body_on_unknown_route_is_404() {
        let (handler, sender) = setup();
        let resp = handler.handle(&event("c1", "pingpong", Some(""))).await;
        assert_eq!(resp.status(), 404);
        assert_eq!(resp.body(), ROUTE_NOT_FOUND_MESSAGE);
        assert_eq!(sender.attempt_count(), 0);
    }

    #[tokio::test]
    async fn empty_body_on_connect_acknowledged() {
        let (handler, _) = setup();
        assert_eq!(handler.handle(&event("c1", "$connect", Some(""))).await, HandlerResponse::ok());
    }

    #[tokio::test]
    async fn missing_context_is_400() {
        let (handler, _) = setup();
        let resp = handler
            .handle(&InboundEvent {
                request_context: None,
                body: Some("{}".into()),
            })
            .await;
        assert_eq!(resp.status(), 400);
        assert_eq!(resp.body(), INVALID_CONTEXT_MESSAGE);
    }

    #[tokio::test]
    async fn delivery_failures_do_not_change_response() {
        let (handler, sender) = setup();
        handler
            .router()
            .registry()
            .upsert("dead".into(), Some("zombie".into()));
        sender.fail("dead", crate::peer::SendError::Gone);
        let resp = handler
            .handle(&event("c1", "sendPublic", Some(r#"{"message":"hi"}"#)))
            .await;
        // c1 is not a participant; nothing sent, still acknowledged
        assert!(resp.is_success());

        let _ = handler
            .handle(&event("c1", "setName", Some(r#"{"name":"alice"}"#)))
            .await;
        let resp = handler
            .handle(&event("c1", "sendPublic", Some(r#"{"message":"hi"}"#)))
            .await;
        assert!(resp.is_success());
        assert!(!handler.router().registry().contains(&"dead".into()));
        assert_eq!(
            sender.received("c1").last(),
            Some(&json!({"publicMessage": "alice: hi"}))
        );
    }

    #[tokio::test]
    async fn rejection_is_logged() {
        let (logs, _guard) = capture_logs();
        let (handler, _) = setup();
        let _ = handler.handle(&event("c1", "nope", None)).await;
        assert!(logs.has_event(Level::WARN, "rejected event"));
    }

    #[test]
    fn response_json_shape() {
        let json = HandlerResponse::ok().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, json!({"statusCode": 200, "body": "Hello from Lambda!"}));
    }

    #[test]
    fn response_from_error() {
        let resp: HandlerResponse = RequestError::UnknownRoute {
            route_key: "x".into(),
        }
        .into();
        assert_eq!(resp.status(), 404);
        assert!(!resp.is_success());
    }
}
