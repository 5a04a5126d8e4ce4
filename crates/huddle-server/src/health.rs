//! `/health` endpoint.

use huddle_relay::ConnectionRegistry;
use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Open WebSocket connections.
    pub connections: usize,
    /// Registered chat participants.
    pub participants: usize,
}

/// Build a health response from the open socket count and the registry.
///
/// Sockets that have not sent `setName` are connections but not participants.
pub fn health_check(
    start_time: Instant,
    connections: usize,
    registry: &ConnectionRegistry,
) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        participants: registry.len(),
    }
}
