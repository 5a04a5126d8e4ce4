//! # huddle-server
//!
//! Axum HTTP + `WebSocket` gateway for the huddle relay.
//!
//! - `GET /ws`: one session per socket; frames become relay events routed by
//!   their `action` field, rejections are echoed back
//! - Outbound delivery through per-socket queues ([`WsPeerSender`])
//! - Heartbeat pings with idle timeout
//! - `GET /health`, `GET /metrics`
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::ServerError;
pub use server::{AppState, HuddleServer};
pub use shutdown::{DrainOutcome, ShutdownCoordinator};
pub use websocket::peers::{PeerTable, WsPeerSender};
