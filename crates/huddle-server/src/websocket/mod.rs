//! WebSocket gateway: per-socket sessions, outbound queues, and the
//! [`PeerSender`](huddle_relay::PeerSender) implementation over them.

pub mod connection;
pub mod peers;
pub mod session;
