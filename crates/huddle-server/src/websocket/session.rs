//! WebSocket session lifecycle: one connected socket from upgrade through
//! disconnect.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use huddle_core::{ConnectionId, InboundEvent};
use huddle_relay::RelayHandler;
use metrics::{counter, gauge, histogram};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::connection::PeerConnection;
use super::peers::PeerTable;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};

/// Route key fed when a socket opens.
pub const CONNECT_ROUTE: &str = "$connect";
/// Route key fed when a socket closes.
pub const DISCONNECT_ROUTE: &str = "$disconnect";
/// Route key for frames that name no `action`.
pub const DEFAULT_ROUTE: &str = "$default";

/// Per-session timing and queue settings.
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// Interval between server pings.
    pub heartbeat_interval: Duration,
    /// Silence after which the socket is closed.
    pub heartbeat_timeout: Duration,
    /// Outbound queue depth.
    pub send_queue_capacity: usize,
}

/// Turn an inbound text frame into an event.
///
/// The frame's string `action` field selects the route; anything else
/// (including a frame that is not JSON) goes to [`DEFAULT_ROUTE`]. The raw
/// frame is the body.
pub fn frame_event(id: &ConnectionId, frame: &str) -> InboundEvent {
    let route = serde_json::from_str::<Value>(frame)
        .ok()
        .and_then(|v| v.get("action").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| DEFAULT_ROUTE.to_owned());
    InboundEvent::new(id.clone(), route, Some(frame.to_owned()))
}

/// Drive one socket until it closes, times out, or `shutdown` fires.
///
/// 1. Registers the socket in `peers` and feeds `$connect`
/// 2. Forwards queued payloads to the socket and pings on an interval
/// 3. Feeds every text frame through `handler`, echoing rejections back
/// 4. On exit, closes the outbound queue, feeds `$disconnect`, and
///    unregisters the socket
#[instrument(skip_all, fields(conn_id = %id))]
pub async fn run_ws_session(
    ws: WebSocket,
    id: ConnectionId,
    handler: RelayHandler,
    peers: Arc<PeerTable>,
    config: SessionConfig,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(config.send_queue_capacity.max(1));
    let connection = Arc::new(PeerConnection::new(id.clone(), send_tx));

    let started = Instant::now();
    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    peers.add(Arc::clone(&connection)).await;
    dispatch(&handler, &connection, &InboundEvent::new(id.clone(), CONNECT_ROUTE, None)).await;

    // Cancelled by whichever side stops first.
    let closed = shutdown.child_token();

    let writer_conn = Arc::clone(&connection);
    let writer_closed = closed.clone();
    let writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(config.heartbeat_interval);
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(Message::Text(String::clone(&text).into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if writer_conn.idle_for() > config.heartbeat_timeout {
                        warn!(timeout = ?config.heartbeat_timeout, "client unresponsive, disconnecting");
                        break;
                    }
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
                () = writer_closed.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
        writer_closed.cancel();
    });

    loop {
        let frame = tokio::select! {
            () = closed.cancelled() => break,
            frame = ws_rx.next() => frame,
        };
        let Some(Ok(msg)) = frame else { break };
        connection.mark_alive();

        let text = match msg {
            Message::Text(t) => t.to_string(),
            Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                Ok(s) => s,
                Err(_) => {
                    debug!(len = data.len(), "ignoring non-UTF8 binary frame");
                    continue;
                }
            },
            Message::Close(_) => {
                info!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        dispatch(&handler, &connection, &frame_event(&id, &text)).await;
    }

    // The departing socket's queue is closed before `$disconnect` runs, so
    // anything still addressed to it reports Gone.
    closed.cancel();
    writer.abort();
    let _ = writer.await;

    dispatch(&handler, &connection, &InboundEvent::new(id.clone(), DISCONNECT_ROUTE, None)).await;
    let _ = peers.remove(&id).await;

    info!(duration_secs = started.elapsed().as_secs(), "client disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
}

/// Run `event` through the handler, echoing any rejection to the socket.
async fn dispatch(handler: &RelayHandler, connection: &PeerConnection, event: &InboundEvent) {
    let response = handler.handle(event).await;
    if response.is_success() {
        return;
    }
    match response.to_json() {
        Ok(json) => {
            if let Err(e) = connection.enqueue(Arc::new(json)) {
                debug!(error = %e, status = response.status(), "could not echo rejection");
            }
        }
        Err(e) => warn!(error = %e, "failed to serialize handler response"),
    }
}
