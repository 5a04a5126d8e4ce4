//! `HuddleServer`: axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use huddle_core::ConnectionId;
use huddle_relay::{ConnectionRegistry, EventRouter, RelayHandler};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::metrics::WS_CONNECTIONS_REFUSED_TOTAL;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::peers::{PeerTable, WsPeerSender};
use crate::websocket::session::{SessionConfig, run_ws_session};

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Request handler driving the relay.
    pub handler: RelayHandler,
    /// Open sockets.
    pub peers: Arc<PeerTable>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The chat relay server.
pub struct HuddleServer {
    config: Arc<ServerConfig>,
    handler: RelayHandler,
    peers: Arc<PeerTable>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

impl HuddleServer {
    /// Create a server with an empty registry.
    pub fn new(config: ServerConfig, metrics: Option<PrometheusHandle>) -> Self {
        let peers = Arc::new(PeerTable::new());
        let sender = Arc::new(WsPeerSender::new(Arc::clone(&peers)));
        let router = EventRouter::new(Arc::new(ConnectionRegistry::new()), sender);
        Self {
            config: Arc::new(config),
            handler: RelayHandler::new(router),
            peers,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics,
        }
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            handler: self.handler.clone(),
            peers: Arc::clone(&self.peers),
            config: Arc::clone(&self.config),
            shutdown: Arc::clone(&self.shutdown),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind and serve in the background.
    ///
    /// Returns the bound address and the serve task, which finishes after
    /// [`ShutdownCoordinator::shutdown`].
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, max_connections = self.config.max_connections, "huddle server listening");

        let router = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await });
            if let Err(e) = serve.await {
                error!(error = %e, "server terminated");
            }
        });
        Ok((local_addr, handle))
    }

    /// The relay request handler.
    pub fn handler(&self) -> &RelayHandler {
        &self.handler
    }

    /// The chat participant registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.handler.router().registry()
    }

    /// Open sockets.
    pub fn peers(&self) -> &Arc<PeerTable> {
        &self.peers
    }

    /// The shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /ws
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let open = state.peers.len().await;
    if open >= state.config.max_connections {
        warn!(open, max = state.config.max_connections, "connection limit reached, refusing upgrade");
        counter!(WS_CONNECTIONS_REFUSED_TOTAL).increment(1);
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    }

    let session = SessionConfig {
        heartbeat_interval: state.config.heartbeat_interval(),
        heartbeat_timeout: state.config.heartbeat_timeout(),
        send_queue_capacity: state.config.send_queue_capacity,
    };
    let token = state.shutdown.token();
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| {
            run_ws_session(
                socket,
                ConnectionId::new(),
                state.handler,
                state.peers,
                session,
                token,
            )
        })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.peers.len().await;
    Json(health::health_check(
        state.start_time,
        connections,
        state.handler.router().registry(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
