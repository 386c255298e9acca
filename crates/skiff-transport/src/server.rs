//! Web server over axum.
//!
//! One listener serves both worlds: the upgrade endpoint turns socket
//! connections into bridge events, everything else falls through to the
//! HTTP handler chain.

use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use skiff_bridge::{ConnectionRegistry, EventDispatcher, HandshakeTemplate};
use skiff_core::{ConnectionHandle, ConnectionState, OutboundFrame, ScriptEngine, SocketEvent};
use skiff_http::PipelineConfig;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Subprotocols offered during the upgrade handshake. The first one the
/// client also speaks wins.
const SUBPROTOCOLS: [&str; 3] = ["v12.stomp", "v11.stomp", "v10.stomp"];

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid bind address {addr}: {source}")]
    InvalidAddress {
        addr: String,
        source: std::net::AddrParseError,
    },
    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Hostname to bind to.
    pub host: String,
    /// Port to listen on (0 for OS-assigned).
    pub port: u16,
    /// Route for socket upgrades.
    pub socket_path: String,
    /// Path used in the target of requests synthesized from socket events.
    pub dispatch_path: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            socket_path: "/ws".into(),
            dispatch_path: "/websocket".into(),
        }
    }
}

/// Shared state for the upgrade endpoint.
struct SocketState {
    engine: Arc<dyn ScriptEngine>,
    registry: Arc<ConnectionRegistry>,
    shutdown: Arc<AtomicBool>,
    dispatch_path: String,
    local_addr: SocketAddr,
}

/// A running server instance.
pub struct WebServer {
    registry: Arc<ConnectionRegistry>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
    port: u16,
}

impl WebServer {
    /// Bind the listener and start serving.
    ///
    /// The registry and shutdown flag are supplied by the caller so the
    /// engine and the process-level signal handler can share them.
    pub async fn start(
        config: TransportConfig,
        pipeline: PipelineConfig,
        engine: Arc<dyn ScriptEngine>,
        registry: Arc<ConnectionRegistry>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, TransportError> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let addr: SocketAddr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|source| TransportError::InvalidAddress {
                addr: format!("{}:{}", config.host, config.port),
                source,
            })?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let port = local_addr.port();

        let state = Arc::new(SocketState {
            engine: engine.clone(),
            registry: registry.clone(),
            shutdown,
            dispatch_path: config.dispatch_path.clone(),
            local_addr,
        });

        let app = Router::new()
            .route(&config.socket_path, get(ws_upgrade))
            .with_state(state)
            .merge(skiff_http::build_router(
                pipeline,
                engine,
                &config.socket_path,
                Some(local_addr),
            ));

        info!("listening on http://{}:{}", config.host, port);

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await
            .ok();
        });

        Ok(Self {
            registry,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            port,
        })
    }

    /// The actual bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Gracefully stop the server.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("server stopped");
    }
}

async fn ws_upgrade(
    State(state): State<Arc<SocketState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let template = HandshakeTemplate {
        method: Method::GET,
        headers,
        source: Some(peer),
        destination: Some(state.local_addr),
    };
    ws.protocols(SUBPROTOCOLS)
        .on_upgrade(move |socket| handle_socket(socket, state, template))
}

async fn handle_socket(socket: WebSocket, state: Arc<SocketState>, template: HandshakeTemplate) {
    let (conn, mut outbound_rx) = ConnectionHandle::new();
    conn.mark(ConnectionState::Open);
    state.registry.add(conn.clone());
    info!(id = %conn.id(), peer = ?template.source, "socket connected");

    let dispatcher = EventDispatcher::spawn(
        state.engine.clone(),
        conn.clone(),
        template,
        state.dispatch_path.clone(),
        state.shutdown.clone(),
    );
    dispatcher.dispatch(SocketEvent::connect()).await;

    let (mut ws_tx, mut ws_rx) = socket.split();
    loop {
        tokio::select! {
            frame = outbound_rx.recv() => match frame {
                Some(OutboundFrame::Text(text)) => {
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Some(OutboundFrame::Binary(data)) => {
                    if ws_tx.send(Message::Binary(data.into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    dispatcher.dispatch(SocketEvent::text(text.to_string())).await;
                }
                Some(Ok(Message::Binary(data))) => {
                    dispatcher.dispatch(SocketEvent::binary(data)).await;
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = ws_tx.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    warn!(id = %conn.id(), error = %e, "socket read failed");
                    break;
                }
            }
        }
    }

    // Teardown order matters: the connection must already be gone from the
    // registry when the close event reaches the engine.
    conn.mark(ConnectionState::Closing);
    state.registry.remove(conn.id());
    dispatcher.dispatch(SocketEvent::close()).await;
    conn.mark(ConnectionState::Closed);
    debug!(id = %conn.id(), "socket closed");
}
