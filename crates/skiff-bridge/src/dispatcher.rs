//! Event dispatcher — turns socket events into synthetic script requests.
//!
//! Each connection gets a dispatcher when its handshake completes. Events
//! are queued and processed strictly in arrival order by a per-connection
//! pump task; events for different connections are processed concurrently
//! with no ordering guarantee relative to each other. Building the
//! synthetic request is cheap and happens on the pump task; invoking the
//! engine happens on a worker thread via `spawn_blocking`, with the request
//! context installed for the duration of the call and restored afterwards
//! on every exit path.
//!
//! Engine failures (errors and panics alike) are logged and contained: the
//! event is dropped, the connection stays open, and nothing propagates to
//! the transport layer.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use http::{HeaderMap, Method, header};
use skiff_core::{
    BridgeError, ConnectionHandle, ContextGuard, DispatchOutcome, RequestTransport, ScriptEngine,
    ScriptRequest, SocketAttachment, SocketEvent, SyntheticConnection,
};
use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, error, warn};

/// Method name in the synthesized dispatch target's query string.
pub const DISPATCH_METHOD: &str = "onProcess";

/// Per-connection backlog of events awaiting in-order processing. Frame
/// reads on the connection back off once the queue is full.
const EVENT_QUEUE_DEPTH: usize = 64;

/// Everything copied from the original upgrade request into each synthetic
/// request: header template, method, and the addresses of the socket.
#[derive(Debug, Clone)]
pub struct HandshakeTemplate {
    pub method: Method,
    pub headers: HeaderMap,
    pub source: Option<SocketAddr>,
    pub destination: Option<SocketAddr>,
}

/// Accepts lifecycle events for one connection and feeds them, in order,
/// through the script engine.
pub struct EventDispatcher {
    queue: mpsc::Sender<SocketEvent>,
    shutdown: Arc<AtomicBool>,
}

impl EventDispatcher {
    /// Install a dispatcher for a freshly-upgraded connection, spawning its
    /// pump task.
    pub fn spawn(
        engine: Arc<dyn ScriptEngine>,
        conn: Arc<ConnectionHandle>,
        template: HandshakeTemplate,
        dispatch_path: impl Into<String>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        tokio::spawn(pump(engine, conn, template, dispatch_path.into(), shutdown.clone(), rx));
        Self { queue: tx, shutdown }
    }

    /// Offer an event for dispatch. Non-blocking for all practical purposes
    /// (awaits only when the per-connection queue is full). During global
    /// shutdown events are dropped silently.
    pub async fn dispatch(&self, event: SocketEvent) -> DispatchOutcome {
        if self.shutdown.load(Ordering::Relaxed) {
            return DispatchOutcome::Skipped;
        }
        match self.queue.send(event).await {
            Ok(()) => DispatchOutcome::Dispatched,
            Err(_) => {
                debug!(
                    error = %BridgeError::Dispatch("connection event queue is gone".into()),
                    "event dropped"
                );
                DispatchOutcome::Skipped
            }
        }
    }
}

/// Build the synthetic request for one event.
///
/// Headers are the handshake headers minus the `Upgrade` negotiation
/// header; nothing else is added or dropped. The target is the fixed
/// dispatch path with the event kind as a query parameter, e.g.
/// `/websocket?method=onProcess&eventType=TextMessage`. The event payload
/// and the live connection ride along as an out-of-band attachment.
pub fn build_synthetic_request(
    template: &HandshakeTemplate,
    conn: &Arc<ConnectionHandle>,
    event: SocketEvent,
    dispatch_path: &str,
) -> ScriptRequest {
    let mut headers = HeaderMap::with_capacity(template.headers.len());
    for (name, value) in &template.headers {
        if name != header::UPGRADE {
            headers.append(name.clone(), value.clone());
        }
    }

    ScriptRequest {
        method: template.method.clone(),
        target: format!("{dispatch_path}?method={DISPATCH_METHOD}&eventType={}", event.kind),
        headers,
        source: template.source,
        destination: template.destination,
        transport: RequestTransport::Synthetic(SyntheticConnection::new(
            conn.buffer_pool().clone(),
        )),
        attachment: Some(SocketAttachment {
            payload: event.payload,
            connection: conn.clone(),
        }),
    }
}

async fn pump(
    engine: Arc<dyn ScriptEngine>,
    conn: Arc<ConnectionHandle>,
    template: HandshakeTemplate,
    dispatch_path: String,
    shutdown: Arc<AtomicBool>,
    mut rx: mpsc::Receiver<SocketEvent>,
) {
    while let Some(event) = rx.recv().await {
        // Events that were already queued when shutdown began are dropped
        // here; in-flight engine invocations are never cancelled.
        if shutdown.load(Ordering::Relaxed) {
            continue;
        }

        let kind = event.kind;
        let request = Arc::new(build_synthetic_request(&template, &conn, event, &dispatch_path));

        let engine = engine.clone();
        let invocation = task::spawn_blocking(move || {
            let _guard = ContextGuard::enter(request.clone());
            // Output of an event-synthesized request is intentionally
            // thrown away; replies go through the registry.
            let mut out = crate::blocking::BlockingWriter::discard();
            engine.handle(&request, &mut out)
        });

        // Awaiting the invocation before pulling the next event is what
        // gives per-connection arrival-order processing.
        match invocation.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(id = %conn.id(), event = %kind, error = %e, "script engine failed; event dropped");
            }
            Err(join_err) if join_err.is_panic() => {
                error!(
                    id = %conn.id(),
                    error = %BridgeError::EnginePanic(kind.to_string()),
                    "event dropped"
                );
            }
            Err(_) => {
                // Runtime is tearing down; nothing left to do.
                return;
            }
        }
    }
    debug!(id = %conn.id(), "event pump finished");
}
