//! Script execution for ordinary HTTP requests.
//!
//! The engine keeps its synchronous, one-shot contract: it runs on a worker
//! thread with the request context installed and writes the response body
//! through a [`BlockingWriter`]. Here the writer's channel is a bounded byte
//! queue drained by the async side, so a script that outruns the client
//! blocks on its own `write` call instead of buffering the whole body.

use std::io;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::StreamExt;
use skiff_bridge::{BlockingWriter, SinkChannel};
use skiff_core::{ContextGuard, EngineError, ScriptEngine, ScriptRequest};
use tokio::sync::mpsc;
use tracing::{error, warn};

/// Body chunks buffered between the worker thread and the response stream.
const RESPONSE_CHANNEL_DEPTH: usize = 16;

/// Channel end handed to the blocking writer: each flushed buffer becomes
/// one body chunk. `write` blocks until the async side has room, which is
/// the whole await-writable story for this channel.
struct ResponseSink {
    tx: mpsc::Sender<Bytes>,
}

impl SinkChannel for ResponseSink {
    fn await_writable(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx
            .blocking_send(Bytes::copy_from_slice(buf))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response body closed"))?;
        Ok(buf.len())
    }
}

/// Run `request` through the engine and stream its output as the response.
///
/// A failure before the first byte reaches the channel becomes a 500; a
/// failure mid-body can only be logged, the status line is long gone.
pub async fn execute(engine: Arc<dyn ScriptEngine>, request: ScriptRequest) -> Response {
    let request = Arc::new(request);
    let target = request.target.clone();
    let (tx, mut rx) = mpsc::channel::<Bytes>(RESPONSE_CHANNEL_DEPTH);

    let task = tokio::task::spawn_blocking(move || {
        let _guard = ContextGuard::enter(request.clone());
        let mut out = BlockingWriter::new(Box::new(ResponseSink { tx }));
        engine.handle(&request, &mut out)?;
        out.close()?;
        Ok::<(), EngineError>(())
    });

    // Wait for the first chunk. If the sender drops without producing one,
    // the engine either finished with an empty body or failed before
    // committing anything, and the task outcome tells us which.
    match rx.recv().await {
        Some(first) => {
            tokio::spawn(async move {
                match task.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(%target, error = %e, "script failed mid-response"),
                    Err(e) if e.is_panic() => error!(%target, "script panicked mid-response"),
                    Err(_) => {}
                }
            });
            let rest = futures_util::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|chunk| (Ok::<_, io::Error>(chunk), rx))
            });
            let body = Body::from_stream(
                futures_util::stream::iter([Ok(first)]).chain(rest),
            );
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response()
        }
        None => match task.await {
            Ok(Ok(())) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                Body::empty(),
            )
                .into_response(),
            Ok(Err(e)) => {
                warn!(%target, error = %e, "script failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Script execution failed").into_response()
            }
            Err(e) => {
                if e.is_panic() {
                    error!(%target, "script panicked");
                }
                (StatusCode::INTERNAL_SERVER_ERROR, "Script execution failed").into_response()
            }
        },
    }
}
