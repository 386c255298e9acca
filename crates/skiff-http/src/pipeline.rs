//! Assembly of the HTTP handler chain.
//!
//! Request flow: hidden-file filter, optional framework rewrite, welcome
//! file resolution, then either the script engine (paths with an engine
//! extension) or the static file service. Health routes sit beside the
//! chain; gzip wraps the whole thing.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use skiff_core::{RequestTransport, ScriptEngine, ScriptRequest};
use tower::util::ServiceExt;
use tower_http::compression::predicate::SizeAbove;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tracing::debug;

use crate::health::{self, HealthOptions};
use crate::rewrite::FrameworkRewrites;
use crate::script;
use crate::security::{is_hidden_path, not_found};
use crate::welcome::{Resolution, WelcomeFiles};

/// Responses below this size are not worth compressing.
const GZIP_MIN_BYTES: u16 = 1500;

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub webroot: PathBuf,
    /// Front-controller file for framework rewrites; `None` disables them.
    pub rewrite_file: Option<String>,
    pub health: HealthOptions,
}

struct PipelineState {
    webroot: PathBuf,
    engine: Arc<dyn ScriptEngine>,
    welcome: WelcomeFiles,
    rewrites: Option<FrameworkRewrites>,
    static_files: ServeDir,
    local_addr: Option<SocketAddr>,
}

impl PipelineState {
    /// Script paths either end in an engine extension or contain one as an
    /// interior segment (front-controller style, `/index.ext/extra/path`).
    fn is_script_path(&self, path: &str) -> bool {
        self.engine.extensions().iter().any(|ext| {
            let marker = format!(".{ext}");
            path.ends_with(&marker) || path.contains(&format!("{marker}/"))
        })
    }
}

/// Build the complete HTTP router for one server instance.
///
/// `socket_path` is the websocket endpoint the rewrite rules must leave
/// alone; `local_addr` is the listener's bound address, stamped on every
/// script request as its destination.
pub fn build_router(
    config: PipelineConfig,
    engine: Arc<dyn ScriptEngine>,
    socket_path: &str,
    local_addr: Option<SocketAddr>,
) -> Router {
    let welcome = WelcomeFiles::new(engine.extensions());
    let rewrites = config
        .rewrite_file
        .as_ref()
        .map(|file| FrameworkRewrites::new(file.clone(), engine.extensions(), socket_path));
    let state = Arc::new(PipelineState {
        static_files: ServeDir::new(&config.webroot).append_index_html_on_directories(false),
        webroot: config.webroot,
        engine,
        welcome,
        rewrites,
        local_addr,
    });

    let mut router = Router::new().fallback(serve).with_state(state);
    if config.health.enabled {
        router = router.merge(health::router(config.health));
    }
    router.layer(CompressionLayer::new().compress_when(SizeAbove::new(GZIP_MIN_BYTES)))
}

async fn serve(
    State(state): State<Arc<PipelineState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
) -> Response {
    let original = req.uri().path().to_string();
    if is_hidden_path(&original) {
        return not_found();
    }

    let mut path = original.clone();
    if let Some(rewrites) = &state.rewrites {
        if let Some(rewritten) = rewrites.apply(&state.webroot, &path) {
            debug!(from = %path, to = %rewritten, "framework rewrite");
            path = rewritten;
        }
    }
    match state.welcome.resolve(&state.webroot, &path) {
        Some(Resolution::Redirect(to)) => {
            return (StatusCode::FOUND, [(header::LOCATION, to)]).into_response();
        }
        Some(Resolution::Rewrite(to)) => path = to,
        None => {}
    }

    let query = req.uri().query().map(str::to_string);
    if state.is_script_path(&path) {
        let target = match &query {
            Some(q) => format!("{path}?{q}"),
            None => path,
        };
        let request = ScriptRequest {
            method: req.method().clone(),
            target,
            headers: req.headers().clone(),
            source: Some(peer),
            destination: state.local_addr,
            transport: RequestTransport::Http,
            attachment: None,
        };
        return script::execute(state.engine.clone(), request).await;
    }

    serve_static(&state, req, &original, &path, query.as_deref()).await
}

async fn serve_static(
    state: &PipelineState,
    req: Request,
    original: &str,
    path: &str,
    query: Option<&str>,
) -> Response {
    let (mut parts, _) = req.into_parts();
    if path != original {
        let target = match query {
            Some(q) => format!("{path}?{q}"),
            None => path.to_string(),
        };
        parts.uri = match Uri::try_from(target) {
            Ok(uri) => uri,
            Err(_) => return not_found(),
        };
    }
    let req = Request::from_parts(parts, Body::empty());
    match state.static_files.clone().oneshot(req).await {
        Ok(response) => response.into_response(),
        Err(infallible) => match infallible {},
    }
}
