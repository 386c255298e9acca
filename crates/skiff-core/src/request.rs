//! The request shape handed to the script engine.
//!
//! A [`ScriptRequest`] is built per HTTP request by the HTTP layer, and per
//! socket event by the event dispatcher. For socket events the request is
//! synthetic: it never arrived from a network client, it reuses the original
//! upgrade request as a template so engine code sees the same cookies,
//! method, and addresses it would see on an ordinary page request.

use std::net::SocketAddr;
use std::sync::Arc;

use http::{HeaderMap, Method};

use crate::connection::ConnectionHandle;
use crate::event::EventPayload;
use crate::synthetic::SyntheticConnection;

/// The transport a request arrived on, as seen by the execution pipeline.
///
/// Kept as a closed variant rather than a wide connection interface: the
/// pipeline only ever asks for the handful of capabilities
/// [`SyntheticConnection`] exposes, and a variant fails loudly if the
/// pipeline grows a new requirement instead of silently misbehaving.
#[derive(Debug, Clone)]
pub enum RequestTransport {
    /// A live HTTP exchange; output flows back through the response body.
    Http,
    /// A stand-in for a request synthesized from a socket event. Output is
    /// discarded; replies go through the connection registry.
    Synthetic(SyntheticConnection),
}

impl RequestTransport {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::Synthetic(_))
    }
}

/// Out-of-band data riding on a synthetic request: the event payload (absent
/// for Connect/Close) and the live connection the event arrived on, in that
/// order.
#[derive(Debug, Clone)]
pub struct SocketAttachment {
    pub payload: Option<EventPayload>,
    pub connection: Arc<ConnectionHandle>,
}

/// A request-shaped value consumed by the script engine.
#[derive(Debug, Clone)]
pub struct ScriptRequest {
    /// HTTP method; for synthetic requests, copied from the upgrade request.
    pub method: Method,
    /// Request path plus query string.
    pub target: String,
    /// For synthetic requests: the upgrade request's headers minus `Upgrade`.
    pub headers: HeaderMap,
    /// Peer address.
    pub source: Option<SocketAddr>,
    /// Local (server) address.
    pub destination: Option<SocketAddr>,
    /// Which transport this request arrived on.
    pub transport: RequestTransport,
    /// Present only on requests synthesized from socket events.
    pub attachment: Option<SocketAttachment>,
}

impl ScriptRequest {
    /// Path component of the target, without the query string.
    pub fn path(&self) -> &str {
        match self.target.split_once('?') {
            Some((path, _)) => path,
            None => &self.target,
        }
    }

    /// Value of a query parameter, if present.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        let query = self.target.split_once('?')?.1;
        query.split('&').find_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            (k == name).then_some(v)
        })
    }
}
