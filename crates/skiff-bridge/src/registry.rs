//! Connection registry — the set of live socket connections.
//!
//! Mutated by network I/O tasks (add on handshake success, remove on
//! channel close) and read concurrently by worker threads executing script
//! responses, so the map must tolerate concurrent add/remove/iterate.
//! Sending to a connection that has since closed is a silent no-op, never
//! an error: the registry may briefly hold stale entries between the peer
//! disappearing and the close notification landing.

use std::sync::Arc;

use dashmap::DashMap;
use skiff_core::{ConnectionHandle, ConnectionId, OutboundFrame};
use tracing::debug;

/// Concurrent set of open connections, keyed by connection identity.
///
/// Holds non-owning (`Arc`) references; connection lifetime is governed by
/// the transport's connection task, not by the registry.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, conn: Arc<ConnectionHandle>) {
        debug!(id = %conn.id(), "connection registered");
        self.connections.insert(conn.id(), conn);
    }

    pub fn remove(&self, id: ConnectionId) {
        if self.connections.remove(&id).is_some() {
            debug!(%id, "connection deregistered");
        }
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Visit every registered connection. Safe to call while I/O tasks are
    /// adding and removing entries.
    pub fn for_each(&self, mut f: impl FnMut(&Arc<ConnectionHandle>)) {
        for entry in self.connections.iter() {
            f(entry.value());
        }
    }

    /// Send a text message to one connection. Closed or vanished
    /// connections are skipped silently; returns whether the frame was
    /// queued.
    pub fn send_text(&self, conn: &ConnectionHandle, message: impl Into<String>) -> bool {
        conn.send(OutboundFrame::Text(message.into()))
    }

    /// Send a binary message to one connection.
    pub fn send_binary(&self, conn: &ConnectionHandle, data: impl Into<Vec<u8>>) -> bool {
        conn.send(OutboundFrame::Binary(data.into()))
    }

    /// Send a text message to every currently-open connection, skipping
    /// closed ones without error. Returns the number of successful sends.
    pub fn broadcast_text(&self, message: &str) -> usize {
        let mut sent = 0;
        self.for_each(|conn| {
            if conn.send(OutboundFrame::Text(message.to_string())) {
                sent += 1;
            }
        });
        sent
    }
}
