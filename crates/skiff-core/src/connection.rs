//! Live socket connections: identity, state, outbound frames, buffer pool.
//!
//! A [`ConnectionHandle`] is created by the transport on handshake success
//! and shared (via `Arc`) with the registry, the dispatcher, and any script
//! request attachments that reference the connection. The handle never owns
//! the socket (the transport's connection task does); it only carries the
//! outbound frame queue and the state flag.

use std::sync::atomic::{AtomicU8, Ordering};

use bytes::BytesMut;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Size of pooled buffers and of the blocking output adapter's staging
/// buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Unique identity of one live socket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a connection as seen by the dispatcher.
///
/// `Closed` is terminal. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// A frame queued for delivery to the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Binary(Vec<u8>),
}

/// Pool of reusable 1 KiB byte buffers, shared between a real connection
/// and any synthetic connections synthesized from its events.
#[derive(Debug, Clone, Default)]
pub struct BufferPool {
    inner: std::sync::Arc<Mutex<Vec<BytesMut>>>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a cleared buffer from the pool, allocating if empty.
    pub fn acquire(&self) -> BytesMut {
        self.inner
            .lock()
            .pop()
            .unwrap_or_else(|| BytesMut::with_capacity(DEFAULT_BUFFER_SIZE))
    }

    /// Return a buffer for reuse. Oversized buffers are dropped instead of
    /// pooled so the pool stays bounded at the standard buffer size.
    pub fn release(&self, mut buf: BytesMut) {
        if buf.capacity() > DEFAULT_BUFFER_SIZE {
            return;
        }
        buf.clear();
        self.inner.lock().push(buf);
    }

    pub fn pooled(&self) -> usize {
        self.inner.lock().len()
    }

    /// Standard buffer size for this pool.
    pub fn buffer_size(&self) -> usize {
        DEFAULT_BUFFER_SIZE
    }
}

/// Shared handle to one live socket connection.
pub struct ConnectionHandle {
    id: ConnectionId,
    state: AtomicU8,
    outbound: mpsc::UnboundedSender<OutboundFrame>,
    buffers: BufferPool,
}

impl ConnectionHandle {
    /// Create a handle in the `Connecting` state together with the receiver
    /// end of its outbound frame queue (drained by the transport's writer
    /// task).
    pub fn new() -> (std::sync::Arc<Self>, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: ConnectionId::new(),
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            outbound: tx,
            buffers: BufferPool::new(),
        };
        (std::sync::Arc::new(handle), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Advance the lifecycle. Backward transitions are ignored: `Closed`
    /// stays closed even if a late `mark(Open)` races in.
    pub fn mark(&self, state: ConnectionState) {
        self.state.fetch_max(state as u8, Ordering::AcqRel);
    }

    /// Queue a frame for the peer. Returns false (never an error) if the
    /// connection is not open or its writer task is gone.
    pub fn send(&self, frame: OutboundFrame) -> bool {
        if !self.is_open() {
            return false;
        }
        self.outbound.send(frame).is_ok()
    }

    /// Byte-buffer pool shared with synthetic connections built from this
    /// connection's events.
    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffers
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}
