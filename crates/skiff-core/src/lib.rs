//! Skiff core types.
//!
//! This crate is the single source of truth for the domain model shared by
//! the transport, bridge, and HTTP layers: socket lifecycle events, the
//! synthesized request shape handed to the script engine, connection
//! handles and buffer pooling, the thread-scoped request context, and the
//! engine contract itself.

pub mod connection;
pub mod context;
pub mod engine;
pub mod error;
pub mod event;
pub mod request;
pub mod synthetic;

pub use connection::{
    BufferPool, ConnectionHandle, ConnectionId, ConnectionState, OutboundFrame,
    DEFAULT_BUFFER_SIZE,
};
pub use context::{current_request, ContextGuard};
pub use engine::ScriptEngine;
pub use error::{BridgeError, DispatchOutcome, EngineError};
pub use event::{EventKind, EventPayload, SocketEvent};
pub use request::{RequestTransport, ScriptRequest, SocketAttachment};
pub use synthetic::{DiscardSink, EmptySource, SyntheticConnection};
