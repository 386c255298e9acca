//! The event-to-synthetic-request bridge.
//!
//! Socket lifecycle events arrive as asynchronous, frame-oriented callbacks
//! on network I/O tasks; the script engine expects a blocking, one-shot
//! request/response call on a worker thread. This crate closes that gap:
//!
//! - [`ConnectionRegistry`] tracks live connections for targeted sends and
//!   broadcast.
//! - [`EventDispatcher`] turns each event into a synthetic [`ScriptRequest`]
//!   and drives the engine on a worker thread, in per-connection arrival
//!   order, with the request context installed around every invocation.
//! - [`BlockingWriter`] adapts synchronous stream-style writes onto channels
//!   whose native write primitive is non-blocking.
//!
//! The synthetic connection stand-in itself lives in `skiff-core` (the
//! request model embeds it) and is re-exported here.
//!
//! [`ScriptRequest`]: skiff_core::ScriptRequest

pub mod blocking;
pub mod dispatcher;
pub mod registry;

pub use blocking::{BlockingWriter, SinkChannel};
pub use dispatcher::{EventDispatcher, HandshakeTemplate};
pub use registry::ConnectionRegistry;
pub use skiff_core::synthetic::{DiscardSink, EmptySource, SyntheticConnection};
