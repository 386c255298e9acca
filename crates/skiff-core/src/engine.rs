//! The script engine contract — the seam between skiff and the execution
//! runtime.
//!
//! The engine is a synchronous, one-shot consumer: it receives a
//! request-shaped value and a stream-style writer, and is always invoked on
//! a worker thread (never a network I/O thread), so it may block on the
//! writer. The ambient request is also available through
//! [`crate::context::current_request`] for code with no request parameter
//! in scope.

use std::io::Write;

use crate::error::EngineError;
use crate::request::ScriptRequest;

/// Implemented by the scripting/execution runtime.
pub trait ScriptEngine: Send + Sync + 'static {
    /// Handle one request, writing any output to `out`.
    ///
    /// Errors are contained by the caller: for socket events the dispatcher
    /// logs and drops them; for HTTP requests they become a 500 response.
    fn handle(&self, request: &ScriptRequest, out: &mut dyn Write) -> Result<(), EngineError>;

    /// File extensions (without the dot) this engine executes. The HTTP
    /// layer routes matching paths through the engine instead of the static
    /// file service.
    fn extensions(&self) -> &[String];
}
