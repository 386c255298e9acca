//! Error types shared across the bridge and HTTP layers.

use thiserror::Error;

/// Failures inside the event-to-request bridge.
///
/// Dispatch failures are contained: the dispatcher logs them, drops the
/// event, and leaves the connection open. They never propagate to the
/// transport layer.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Synthetic request construction or hand-off failed.
    #[error("failed to dispatch socket event: {0}")]
    Dispatch(String),

    /// The worker-side engine invocation panicked.
    #[error("script engine panicked while handling {0}")]
    EnginePanic(String),
}

/// Outcome of offering an event to the dispatcher.
///
/// `Skipped` is not an error: it is the documented behavior when the server
/// is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The event was queued for in-order processing.
    Dispatched,
    /// The event was silently dropped (global shutdown in progress, or the
    /// connection's event queue is already gone).
    Skipped,
}

/// Failures surfaced by the script engine for a single request.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The script itself failed.
    #[error("script error: {0}")]
    Script(String),

    /// Writing output failed. A write failure on a real transport indicates
    /// a broken socket and is not swallowed.
    #[error("output write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script(message.into())
    }
}
