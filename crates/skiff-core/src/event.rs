//! Socket lifecycle events.
//!
//! Frames arriving on a live socket are decoded once at the transport
//! boundary into these closed variants. The string form of the event kind
//! only exists in the synthesized request target (`eventType=...`); internal
//! logic never carries it as a string.

use bytes::Bytes;

/// The closed set of lifecycle notifications a socket connection can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connect,
    TextMessage,
    BinaryMessage,
    Close,
}

impl EventKind {
    /// Wire name used in the synthesized dispatch target.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "Connect",
            Self::TextMessage => "TextMessage",
            Self::BinaryMessage => "BinaryMessage",
            Self::Close => "Close",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a message event. Connect/Close events carry none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    Text(String),
    Binary(Bytes),
}

impl EventPayload {
    /// The payload as UTF-8 text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Binary(_) => None,
        }
    }

    /// The raw payload bytes regardless of kind.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Binary(b) => b,
        }
    }
}

/// One lifecycle event on one connection. Ephemeral: constructed and
/// consumed within a single dispatch.
#[derive(Debug, Clone)]
pub struct SocketEvent {
    pub kind: EventKind,
    pub payload: Option<EventPayload>,
}

impl SocketEvent {
    pub fn connect() -> Self {
        Self { kind: EventKind::Connect, payload: None }
    }

    pub fn text(message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::TextMessage,
            payload: Some(EventPayload::Text(message.into())),
        }
    }

    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self {
            kind: EventKind::BinaryMessage,
            payload: Some(EventPayload::Binary(data.into())),
        }
    }

    pub fn close() -> Self {
        Self { kind: EventKind::Close, payload: None }
    }
}
