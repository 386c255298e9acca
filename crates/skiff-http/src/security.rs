//! Hidden-file filter.
//!
//! Any request whose path contains a segment starting with `.` is answered
//! with a plain 404 before the filesystem is consulted, so `.env`,
//! `.git/config`, and friends neither load nor reveal that they exist. This
//! also rejects `..` segments, which keeps the later path-to-filesystem
//! mapping traversal-free.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

/// True when the path has a segment starting with a dot.
pub fn is_hidden_path(path: &str) -> bool {
    path.split('/').any(|segment| segment.starts_with('.'))
}

/// The uniform not-found answer: plain text, no hints.
pub fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain")],
        "Not Found",
    )
        .into_response()
}
