//! The HTTP side of the server: a thin handler chain over `tower-http`.
//!
//! Almost everything here delegates to the underlying libraries. The pieces
//! that are ours:
//!
//! - [`script`] runs requests targeting a script extension through the same
//!   synchronous engine contract the event bridge uses, streaming the
//!   engine's blocking writes out as the response body.
//! - [`security`] hides dotfiles with a plain 404.
//! - [`welcome`] maps directory URLs to welcome files.
//! - [`rewrite`] sends framework-style pretty URLs to a front controller.
//! - [`health`] serves the operational check endpoints.
//! - [`pipeline`] assembles the above, plus static files and gzip, into one
//!   `axum::Router`.

pub mod health;
pub mod pipeline;
pub mod rewrite;
pub mod script;
pub mod security;
pub mod welcome;

pub use health::HealthOptions;
pub use pipeline::{build_router, PipelineConfig};
pub use rewrite::FrameworkRewrites;
pub use welcome::{Resolution, WelcomeFiles};
