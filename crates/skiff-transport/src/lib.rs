//! The listener: binds the port, upgrades socket connections, and wires the
//! event bridge and the HTTP handler chain into one router.

pub mod server;

pub use server::{TransportConfig, TransportError, WebServer};
