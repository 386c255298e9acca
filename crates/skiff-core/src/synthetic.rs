//! The synthetic connection — a network-connection stand-in with no socket.
//!
//! The execution pipeline is written against a transport that assumes real
//! I/O. Requests synthesized from socket events satisfy that contract with
//! inert implementations restricted to the operations the pipeline actually
//! exercises: buffer pool access, a sink that discards, a source that is
//! already at end-of-input, and an always-open flag. Real output for socket
//! events goes through the connection registry, never through this type.

use std::io;

use crate::connection::BufferPool;

/// Stand-in for the connection owning a synthetic request.
#[derive(Debug, Clone)]
pub struct SyntheticConnection {
    buffers: BufferPool,
}

impl SyntheticConnection {
    /// Build a synthetic connection sharing the real connection's buffer
    /// pool.
    pub fn new(buffers: BufferPool) -> Self {
        Self { buffers }
    }

    /// Synthetic connections are never closed; their lifetime is the single
    /// dispatch that created them.
    pub fn is_open(&self) -> bool {
        true
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffers
    }

    /// Sink channel stand-in. Writes are accepted and discarded.
    pub fn sink(&self) -> DiscardSink {
        DiscardSink
    }

    /// Source channel stand-in. Always reports end-of-input; no inbound
    /// body is possible on a synthesized event.
    pub fn source(&self) -> EmptySource {
        EmptySource
    }

    /// Out-of-band responses require a real transport.
    ///
    /// # Panics
    ///
    /// Always. Calling this on a synthetic connection is a programming
    /// error in the pipeline, not a runtime condition to recover from.
    pub fn send_out_of_band(&self) -> ! {
        panic!("out-of-band responses are not supported on a synthetic connection");
    }
}

/// Write sink whose input is accepted and thrown away.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

impl io::Write for DiscardSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Read source that is permanently at end-of-input.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySource;

impl io::Read for EmptySource {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }
}
