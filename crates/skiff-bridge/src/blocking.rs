//! Blocking buffered output adapter.
//!
//! Lets a synchronous, write-and-flush style consumer (the script engine)
//! push bytes into a transport whose native write primitive is
//! non-blocking and may reject writes until the transport reports writable.
//! We do not use plain `BufWriter` because it has no notion of awaiting
//! writability on the underlying channel.
//!
//! Calls may block the calling thread, so the adapter must only ever run on
//! a worker thread, never on a network I/O task. The await-writable loop
//! has no timeout or backpressure limit: a stalled peer can block a worker
//! thread indefinitely.

use std::io;

use skiff_core::DEFAULT_BUFFER_SIZE;

/// A transport channel that can accept partial writes and report
/// writability by blocking.
pub trait SinkChannel: Send {
    /// Block the calling thread until the channel can accept more data.
    fn await_writable(&mut self) -> io::Result<()>;

    /// Write as much of `buf` as the channel will currently take, returning
    /// the number of bytes consumed. May return 0; the caller re-awaits
    /// writability and retries.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Close the channel after the final flush.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Buffered blocking writer over a [`SinkChannel`].
///
/// Guarantees the byte sequence delivered to the channel is identical, and
/// in the same order, to the sequence written by the caller, regardless of
/// chunk boundaries.
pub struct BlockingWriter {
    channel: Option<Box<dyn SinkChannel>>,
    buffer: Vec<u8>,
    capacity: usize,
}

impl BlockingWriter {
    /// Writer flushing into `channel`, staged through a 1 KiB buffer.
    pub fn new(channel: Box<dyn SinkChannel>) -> Self {
        Self::with_capacity(channel, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(channel: Box<dyn SinkChannel>, capacity: usize) -> Self {
        Self {
            channel: Some(channel),
            buffer: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Writer with no transport attached: writes are buffered and thrown
    /// away on flush. Used when output is intentionally discarded, e.g. for
    /// requests synthesized from socket events.
    pub fn discard() -> Self {
        Self {
            channel: None,
            buffer: Vec::with_capacity(DEFAULT_BUFFER_SIZE),
            capacity: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Flush remaining bytes, then close the underlying channel if one is
    /// attached.
    pub fn close(mut self) -> io::Result<()> {
        self.flush_buffer()?;
        if let Some(channel) = self.channel.as_mut() {
            channel.close()?;
        }
        Ok(())
    }

    /// Drain the staging buffer into the channel: loop awaiting writability
    /// and performing partial writes until fully drained, then reset the
    /// buffer for reuse. With no channel attached this degenerates to
    /// clearing the buffer.
    fn flush_buffer(&mut self) -> io::Result<()> {
        let Some(channel) = self.channel.as_mut() else {
            self.buffer.clear();
            return Ok(());
        };
        let mut pos = 0;
        while pos < self.buffer.len() {
            channel.await_writable()?;
            pos += channel.write(&self.buffer[pos..])?;
        }
        self.buffer.clear();
        Ok(())
    }
}

impl io::Write for BlockingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut remaining = buf;
        while !remaining.is_empty() {
            let room = self.capacity - self.buffer.len();
            let take = room.min(remaining.len());
            self.buffer.extend_from_slice(&remaining[..take]);
            remaining = &remaining[take..];
            if self.buffer.len() == self.capacity {
                self.flush_buffer()?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_buffer()
    }
}
