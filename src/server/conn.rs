use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;

use mio::net::TcpStream;

use crate::router::StreamHandler;
use crate::server::Request;
use crate::sse::{SseQueue, SseSender};

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnState {
    /// Accumulating request bytes; the normal request/response cycle.
    Reading,
    /// Held open for SSE; the tick handler feeds the event queue.
    Streaming,
    /// Responses queued; close once the write buffer drains.
    Closing,
}

/// Streaming context attached to a connection once an SSE route matches.
pub(crate) struct SseStream {
    /// The request that opened the stream, kept for the tick handler.
    pub request: Request,
    /// Callback re-invoked once per loop tick.
    pub handler: Arc<StreamHandler>,
    /// Sender half handed to the handler (clonable to other producers).
    pub sender: SseSender,
    /// Queue half drained by the multiplexer.
    pub queue: SseQueue,
}

/// Per-socket state owned exclusively by the event loop. One connection
/// per socket; destroyed on close or protocol error, never shared.
pub(crate) struct Connection {
    pub stream: TcpStream,
    pub peer: SocketAddr,
    /// Bytes received but not yet consumed by the parser.
    pub read_buf: Vec<u8>,
    /// Bytes queued for the socket; `write_pos` marks the unsent tail.
    pub write_buf: Vec<u8>,
    pub write_pos: usize,
    pub state: ConnState,
    pub sse: Option<SseStream>,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            read_buf: Vec::new(),
            write_buf: Vec::new(),
            write_pos: 0,
            state: ConnState::Reading,
            sse: None,
        }
    }

    /// Unsent bytes still queued for this socket.
    pub fn pending_write(&self) -> usize {
        self.write_buf.len() - self.write_pos
    }

    /// Append bytes to the outbound queue.
    pub fn queue_bytes(&mut self, bytes: &[u8]) {
        self.write_buf.extend_from_slice(bytes);
    }

    /// Read everything currently available on the socket into `read_buf`.
    ///
    /// Returns `Ok(true)` while the peer is still connected, `Ok(false)`
    /// on a clean EOF. `WouldBlock` ends the read without error.
    pub fn fill_read_buf(&mut self) -> io::Result<bool> {
        let mut chunk = [0u8; 4096];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => return Ok(false),
                Ok(n) => self.read_buf.extend_from_slice(&chunk[..n]),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(true),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Write as much of the pending buffer as the socket accepts; partial
    /// writes resume from the unsent remainder on the next tick.
    pub fn flush(&mut self) -> io::Result<()> {
        while self.write_pos < self.write_buf.len() {
            match self.stream.write(&self.write_buf[self.write_pos..]) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => self.write_pos += n,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        if self.write_pos == self.write_buf.len() {
            self.write_buf.clear();
            self.write_pos = 0;
        }
        Ok(())
    }
}
