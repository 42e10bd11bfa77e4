//! Server-Sent Events support.
//!
//! A streaming connection owns the queue half of an SSE channel; handlers
//! (or any producer thread) hold the sender half. Sending never blocks;
//! it only enqueues a formatted `text/event-stream` frame. The connection
//! multiplexer drains the queue into the socket whenever it is writable,
//! in strict FIFO order.
//!
//! Once the connection closes, the queue half is dropped and every further
//! [`SseSender::send`] becomes a silent no-op.

use std::sync::mpsc;

/// Sender half of an SSE channel.
///
/// Clone it freely; every clone feeds the same connection queue.
#[derive(Clone)]
pub struct SseSender {
    tx: mpsc::Sender<String>,
}

impl SseSender {
    /// Enqueue one named event frame. Never blocks; a no-op after the
    /// connection has closed.
    pub fn send(&self, event: &str, data: impl AsRef<str>) {
        let _ = self.tx.send(format_frame(event, data.as_ref()));
    }
}

/// Queue half of an SSE channel, owned by the connection.
pub struct SseQueue {
    rx: mpsc::Receiver<String>,
}

impl SseQueue {
    /// Take the next pending frame, if any. Never blocks.
    #[must_use]
    pub fn pop(&self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Drain every pending frame into `out`, returning the number of
    /// frames moved. Frames leave in enqueue order.
    pub fn drain_into(&self, out: &mut Vec<u8>) -> usize {
        let mut moved = 0;
        while let Some(frame) = self.pop() {
            out.extend_from_slice(frame.as_bytes());
            moved += 1;
        }
        moved
    }
}

/// Create a new SSE channel returning the sender and queue halves.
#[must_use]
pub fn channel() -> (SseSender, SseQueue) {
    let (tx, rx) = mpsc::channel();
    (SseSender { tx }, SseQueue { rx })
}

/// Format one SSE wire frame: `event: <name>\ndata: <payload>\n\n`.
#[must_use]
pub fn format_frame(event: &str, data: &str) -> String {
    format!("event: {event}\ndata: {data}\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_frame() {
        assert_eq!(format_frame("tick", "7"), "event: tick\ndata: 7\n\n");
    }

    #[test]
    fn test_fifo_order() {
        let (tx, rx) = channel();
        tx.send("e", "A");
        tx.send("e", "B");
        tx.send("e", "C");
        let mut out = Vec::new();
        assert_eq!(rx.drain_into(&mut out), 3);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "event: e\ndata: A\n\nevent: e\ndata: B\n\nevent: e\ndata: C\n\n"
        );
    }

    #[test]
    fn test_send_after_close_is_noop() {
        let (tx, rx) = channel();
        drop(rx);
        tx.send("e", "ignored");
    }
}
