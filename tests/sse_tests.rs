//! Tests for the SSE event channel
//!
//! Covers frame formatting, FIFO ordering through the queue, batched
//! draining and the closed-receiver behavior (sends become no-ops).

use microhttp::sse::{channel, format_frame};

#[test]
fn test_frame_format() {
    assert_eq!(
        format_frame("update", "hello"),
        "event: update\ndata: hello\n\n"
    );
}

#[test]
fn test_events_delivered_in_order() {
    let (tx, queue) = channel();
    tx.send("m", "A");
    tx.send("m", "B");
    tx.send("m", "C");

    assert_eq!(queue.pop().as_deref(), Some("event: m\ndata: A\n\n"));
    assert_eq!(queue.pop().as_deref(), Some("event: m\ndata: B\n\n"));
    assert_eq!(queue.pop().as_deref(), Some("event: m\ndata: C\n\n"));
    assert_eq!(queue.pop(), None);
}

#[test]
fn test_drain_concatenates_pending_frames() {
    let (tx, queue) = channel();
    tx.send("a", "1");
    tx.send("b", "2");

    let mut out = Vec::new();
    let n = queue.drain_into(&mut out);
    assert_eq!(n, 2);
    assert_eq!(out, b"event: a\ndata: 1\n\nevent: b\ndata: 2\n\n");

    // Nothing left after a drain.
    assert_eq!(queue.drain_into(&mut Vec::new()), 0);
}

#[test]
fn test_send_after_close_is_noop() {
    let (tx, queue) = channel();
    drop(queue);
    // Must not panic or error; the stream is simply gone.
    tx.send("m", "lost");
}

#[test]
fn test_cloned_senders_feed_one_queue() {
    let (tx, queue) = channel();
    let tx2 = tx.clone();
    tx.send("m", "first");
    tx2.send("m", "second");

    assert_eq!(queue.pop().as_deref(), Some("event: m\ndata: first\n\n"));
    assert_eq!(queue.pop().as_deref(), Some("event: m\ndata: second\n\n"));
}
