//! Background subscription listener.
//!
//! One reader thread drains a WebSocket connection into a thread-safe
//! queue; the main thread consumes the queue with a short settle delay
//! before validating each message. The queue starts empty at connection
//! open, so stale messages from a previous subscription never leak into
//! a new test. Shutdown is timeout-based: the reader checks a stop flag
//! between socket reads.

use std::collections::VecDeque;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::Message;

use xrpl_parity_transport::ws::{command_envelope, open_socket};

/// Thread-safe FIFO of parsed stream messages.
#[derive(Clone, Default)]
pub struct StreamQueue {
    inner: Arc<Mutex<VecDeque<Value>>>,
}

impl StreamQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: Value) {
        self.inner.lock().push_back(message);
    }

    pub fn pop(&self) -> Option<Value> {
        self.inner.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear()
    }
}

/// Subscription consumer for push-notification tests.
pub struct StreamListener {
    queue: StreamQueue,
    settle: Duration,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl StreamListener {
    /// Connect, send a `subscribe` command, and start draining messages.
    ///
    /// `subscription` is the subscribe body (e.g.
    /// `{"streams": ["transactions"]}` or `{"accounts": [addr]}`).
    pub fn subscribe(url: &str, subscription: Value, settle: Duration) -> Result<Self> {
        let mut socket = open_socket(url)?;
        // Bounded reads so the reader thread can observe the stop flag,
        // for plain and TLS connections alike.
        match socket.get_ref() {
            MaybeTlsStream::Plain(stream) => {
                let _ = stream.set_read_timeout(Some(Duration::from_millis(500)));
            }
            MaybeTlsStream::NativeTls(stream) => {
                let _ = stream.get_ref().set_read_timeout(Some(Duration::from_millis(500)));
            }
            _ => {}
        }
        let request = command_envelope("subscribe", &subscription, 0)?;
        socket
            .send(Message::Text(request.to_string()))
            .context("subscribe command failed")?;

        let queue = StreamQueue::new();
        queue.clear();
        let stop = Arc::new(AtomicBool::new(false));

        let reader_queue = queue.clone();
        let reader_stop = stop.clone();
        let reader = std::thread::spawn(move || {
            reader_loop(socket, reader_queue, reader_stop);
        });

        Ok(Self {
            queue,
            settle,
            stop,
            reader: Some(reader),
        })
    }

    /// The underlying queue, for direct draining in tests.
    pub fn queue(&self) -> &StreamQueue {
        &self.queue
    }

    /// Pop the next message after the settle delay, giving in-flight
    /// notifications time to land.
    pub fn next_message(&self) -> Option<Value> {
        std::thread::sleep(self.settle);
        self.queue.pop()
    }

    /// Everything received so far, clearing the queue.
    pub fn drain(&self) -> Vec<Value> {
        std::thread::sleep(self.settle);
        let mut messages = Vec::new();
        while let Some(m) = self.queue.pop() {
            messages.push(m);
        }
        messages
    }
}

impl Drop for StreamListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

fn reader_loop(
    mut socket: tungstenite::WebSocket<MaybeTlsStream<TcpStream>>,
    queue: StreamQueue,
    stop: Arc<AtomicBool>,
) {
    while !stop.load(Ordering::Relaxed) {
        let message = match socket.read() {
            Ok(m) => m,
            // Read timeout: loop to re-check the stop flag.
            Err(tungstenite::Error::Io(e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue
            }
            Err(e) => {
                warn!("stream connection lost: {e}");
                break;
            }
        };
        let Message::Text(text) = message else {
            continue;
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => {
                // The subscribe acknowledgement carries our id; only push
                // actual stream notifications.
                if value.get("id").is_none() {
                    let kind = value
                        .get("type")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or("?");
                    debug!(kind, "stream message");
                    queue.push(value);
                }
            }
            Err(e) => warn!("unparseable stream message: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_queue_fifo_order() {
        let queue = StreamQueue::new();
        queue.push(json!({"type": "transaction", "seq": 1}));
        queue.push(json!({"type": "transaction", "seq": 2}));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().unwrap()["seq"], 1);
        assert_eq!(queue.pop().unwrap()["seq"], 2);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_queue_clear_at_open() {
        let queue = StreamQueue::new();
        queue.push(json!({"stale": true}));
        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clones_share_storage() {
        let queue = StreamQueue::new();
        let alias = queue.clone();
        alias.push(json!({"seq": 1}));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_subscribe_to_closed_port_is_err() {
        assert!(StreamListener::subscribe(
            "ws://127.0.0.1:1",
            json!({"streams": ["ledger"]}),
            Duration::from_millis(1)
        )
        .is_err());
    }
}
