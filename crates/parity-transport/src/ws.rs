//! JSON-RPC over WebSocket.
//!
//! The WebSocket API uses a command envelope instead of the HTTP
//! `method`/`params` wrapper: request fields sit next to `command` and
//! `id`, and the reply carries the same `id` with the result inlined
//! under `result`. Push notifications (stream messages) have no `id` and
//! are skipped here; the stream listener owns its own connection.

use std::net::TcpStream;

use anyhow::{anyhow, bail, Context, Result};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::debug;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{connect, Message, WebSocket};

use crate::Rpc;

pub type WsSocket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Open a raw WebSocket to an XRPL server endpoint.
pub fn open_socket(url: &str) -> Result<WsSocket> {
    let (socket, _response) =
        connect(url).with_context(|| format!("websocket connect to {url} failed"))?;
    Ok(socket)
}

/// Build the command envelope for one request: `params` fields are
/// inlined next to `command` and `id`.
pub fn command_envelope(method: &str, params: &Value, id: u64) -> Result<Value> {
    let mut fields = Map::new();
    fields.insert("id".to_string(), Value::from(id));
    fields.insert("command".to_string(), Value::from(method));
    if let Value::Object(extra) = params {
        for (k, v) in extra {
            fields.insert(k.clone(), v.clone());
        }
    } else if !params.is_null() {
        bail!("websocket params must be an object, got: {params}");
    }
    Ok(Value::Object(fields))
}

/// Synchronous request/response client over one WebSocket connection.
pub struct WsTransport {
    socket: Mutex<WsSocket>,
    next_id: Mutex<u64>,
}

impl WsTransport {
    pub fn connect(url: &str) -> Result<Self> {
        Ok(Self {
            socket: Mutex::new(open_socket(url)?),
            next_id: Mutex::new(1),
        })
    }
}

impl Rpc for WsTransport {
    fn send(&self, method: &str, params: Value) -> Result<Value> {
        let id = {
            let mut next = self.next_id.lock();
            let id = *next;
            *next += 1;
            id
        };
        let request = command_envelope(method, &params, id)?;
        debug!(method, id, "ws request");

        let mut socket = self.socket.lock();
        socket
            .send(Message::Text(request.to_string()))
            .map_err(|e| anyhow!("websocket send failed: {e}"))?;

        // Skip interleaved push messages until our id comes back.
        loop {
            let message = socket
                .read()
                .map_err(|e| anyhow!("websocket read failed: {e}"))?;
            let text = match message {
                Message::Text(t) => t,
                Message::Ping(_) | Message::Pong(_) => continue,
                Message::Close(frame) => bail!("websocket closed by peer: {frame:?}"),
                other => bail!("unexpected websocket frame: {other:?}"),
            };
            let value: Value = serde_json::from_str(&text)
                .with_context(|| "malformed websocket response".to_string())?;
            if value.get("id").and_then(Value::as_u64) == Some(id) {
                return Ok(value);
            }
        }
    }
}
