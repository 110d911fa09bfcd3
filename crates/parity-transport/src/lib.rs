//! Transport layer for xrpl-parity.
//!
//! This crate provides:
//! - [`Rpc`]: the one-request seam everything above the wire depends on
//! - [`http::HttpTransport`]: JSON-RPC over HTTP via `ureq`
//! - [`ws::WsTransport`]: the command-envelope equivalent over WebSocket
//! - [`dispatcher::RequestDispatcher`]: method inference and
//!   protocol-mandated field injection
//!
//! Transports issue exactly one request and parse the response; all retry
//! logic lives in the harness crate.
//!
//! # Example
//!
//! ```ignore
//! use xrpl_parity_transport::{http::HttpTransport, Rpc};
//! use serde_json::json;
//!
//! let node = HttpTransport::new("http://127.0.0.1:5005", false);
//! let info = node.send("server_state", json!({}))?;
//! ```

pub mod dispatcher;
pub mod http;
pub mod ws;

use anyhow::Result;
use serde_json::Value;

pub use dispatcher::RequestDispatcher;
pub use http::HttpTransport;
pub use ws::WsTransport;

/// One JSON-RPC request, parsed response. No retry; connection and
/// malformed-response failures are `Err` and bubble to the retry
/// controller. Ledger-rule rejections are `Ok` responses.
pub trait Rpc: Send + Sync {
    fn send(&self, method: &str, params: Value) -> Result<Value>;
}

/// Extract the `result` object of a response, or the whole response for
/// envelopes that inline it (WebSocket replies).
pub fn result_of(response: &Value) -> &Value {
    response.get("result").unwrap_or(response)
}

/// Engine result of a submission, or the RPC error code for request-level
/// failures (`actNotFound`, `channelMalformed`, ...).
pub fn engine_result(response: &Value) -> Option<&str> {
    let result = result_of(response);
    result
        .get("engine_result")
        .and_then(Value::as_str)
        .or_else(|| result.get("error").and_then(Value::as_str))
}

/// Human-readable message accompanying an engine result or RPC error.
pub fn engine_message(response: &Value) -> Option<&str> {
    let result = result_of(response);
    result
        .get("engine_result_message")
        .and_then(Value::as_str)
        .or_else(|| result.get("error_message").and_then(Value::as_str))
}
