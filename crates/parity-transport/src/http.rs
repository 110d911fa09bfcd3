//! JSON-RPC over HTTP.
//!
//! Request shape: `{"method": <name>, "params": [ { ... } ]}`. In a
//! standalone deployment the transport additionally closes the open
//! ledger after each submission-class call, since nothing else advances
//! consensus there.

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::Rpc;

/// Methods that enter a transaction into consensus and therefore need a
/// `ledger_accept` nudge in standalone mode.
const SUBMISSION_METHODS: &[&str] = &["submit", "submit_multisigned"];

/// Synchronous JSON-RPC client over HTTP.
#[derive(Clone)]
pub struct HttpTransport {
    url: String,
    agent: ureq::Agent,
    standalone: bool,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, standalone: bool) -> Self {
        Self {
            url: url.into(),
            agent: ureq::Agent::new(),
            standalone,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn post(&self, body: &Value) -> Result<Value> {
        let response = self
            .agent
            .post(&self.url)
            .send_json(body)
            .map_err(|e| anyhow!("request to {} failed: {e}", self.url))?;
        response
            .into_json::<Value>()
            .with_context(|| format!("malformed JSON-RPC response from {}", self.url))
    }

    /// Close the open ledger so a just-submitted transaction can validate.
    /// Failures are logged, not fatal: the target may not be standalone
    /// after all, and the finality waiter will report the real problem.
    fn advance_ledger(&self) {
        let body = json!({"method": "ledger_accept", "params": [{}]});
        if let Err(e) = self.post(&body) {
            warn!("ledger_accept after submission failed: {e}");
        }
    }
}

impl Rpc for HttpTransport {
    fn send(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({"method": method, "params": [params]});
        debug!(method, url = %self.url, "rpc request");
        let response = self.post(&body)?;
        if self.standalone && SUBMISSION_METHODS.contains(&method) {
            self.advance_ledger();
        }
        Ok(response)
    }
}
