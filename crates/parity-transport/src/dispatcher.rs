//! Request dispatch: method inference and protocol-mandated gap filling.
//!
//! The dispatcher turns a logical payload (tx_json plus optional signing
//! secret) into a concrete `(method, params)` pair. It fills gaps the
//! protocol mandates - default fee, `NetworkID` on high-numbered chains -
//! but never rewrites a field the caller set.

use anyhow::Result;
use serde_json::{json, Map, Value};

use xrpl_parity_types::config::NETWORK_ID_THRESHOLD;

/// A logical request before dispatch.
#[derive(Debug, Clone)]
pub struct Payload {
    /// Transaction JSON, or a bare query object for read methods.
    pub tx_json: Value,
    /// Seed to sign with; present for server-side-signed submissions.
    pub secret: Option<String>,
    /// Pre-signed blob; forces `submit`.
    pub tx_blob: Option<String>,
}

impl Payload {
    pub fn tx(tx_json: Value, secret: impl Into<String>) -> Self {
        Self {
            tx_json,
            secret: Some(secret.into()),
            tx_blob: None,
        }
    }

    pub fn query(fields: Value) -> Self {
        Self {
            tx_json: fields,
            secret: None,
            tx_blob: None,
        }
    }

    pub fn signed_blob(blob: impl Into<String>) -> Self {
        Self {
            tx_json: Value::Null,
            secret: None,
            tx_blob: Some(blob.into()),
        }
    }

    /// Whether the caller pinned `Sequence` themselves. Pinned sequences
    /// are never rewritten by stale-sequence retries.
    pub fn sequence_pinned(&self) -> bool {
        self.tx_json.get("Sequence").is_some()
    }
}

/// Builds the JSON-RPC request for a payload.
#[derive(Debug, Clone)]
pub struct RequestDispatcher {
    default_fee_drops: u64,
    network_id: u32,
}

impl RequestDispatcher {
    pub fn new(default_fee_drops: u64, network_id: u32) -> Self {
        Self {
            default_fee_drops,
            network_id,
        }
    }

    /// Infer the RPC method for a payload.
    ///
    /// A payload carrying a `TransactionType` (and no explicit method) is
    /// a submission; so is a pre-signed blob. Otherwise the caller's
    /// method is authoritative and a missing one is an error.
    pub fn method_for(&self, payload: &Payload, explicit: Option<&str>) -> Result<String> {
        if let Some(method) = explicit {
            return Ok(method.to_string());
        }
        if payload.tx_blob.is_some() {
            return Ok("submit".to_string());
        }
        if payload.tx_json.get("TransactionType").is_some() {
            return Ok("submit".to_string());
        }
        anyhow::bail!("no method given and none inferable from payload: {}", payload.tx_json)
    }

    /// Build the params object, injecting defaults into a copy of the
    /// transaction. Caller-set fields are left untouched.
    pub fn params_for(&self, payload: &Payload, method: &str) -> Value {
        if let Some(blob) = &payload.tx_blob {
            return json!({"tx_blob": blob});
        }

        // Read methods pass their fields through unchanged.
        if method != "submit" && method != "submit_multisigned" {
            return payload.tx_json.clone();
        }

        let mut tx_json = payload.tx_json.clone();
        if let Value::Object(fields) = &mut tx_json {
            self.fill_protocol_gaps(fields);
        }

        let mut params = Map::new();
        params.insert("tx_json".to_string(), tx_json);
        if let Some(secret) = &payload.secret {
            params.insert("secret".to_string(), Value::from(secret.clone()));
        }
        Value::Object(params)
    }

    fn fill_protocol_gaps(&self, fields: &mut Map<String, Value>) {
        if !fields.contains_key("Fee") {
            fields.insert("Fee".to_string(), Value::from(self.default_fee_drops.to_string()));
        }
        if self.network_id > NETWORK_ID_THRESHOLD && !fields.contains_key("NetworkID") {
            fields.insert("NetworkID".to_string(), Value::from(self.network_id));
        }
    }

    /// Rewrite the payload's `Sequence` in place after a stale-sequence
    /// retry refreshed it from `account_info`.
    pub fn refresh_sequence(payload: &mut Payload, sequence: u64) {
        if let Value::Object(fields) = &mut payload.tx_json {
            fields.insert("Sequence".to_string(), Value::from(sequence));
        }
    }
}
