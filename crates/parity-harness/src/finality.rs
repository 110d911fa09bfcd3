//! Finality waiter: polls `tx(hash)` until the transaction validates.
//!
//! Engaged only for `tesSUCCESS`/`terQUEUED` submissions. A timeout is a
//! test-failure signal, never a retry: consensus completes well inside
//! the deadline on a healthy network, so a transaction that fails to
//! validate in time indicates a real problem.

use anyhow::Result;
use serde_json::{json, Value};
use tracing::debug;

use xrpl_parity_transport::{result_of, Rpc};
use xrpl_parity_types::result_code::{TER_QUEUED, TES_SUCCESS};
use xrpl_parity_types::HarnessConfig;

use crate::poll::poll_until;

/// Whether a submission result even engages the finality waiter.
pub fn awaits_finality(engine_result: &str) -> bool {
    engine_result == TES_SUCCESS || engine_result == TER_QUEUED
}

/// The fully validated transaction as reported by `tx(hash)`, kept for
/// mirror/verifier consumption.
#[derive(Debug, Clone)]
pub struct ValidatedTx {
    pub tx_json: Value,
    pub meta: Value,
    pub ledger_index: Option<u64>,
    pub hash: String,
}

/// Poll `tx(hash)` until `validated == true` and, unless
/// `accept_queued_only`, the final `TransactionResult` equals
/// `expected_result`. `Ok(None)` on deadline.
pub fn wait_for_validation(
    rpc: &dyn Rpc,
    config: &HarnessConfig,
    hash: &str,
    expected_result: &str,
    accept_queued_only: bool,
) -> Result<Option<ValidatedTx>> {
    poll_until(config.finality_interval, config.finality_deadline, || {
        let response = rpc.send("tx", json!({"transaction": hash, "binary": false}))?;
        let result = result_of(&response);

        if !result.get("validated").and_then(Value::as_bool).unwrap_or(false) {
            debug!(hash, "transaction not yet validated");
            return Ok(None);
        }

        let final_result = result
            .pointer("/meta/TransactionResult")
            .and_then(Value::as_str)
            .unwrap_or("");
        if !accept_queued_only && final_result != expected_result {
            // Validated with the wrong code: further polling cannot change
            // an irreversible outcome, but surfacing it as a timeout keeps
            // the caller's assertion on the final code authoritative.
            debug!(hash, final_result, expected_result, "validated with unexpected result");
            return Ok(None);
        }

        Ok(Some(ValidatedTx {
            tx_json: result.clone(),
            meta: result.get("meta").cloned().unwrap_or(Value::Null),
            ledger_index: result.get("ledger_index").and_then(Value::as_u64),
            hash: hash.to_string(),
        }))
    })
}
