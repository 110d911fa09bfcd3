//! Retry/backoff controller for transaction submission.
//!
//! Transient infrastructure failures (queue congestion, not-yet-synced
//! nodes, stale-sequence races) are retried inside a wall-clock budget;
//! everything else - including the deliberate ledger-rule rejections that
//! negative tests assert on - is accepted and returned unchanged. The
//! budget is wall-clock rather than a retry count because recovery time
//! under load is unbounded in the real system.

use std::time::Instant;

use anyhow::{bail, Result};
use serde_json::{json, Value};
use tracing::{debug, warn};

use xrpl_parity_transport::dispatcher::{Payload, RequestDispatcher};
use xrpl_parity_transport::{engine_message, engine_result, result_of, Rpc};
use xrpl_parity_types::{classify_result, HarnessConfig, ResultClass};

/// Outcome of a submission the controller accepted (which includes
/// application-level rejections the caller asserts on).
#[derive(Debug, Clone)]
pub struct Submission {
    pub response: Value,
    pub engine_result: Option<String>,
    pub tx_hash: Option<String>,
    /// Transient-failure resubmissions performed, for assertions like
    /// "application errors take zero retries".
    pub retries: u32,
}

/// Drives one payload through the transport until a non-transient result.
pub struct RetryController<'a> {
    config: &'a HarnessConfig,
}

impl<'a> RetryController<'a> {
    pub fn new(config: &'a HarnessConfig) -> Self {
        Self { config }
    }

    /// Submit until accepted or the retry budget is exhausted.
    ///
    /// The payload is mutable: stale-sequence retries rewrite its
    /// `Sequence` field in place, unless the caller pinned one.
    pub fn submit(
        &self,
        rpc: &dyn Rpc,
        dispatcher: &RequestDispatcher,
        payload: &mut Payload,
        method: &str,
    ) -> Result<Submission> {
        let started = Instant::now();
        let sequence_pinned = payload.sequence_pinned();
        let mut retries = 0u32;
        let mut last_message = String::new();

        loop {
            let params = dispatcher.params_for(payload, method);
            let response = rpc.send(method, params)?;
            let code = engine_result(&response).map(str::to_string);
            if let Some(message) = engine_message(&response) {
                last_message = message.to_string();
            }

            let class = code.as_deref().map_or(ResultClass::Other, classify_result);
            match class {
                ResultClass::Congestion | ResultClass::NotSynced => {
                    self.check_budget(started, &code, &last_message)?;
                    warn!(
                        code = code.as_deref().unwrap_or(""),
                        retries, "transient submission failure, backing off"
                    );
                    std::thread::sleep(self.config.retry_wait);
                    retries += 1;
                }
                ResultClass::StaleSequence if !sequence_pinned => {
                    self.check_budget(started, &code, &last_message)?;
                    let sequence = self.current_sequence(rpc, payload)?;
                    debug!(sequence, "refreshing stale sequence and resubmitting");
                    RequestDispatcher::refresh_sequence(payload, sequence);
                    retries += 1;
                }
                _ => {
                    let tx_hash = extract_tx_hash(&response);
                    return Ok(Submission {
                        response,
                        engine_result: code,
                        tx_hash,
                        retries,
                    });
                }
            }
        }
    }

    fn check_budget(&self, started: Instant, code: &Option<String>, message: &str) -> Result<()> {
        if started.elapsed() + self.config.retry_wait > self.config.retry_budget {
            bail!(
                "retry budget ({:?}) exhausted; last result {}: {}",
                self.config.retry_budget,
                code.as_deref().unwrap_or("<none>"),
                message
            );
        }
        Ok(())
    }

    /// Fetch the account's authoritative sequence for a stale-sequence
    /// resubmission.
    fn current_sequence(&self, rpc: &dyn Rpc, payload: &Payload) -> Result<u64> {
        let Some(account) = payload.tx_json.get("Account").and_then(Value::as_str) else {
            bail!("stale sequence on a payload without an Account field");
        };
        let response = rpc.send(
            "account_info",
            json!({"account": account, "ledger_index": "current"}),
        )?;
        result_of(&response)
            .pointer("/account_data/Sequence")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                anyhow::anyhow!("account_info for {account} returned no Sequence: {response}")
            })
    }
}

/// Transaction hash of a submission response (`result.tx_json.hash`).
pub fn extract_tx_hash(response: &Value) -> Option<String> {
    let result = result_of(response);
    result
        .pointer("/tx_json/hash")
        .or_else(|| result.get("hash"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedRpc;
    use std::time::Duration;

    /// Shrink the retry clock; wall-clock budgets make the real defaults
    /// unusable in unit tests.
    fn fast_config() -> HarnessConfig {
        HarnessConfig {
            retry_wait: Duration::from_millis(1),
            retry_budget: Duration::from_millis(30),
            ..HarnessConfig::default()
        }
    }

    fn payload() -> Payload {
        Payload::tx(
            json!({"TransactionType": "Payment", "Account": "rSender", "Amount": "1000", "Destination": "rDest"}),
            "sSeed",
        )
    }

    fn submit_response(code: &str) -> Value {
        json!({"result": {
            "engine_result": code,
            "engine_result_message": format!("msg for {code}"),
            "tx_json": {"hash": "ABC123"}
        }})
    }

    #[test]
    fn test_success_first_try_no_retries() {
        let config = fast_config();
        let rpc = ScriptedRpc::new().respond("submit", submit_response("tesSUCCESS"));
        let mut p = payload();
        let dispatcher = RequestDispatcher::new(10, 0);

        let s = RetryController::new(&config)
            .submit(&rpc, &dispatcher, &mut p, "submit")
            .unwrap();
        assert_eq!(s.engine_result.as_deref(), Some("tesSUCCESS"));
        assert_eq!(s.tx_hash.as_deref(), Some("ABC123"));
        assert_eq!(s.retries, 0);
    }

    #[test]
    fn test_congestion_retried_until_accepted() {
        let config = fast_config();
        let rpc = ScriptedRpc::new()
            .respond("submit", submit_response("telCAN_NOT_QUEUE_FEE"))
            .respond("submit", submit_response("tesSUCCESS"));
        let mut p = payload();
        let dispatcher = RequestDispatcher::new(10, 0);

        let s = RetryController::new(&config)
            .submit(&rpc, &dispatcher, &mut p, "submit")
            .unwrap();
        assert_eq!(s.engine_result.as_deref(), Some("tesSUCCESS"));
        assert_eq!(s.retries, 1);
        assert_eq!(rpc.call_count("submit"), 2);
    }

    #[test]
    fn test_application_error_accepted_with_zero_retries() {
        // Negative tests depend on rejections passing through unretried.
        let config = fast_config();
        let rpc = ScriptedRpc::new().respond(
            "channel_authorize",
            json!({"result": {"error": "channelMalformed", "error_message": "bad id"}}),
        );
        let mut p = Payload::query(json!({"channel_id": "nonsense", "amount": "100"}));
        let dispatcher = RequestDispatcher::new(10, 0);

        let s = RetryController::new(&config)
            .submit(&rpc, &dispatcher, &mut p, "channel_authorize")
            .unwrap();
        assert_eq!(s.engine_result.as_deref(), Some("channelMalformed"));
        assert_eq!(s.retries, 0);
        assert_eq!(rpc.call_count("channel_authorize"), 1);
    }

    #[test]
    fn test_stale_sequence_refreshes_and_resubmits() {
        let config = fast_config();
        let rpc = ScriptedRpc::new()
            .respond("submit", submit_response("tefPAST_SEQ"))
            .respond("submit", submit_response("tesSUCCESS"))
            .respond(
                "account_info",
                json!({"result": {"account_data": {"Sequence": 42}}}),
            );
        let mut p = payload();
        let dispatcher = RequestDispatcher::new(10, 0);

        let s = RetryController::new(&config)
            .submit(&rpc, &dispatcher, &mut p, "submit")
            .unwrap();
        assert_eq!(s.engine_result.as_deref(), Some("tesSUCCESS"));
        assert_eq!(p.tx_json["Sequence"], 42);
        assert_eq!(rpc.call_count("account_info"), 1);
    }

    #[test]
    fn test_pinned_sequence_never_rewritten() {
        let config = fast_config();
        let rpc = ScriptedRpc::new().respond("submit", submit_response("tefPAST_SEQ"));
        let mut p = Payload::tx(
            json!({"TransactionType": "Payment", "Account": "rS", "Sequence": 7}),
            "sSeed",
        );
        let dispatcher = RequestDispatcher::new(10, 0);

        let s = RetryController::new(&config)
            .submit(&rpc, &dispatcher, &mut p, "submit")
            .unwrap();
        // Accepted as-is: the caller pinned Sequence, so the stale-sequence
        // rejection is theirs to assert on.
        assert_eq!(s.engine_result.as_deref(), Some("tefPAST_SEQ"));
        assert_eq!(p.tx_json["Sequence"], 7);
        assert_eq!(s.retries, 0);
    }

    #[test]
    fn test_budget_exhaustion_is_fatal_with_last_message() {
        let config = fast_config();
        let rpc = ScriptedRpc::new().respond("submit", submit_response("telCAN_NOT_QUEUE"));
        let mut p = payload();
        let dispatcher = RequestDispatcher::new(10, 0);

        let err = RetryController::new(&config)
            .submit(&rpc, &dispatcher, &mut p, "submit")
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("retry budget"), "{text}");
        assert!(text.contains("telCAN_NOT_QUEUE"), "{text}");
    }

    #[test]
    fn test_not_synced_retried() {
        let config = fast_config();
        let rpc = ScriptedRpc::new()
            .respond(
                "submit",
                json!({"result": {"error": "noCurrent", "error_message": "no current ledger"}}),
            )
            .respond("submit", submit_response("tesSUCCESS"));
        let mut p = payload();
        let dispatcher = RequestDispatcher::new(10, 0);

        let s = RetryController::new(&config)
            .submit(&rpc, &dispatcher, &mut p, "submit")
            .unwrap();
        assert_eq!(s.engine_result.as_deref(), Some("tesSUCCESS"));
        assert_eq!(s.retries, 1);
    }
}
