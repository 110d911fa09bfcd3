//! Harness facade: the surface test-case modules call.
//!
//! One `Harness` per test session owns the shadow ledger and the two
//! server transports. Callers must serialize transactions per account;
//! the harness performs no cross-transaction locking because consensus
//! already serializes effects.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{json, Value};
use tracing::{debug, info};

use xrpl_parity_transport::dispatcher::{Payload, RequestDispatcher};
use xrpl_parity_transport::{result_of, HttpTransport, Rpc};
use xrpl_parity_types::amount::drops;
use xrpl_parity_types::result_code::TES_SUCCESS;
use xrpl_parity_types::{Account, HarnessConfig};

use crate::compare::{assert_equivalent, CompareOptions};
use crate::finality::{awaits_finality, wait_for_validation, ValidatedTx};
use crate::mirror::ShadowLedger;
use crate::retry::{RetryController, Submission};
use crate::verifier::{Verifier, VerifyOptions};

/// Which server a read or verification should run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerKind {
    /// The full validating node.
    Node,
    /// The read-oriented indexing server.
    Indexer,
}

/// A logical transaction request.
#[derive(Debug, Clone)]
pub struct TxRequest {
    pub payload: Payload,
    /// Explicit RPC method; inferred from the payload when absent.
    pub method: Option<String>,
    /// Engine result the caller expects (`tesSUCCESS` by default).
    pub expected_result: String,
    /// Accept queued inclusion without asserting on the final code.
    pub accept_queued: bool,
    /// Partial/offline-signer submissions whose responses must not be
    /// validated at all.
    pub skip_verification: bool,
    /// Caller-declared structural expectations (offer outcomes).
    pub verify: VerifyOptions,
}

impl TxRequest {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            method: None,
            expected_result: TES_SUCCESS.to_string(),
            accept_queued: false,
            skip_verification: false,
            verify: VerifyOptions::default(),
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn expecting(mut self, result: impl Into<String>) -> Self {
        self.expected_result = result.into();
        self
    }

    pub fn queued_ok(mut self) -> Self {
        self.accept_queued = true;
        self
    }

    pub fn skipping_verification(mut self) -> Self {
        self.skip_verification = true;
        self
    }

    pub fn with_verify(mut self, verify: VerifyOptions) -> Self {
        self.verify = verify;
        self
    }
}

/// Result of executing a transaction through the harness.
#[derive(Debug, Clone)]
pub enum ExecutionResult {
    /// Submission accepted (successful or a deliberate rejection the
    /// caller asserts on).
    Completed(Submission),
    /// Sentinel for responses that must bypass all validation.
    SkipVerification,
}

impl ExecutionResult {
    pub fn submission(&self) -> Option<&Submission> {
        match self {
            ExecutionResult::Completed(s) => Some(s),
            ExecutionResult::SkipVerification => None,
        }
    }

    pub fn engine_result(&self) -> Option<&str> {
        self.submission().and_then(|s| s.engine_result.as_deref())
    }
}

/// What `verify_test` should check against a response.
#[derive(Debug, Clone)]
pub struct VerificationExpectation {
    /// Expected engine result or RPC error code.
    pub response_result: String,
    /// Accounts whose shadow balances must match the server.
    pub accounts: Vec<String>,
}

impl Default for VerificationExpectation {
    fn default() -> Self {
        Self {
            response_result: TES_SUCCESS.to_string(),
            accounts: Vec::new(),
        }
    }
}

/// Outcome of `verify_test`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    /// The response carried the skip sentinel; nothing was checked.
    Skipped,
}

/// Execution harness for one differential test session.
pub struct Harness {
    config: HarnessConfig,
    dispatcher: RequestDispatcher,
    node: Arc<dyn Rpc>,
    indexer: Option<Arc<dyn Rpc>>,
    shadow: ShadowLedger,
}

impl Harness {
    /// Connect to the configured endpoints over HTTP.
    pub fn new(config: HarnessConfig) -> Self {
        let node: Arc<dyn Rpc> =
            Arc::new(HttpTransport::new(&config.rippled_url, config.standalone));
        let indexer: Option<Arc<dyn Rpc>> = Some(Arc::new(HttpTransport::new(
            &config.indexer_url,
            false,
        )));
        Self::with_transports(config, node, indexer)
    }

    /// Construct over explicit transports (the test seam).
    pub fn with_transports(
        config: HarnessConfig,
        node: Arc<dyn Rpc>,
        indexer: Option<Arc<dyn Rpc>>,
    ) -> Self {
        let dispatcher = RequestDispatcher::new(config.default_fee_drops, config.network_id);
        Self {
            config,
            dispatcher,
            node,
            indexer,
            shadow: ShadowLedger::new(),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn shadow(&self) -> &ShadowLedger {
        &self.shadow
    }

    fn server(&self, kind: ServerKind) -> Result<&dyn Rpc> {
        match kind {
            ServerKind::Node => Ok(self.node.as_ref()),
            ServerKind::Indexer => self
                .indexer
                .as_deref()
                .ok_or_else(|| anyhow!("no indexing server configured")),
        }
    }

    // ==================== Account lifecycle ====================

    /// Propose a wallet and optionally fund it from the genesis account.
    /// Funded accounts are tracked in the shadow ledger at their
    /// authoritative post-funding balance and sequence.
    pub fn create_account(&mut self, fund: bool, amount: Option<u64>) -> Result<Account> {
        let response = self.node.send("wallet_propose", json!({}))?;
        let result = result_of(&response);
        let address = result
            .get("account_id")
            .and_then(Value::as_str)
            .context("wallet_propose returned no account_id")?
            .to_string();
        let master_seed = result
            .get("master_seed")
            .and_then(Value::as_str)
            .context("wallet_propose returned no master_seed")?
            .to_string();
        let account = Account::new(&address, &master_seed);

        if fund {
            let amount = amount.unwrap_or(self.config.default_fund_drops);
            let payload = Payload::tx(
                json!({
                    "TransactionType": "Payment",
                    "Account": self.config.genesis_address,
                    "Destination": address,
                    "Amount": amount.to_string(),
                }),
                self.config.genesis_seed.clone(),
            );
            self.execute_transaction(TxRequest::new(payload))?;

            // Track at ground truth rather than the requested amount, in
            // case the funding payment partially delivered.
            let info = self.get_account_info(ServerKind::Node, &account.address)?;
            let data = result_of(&info)
                .get("account_data")
                .context("funded account has no account_data")?;
            let balance = drops(data.get("Balance"))
                .context("funded account has no drops Balance")? as i64;
            let sequence = data
                .get("Sequence")
                .and_then(Value::as_u64)
                .context("funded account has no Sequence")?;
            self.shadow.track(&account.address, balance, sequence);
            info!(address = %account.address, balance, "account created and funded");
        }
        Ok(account)
    }

    // ==================== Transaction execution ====================

    /// Execute a transaction end to end: dispatch, retry, finality,
    /// shadow update, structural verification.
    pub fn execute_transaction(&mut self, mut request: TxRequest) -> Result<ExecutionResult> {
        let method = self
            .dispatcher
            .method_for(&request.payload, request.method.as_deref())?;
        let submission = RetryController::new(&self.config).submit(
            self.node.as_ref(),
            &self.dispatcher,
            &mut request.payload,
            &method,
        )?;

        if request.skip_verification {
            debug!(method, "skip-verification sentinel; response not validated");
            return Ok(ExecutionResult::SkipVerification);
        }

        let Some(code) = submission.engine_result.clone() else {
            // Pure read or meta method; nothing to wait for.
            return Ok(ExecutionResult::Completed(submission));
        };
        if !awaits_finality(&code) {
            // Application-level rejection: surfaced for the caller.
            return Ok(ExecutionResult::Completed(submission));
        }

        let hash = submission
            .tx_hash
            .clone()
            .context("submission reported success but no transaction hash")?;
        let validated = wait_for_validation(
            self.node.as_ref(),
            &self.config,
            &hash,
            &request.expected_result,
            request.accept_queued,
        )?
        .with_context(|| {
            format!(
                "transaction {hash} did not validate with {} within {:?}",
                request.expected_result, self.config.finality_deadline
            )
        })?;

        self.absorb_validated(&validated, &request.verify)?;
        Ok(ExecutionResult::Completed(submission))
    }

    /// Apply a validated transaction to the shadow ledger and verify its
    /// structural effects. Failed-but-validated transactions (tec class)
    /// burn the fee and consume the sequence without further effects.
    fn absorb_validated(&mut self, validated: &ValidatedTx, verify: &VerifyOptions) -> Result<()> {
        let final_result = validated
            .meta
            .get("TransactionResult")
            .and_then(Value::as_str)
            .unwrap_or("");
        if final_result == TES_SUCCESS {
            self.shadow.apply_validated(validated, &self.config)?;
            Verifier::new(self.node.as_ref(), &self.config).verify(validated, verify)?;
        } else {
            self.shadow.apply_fee_only(validated)?;
        }
        Ok(())
    }

    /// Confirm a prior submission reached finality with the expected
    /// result. A `false` is a test-failure signal, not a retry cue.
    pub fn is_transaction_validated(&self, submission: &Submission, expected_result: &str) -> bool {
        let Some(hash) = submission.tx_hash.as_deref() else {
            return false;
        };
        matches!(
            wait_for_validation(self.node.as_ref(), &self.config, hash, expected_result, false),
            Ok(Some(_))
        )
    }

    // ==================== Reads ====================

    pub fn tx(&self, hash: &str) -> Result<Value> {
        self.node
            .send("tx", json!({"transaction": hash, "binary": false}))
    }

    pub fn get_account_info(&self, server: ServerKind, account: &str) -> Result<Value> {
        self.server(server)?.send(
            "account_info",
            json!({"account": account, "ledger_index": "validated"}),
        )
    }

    pub fn get_account_lines(&self, server: ServerKind, account: &str, peer: Option<&str>) -> Result<Value> {
        let mut params = json!({"account": account, "ledger_index": "validated"});
        if let Some(peer) = peer {
            params["peer"] = Value::from(peer);
        }
        self.server(server)?.send("account_lines", params)
    }

    pub fn get_account_objects(&self, server: ServerKind, account: &str) -> Result<Value> {
        self.server(server)?.send(
            "account_objects",
            json!({"account": account, "ledger_index": "validated"}),
        )
    }

    pub fn get_account_nfts(&self, server: ServerKind, account: &str) -> Result<Value> {
        self.server(server)?
            .send("account_nfts", json!({"account": account}))
    }

    pub fn get_account_channels(&self, server: ServerKind, account: &str) -> Result<Value> {
        self.server(server)?
            .send("account_channels", json!({"account": account}))
    }

    pub fn get_ledger(&self, server: ServerKind, ledger_index: &str) -> Result<Value> {
        self.server(server)?
            .send("ledger", json!({"ledger_index": ledger_index}))
    }

    /// NFT provenance query; only the indexing server implements it.
    pub fn get_nft_history(&self, nft_id: &str) -> Result<Value> {
        self.server(ServerKind::Indexer)?
            .send("nft_history", json!({"nft_id": nft_id}))
    }

    pub fn server_state(&self, server: ServerKind) -> Result<Value> {
        self.server(server)?.send("server_state", json!({}))
    }

    /// Cheapest connectivity probe.
    pub fn ping(&self, server: ServerKind) -> Result<Value> {
        self.server(server)?.send("ping", json!({}))
    }

    // ==================== Verification ====================

    /// Assert a response matches the expectation: result code, then each
    /// named account's server balance against its shadow.
    pub fn verify_test(
        &self,
        server: ServerKind,
        execution: &ExecutionResult,
        expectation: &VerificationExpectation,
    ) -> Result<VerifyOutcome> {
        let Some(submission) = execution.submission() else {
            return Ok(VerifyOutcome::Skipped);
        };

        let code = submission.engine_result.as_deref().unwrap_or("");
        if code != expectation.response_result {
            bail!(
                "response result {code}, expected {}: {}",
                expectation.response_result,
                submission.response
            );
        }

        for account in &expectation.accounts {
            let shadow = self
                .shadow
                .balance(account)
                .with_context(|| format!("account {account} is not tracked (or deleted)"))?;
            let info = self.get_account_info(server, account)?;
            let on_ledger = drops(result_of(&info).pointer("/account_data/Balance"))
                .with_context(|| format!("account_info for {account} has no Balance"))?
                as i64;
            if on_ledger != shadow {
                bail!(
                    "balance drift for {account}: shadow {shadow}, server reports {on_ledger}"
                );
            }
        }
        Ok(VerifyOutcome::Verified)
    }

    /// Run the same logical request against both servers and assert the
    /// responses are equivalent outside the ignore-set.
    pub fn compare_servers(
        &self,
        method: &str,
        params: Value,
        options: &CompareOptions,
    ) -> Result<()> {
        let from_node = self.server(ServerKind::Node)?.send(method, params.clone())?;
        let from_indexer = self.server(ServerKind::Indexer)?.send(method, params)?;
        assert_equivalent(&from_node, &from_indexer, options)
            .with_context(|| format!("differential mismatch on {method}"))
    }
}
