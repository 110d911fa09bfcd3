//! Harness configuration.
//!
//! Every timing budget the polling loops use is a named field here, not
//! an inlined literal at the call site. Defaults match a standalone
//! rippled + indexing-server deployment; each field can be overridden
//! through an `XRPL_PARITY_*` environment variable.

use std::time::Duration;

use crate::env_utils::{env_bool_or, env_string_or, env_var_or};

/// `NetworkID` must be injected into transactions on chains whose network
/// id exceeds this protocol threshold.
pub const NETWORK_ID_THRESHOLD: u32 = 2047;

/// Configuration for one harness session.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// JSON-RPC endpoint of the validating node.
    pub rippled_url: String,
    /// JSON-RPC endpoint of the read-oriented indexing server.
    pub indexer_url: String,
    /// WebSocket endpoint used by the stream listener.
    pub ws_url: String,
    /// Network id of the chain under test; injected into transactions
    /// when above [`NETWORK_ID_THRESHOLD`].
    pub network_id: u32,
    /// Standalone mode: advance the ledger after each submission.
    pub standalone: bool,

    /// Funding account used by `create_account`. Defaults to the
    /// standalone genesis account.
    pub genesis_address: String,
    pub genesis_seed: String,

    /// Default `Fee` in drops injected when a payload omits one.
    pub default_fee_drops: u64,
    /// Funding amount in drops for newly created accounts.
    pub default_fund_drops: u64,
    /// Owner-reserve parameters used for reserve-adjusted spendable
    /// balance in offer-crossing deltas.
    pub reserve_base_drops: u64,
    pub reserve_inc_drops: u64,

    /// Wait between resubmissions on congestion / not-synced results.
    pub retry_wait: Duration,
    /// Total wall-clock budget for transient-error resubmission.
    pub retry_budget: Duration,
    /// Poll interval for `tx` finality lookups.
    pub finality_interval: Duration,
    /// Wall-clock deadline for a submitted transaction to validate.
    pub finality_deadline: Duration,
    /// Poll interval / deadline for a created object to appear in
    /// `account_objects`.
    pub object_poll_interval: Duration,
    pub object_poll_deadline: Duration,
    /// Settle delay before a stream message is validated.
    pub stream_settle: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            rippled_url: "http://127.0.0.1:5005".to_string(),
            indexer_url: "http://127.0.0.1:51233".to_string(),
            ws_url: "ws://127.0.0.1:6006".to_string(),
            network_id: 0,
            standalone: true,
            genesis_address: "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh".to_string(),
            genesis_seed: "snoPBrXtMeMyMHUVTgbuqAfg1SUTb".to_string(),
            default_fee_drops: 10,
            default_fund_drops: 20_000_000,
            reserve_base_drops: 10_000_000,
            reserve_inc_drops: 2_000_000,
            retry_wait: Duration::from_secs(20),
            retry_budget: Duration::from_secs(120),
            finality_interval: Duration::from_secs(1),
            finality_deadline: Duration::from_secs(30),
            object_poll_interval: Duration::from_secs(1),
            object_poll_deadline: Duration::from_secs(20),
            stream_settle: Duration::from_secs(2),
        }
    }
}

impl HarnessConfig {
    /// Build a config from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            rippled_url: env_string_or("XRPL_PARITY_RIPPLED_URL", &d.rippled_url),
            indexer_url: env_string_or("XRPL_PARITY_INDEXER_URL", &d.indexer_url),
            ws_url: env_string_or("XRPL_PARITY_WS_URL", &d.ws_url),
            network_id: env_var_or("XRPL_PARITY_NETWORK_ID", d.network_id),
            standalone: env_bool_or("XRPL_PARITY_STANDALONE", d.standalone),
            genesis_address: env_string_or("XRPL_PARITY_GENESIS_ADDRESS", &d.genesis_address),
            genesis_seed: env_string_or("XRPL_PARITY_GENESIS_SEED", &d.genesis_seed),
            default_fee_drops: env_var_or("XRPL_PARITY_DEFAULT_FEE", d.default_fee_drops),
            default_fund_drops: env_var_or("XRPL_PARITY_FUND_DROPS", d.default_fund_drops),
            reserve_base_drops: env_var_or("XRPL_PARITY_RESERVE_BASE", d.reserve_base_drops),
            reserve_inc_drops: env_var_or("XRPL_PARITY_RESERVE_INC", d.reserve_inc_drops),
            retry_wait: Duration::from_secs(env_var_or("XRPL_PARITY_RETRY_WAIT_SECS", 20)),
            retry_budget: Duration::from_secs(env_var_or("XRPL_PARITY_RETRY_BUDGET_SECS", 120)),
            finality_interval: Duration::from_secs(env_var_or(
                "XRPL_PARITY_FINALITY_INTERVAL_SECS",
                1,
            )),
            finality_deadline: Duration::from_secs(env_var_or(
                "XRPL_PARITY_FINALITY_DEADLINE_SECS",
                30,
            )),
            object_poll_interval: Duration::from_secs(env_var_or(
                "XRPL_PARITY_OBJECT_POLL_INTERVAL_SECS",
                1,
            )),
            object_poll_deadline: Duration::from_secs(env_var_or(
                "XRPL_PARITY_OBJECT_POLL_DEADLINE_SECS",
                20,
            )),
            stream_settle: Duration::from_secs(env_var_or("XRPL_PARITY_STREAM_SETTLE_SECS", 2)),
        }
    }

    /// Whether transactions on this chain must carry a `NetworkID` field.
    pub fn requires_network_id(&self) -> bool {
        self.network_id > NETWORK_ID_THRESHOLD
    }

    /// Owner reserve for `owner_count` objects, in drops.
    pub fn reserve_drops(&self, owner_count: u64) -> u64 {
        self.reserve_base_drops + self.reserve_inc_drops * owner_count
    }
}
