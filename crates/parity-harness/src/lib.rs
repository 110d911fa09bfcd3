//! Execution harness for differential testing of two XRPL query servers.
//!
//! The harness submits identical JSON-RPC requests to a validating node
//! and a read-oriented indexing server, maintains a client-side shadow of
//! account balances and sequences reconstructed from transaction
//! metadata, waits for finality, verifies structural side effects, and
//! deep-compares the two servers' responses.
//!
//! Component layering, leaves first:
//!
//! - [`poll`]: deadline-bounded polling used by every wait
//! - [`retry`]: transient-failure resubmission inside a wall-clock budget
//! - [`finality`]: `tx(hash)` polling until validation
//! - [`mirror`]: shadow balance/sequence model
//! - [`verifier`]: object creation/mutation/deletion checks
//! - [`compare`]: structural response diffing with an ignore-set
//! - [`stream`]: background subscription listener
//! - [`harness`]: the facade test modules call
//!
//! # Example
//!
//! ```ignore
//! use xrpl_parity_harness::{Harness, TxRequest, ServerKind};
//! use xrpl_parity_types::HarnessConfig;
//!
//! let mut harness = Harness::new(HarnessConfig::from_env());
//! let alice = harness.create_account(true, None)?;
//! let bob = harness.create_account(true, None)?;
//! // ... submit transactions, then:
//! harness.compare_servers("account_info",
//!     serde_json::json!({"account": alice.address}),
//!     &xrpl_parity_harness::compare::CompareOptions::server_defaults())?;
//! ```

pub mod compare;
pub mod finality;
pub mod harness;
pub mod mirror;
pub mod poll;
pub mod retry;
pub mod scripted;
pub mod stream;
pub mod verifier;

pub use compare::{assert_equivalent, first_divergence, CompareOptions};
pub use finality::{awaits_finality, wait_for_validation, ValidatedTx};
pub use harness::{
    ExecutionResult, Harness, ServerKind, TxRequest, VerificationExpectation, VerifyOutcome,
};
pub use mirror::{ShadowAccount, ShadowLedger};
pub use poll::poll_until;
pub use retry::{RetryController, Submission};
pub use stream::{StreamListener, StreamQueue};
pub use verifier::{OfferOutcome, Verifier, VerifyOptions};
