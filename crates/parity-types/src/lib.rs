//! Shared types for the xrpl-parity workspace.
//!
//! This crate provides foundational types used across the transport and
//! harness crates, breaking circular dependency chains:
//!
//! - [`TxType`](tx_type::TxType) - typed transaction-type enum with its
//!   object-effect classification and ledger-entry mappings
//! - [`ResultClass`](result_code::ResultClass) - engine-result taxonomy
//!   driving retry decisions
//! - [`Account`](account::Account) - test account identity and signing material
//! - [`HarnessConfig`](config::HarnessConfig) - named timing budgets and
//!   endpoints, overridable via `XRPL_PARITY_*` environment variables

pub mod account;
pub mod amount;
pub mod config;
pub mod env_utils;
pub mod result_code;
pub mod tx_type;

pub use account::Account;
pub use amount::{drops, signed_drops};
pub use config::HarnessConfig;
pub use result_code::{classify_result, ResultClass};
pub use tx_type::{ObjectEffect, TxType};
