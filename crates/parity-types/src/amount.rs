//! XRP amount parsing helpers.
//!
//! Amounts on the wire are either a decimal string of drops (native XRP)
//! or a `{currency, issuer, value}` object (issued currency). The shadow
//! mirror models native drops only, so issued-currency amounts parse to
//! `None` and contribute no XRP delta.

use serde_json::Value;

/// Parse a wire amount as unsigned drops. `None` for issued-currency
/// objects or absent fields.
pub fn drops(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::String(s) => s.parse::<u64>().ok(),
        // Some tooling emits drops as a bare number.
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// Parse a wire amount as signed drops. Channel balances in
/// `PreviousFields`/`FinalFields` diffs need signed arithmetic.
pub fn signed_drops(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::String(s) => s.parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}
