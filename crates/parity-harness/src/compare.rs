//! Differential comparison of two server responses.
//!
//! The indexing server is supposed to be a drop-in read replacement for
//! the validating node, so responses to the same logical query must be
//! structurally identical outside a declared ignore-set (validated ledger
//! hashes on non-identical chains, timing fields, server metadata).
//! Failures report the first mismatching key path.

use std::collections::HashSet;

use anyhow::{bail, Result};
use serde_json::Value;

/// Comparison policy.
#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    /// Key names treated as wildcards at any depth.
    pub ignore_keys: HashSet<String>,
    /// Compare arrays element-by-element in order (the default); when
    /// false, arrays match if they are equal as multisets.
    pub unordered_arrays: bool,
}

impl CompareOptions {
    pub fn ignoring<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignore_keys: keys.into_iter().map(Into::into).collect(),
            unordered_arrays: false,
        }
    }

    /// Ignore-set for fields that legitimately diverge between a
    /// validating node and an indexing server.
    pub fn server_defaults() -> Self {
        Self::ignoring([
            "ledger_hash",
            "ledger_index",
            "ledger_current_index",
            "validated_ledgers",
            "warnings",
            "time",
            "date",
            "inLedger",
        ])
    }
}

/// First mismatching path between two response trees, or `None` when
/// equivalent under the options.
pub fn first_divergence(a: &Value, b: &Value, options: &CompareOptions) -> Option<String> {
    diff_at("", a, b, options)
}

/// Assert structural equivalence; the error names the mismatching path.
pub fn assert_equivalent(a: &Value, b: &Value, options: &CompareOptions) -> Result<()> {
    if let Some(path) = first_divergence(a, b, options) {
        bail!("responses diverge at {path}");
    }
    Ok(())
}

fn diff_at(path: &str, a: &Value, b: &Value, options: &CompareOptions) -> Option<String> {
    match (a, b) {
        (Value::Object(left), Value::Object(right)) => {
            let keys: HashSet<&String> = left.keys().chain(right.keys()).collect();
            // Deterministic reporting order.
            let mut keys: Vec<&String> = keys.into_iter().collect();
            keys.sort();
            for key in keys {
                if options.ignore_keys.contains(key.as_str()) {
                    continue;
                }
                let child = join(path, key);
                match (left.get(key), right.get(key)) {
                    (Some(l), Some(r)) => {
                        if let Some(found) = diff_at(&child, l, r, options) {
                            return Some(found);
                        }
                    }
                    _ => return Some(child),
                }
            }
            None
        }
        (Value::Array(left), Value::Array(right)) => {
            if left.len() != right.len() {
                return Some(format!("{path}.len ({} vs {})", left.len(), right.len()));
            }
            if options.unordered_arrays {
                diff_unordered(path, left, right, options)
            } else {
                for (i, (l, r)) in left.iter().zip(right).enumerate() {
                    let child = join(path, &i.to_string());
                    if let Some(found) = diff_at(&child, l, r, options) {
                        return Some(found);
                    }
                }
                None
            }
        }
        _ => (a != b).then(|| {
            if path.is_empty() {
                "<root>".to_string()
            } else {
                path.to_string()
            }
        }),
    }
}

/// Multiset match: every left element pairs with a distinct right one.
fn diff_unordered(
    path: &str,
    left: &[Value],
    right: &[Value],
    options: &CompareOptions,
) -> Option<String> {
    let mut unmatched: Vec<&Value> = right.iter().collect();
    for (i, l) in left.iter().enumerate() {
        let found = unmatched
            .iter()
            .position(|r| diff_at("", l, r, options).is_none());
        match found {
            Some(pos) => {
                unmatched.swap_remove(pos);
            }
            None => return Some(join(path, &i.to_string())),
        }
    }
    None
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}
