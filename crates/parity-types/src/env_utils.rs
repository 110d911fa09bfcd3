//! Environment variable parsing utilities.
//!
//! Small helpers used by [`crate::config`] so every timing budget and
//! endpoint can be overridden without code changes:
//!
//! ```
//! use xrpl_parity_types::env_utils::{env_var_or, env_string_or};
//!
//! let wait_secs: u64 = env_var_or("XRPL_PARITY_RETRY_WAIT_SECS", 20);
//! let url = env_string_or("XRPL_PARITY_RIPPLED_URL", "http://127.0.0.1:5005");
//! ```

use std::str::FromStr;

/// Parse an environment variable into a type that implements `FromStr`.
///
/// Returns `None` if the variable is not set or cannot be parsed.
pub fn env_var<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Parse an environment variable with a default value.
///
/// Returns the default if the variable is not set or cannot be parsed.
pub fn env_var_or<T: FromStr>(key: &str, default: T) -> T {
    env_var(key).unwrap_or(default)
}

/// Get an environment variable as a string with a default value.
pub fn env_string_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Check if an environment variable is set to a truthy value.
///
/// Returns `true` for "1", "true", "yes", or "on" (case-insensitive).
pub fn env_bool(key: &str) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Like [`env_bool`], but with a default when the variable is unset.
pub fn env_bool_or(key: &str, default: bool) -> bool {
    match std::env::var(key).ok() {
        Some(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_or() {
        std::env::set_var("PARITY_TEST_U64", "42");
        let val: u64 = env_var_or("PARITY_TEST_U64", 7);
        assert_eq!(val, 42);

        let default_val: u64 = env_var_or("PARITY_TEST_MISSING_1", 7);
        assert_eq!(default_val, 7);

        std::env::remove_var("PARITY_TEST_U64");
    }

    #[test]
    fn test_env_string_or() {
        std::env::set_var("PARITY_TEST_STR", "ws://localhost:6006");
        assert_eq!(env_string_or("PARITY_TEST_STR", "d"), "ws://localhost:6006");
        assert_eq!(env_string_or("PARITY_TEST_MISSING_2", "d"), "d");
        std::env::remove_var("PARITY_TEST_STR");
    }

    #[test]
    fn test_env_bool() {
        std::env::set_var("PARITY_TEST_BOOL", "YES");
        assert!(env_bool("PARITY_TEST_BOOL"));
        std::env::set_var("PARITY_TEST_BOOL", "false");
        assert!(!env_bool("PARITY_TEST_BOOL"));
        assert!(!env_bool("PARITY_TEST_MISSING_3"));
        std::env::remove_var("PARITY_TEST_BOOL");
    }
}
