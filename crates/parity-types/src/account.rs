//! Test account identity and signing material.

use serde::{Deserialize, Serialize};

/// An account under test: classic address plus the seeds the harness
/// signs with. Shadow balance/sequence live in the harness's
/// `ShadowLedger`, not here, so `Account` stays freely cloneable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Classic address (`r...`).
    pub address: String,
    /// Master key seed (`s...`), as returned by `wallet_propose`.
    pub master_seed: String,
    /// Seed of the regular key, when one has been set via `SetRegularKey`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regular_key_seed: Option<String>,
    /// Address the regular key resolves to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regular_key: Option<String>,
}

impl Account {
    pub fn new(address: impl Into<String>, master_seed: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            master_seed: master_seed.into(),
            regular_key_seed: None,
            regular_key: None,
        }
    }

    /// The seed submissions should sign with: the regular key once set,
    /// the master seed otherwise.
    pub fn signing_seed(&self) -> &str {
        self.regular_key_seed.as_deref().unwrap_or(&self.master_seed)
    }

    /// Attach a regular key (after a validated `SetRegularKey`).
    pub fn with_regular_key(mut self, address: impl Into<String>, seed: impl Into<String>) -> Self {
        self.regular_key = Some(address.into());
        self.regular_key_seed = Some(seed.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_seed_prefers_regular_key() {
        let plain = Account::new("rAlice", "sMaster");
        assert_eq!(plain.signing_seed(), "sMaster");

        let keyed = plain.with_regular_key("rRegular", "sRegular");
        assert_eq!(keyed.signing_seed(), "sRegular");
        assert_eq!(keyed.regular_key.as_deref(), Some("rRegular"));
    }
}
