//! Typed transaction-type enum and its structural classifications.
//!
//! Every transaction type the harness models is a variant of [`TxType`].
//! The verifier and the balance mirror dispatch on this enum with
//! exhaustive `match` arms, so adding a variant forces both tables to be
//! extended at compile time instead of failing at runtime on an unknown
//! string.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error};

/// Transaction types exercised by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxType {
    Payment,
    AccountSet,
    AccountDelete,
    SetRegularKey,
    TrustSet,
    OfferCreate,
    OfferCancel,
    EscrowCreate,
    EscrowFinish,
    EscrowCancel,
    PaymentChannelCreate,
    PaymentChannelFund,
    PaymentChannelClaim,
    CheckCreate,
    CheckCash,
    CheckCancel,
    TicketCreate,
    DepositPreauth,
    SignerListSet,
    NFTokenMint,
    NFTokenBurn,
    NFTokenCreateOffer,
    NFTokenCancelOffer,
    NFTokenAcceptOffer,
    DIDSet,
    DIDDelete,
    OracleSet,
    OracleDelete,
}

/// Structural side-effect class of a transaction type.
///
/// Each type belongs to exactly one class; the lifecycle verifier selects
/// its check strategy from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectEffect {
    /// Produces a new ledger object whose `PreviousTxnID` is the tx hash.
    CreatingObjects,
    /// Removes an existing ledger object (or the account itself).
    ClearingObjects,
    /// Mutates balances or flags but leaves no new object behind.
    NotCreatingObjects,
    /// Submit-only / meta operations with no ledger-object semantics.
    NoObjectEffect,
}

impl TxType {
    /// Canonical wire name used in `tx_json.TransactionType`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Payment => "Payment",
            TxType::AccountSet => "AccountSet",
            TxType::AccountDelete => "AccountDelete",
            TxType::SetRegularKey => "SetRegularKey",
            TxType::TrustSet => "TrustSet",
            TxType::OfferCreate => "OfferCreate",
            TxType::OfferCancel => "OfferCancel",
            TxType::EscrowCreate => "EscrowCreate",
            TxType::EscrowFinish => "EscrowFinish",
            TxType::EscrowCancel => "EscrowCancel",
            TxType::PaymentChannelCreate => "PaymentChannelCreate",
            TxType::PaymentChannelFund => "PaymentChannelFund",
            TxType::PaymentChannelClaim => "PaymentChannelClaim",
            TxType::CheckCreate => "CheckCreate",
            TxType::CheckCash => "CheckCash",
            TxType::CheckCancel => "CheckCancel",
            TxType::TicketCreate => "TicketCreate",
            TxType::DepositPreauth => "DepositPreauth",
            TxType::SignerListSet => "SignerListSet",
            TxType::NFTokenMint => "NFTokenMint",
            TxType::NFTokenBurn => "NFTokenBurn",
            TxType::NFTokenCreateOffer => "NFTokenCreateOffer",
            TxType::NFTokenCancelOffer => "NFTokenCancelOffer",
            TxType::NFTokenAcceptOffer => "NFTokenAcceptOffer",
            TxType::DIDSet => "DIDSet",
            TxType::DIDDelete => "DIDDelete",
            TxType::OracleSet => "OracleSet",
            TxType::OracleDelete => "OracleDelete",
        }
    }

    /// Which structural side-effect class this type belongs to.
    pub fn object_effect(&self) -> ObjectEffect {
        match self {
            TxType::TrustSet
            | TxType::OfferCreate
            | TxType::EscrowCreate
            | TxType::PaymentChannelCreate
            | TxType::CheckCreate
            | TxType::TicketCreate
            | TxType::DepositPreauth
            | TxType::SignerListSet
            | TxType::NFTokenCreateOffer
            | TxType::DIDSet
            | TxType::OracleSet => ObjectEffect::CreatingObjects,

            TxType::AccountDelete
            | TxType::OfferCancel
            | TxType::EscrowFinish
            | TxType::EscrowCancel
            | TxType::CheckCash
            | TxType::CheckCancel
            | TxType::NFTokenBurn
            | TxType::NFTokenCancelOffer
            | TxType::NFTokenAcceptOffer
            | TxType::DIDDelete
            | TxType::OracleDelete => ObjectEffect::ClearingObjects,

            // PaymentChannelClaim without a close flag only rewrites the
            // channel balance; NFTokenMint lands on an NFTokenPage whose
            // PreviousTxnID tracks the page, not the mint.
            TxType::Payment
            | TxType::AccountSet
            | TxType::SetRegularKey
            | TxType::PaymentChannelFund
            | TxType::PaymentChannelClaim
            | TxType::NFTokenMint => ObjectEffect::NotCreatingObjects,
        }
    }

    /// `LedgerEntryType` of the object a creating-class transaction
    /// produces. `None` for types that never create an enumerable object.
    ///
    /// `OfferCreate` maps to `Offer` here; crossing outcomes are resolved
    /// by the verifier against the caller's declared expectation.
    pub fn created_entry_type(&self) -> Option<&'static str> {
        match self {
            TxType::TrustSet => Some("RippleState"),
            TxType::OfferCreate => Some("Offer"),
            TxType::EscrowCreate => Some("Escrow"),
            TxType::PaymentChannelCreate => Some("PayChannel"),
            TxType::CheckCreate => Some("Check"),
            TxType::TicketCreate => Some("Ticket"),
            TxType::DepositPreauth => Some("DepositPreauth"),
            TxType::SignerListSet => Some("SignerList"),
            TxType::NFTokenCreateOffer => Some("NFTokenOffer"),
            TxType::DIDSet => Some("DID"),
            TxType::OracleSet => Some("Oracle"),
            _ => None,
        }
    }

    /// Types whose objects are keyed by a composite and are not reliably
    /// enumerable through `account_objects`; the verifier confirms them
    /// with a direct `ledger_entry` lookup instead.
    pub fn verified_via_ledger_entry(&self) -> bool {
        matches!(
            self,
            TxType::DIDSet | TxType::DIDDelete | TxType::OracleSet | TxType::OracleDelete
        )
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s {
            "Payment" => TxType::Payment,
            "AccountSet" => TxType::AccountSet,
            "AccountDelete" => TxType::AccountDelete,
            "SetRegularKey" => TxType::SetRegularKey,
            "TrustSet" => TxType::TrustSet,
            "OfferCreate" => TxType::OfferCreate,
            "OfferCancel" => TxType::OfferCancel,
            "EscrowCreate" => TxType::EscrowCreate,
            "EscrowFinish" => TxType::EscrowFinish,
            "EscrowCancel" => TxType::EscrowCancel,
            "PaymentChannelCreate" => TxType::PaymentChannelCreate,
            "PaymentChannelFund" => TxType::PaymentChannelFund,
            "PaymentChannelClaim" => TxType::PaymentChannelClaim,
            "CheckCreate" => TxType::CheckCreate,
            "CheckCash" => TxType::CheckCash,
            "CheckCancel" => TxType::CheckCancel,
            "TicketCreate" => TxType::TicketCreate,
            "DepositPreauth" => TxType::DepositPreauth,
            "SignerListSet" => TxType::SignerListSet,
            "NFTokenMint" => TxType::NFTokenMint,
            "NFTokenBurn" => TxType::NFTokenBurn,
            "NFTokenCreateOffer" => TxType::NFTokenCreateOffer,
            "NFTokenCancelOffer" => TxType::NFTokenCancelOffer,
            "NFTokenAcceptOffer" => TxType::NFTokenAcceptOffer,
            "DIDSet" => TxType::DIDSet,
            "DIDDelete" => TxType::DIDDelete,
            "OracleSet" => TxType::OracleSet,
            "OracleDelete" => TxType::OracleDelete,
            other => return Err(anyhow!("unknown TransactionType: {other}")),
        };
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_name_round_trip() {
        let all = [
            TxType::Payment,
            TxType::TrustSet,
            TxType::OfferCreate,
            TxType::TicketCreate,
            TxType::NFTokenAcceptOffer,
            TxType::OracleDelete,
        ];
        for ty in all {
            assert_eq!(ty.as_str().parse::<TxType>().unwrap(), ty);
        }
        assert!("OfferDelete".parse::<TxType>().is_err());
    }

    #[test]
    fn test_creating_types_have_entry_mapping() {
        // Every creating-class type must name the entry type it produces.
        let all = [
            TxType::Payment,
            TxType::AccountSet,
            TxType::AccountDelete,
            TxType::SetRegularKey,
            TxType::TrustSet,
            TxType::OfferCreate,
            TxType::OfferCancel,
            TxType::EscrowCreate,
            TxType::EscrowFinish,
            TxType::EscrowCancel,
            TxType::PaymentChannelCreate,
            TxType::PaymentChannelFund,
            TxType::PaymentChannelClaim,
            TxType::CheckCreate,
            TxType::CheckCash,
            TxType::CheckCancel,
            TxType::TicketCreate,
            TxType::DepositPreauth,
            TxType::SignerListSet,
            TxType::NFTokenMint,
            TxType::NFTokenBurn,
            TxType::NFTokenCreateOffer,
            TxType::NFTokenCancelOffer,
            TxType::NFTokenAcceptOffer,
            TxType::DIDSet,
            TxType::DIDDelete,
            TxType::OracleSet,
            TxType::OracleDelete,
        ];
        for ty in all {
            if ty.object_effect() == ObjectEffect::CreatingObjects {
                assert!(ty.created_entry_type().is_some(), "{ty} missing mapping");
            }
        }
    }

    #[test]
    fn test_special_entry_mappings() {
        assert_eq!(TxType::TrustSet.created_entry_type(), Some("RippleState"));
        assert_eq!(
            TxType::PaymentChannelCreate.created_entry_type(),
            Some("PayChannel")
        );
        assert_eq!(
            TxType::NFTokenCreateOffer.created_entry_type(),
            Some("NFTokenOffer")
        );
    }

    #[test]
    fn test_composite_key_types_use_ledger_entry() {
        assert!(TxType::DIDSet.verified_via_ledger_entry());
        assert!(TxType::OracleDelete.verified_via_ledger_entry());
        assert!(!TxType::TrustSet.verified_via_ledger_entry());
    }
}
