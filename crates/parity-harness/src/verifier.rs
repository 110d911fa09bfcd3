//! Structural side-effect verification.
//!
//! After a transaction validates, the verifier confirms the ledger
//! objects it should have created, mutated, or removed actually exist (or
//! no longer exist). Each [`TxType`] belongs to exactly one
//! [`ObjectEffect`] class, which selects the check strategy. Mismatches
//! are errors naming the object or path that was expected and missing.

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tracing::debug;

use xrpl_parity_transport::{result_of, Rpc};
use xrpl_parity_types::{HarnessConfig, ObjectEffect, TxType};

use crate::finality::ValidatedTx;
use crate::poll::poll_until;

/// Declared outcome for an `OfferCreate`, resolving the three-way
/// ambiguity between resting, fully crossed, and partially crossed
/// offers. The verifier asserts the declared outcome and rejects the
/// other two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OfferOutcome {
    /// A new `Offer` object rests in the book.
    #[default]
    Resting,
    /// Fully settled against resting offers; no object remains.
    FullyCrossed,
    /// Partial/brokered crossing leaving a trustline settlement.
    PartiallyCrossed,
}

/// Caller-declared expectations the verifier cannot infer.
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    pub offer_outcome: OfferOutcome,
}

pub struct Verifier<'a> {
    rpc: &'a dyn Rpc,
    config: &'a HarnessConfig,
}

impl<'a> Verifier<'a> {
    pub fn new(rpc: &'a dyn Rpc, config: &'a HarnessConfig) -> Self {
        Self { rpc, config }
    }

    /// Verify the structural effects of a validated transaction.
    pub fn verify(&self, tx: &ValidatedTx, options: &VerifyOptions) -> Result<()> {
        let Some(ty) = tx
            .tx_json
            .get("TransactionType")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<TxType>().ok())
        else {
            // Non-transaction methods carry no object semantics.
            return Ok(());
        };
        let account = tx
            .tx_json
            .get("Account")
            .and_then(Value::as_str)
            .context("validated transaction has no Account")?;

        match ty.object_effect() {
            ObjectEffect::CreatingObjects => self.verify_created(ty, account, tx, options),
            ObjectEffect::ClearingObjects => self.verify_cleared(ty, account, tx),
            ObjectEffect::NotCreatingObjects => self.verify_not_created(account, tx),
            ObjectEffect::NoObjectEffect => Ok(()),
        }
    }

    fn account_objects(&self, account: &str) -> Result<Vec<Value>> {
        let response = self.rpc.send(
            "account_objects",
            json!({"account": account, "ledger_index": "validated"}),
        )?;
        Ok(result_of(&response)
            .get("account_objects")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// Poll until an object caused by `tx_hash` shows up for the owner.
    fn wait_for_object(&self, account: &str, tx_hash: &str) -> Result<Option<Value>> {
        poll_until(
            self.config.object_poll_interval,
            self.config.object_poll_deadline,
            || {
                let objects = self.account_objects(account)?;
                Ok(objects
                    .iter()
                    .find(|o| {
                        o.get("PreviousTxnID").and_then(Value::as_str) == Some(tx_hash)
                    })
                    .cloned())
            },
        )
    }

    fn verify_created(
        &self,
        ty: TxType,
        account: &str,
        tx: &ValidatedTx,
        options: &VerifyOptions,
    ) -> Result<()> {
        if ty.verified_via_ledger_entry() {
            return self.verify_ledger_entry(ty, account, &tx.tx_json, true);
        }
        if ty == TxType::OfferCreate {
            return self.verify_offer_outcome(account, tx, options.offer_outcome);
        }
        if ty == TxType::TicketCreate {
            return self.verify_tickets(account, tx);
        }

        let expected = ty
            .created_entry_type()
            .context("creating-class type without an entry mapping")?;
        let object = self
            .wait_for_object(account, &tx.hash)?
            .with_context(|| {
                format!(
                    "no ledger object with PreviousTxnID {} appeared for {account} within {:?}",
                    tx.hash, self.config.object_poll_deadline
                )
            })?;
        let entry_type = object
            .get("LedgerEntryType")
            .and_then(Value::as_str)
            .unwrap_or("");
        if entry_type != expected {
            bail!(
                "{ty} created a {entry_type} object, expected {expected} (index {})",
                object.get("index").and_then(Value::as_str).unwrap_or("?")
            );
        }
        debug!(%ty, entry_type, "created object verified");
        Ok(())
    }

    /// Resolve the declared `OfferCreate` outcome and reject the others.
    fn verify_offer_outcome(
        &self,
        account: &str,
        tx: &ValidatedTx,
        outcome: OfferOutcome,
    ) -> Result<()> {
        match outcome {
            OfferOutcome::Resting => {
                let object = self.wait_for_object(account, &tx.hash)?.with_context(|| {
                    format!("expected a resting Offer for {}, found no object", tx.hash)
                })?;
                let entry_type = object
                    .get("LedgerEntryType")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                if entry_type != "Offer" {
                    bail!("expected a resting Offer, found {entry_type}; was offer crossing intended?");
                }
                Ok(())
            }
            OfferOutcome::PartiallyCrossed => {
                let object = self.wait_for_object(account, &tx.hash)?.with_context(|| {
                    format!("expected a RippleState settlement for {}, found no object", tx.hash)
                })?;
                let entry_type = object
                    .get("LedgerEntryType")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                if entry_type != "RippleState" {
                    bail!("expected a RippleState settlement, found {entry_type}");
                }
                Ok(())
            }
            OfferOutcome::FullyCrossed => {
                // Full settlement leaves nothing behind; one validated read
                // suffices since the transaction is already final.
                let objects = self.account_objects(account)?;
                if let Some(object) = objects.iter().find(|o| {
                    o.get("PreviousTxnID").and_then(Value::as_str) == Some(tx.hash.as_str())
                        && o.get("LedgerEntryType").and_then(Value::as_str) == Some("Offer")
                }) {
                    bail!(
                        "expected full offer crossing but an Offer rests at index {}",
                        object.get("index").and_then(Value::as_str).unwrap_or("?")
                    );
                }
                Ok(())
            }
        }
    }

    /// `TicketCreate` is the one creating type that produces several
    /// objects: one `Ticket` per requested count, and the account
    /// sequence jumps past all of them.
    fn verify_tickets(&self, account: &str, tx: &ValidatedTx) -> Result<()> {
        let requested = tx
            .tx_json
            .get("TicketCount")
            .and_then(Value::as_u64)
            .context("TicketCreate without TicketCount")?;
        self.wait_for_object(account, &tx.hash)?
            .with_context(|| format!("no Ticket appeared for {} within deadline", tx.hash))?;

        let tickets = self
            .account_objects(account)?
            .iter()
            .filter(|o| {
                o.get("LedgerEntryType").and_then(Value::as_str) == Some("Ticket")
                    && o.get("PreviousTxnID").and_then(Value::as_str)
                        == Some(tx.hash.as_str())
            })
            .count() as u64;
        if tickets != requested {
            bail!("TicketCreate produced {tickets} Ticket objects, expected {requested}");
        }

        if let Some(submitted_seq) = tx.tx_json.get("Sequence").and_then(Value::as_u64) {
            let response = self.rpc.send(
                "account_info",
                json!({"account": account, "ledger_index": "validated"}),
            )?;
            let sequence = result_of(&response)
                .pointer("/account_data/Sequence")
                .and_then(Value::as_u64)
                .context("account_info returned no Sequence")?;
            let expected = submitted_seq + requested + 1;
            if sequence != expected {
                bail!(
                    "account sequence is {sequence} after TicketCreate, expected {expected} \
                     (submitted {submitted_seq} + {requested} tickets + 1)"
                );
            }
        }
        Ok(())
    }

    fn verify_cleared(&self, ty: TxType, account: &str, tx: &ValidatedTx) -> Result<()> {
        if ty == TxType::AccountDelete {
            let response = self
                .rpc
                .send("account_info", json!({"account": account}))?;
            let error = result_of(&response).get("error").and_then(Value::as_str);
            if error != Some("actNotFound") {
                bail!("account {account} still resolves after AccountDelete: {response}");
            }
            return Ok(());
        }
        if ty.verified_via_ledger_entry() {
            return self.verify_ledger_entry(ty, account, &tx.tx_json, false);
        }

        // The deleted object's index comes from the transaction's own
        // affected nodes.
        let Some(deleted_index) = tx
            .meta
            .get("AffectedNodes")
            .and_then(Value::as_array)
            .and_then(|nodes| {
                nodes
                    .iter()
                    .filter_map(|n| n.get("DeletedNode"))
                    .filter_map(|n| n.get("LedgerIndex").and_then(Value::as_str))
                    .next()
            })
        else {
            bail!("{ty} validated but its metadata shows no DeletedNode");
        };

        let objects = self.account_objects(account)?;
        if objects
            .iter()
            .any(|o| o.get("index").and_then(Value::as_str) == Some(deleted_index))
        {
            bail!("object {deleted_index} still present after {ty}");
        }
        Ok(())
    }

    /// Nothing new may be attributable to a non-creating transaction.
    fn verify_not_created(&self, account: &str, tx: &ValidatedTx) -> Result<()> {
        let objects = self.account_objects(account)?;
        if let Some(object) = objects
            .iter()
            .find(|o| o.get("PreviousTxnID").and_then(Value::as_str) == Some(tx.hash.as_str()))
        {
            // Trustline balance changes legitimately stamp RippleState
            // entries with the causing hash; only fresh objects count.
            let entry_type = object
                .get("LedgerEntryType")
                .and_then(Value::as_str)
                .unwrap_or("?");
            if entry_type != "RippleState" && entry_type != "NFTokenPage" {
                bail!(
                    "non-creating transaction {} left a {entry_type} object behind",
                    tx.hash
                );
            }
        }
        Ok(())
    }

    /// DID/Oracle entries are keyed by composite keys and not reliably
    /// enumerable via `account_objects`; confirm them with a direct
    /// `ledger_entry` lookup.
    fn verify_ledger_entry(
        &self,
        ty: TxType,
        account: &str,
        tx_json: &Value,
        expect_present: bool,
    ) -> Result<()> {
        let params = match ty {
            TxType::DIDSet | TxType::DIDDelete => json!({"did": account}),
            TxType::OracleSet | TxType::OracleDelete => json!({"oracle": {
                "account": account,
                "oracle_document_id": tx_json.get("OracleDocumentID").cloned().unwrap_or(Value::from(0)),
            }}),
            _ => bail!("{ty} is not a ledger_entry-verified type"),
        };
        let response = self.rpc.send("ledger_entry", params)?;
        let result = result_of(&response);
        let found = result.get("node").is_some();
        let not_found = result.get("error").and_then(Value::as_str) == Some("entryNotFound");

        match (expect_present, found, not_found) {
            (true, true, _) => {
                let entry_type = result
                    .pointer("/node/LedgerEntryType")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                let expected = ty.created_entry_type().unwrap_or("");
                if entry_type != expected {
                    bail!("{ty} entry has LedgerEntryType {entry_type}, expected {expected}");
                }
                Ok(())
            }
            (true, false, _) => bail!("{ty} entry not found via ledger_entry: {response}"),
            (false, _, true) => Ok(()),
            (false, _, false) => bail!("{ty} entry still present after deletion: {response}"),
        }
    }
}
