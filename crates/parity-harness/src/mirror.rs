//! Client-side shadow of account balances and sequences.
//!
//! The servers expose no "apply and tell me the diff" API, so the harness
//! reconstructs every balance change from validated-transaction metadata.
//! `ShadowLedger` is owned by one harness session and passed by reference;
//! callers must serialize transactions per account (consensus already
//! serializes the effects).
//!
//! For every transaction classified validated-successful the mirror
//! debits the sender's fee, advances the shadow sequence, and applies a
//! transaction-type-specific delta through an exhaustive `match` on
//! [`TxType`]. A modeled type whose metadata is missing the expected
//! shape is an error, never a silent zero delta.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::debug;

use xrpl_parity_types::amount::{drops, signed_drops};
use xrpl_parity_types::{HarnessConfig, ObjectEffect, TxType};

use crate::finality::ValidatedTx;

/// Shadow state for one tracked account.
#[derive(Debug, Clone, Default)]
pub struct ShadowAccount {
    /// Balance in drops. Signed so drift bugs surface as negatives
    /// instead of wrapping.
    pub balance: i64,
    /// Last known authoritative sequence.
    pub sequence: u64,
    /// Owned-object count, used for reserve-adjusted spendable balance.
    pub owner_count: u64,
    /// Cleared on `AccountDelete`; the entry stays for post-mortem reads.
    pub live: bool,
}

/// Per-session shadow of all tracked accounts.
#[derive(Debug, Default)]
pub struct ShadowLedger {
    accounts: HashMap<String, ShadowAccount>,
}

impl ShadowLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an account at a known balance and sequence.
    pub fn track(&mut self, address: &str, balance: i64, sequence: u64) {
        self.accounts.insert(
            address.to_string(),
            ShadowAccount {
                balance,
                sequence,
                owner_count: 0,
                live: true,
            },
        );
    }

    pub fn get(&self, address: &str) -> Option<&ShadowAccount> {
        self.accounts.get(address)
    }

    pub fn balance(&self, address: &str) -> Option<i64> {
        self.accounts.get(address).filter(|a| a.live).map(|a| a.balance)
    }

    pub fn is_tracked(&self, address: &str) -> bool {
        self.accounts.contains_key(address)
    }

    fn credit(&mut self, address: &str, amount: i64) {
        if let Some(account) = self.accounts.get_mut(address) {
            account.balance += amount;
        }
    }

    fn debit(&mut self, address: &str, amount: i64) {
        self.credit(address, -amount);
    }

    /// Spendable drops after the owner reserve.
    fn spendable(&self, address: &str, config: &HarnessConfig) -> Option<i64> {
        let account = self.accounts.get(address)?;
        Some(account.balance - config.reserve_drops(account.owner_count) as i64)
    }

    /// Apply the economic effect of a validated-successful transaction.
    pub fn apply_validated(&mut self, tx: &ValidatedTx, config: &HarnessConfig) -> Result<()> {
        let tx_json = &tx.tx_json;
        let ty: TxType = tx_json
            .get("TransactionType")
            .and_then(Value::as_str)
            .context("validated transaction has no TransactionType")?
            .parse()?;
        let sender = tx_json
            .get("Account")
            .and_then(Value::as_str)
            .context("validated transaction has no Account")?
            .to_string();
        let fee = drops(tx_json.get("Fee")).unwrap_or(0) as i64;

        self.debit(&sender, fee);
        self.advance_sequence(&sender, tx_json, ty);
        self.apply_type_delta(ty, &sender, tx_json, &tx.meta, fee, config)?;
        self.adjust_owner_count(ty, &sender, tx_json);

        debug!(tx = %ty, sender, fee, "shadow ledger updated");
        Ok(())
    }

    /// Validated-but-failed (tec class) transactions burn the fee and
    /// consume the sequence with no other effect.
    pub fn apply_fee_only(&mut self, tx: &ValidatedTx) -> Result<()> {
        let tx_json = &tx.tx_json;
        let sender = tx_json
            .get("Account")
            .and_then(Value::as_str)
            .context("validated transaction has no Account")?
            .to_string();
        let fee = drops(tx_json.get("Fee")).unwrap_or(0) as i64;
        self.debit(&sender, fee);
        if let Some(seq) = tx_json.get("Sequence").and_then(Value::as_u64) {
            if seq > 0 {
                if let Some(account) = self.accounts.get_mut(&sender) {
                    account.sequence = account.sequence.max(seq + 1);
                }
            }
        }
        Ok(())
    }

    /// Shadow sequence is monotonically non-decreasing and never runs
    /// ahead of the chain; it only moves when the transaction carried an
    /// authoritative `Sequence`.
    fn advance_sequence(&mut self, sender: &str, tx_json: &Value, ty: TxType) {
        let Some(seq) = tx_json.get("Sequence").and_then(Value::as_u64) else {
            return;
        };
        // Ticket-sequence transactions carry Sequence 0 and do not
        // advance the account sequence.
        if seq == 0 {
            return;
        }
        let consumed = if ty == TxType::TicketCreate {
            1 + tx_json.get("TicketCount").and_then(Value::as_u64).unwrap_or(0)
        } else {
            1
        };
        if let Some(account) = self.accounts.get_mut(sender) {
            account.sequence = account.sequence.max(seq + consumed);
        }
    }

    fn apply_type_delta(
        &mut self,
        ty: TxType,
        sender: &str,
        tx_json: &Value,
        meta: &Value,
        fee: i64,
        config: &HarnessConfig,
    ) -> Result<()> {
        match ty {
            TxType::Payment => self.apply_payment(sender, tx_json),
            TxType::EscrowCreate
            | TxType::PaymentChannelCreate
            | TxType::PaymentChannelFund => {
                if let Some(amount) = drops(tx_json.get("Amount")) {
                    self.debit(sender, amount as i64);
                }
                Ok(())
            }
            TxType::EscrowFinish => self.apply_escrow_release(meta, "Destination"),
            TxType::EscrowCancel => self.apply_escrow_release(meta, "Account"),
            TxType::PaymentChannelClaim => self.apply_channel_claim(meta),
            TxType::CheckCash => self.apply_check_cash(sender, tx_json, meta),
            TxType::NFTokenAcceptOffer => self.apply_nft_accept(sender, tx_json, meta),
            TxType::OfferCreate => self.apply_offer_crossing(sender, meta, fee, config),
            TxType::AccountDelete => self.apply_account_delete(sender, tx_json),

            // Fee-only types: no further XRP movement.
            TxType::AccountSet
            | TxType::SetRegularKey
            | TxType::TrustSet
            | TxType::OfferCancel
            | TxType::CheckCreate
            | TxType::CheckCancel
            | TxType::TicketCreate
            | TxType::DepositPreauth
            | TxType::SignerListSet
            | TxType::NFTokenMint
            | TxType::NFTokenBurn
            | TxType::NFTokenCreateOffer
            | TxType::NFTokenCancelOffer
            | TxType::DIDSet
            | TxType::DIDDelete
            | TxType::OracleSet
            | TxType::OracleDelete => Ok(()),
        }
    }

    fn apply_payment(&mut self, sender: &str, tx_json: &Value) -> Result<()> {
        let amount = drops(tx_json.get("Amount"));
        let send_max = drops(tx_json.get("SendMax"));
        // Issued-currency payments move no XRP beyond the fee.
        let Some(credited) = amount else {
            return Ok(());
        };
        let debited = send_max.unwrap_or(credited);
        self.debit(sender, debited as i64);
        if let Some(destination) = tx_json.get("Destination").and_then(Value::as_str) {
            self.credit(destination, credited as i64);
        }
        Ok(())
    }

    /// EscrowFinish releases the held amount to `Destination`,
    /// EscrowCancel back to the creator (`Account`); both fields live on
    /// the deleted `Escrow` node.
    fn apply_escrow_release(&mut self, meta: &Value, recipient_field: &str) -> Result<()> {
        let node = single_node(meta, "DeletedNode", "Escrow")
            .context("escrow release without a deleted Escrow node in metadata")?;
        let fields = &node["FinalFields"];
        let amount = drops(fields.get("Amount"))
            .context("deleted Escrow node has no drops Amount")?;
        let recipient = fields
            .get(recipient_field)
            .and_then(Value::as_str)
            .with_context(|| format!("deleted Escrow node has no {recipient_field}"))?;
        self.credit(&recipient.to_string(), amount as i64);
        Ok(())
    }

    /// A claim moves the channel's `Balance` watermark; the destination
    /// receives the difference against the pre-claim value. Closing the
    /// channel refunds the unclaimed remainder to the channel owner.
    fn apply_channel_claim(&mut self, meta: &Value) -> Result<()> {
        let (node, deleted) = match single_node(meta, "ModifiedNode", "PayChannel") {
            Some(n) => (n, false),
            None => (
                single_node(meta, "DeletedNode", "PayChannel")
                    .context("PaymentChannelClaim without a PayChannel node in metadata")?,
                true,
            ),
        };
        let fields = &node["FinalFields"];
        let final_balance = signed_drops(fields.get("Balance")).unwrap_or(0);
        let prev_balance = signed_drops(node.pointer("/PreviousFields/Balance")).unwrap_or(0);
        let claimed = final_balance - prev_balance;

        if claimed > 0 {
            let destination = fields
                .get("Destination")
                .and_then(Value::as_str)
                .context("PayChannel node has no Destination")?
                .to_string();
            self.credit(&destination, claimed);
        }
        if deleted {
            let capacity = signed_drops(fields.get("Amount")).unwrap_or(0);
            let owner = fields
                .get("Account")
                .and_then(Value::as_str)
                .context("PayChannel node has no Account")?
                .to_string();
            self.credit(&owner, capacity - final_balance);
        }
        Ok(())
    }

    fn apply_check_cash(&mut self, casher: &str, tx_json: &Value, meta: &Value) -> Result<()> {
        let node = single_node(meta, "DeletedNode", "Check")
            .context("CheckCash without a deleted Check node in metadata")?;
        let writer = node
            .pointer("/FinalFields/Account")
            .and_then(Value::as_str)
            .context("deleted Check node has no Account")?
            .to_string();
        let amount = drops(meta.get("delivered_amount"))
            .or_else(|| drops(tx_json.get("Amount")))
            .or_else(|| drops(tx_json.get("DeliverMin")));
        // An issued-currency check moves no XRP.
        if let Some(amount) = amount {
            self.debit(&writer, amount as i64);
            self.credit(&casher.to_string(), amount as i64);
        }
        Ok(())
    }

    /// Accepting an NFT offer deletes the offer object(s). Direct mode
    /// deletes one; broker mode deletes a matched buy/sell pair and the
    /// broker keeps `NFTokenBrokerFee` out of the buyer's payment.
    fn apply_nft_accept(&mut self, acceptor: &str, tx_json: &Value, meta: &Value) -> Result<()> {
        let offers = nodes_of(meta, "DeletedNode", "NFTokenOffer");
        match offers.len() {
            0 => bail!("NFTokenAcceptOffer without a deleted NFTokenOffer node in metadata"),
            1 => {
                let fields = &offers[0]["FinalFields"];
                let Some(amount) = drops(fields.get("Amount")) else {
                    return Ok(()); // issued-currency trade
                };
                let owner = fields
                    .get("Owner")
                    .and_then(Value::as_str)
                    .context("deleted NFTokenOffer has no Owner")?
                    .to_string();
                let is_sell = nft_offer_is_sell(fields);
                if is_sell {
                    // Acceptor buys: pays the listed amount to the owner.
                    self.debit(&acceptor.to_string(), amount as i64);
                    self.credit(&owner, amount as i64);
                } else {
                    // Acceptor sells into a buy offer.
                    self.debit(&owner, amount as i64);
                    self.credit(&acceptor.to_string(), amount as i64);
                }
                Ok(())
            }
            2 => {
                let (sell, buy) = if nft_offer_is_sell(&offers[0]["FinalFields"]) {
                    (&offers[0]["FinalFields"], &offers[1]["FinalFields"])
                } else {
                    (&offers[1]["FinalFields"], &offers[0]["FinalFields"])
                };
                if nft_offer_is_sell(buy) || !nft_offer_is_sell(sell) {
                    bail!("brokered NFTokenAcceptOffer did not delete a buy/sell offer pair");
                }
                let Some(buy_amount) = drops(buy.get("Amount")) else {
                    return Ok(());
                };
                let broker_fee = drops(tx_json.get("NFTokenBrokerFee")).unwrap_or(0);
                let seller_take = buy_amount.checked_sub(broker_fee).with_context(|| {
                    format!("broker fee {broker_fee} exceeds buy amount {buy_amount}")
                })?;
                let buyer = buy
                    .get("Owner")
                    .and_then(Value::as_str)
                    .context("deleted buy NFTokenOffer has no Owner")?
                    .to_string();
                let seller = sell
                    .get("Owner")
                    .and_then(Value::as_str)
                    .context("deleted sell NFTokenOffer has no Owner")?
                    .to_string();
                self.debit(&buyer, buy_amount as i64);
                self.credit(&seller, seller_take as i64);
                self.credit(&acceptor.to_string(), broker_fee as i64);
                Ok(())
            }
            n => bail!("NFTokenAcceptOffer deleted {n} NFTokenOffer nodes, expected 1 or 2"),
        }
    }

    /// An `OfferCreate` that crosses resting offers trades immediately.
    /// The XRP volume comes from each consumed offer's pre-crossing
    /// `TakerPays`/`TakerGets`, capped - on the paying side - by the
    /// trader's reserve-adjusted spendable balance before the fee debit.
    /// The fee is already off the shadow balance when this runs, so it is
    /// added back for the cap.
    fn apply_offer_crossing(
        &mut self,
        trader: &str,
        meta: &Value,
        fee: i64,
        config: &HarnessConfig,
    ) -> Result<()> {
        for node in nodes_of(meta, "DeletedNode", "Offer") {
            let fields = &node["FinalFields"];
            let Some(owner) = fields.get("Owner").and_then(Value::as_str) else {
                // Offer nodes keyed by Account in older metadata shapes.
                continue;
            };
            let owner = owner.to_string();
            let prior = |name: &str| {
                node.pointer(&format!("/PreviousFields/{name}"))
                    .or_else(|| fields.get(name))
            };
            if let Some(taker_pays) = drops(prior("TakerPays")) {
                // Maker wanted XRP; the trader delivers it.
                let cap = self
                    .spendable(trader, config)
                    .map(|s| s + fee)
                    .unwrap_or(taker_pays as i64);
                let traded = (taker_pays as i64).min(cap.max(0));
                self.debit(&trader.to_string(), traded);
                self.credit(&owner, traded);
            } else if let Some(taker_gets) = drops(prior("TakerGets")) {
                // Maker was giving XRP; the trader receives it.
                self.debit(&owner, taker_gets as i64);
                self.credit(&trader.to_string(), taker_gets as i64);
            }
        }
        // No deleted Offer node at all is legitimate here: the offer
        // simply rested without crossing.
        Ok(())
    }

    fn apply_account_delete(&mut self, sender: &str, tx_json: &Value) -> Result<()> {
        let destination = tx_json
            .get("Destination")
            .and_then(Value::as_str)
            .context("AccountDelete has no Destination")?
            .to_string();
        if let Some(account) = self.accounts.get_mut(sender) {
            // Fee was already debited; whatever remains moves over.
            let remaining = account.balance;
            account.balance = 0;
            account.live = false;
            self.credit(&destination, remaining);
        }
        Ok(())
    }

    fn adjust_owner_count(&mut self, ty: TxType, sender: &str, tx_json: &Value) {
        let delta: i64 = match ty.object_effect() {
            ObjectEffect::CreatingObjects => {
                if ty == TxType::TicketCreate {
                    tx_json.get("TicketCount").and_then(Value::as_u64).unwrap_or(1) as i64
                } else {
                    1
                }
            }
            ObjectEffect::ClearingObjects => -1,
            _ => 0,
        };
        if let Some(account) = self.accounts.get_mut(sender) {
            account.owner_count = account.owner_count.saturating_add_signed(delta);
        }
    }
}

/// All `AffectedNodes` entries of the given node kind and entry type.
fn nodes_of<'a>(meta: &'a Value, kind: &str, entry_type: &str) -> Vec<&'a Value> {
    meta.get("AffectedNodes")
        .and_then(Value::as_array)
        .map(|nodes| {
            nodes
                .iter()
                .filter_map(|n| n.get(kind))
                .filter(|n| {
                    n.get("LedgerEntryType").and_then(Value::as_str) == Some(entry_type)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn single_node<'a>(meta: &'a Value, kind: &str, entry_type: &str) -> Option<&'a Value> {
    nodes_of(meta, kind, entry_type).into_iter().next()
}

/// lsfSellNFToken on an NFTokenOffer.
fn nft_offer_is_sell(fields: &Value) -> bool {
    fields.get("Flags").and_then(Value::as_u64).unwrap_or(0) & 1 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validated(tx_json: Value, meta: Value) -> ValidatedTx {
        let mut full = tx_json;
        full["meta"] = meta.clone();
        ValidatedTx {
            tx_json: full,
            meta,
            ledger_index: Some(10),
            hash: "HASH".to_string(),
        }
    }

    fn config() -> HarnessConfig {
        HarnessConfig::default()
    }

    #[test]
    fn test_payment_moves_amount_plus_fee() {
        let mut shadow = ShadowLedger::new();
        shadow.track("rAlice", 20_000_000, 5);
        shadow.track("rBob", 20_000_000, 3);

        let tx = validated(
            json!({
                "TransactionType": "Payment",
                "Account": "rAlice",
                "Destination": "rBob",
                "Amount": "1000000",
                "Fee": "10",
                "Sequence": 5
            }),
            json!({"AffectedNodes": [], "TransactionResult": "tesSUCCESS"}),
        );
        shadow.apply_validated(&tx, &config()).unwrap();

        assert_eq!(shadow.balance("rAlice"), Some(20_000_000 - 1_000_000 - 10));
        assert_eq!(shadow.balance("rBob"), Some(21_000_000));
        assert_eq!(shadow.get("rAlice").unwrap().sequence, 6);
    }

    #[test]
    fn test_payment_with_send_max_debits_send_max() {
        let mut shadow = ShadowLedger::new();
        shadow.track("rAlice", 10_000_000, 1);
        shadow.track("rBob", 0, 1);

        let tx = validated(
            json!({
                "TransactionType": "Payment",
                "Account": "rAlice",
                "Destination": "rBob",
                "Amount": "500",
                "SendMax": "600",
                "Fee": "10",
                "Sequence": 1
            }),
            json!({"AffectedNodes": []}),
        );
        shadow.apply_validated(&tx, &config()).unwrap();
        assert_eq!(shadow.balance("rAlice"), Some(10_000_000 - 600 - 10));
        assert_eq!(shadow.balance("rBob"), Some(500));
    }

    #[test]
    fn test_trust_set_is_fee_only() {
        let mut shadow = ShadowLedger::new();
        shadow.track("rAlice", 20_000_000, 8);

        let tx = validated(
            json!({
                "TransactionType": "TrustSet",
                "Account": "rAlice",
                "LimitAmount": {"currency": "USD", "issuer": "rBob", "value": "1000"},
                "Fee": "10",
                "Sequence": 8
            }),
            json!({"AffectedNodes": []}),
        );
        shadow.apply_validated(&tx, &config()).unwrap();
        assert_eq!(shadow.balance("rAlice"), Some(19_999_990));
        // Trustline counts against the owner reserve.
        assert_eq!(shadow.get("rAlice").unwrap().owner_count, 1);
    }

    #[test]
    fn test_channel_claim_diffs_balance_watermark() {
        let mut shadow = ShadowLedger::new();
        shadow.track("rOwner", 10_000_000, 2);
        shadow.track("rDest", 1_000_000, 2);

        let meta = json!({"AffectedNodes": [{"ModifiedNode": {
            "LedgerEntryType": "PayChannel",
            "FinalFields": {
                "Account": "rOwner",
                "Destination": "rDest",
                "Amount": "5000000",
                "Balance": "300000"
            },
            "PreviousFields": {"Balance": "100000"}
        }}]});
        let tx = validated(
            json!({
                "TransactionType": "PaymentChannelClaim",
                "Account": "rDest",
                "Fee": "10",
                "Sequence": 2
            }),
            meta,
        );
        shadow.apply_validated(&tx, &config()).unwrap();
        assert_eq!(shadow.balance("rDest"), Some(1_000_000 + 200_000 - 10));
        assert_eq!(shadow.balance("rOwner"), Some(10_000_000));
    }

    #[test]
    fn test_channel_close_refunds_remainder() {
        let mut shadow = ShadowLedger::new();
        shadow.track("rOwner", 10_000_000, 2);
        shadow.track("rDest", 1_000_000, 2);

        let meta = json!({"AffectedNodes": [{"DeletedNode": {
            "LedgerEntryType": "PayChannel",
            "FinalFields": {
                "Account": "rOwner",
                "Destination": "rDest",
                "Amount": "5000000",
                "Balance": "300000"
            },
            "PreviousFields": {"Balance": "300000"}
        }}]});
        let tx = validated(
            json!({
                "TransactionType": "PaymentChannelClaim",
                "Account": "rOwner",
                "Fee": "10",
                "Sequence": 2,
                "Flags": 2147614720u32
            }),
            meta,
        );
        shadow.apply_validated(&tx, &config()).unwrap();
        // Nothing newly claimed; owner recovers the unclaimed 4.7M.
        assert_eq!(shadow.balance("rOwner"), Some(10_000_000 - 10 + 4_700_000));
        assert_eq!(shadow.balance("rDest"), Some(1_000_000));
    }

    #[test]
    fn test_claim_without_channel_node_is_error() {
        let mut shadow = ShadowLedger::new();
        shadow.track("rDest", 1_000_000, 2);
        let tx = validated(
            json!({
                "TransactionType": "PaymentChannelClaim",
                "Account": "rDest",
                "Fee": "10",
                "Sequence": 2
            }),
            json!({"AffectedNodes": []}),
        );
        let err = shadow.apply_validated(&tx, &config()).unwrap_err();
        assert!(err.to_string().contains("PayChannel"), "{err}");
    }

    #[test]
    fn test_nft_accept_direct_sell_offer() {
        let mut shadow = ShadowLedger::new();
        shadow.track("rSeller", 5_000_000, 1);
        shadow.track("rBuyer", 5_000_000, 1);

        let meta = json!({"AffectedNodes": [{"DeletedNode": {
            "LedgerEntryType": "NFTokenOffer",
            "FinalFields": {"Owner": "rSeller", "Amount": "250000", "Flags": 1}
        }}]});
        let tx = validated(
            json!({
                "TransactionType": "NFTokenAcceptOffer",
                "Account": "rBuyer",
                "Fee": "10",
                "Sequence": 1
            }),
            meta,
        );
        shadow.apply_validated(&tx, &config()).unwrap();
        assert_eq!(shadow.balance("rBuyer"), Some(5_000_000 - 250_000 - 10));
        assert_eq!(shadow.balance("rSeller"), Some(5_250_000));
    }

    #[test]
    fn test_nft_accept_brokered_pair_with_fee() {
        let mut shadow = ShadowLedger::new();
        shadow.track("rSeller", 1_000_000, 1);
        shadow.track("rBuyer", 1_000_000, 1);
        shadow.track("rBroker", 1_000_000, 1);

        let meta = json!({"AffectedNodes": [
            {"DeletedNode": {
                "LedgerEntryType": "NFTokenOffer",
                "FinalFields": {"Owner": "rBuyer", "Amount": "100000", "Flags": 0}
            }},
            {"DeletedNode": {
                "LedgerEntryType": "NFTokenOffer",
                "FinalFields": {"Owner": "rSeller", "Amount": "90000", "Flags": 1}
            }}
        ]});
        let tx = validated(
            json!({
                "TransactionType": "NFTokenAcceptOffer",
                "Account": "rBroker",
                "NFTokenBrokerFee": "10000",
                "Fee": "10",
                "Sequence": 1
            }),
            meta,
        );
        shadow.apply_validated(&tx, &config()).unwrap();
        assert_eq!(shadow.balance("rBuyer"), Some(900_000));
        assert_eq!(shadow.balance("rSeller"), Some(1_090_000));
        assert_eq!(shadow.balance("rBroker"), Some(1_010_000 - 10));
    }

    #[test]
    fn test_nft_broker_fee_above_buy_amount_is_error() {
        let mut shadow = ShadowLedger::new();
        shadow.track("rBroker", 1_000_000, 1);

        let meta = json!({"AffectedNodes": [
            {"DeletedNode": {
                "LedgerEntryType": "NFTokenOffer",
                "FinalFields": {"Owner": "rBuyer", "Amount": "100", "Flags": 0}
            }},
            {"DeletedNode": {
                "LedgerEntryType": "NFTokenOffer",
                "FinalFields": {"Owner": "rSeller", "Amount": "90", "Flags": 1}
            }}
        ]});
        let tx = validated(
            json!({
                "TransactionType": "NFTokenAcceptOffer",
                "Account": "rBroker",
                "NFTokenBrokerFee": "5000",
                "Fee": "10",
                "Sequence": 1
            }),
            meta,
        );
        let err = shadow.apply_validated(&tx, &config()).unwrap_err();
        assert!(err.to_string().contains("exceeds buy amount"), "{err}");
    }

    #[test]
    fn test_nft_accept_without_offer_node_is_error() {
        let mut shadow = ShadowLedger::new();
        shadow.track("rBuyer", 1_000_000, 1);
        let tx = validated(
            json!({
                "TransactionType": "NFTokenAcceptOffer",
                "Account": "rBuyer",
                "Fee": "10",
                "Sequence": 1
            }),
            json!({"AffectedNodes": []}),
        );
        assert!(shadow.apply_validated(&tx, &config()).is_err());
    }

    #[test]
    fn test_offer_create_crossing_caps_at_spendable() {
        let mut shadow = ShadowLedger::new();
        // Spendable = 12M - 10M base reserve - 0 = 2M, below the maker's 3M ask.
        shadow.track("rTrader", 12_000_000, 1);
        shadow.track("rMaker", 8_000_000, 1);

        let meta = json!({"AffectedNodes": [{"DeletedNode": {
            "LedgerEntryType": "Offer",
            "FinalFields": {"Owner": "rMaker", "TakerPays": "0", "TakerGets": {"currency": "USD", "issuer": "rI", "value": "0"}},
            "PreviousFields": {"TakerPays": "3000000", "TakerGets": {"currency": "USD", "issuer": "rI", "value": "3"}}
        }}]});
        let tx = validated(
            json!({
                "TransactionType": "OfferCreate",
                "Account": "rTrader",
                "TakerGets": "3000000",
                "TakerPays": {"currency": "USD", "issuer": "rI", "value": "3"},
                "Fee": "10",
                "Sequence": 1
            }),
            meta,
        );
        shadow.apply_validated(&tx, &config()).unwrap();
        assert_eq!(shadow.balance("rTrader"), Some(12_000_000 - 2_000_000 - 10));
        assert_eq!(shadow.balance("rMaker"), Some(10_000_000));
    }

    #[test]
    fn test_offer_crossing_cap_ignores_own_fee_debit() {
        let mut shadow = ShadowLedger::new();
        // Pre-fee spendable = 12_000_010 - 10M = 2_000_010, just enough
        // for the maker's 2_000_005 ask. The fee debit must not shrink
        // the cap below the ask.
        shadow.track("rTrader", 12_000_010, 1);
        shadow.track("rMaker", 8_000_000, 1);

        let meta = json!({"AffectedNodes": [{"DeletedNode": {
            "LedgerEntryType": "Offer",
            "FinalFields": {"Owner": "rMaker", "TakerPays": "0", "TakerGets": {"currency": "USD", "issuer": "rI", "value": "0"}},
            "PreviousFields": {"TakerPays": "2000005", "TakerGets": {"currency": "USD", "issuer": "rI", "value": "2"}}
        }}]});
        let tx = validated(
            json!({
                "TransactionType": "OfferCreate",
                "Account": "rTrader",
                "TakerGets": "2000005",
                "TakerPays": {"currency": "USD", "issuer": "rI", "value": "2"},
                "Fee": "10",
                "Sequence": 1
            }),
            meta,
        );
        shadow.apply_validated(&tx, &config()).unwrap();
        assert_eq!(shadow.balance("rTrader"), Some(12_000_010 - 2_000_005 - 10));
        assert_eq!(shadow.balance("rMaker"), Some(8_000_000 + 2_000_005));
    }

    #[test]
    fn test_offer_create_resting_is_fee_only() {
        let mut shadow = ShadowLedger::new();
        shadow.track("rTrader", 12_000_000, 1);
        let tx = validated(
            json!({
                "TransactionType": "OfferCreate",
                "Account": "rTrader",
                "TakerGets": "1000000",
                "TakerPays": {"currency": "USD", "issuer": "rI", "value": "1"},
                "Fee": "10",
                "Sequence": 1
            }),
            json!({"AffectedNodes": [{"CreatedNode": {"LedgerEntryType": "Offer"}}]}),
        );
        shadow.apply_validated(&tx, &config()).unwrap();
        assert_eq!(shadow.balance("rTrader"), Some(11_999_990));
    }

    #[test]
    fn test_account_delete_invalidates_and_transfers() {
        let mut shadow = ShadowLedger::new();
        shadow.track("rGone", 5_000_000, 9);
        shadow.track("rHeir", 1_000_000, 1);

        let tx = validated(
            json!({
                "TransactionType": "AccountDelete",
                "Account": "rGone",
                "Destination": "rHeir",
                "Fee": "2000000",
                "Sequence": 9
            }),
            json!({"AffectedNodes": []}),
        );
        shadow.apply_validated(&tx, &config()).unwrap();
        assert_eq!(shadow.balance("rGone"), None); // invalidated, not removed
        assert!(shadow.is_tracked("rGone"));
        assert_eq!(shadow.balance("rHeir"), Some(1_000_000 + 3_000_000));
    }

    #[test]
    fn test_escrow_finish_credits_destination() {
        let mut shadow = ShadowLedger::new();
        shadow.track("rDest", 100, 1);
        let meta = json!({"AffectedNodes": [{"DeletedNode": {
            "LedgerEntryType": "Escrow",
            "FinalFields": {"Account": "rSrc", "Destination": "rDest", "Amount": "7000"}
        }}]});
        let tx = validated(
            json!({"TransactionType": "EscrowFinish", "Account": "rAnyone", "Fee": "10", "Sequence": 3}),
            meta,
        );
        shadow.apply_validated(&tx, &config()).unwrap();
        assert_eq!(shadow.balance("rDest"), Some(7_100));
    }

    #[test]
    fn test_ticket_create_sequence_advance() {
        let mut shadow = ShadowLedger::new();
        shadow.track("rAlice", 50_000_000, 10);
        let tx = validated(
            json!({
                "TransactionType": "TicketCreate",
                "Account": "rAlice",
                "TicketCount": 3,
                "Fee": "10",
                "Sequence": 10
            }),
            json!({"AffectedNodes": []}),
        );
        shadow.apply_validated(&tx, &config()).unwrap();
        // Sequence consumed by the creating transaction plus one per ticket.
        assert_eq!(shadow.get("rAlice").unwrap().sequence, 14);
        assert_eq!(shadow.get("rAlice").unwrap().owner_count, 3);
    }

    #[test]
    fn test_sequence_never_regresses() {
        let mut shadow = ShadowLedger::new();
        shadow.track("rAlice", 50_000_000, 20);
        let tx = validated(
            json!({"TransactionType": "AccountSet", "Account": "rAlice", "Fee": "10", "Sequence": 5}),
            json!({"AffectedNodes": []}),
        );
        shadow.apply_validated(&tx, &config()).unwrap();
        assert_eq!(shadow.get("rAlice").unwrap().sequence, 20);
    }
}
