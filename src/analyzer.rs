//! Balance-delta analysis of settled transactions.
//!
//! Given a [`TransactionRecord`], this module answers two questions: how
//! much of a given token did a given recipient receive, and who most likely
//! sent it. The received amount is exact, reconstructed from the pre/post
//! balance snapshots. Sender attribution is best effort and explicitly
//! tagged as such: token balance snapshots do not carry the payer's
//! identity, so the analyzer reconciles balance decreases against the
//! received amount and otherwise falls back to the fee payer.

use rust_decimal::Decimal;

use crate::chain::record::{TokenBalanceEntry, TransactionRecord};
use crate::chain::types::Address;

/// Best-effort attribution of the paying side of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sender {
    /// Owner of a token account whose balance decreased by exactly the
    /// received amount. High confidence: the deltas reconcile as a direct
    /// transfer.
    Reconciled(Address),
    /// First account key of the transaction, the fee payer. Low confidence:
    /// used when no balance decrease reconciles, so this is approximate
    /// attribution only.
    FeePayer(Address),
    /// The record carries no usable attribution at all.
    Unknown,
}

impl Sender {
    /// The attributed address, if any.
    pub fn address(&self) -> Option<&Address> {
        match self {
            Sender::Reconciled(address) | Sender::FeePayer(address) => Some(address),
            Sender::Unknown => None,
        }
    }
}

/// A positive token transfer received by the target recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedTransfer {
    /// Net amount received, in display units. Always positive.
    pub amount: Decimal,
    /// Best-effort sender attribution.
    pub sender: Sender,
}

/// Extracts the net amount of `token` received by `recipient` in `record`,
/// along with the most probable sender.
///
/// Post-transaction balance entries are scanned in encounter order; the
/// first recipient-owned entry for the token with a positive delta wins,
/// and ties are not re-scored. A missing pre-transaction entry counts as a
/// zero starting balance (freshly created token account).
///
/// Returns `None` when no positive delta exists, so a transaction that
/// moved nothing to the recipient can never look like a zero-amount
/// payment.
pub fn received_transfer(
    record: &TransactionRecord,
    token: &str,
    recipient: &Address,
) -> Option<ReceivedTransfer> {
    for post in &record.post_token_balances {
        if post.mint != token || post.owner.as_ref() != Some(recipient) {
            continue;
        }
        let pre_amount = find_balance(&record.pre_token_balances, post.account_index, token)
            .map(|entry| entry.amount)
            .unwrap_or(Decimal::ZERO);
        let received = post.amount - pre_amount;
        if received <= Decimal::ZERO {
            continue;
        }
        let sender = attribute_sender(record, token, post.account_index, received);
        return Some(ReceivedTransfer {
            amount: received,
            sender,
        });
    }
    None
}

/// Finds the token account, other than the recipient's, whose balance
/// decreased by exactly `received`, and reports its owner. Falls back to the
/// fee payer when no decrease reconciles.
fn attribute_sender(
    record: &TransactionRecord,
    token: &str,
    recipient_index: u8,
    received: Decimal,
) -> Sender {
    for pre in &record.pre_token_balances {
        if pre.mint != token || pre.account_index == recipient_index {
            continue;
        }
        let post_amount = find_balance(&record.post_token_balances, pre.account_index, token)
            .map(|entry| entry.amount)
            .unwrap_or(Decimal::ZERO);
        if pre.amount > post_amount && pre.amount - post_amount == received {
            if let Some(owner) = &pre.owner {
                return Sender::Reconciled(*owner);
            }
            break;
        }
    }
    match record.fee_payer() {
        Some(fee_payer) => Sender::FeePayer(*fee_payer),
        None => Sender::Unknown,
    }
}

fn find_balance<'a>(
    entries: &'a [TokenBalanceEntry],
    account_index: u8,
    token: &str,
) -> Option<&'a TokenBalanceEntry> {
    entries
        .iter()
        .find(|entry| entry.account_index == account_index && entry.mint == token)
}
