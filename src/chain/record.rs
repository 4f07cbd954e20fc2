//! Immutable view of a settled ledger transaction.
//!
//! A [`TransactionRecord`] is what the payment verifier reasons about: the
//! settlement time, the success or failure of the transaction, and the token
//! balance snapshots taken before and after it ran. Records are produced by
//! the [`LedgerRpc`](crate::chain::rpc::LedgerRpc) boundary and never
//! mutated afterwards.

use rust_decimal::Decimal;

use crate::chain::Address;
use crate::timestamp::UnixTimestamp;

/// Whether the transaction executed successfully on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    Success,
    Failed,
}

/// Snapshot of one account's holdings of one token, before or after a
/// transaction.
///
/// Pre- and post-transaction entries correlate by `(account_index, mint)`;
/// the account index is stable within a single record.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenBalanceEntry {
    /// Index of the token account within the transaction's account list.
    pub account_index: u8,
    /// Owner of the token account, when the ledger reports one.
    pub owner: Option<Address>,
    /// Mint address of the token.
    pub mint: String,
    /// Balance in display units, exact decimal.
    pub amount: Decimal,
}

/// A settled transaction as returned by the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    /// Block time of the transaction. Records the ledger reports without a
    /// block time settle at epoch 0, which makes them fail any freshness
    /// check.
    pub settled_at: UnixTimestamp,
    /// Execution outcome.
    pub outcome: TransactionOutcome,
    /// Token balances before the transaction, in ledger order.
    pub pre_token_balances: Vec<TokenBalanceEntry>,
    /// Token balances after the transaction, in ledger order.
    pub post_token_balances: Vec<TokenBalanceEntry>,
    /// Static account keys of the transaction message. The first entry is
    /// the fee payer.
    pub account_keys: Vec<Address>,
}

impl TransactionRecord {
    /// First account key of the transaction, the fee payer, if any.
    pub fn fee_payer(&self) -> Option<&Address> {
        self.account_keys.first()
    }
}
