//! Payment verification flow.
//!
//! [`PaymentGate`] is the read side of the protocol: given a transaction
//! signature and the expected payment terms, it decides whether the
//! signature proves a settled payment. The checks run in a fixed order and
//! nothing is retried internally; a `TransactionNotFound` for a
//! not-yet-confirmed signature is terminal for that call and the caller's
//! backoff policy decides when to present it again.
//!
//! Verification is expected to fail often, so every rejection is a value,
//! never a panic, and the public [`PaymentGate::verify`] folds the typed
//! error into the wire [`VerificationResult`].

use rust_decimal::Decimal;
use solana_commitment_config::CommitmentConfig;
use solana_signature::Signature;

use crate::analyzer::{Sender, received_transfer};
use crate::chain::record::{TransactionOutcome, TransactionRecord};
use crate::chain::rpc::{LedgerRpc, LedgerRpcError};
use crate::chain::types::Address;
use crate::proto::{PaymentStatus, VerificationResult};
use crate::replay::{ReplayCheck, ReplayGuard};
use crate::timestamp::UnixTimestamp;

/// Default freshness window and replay TTL, in seconds.
pub const DEFAULT_MAX_AGE_SECONDS: u64 = 300;

/// Default absolute tolerance when comparing received and expected amounts,
/// in token display units: `0.0001`.
///
/// The tolerance absorbs rounding artifacts of display-unit conversion. It
/// is deliberately fixed regardless of the token's decimal count; whether it
/// should scale with `decimals` for tokens of very different precision is an
/// open question, so a caller pricing in such a token should set its own via
/// [`GateOptions`].
pub fn default_amount_tolerance() -> Decimal {
    Decimal::new(1, 4)
}

/// Tuning knobs for a [`PaymentGate`].
#[derive(Debug, Clone)]
pub struct GateOptions {
    /// Absolute tolerance for amount comparison, in display units.
    pub amount_tolerance: Decimal,
    /// TTL of replay-guard entries, in seconds. Should be at least as large
    /// as the largest `max_age_seconds` callers verify with; the age check
    /// rejects anything older on its own.
    pub replay_ttl_seconds: u64,
}

impl Default for GateOptions {
    fn default() -> Self {
        Self {
            amount_tolerance: default_amount_tolerance(),
            replay_ttl_seconds: DEFAULT_MAX_AGE_SECONDS,
        }
    }
}

/// The payment terms a signature is verified against.
#[derive(Debug, Clone)]
pub struct ExpectedPayment {
    /// Expected amount in token display units.
    pub amount: Decimal,
    /// Token identifier the payment must be made in (mint address).
    pub token: String,
    /// Address that must have received the payment.
    pub recipient: Address,
    /// Maximum accepted age of the settlement, in seconds. A transaction
    /// settled exactly `max_age_seconds` ago still passes.
    pub max_age_seconds: u64,
}

/// A successfully verified payment.
#[derive(Debug, Clone)]
pub struct SettledPayment {
    pub signature: Signature,
    /// Amount actually received, in display units.
    pub amount: Decimal,
    pub token: String,
    /// Best-effort sender attribution.
    pub sender: Sender,
    pub recipient: Address,
    pub settled_at: UnixTimestamp,
}

impl From<SettledPayment> for VerificationResult {
    fn from(payment: SettledPayment) -> Self {
        let from = payment
            .sender
            .address()
            .map(ToString::to_string)
            .unwrap_or_default();
        VerificationResult::valid(
            payment.signature.to_string(),
            payment.amount,
            payment.token,
            from,
            payment.recipient,
            payment.settled_at,
        )
    }
}

/// Reasons a payment signature fails verification.
///
/// Only [`VerificationError::Ledger`] is worth retrying; every other
/// variant is terminal for that signature.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    /// The ledger does not know the signature at confirmed commitment.
    #[error("Transaction not found")]
    TransactionNotFound,
    /// The transaction settled outside the freshness window.
    #[error("Transaction too old: {age}s (max {max}s)")]
    TransactionExpired { age: u64, max: u64 },
    /// The transaction executed but failed on the ledger.
    #[error("Transaction failed")]
    TransactionFailed,
    /// The transaction moved no positive amount of the expected token to
    /// the expected recipient.
    #[error("No {token} transfer found to recipient address")]
    NoTransferFound { token: String },
    /// The received amount differs from the expected amount beyond the
    /// configured tolerance.
    #[error("Amount mismatch: expected {expected}, got {actual}")]
    AmountMismatch { expected: Decimal, actual: Decimal },
    /// The signature already paid for an earlier request.
    #[error("Signature already used for a previous payment")]
    AlreadyUsed,
    /// The ledger could not be queried. Unlike the other variants this is
    /// not a verdict about the payment.
    #[error("Ledger unavailable: {0}")]
    Ledger(#[from] LedgerRpcError),
}

/// Verifies settled payments against expected terms.
///
/// The gate owns no per-call state; the replay table is the only shared
/// mutable resource, and its per-signature check-and-record is atomic, so
/// `verify` calls for distinct signatures run fully in parallel.
///
/// # Example
///
/// ```ignore
/// use x402_paygate::chain::SolanaLedgerRpc;
/// use x402_paygate::gate::{ExpectedPayment, PaymentGate};
///
/// let gate = PaymentGate::new(SolanaLedgerRpc::new("https://api.devnet.solana.com"));
/// let result = gate.verify(&signature, &expected).await;
/// if result.valid {
///     // grant access
/// }
/// ```
#[derive(Debug)]
pub struct PaymentGate<L> {
    ledger: L,
    replay: ReplayGuard,
    amount_tolerance: Decimal,
}

impl<L> PaymentGate<L> {
    /// Creates a gate with default options.
    pub fn new(ledger: L) -> Self {
        Self::with_options(ledger, GateOptions::default())
    }

    /// Creates a gate with explicit options.
    pub fn with_options(ledger: L, options: GateOptions) -> Self {
        Self {
            ledger,
            replay: ReplayGuard::new(options.replay_ttl_seconds),
            amount_tolerance: options.amount_tolerance,
        }
    }

    /// The replay guard backing this gate, for periodic sweeps.
    pub fn replay_guard(&self) -> &ReplayGuard {
        &self.replay
    }

    fn verify_record(
        &self,
        signature: &Signature,
        expected: &ExpectedPayment,
        record: &TransactionRecord,
        now: UnixTimestamp,
    ) -> Result<SettledPayment, VerificationError> {
        let age = now.saturating_secs_since(record.settled_at);
        if age > expected.max_age_seconds {
            return Err(VerificationError::TransactionExpired {
                age,
                max: expected.max_age_seconds,
            });
        }
        if record.outcome == TransactionOutcome::Failed {
            return Err(VerificationError::TransactionFailed);
        }
        let transfer = received_transfer(record, &expected.token, &expected.recipient).ok_or_else(
            || VerificationError::NoTransferFound {
                token: expected.token.clone(),
            },
        )?;
        if (transfer.amount - expected.amount).abs() > self.amount_tolerance {
            return Err(VerificationError::AmountMismatch {
                expected: expected.amount,
                actual: transfer.amount,
            });
        }
        if self.replay.check_and_record(signature) == ReplayCheck::AlreadyUsed {
            return Err(VerificationError::AlreadyUsed);
        }
        Ok(SettledPayment {
            signature: *signature,
            amount: transfer.amount,
            token: expected.token.clone(),
            sender: transfer.sender,
            recipient: expected.recipient,
            settled_at: record.settled_at,
        })
    }
}

impl<L: LedgerRpc> PaymentGate<L> {
    /// Verifies that `signature` proves a settled payment matching
    /// `expected`, and returns the wire verdict.
    ///
    /// Checks run in fixed order: fetch, freshness, outcome, transfer
    /// extraction, amount reconciliation, replay. The age check and the
    /// replay check are independent safeguards; both must hold.
    pub async fn verify(
        &self,
        signature: &Signature,
        expected: &ExpectedPayment,
    ) -> VerificationResult {
        match self.verify_payment(signature, expected).await {
            Ok(payment) => payment.into(),
            Err(error) => {
                tracing::debug!(%signature, %error, "payment rejected");
                VerificationResult::invalid(&error)
            }
        }
    }

    /// Same as [`verify`](Self::verify), but keeps the typed outcome.
    pub async fn verify_payment(
        &self,
        signature: &Signature,
        expected: &ExpectedPayment,
    ) -> Result<SettledPayment, VerificationError> {
        let record = self
            .ledger
            .get_transaction_record(signature, CommitmentConfig::confirmed())
            .await?
            .ok_or(VerificationError::TransactionNotFound)?;
        self.verify_record(signature, expected, &record, UnixTimestamp::now())
    }

    /// Reports confirmation and finality of a signature, independent of
    /// payment semantics. Two separate ledger queries; transport failures
    /// propagate rather than masquerading as "not confirmed".
    pub async fn status(&self, signature: &Signature) -> Result<PaymentStatus, LedgerRpcError> {
        let confirmed = self
            .ledger
            .get_transaction_record(signature, CommitmentConfig::confirmed())
            .await?
            .is_some();
        let finalized = self
            .ledger
            .get_transaction_record(signature, CommitmentConfig::finalized())
            .await?
            .is_some();
        Ok(PaymentStatus {
            confirmed,
            finalized,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::record::TokenBalanceEntry;
    use std::str::FromStr;

    const USDC: &str = "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZ5nc4pb";

    struct NoLedger;

    fn addr(seed: u8) -> Address {
        Address::new(solana_pubkey::Pubkey::new_from_array([seed; 32]))
    }

    fn expected(recipient: Address, amount: &str, max_age_seconds: u64) -> ExpectedPayment {
        ExpectedPayment {
            amount: Decimal::from_str(amount).unwrap(),
            token: USDC.to_string(),
            recipient,
            max_age_seconds,
        }
    }

    fn transfer_record(
        recipient: Address,
        sender: Address,
        settled_at: UnixTimestamp,
    ) -> TransactionRecord {
        let entry = |index: u8, owner: Address, amount: &str| TokenBalanceEntry {
            account_index: index,
            owner: Some(owner),
            mint: USDC.to_string(),
            amount: Decimal::from_str(amount).unwrap(),
        };
        TransactionRecord {
            settled_at,
            outcome: TransactionOutcome::Success,
            pre_token_balances: vec![entry(1, recipient, "1.00"), entry(2, sender, "5.00")],
            post_token_balances: vec![entry(1, recipient, "1.01"), entry(2, sender, "4.99")],
            account_keys: vec![sender],
        }
    }

    fn gate() -> PaymentGate<NoLedger> {
        PaymentGate::new(NoLedger)
    }

    fn sig(seed: u8) -> Signature {
        Signature::from([seed; 64])
    }

    #[test]
    fn age_boundary_is_inclusive() {
        let recipient = addr(1);
        let now = UnixTimestamp::from_secs(1_700_000_000);
        let record = transfer_record(recipient, addr(2), now - 300);
        let expected = expected(recipient, "0.01", 300);

        // Settled exactly max_age_seconds ago: accepted.
        assert!(
            gate()
                .verify_record(&sig(1), &expected, &record, now)
                .is_ok()
        );

        // One second older: expired.
        let record = transfer_record(recipient, addr(2), now - 301);
        let result = gate().verify_record(&sig(2), &expected, &record, now);
        assert!(matches!(
            result,
            Err(VerificationError::TransactionExpired { age: 301, max: 300 })
        ));
    }

    #[test]
    fn missing_block_time_reads_as_expired() {
        let recipient = addr(1);
        let now = UnixTimestamp::from_secs(1_700_000_000);
        let record = transfer_record(recipient, addr(2), UnixTimestamp::from_secs(0));
        let result = gate().verify_record(&sig(1), &expected(recipient, "0.01", 300), &record, now);
        assert!(matches!(
            result,
            Err(VerificationError::TransactionExpired { .. })
        ));
    }

    #[test]
    fn failed_outcome_rejected_regardless_of_balances() {
        let recipient = addr(1);
        let now = UnixTimestamp::from_secs(1_700_000_000);
        let mut record = transfer_record(recipient, addr(2), now - 10);
        record.outcome = TransactionOutcome::Failed;
        let result = gate().verify_record(&sig(1), &expected(recipient, "0.01", 300), &record, now);
        assert!(matches!(result, Err(VerificationError::TransactionFailed)));
    }

    #[test]
    fn amount_tolerance_boundary() {
        let recipient = addr(1);
        let now = UnixTimestamp::from_secs(1_700_000_000);
        let record = transfer_record(recipient, addr(2), now - 10);

        // Received 0.01; expectation off by exactly the tolerance passes.
        let result = gate().verify_record(&sig(1), &expected(recipient, "0.0101", 300), &record, now);
        assert!(result.is_ok());

        // Off by more than the tolerance fails, carrying both values.
        let result = gate().verify_record(&sig(2), &expected(recipient, "0.02", 300), &record, now);
        match result {
            Err(VerificationError::AmountMismatch { expected, actual }) => {
                assert_eq!(expected, Decimal::from_str("0.02").unwrap());
                assert_eq!(actual, Decimal::from_str("0.01").unwrap());
            }
            other => panic!("expected AmountMismatch, got {other:?}"),
        }
    }

    #[test]
    fn replay_is_checked_last() {
        let recipient = addr(1);
        let now = UnixTimestamp::from_secs(1_700_000_000);
        let record = transfer_record(recipient, addr(2), now - 10);
        let gate = gate();
        let signature = sig(1);
        let expected = expected(recipient, "0.01", 300);

        let first = gate.verify_record(&signature, &expected, &record, now);
        assert!(first.is_ok());
        let second = gate.verify_record(&signature, &expected, &record, now);
        assert!(matches!(second, Err(VerificationError::AlreadyUsed)));

        // A rejected verification must not poison the replay table: a
        // mismatching amount leaves the signature unrecorded.
        let other_sig = sig(3);
        let mismatch = gate.verify_record(&other_sig, &ExpectedPayment {
            amount: Decimal::ONE,
            ..expected.clone()
        }, &record, now);
        assert!(matches!(
            mismatch,
            Err(VerificationError::AmountMismatch { .. })
        ));
        let retry = gate.verify_record(&other_sig, &expected, &record, now);
        assert!(retry.is_ok());
    }

    #[test]
    fn settled_payment_maps_to_wire_result() {
        let recipient = addr(1);
        let sender = addr(2);
        let now = UnixTimestamp::from_secs(1_700_000_000);
        let record = transfer_record(recipient, sender, now - 10);
        let payment = gate()
            .verify_record(&sig(1), &expected(recipient, "0.01", 300), &record, now)
            .unwrap();
        assert_eq!(payment.sender, Sender::Reconciled(sender));

        let result: VerificationResult = payment.into();
        assert!(result.valid);
        assert_eq!(result.amount, Some(Decimal::from_str("0.01").unwrap()));
        assert_eq!(result.from, Some(sender.to_string()));
        assert_eq!(result.to, Some(recipient.to_string()));
        assert_eq!(result.timestamp, Some(now - 10));
        assert!(result.error.is_none());
    }
}
