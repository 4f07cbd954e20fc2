//! Ledger RPC boundary.
//!
//! The verifier only ever asks the ledger one question: "what does the
//! transaction with this signature look like at this commitment level?".
//! The [`LedgerRpc`] trait captures exactly that, which keeps the
//! verification flow testable against an in-memory ledger and keeps the
//! remote call at a single, obvious suspension point.
//!
//! Absence of a transaction (`Ok(None)`) is a normal answer and distinct
//! from a transport or protocol failure (`Err`). Callers that receive
//! `Ok(None)` for a not-yet-confirmed signature are expected to re-invoke
//! after their own backoff; no polling happens here.

use rust_decimal::Decimal;
use serde_json::json;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_client::rpc_request::RpcRequest;
use solana_commitment_config::CommitmentConfig;
use solana_signature::Signature;
use solana_transaction_status_client_types::{
    EncodedConfirmedTransactionWithStatusMeta, UiTransactionEncoding, UiTransactionTokenBalance,
};
use std::str::FromStr;
use std::sync::Arc;

use crate::chain::record::{TokenBalanceEntry, TransactionOutcome, TransactionRecord};
use crate::chain::types::Address;
use crate::timestamp::UnixTimestamp;

/// Errors that can occur when fetching a transaction record from the ledger.
///
/// These are transport and protocol failures. An unknown signature is not an
/// error; it surfaces as `Ok(None)` from [`LedgerRpc::get_transaction_record`].
#[derive(Debug, thiserror::Error)]
pub enum LedgerRpcError {
    /// RPC transport error.
    #[error(transparent)]
    Transport(Box<ClientErrorKind>),
    /// The node returned a record this crate could not decode.
    #[error("Malformed transaction record: {0}")]
    MalformedRecord(String),
}

impl From<ClientError> for LedgerRpcError {
    fn from(value: ClientError) -> Self {
        LedgerRpcError::Transport(value.kind)
    }
}

/// Read-only access to settled transactions on a ledger.
pub trait LedgerRpc {
    /// Fetches the transaction record for `signature` at the given
    /// commitment level, or `None` if the ledger does not know it at that
    /// level.
    fn get_transaction_record(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> impl Future<Output = Result<Option<TransactionRecord>, LedgerRpcError>> + Send;
}

impl<T: LedgerRpc + Sync> LedgerRpc for Arc<T> {
    fn get_transaction_record(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> impl Future<Output = Result<Option<TransactionRecord>, LedgerRpcError>> + Send {
        (**self).get_transaction_record(signature, commitment)
    }
}

/// [`LedgerRpc`] implementation over a Solana JSON-RPC node.
pub struct SolanaLedgerRpc {
    rpc_client: Arc<RpcClient>,
}

impl SolanaLedgerRpc {
    /// Creates a new ledger client for the given RPC endpoint.
    pub fn new(rpc_url: impl Into<String>) -> Self {
        let rpc_url = rpc_url.into();
        tracing::info!(rpc = %rpc_url, "Using Solana ledger RPC");
        Self {
            rpc_client: Arc::new(RpcClient::new(rpc_url)),
        }
    }

    /// Returns a cloned reference to the underlying RPC client.
    pub fn rpc_client(&self) -> Arc<RpcClient> {
        Arc::clone(&self.rpc_client)
    }
}

impl std::fmt::Debug for SolanaLedgerRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaLedgerRpc")
            .field("rpc_url", &self.rpc_client.url())
            .finish()
    }
}

impl LedgerRpc for SolanaLedgerRpc {
    async fn get_transaction_record(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<Option<TransactionRecord>, LedgerRpcError> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(commitment),
            max_supported_transaction_version: Some(0),
        };
        // getTransaction returns null for unknown signatures; going through
        // `send` with an Option keeps that distinct from transport errors.
        let response: Option<EncodedConfirmedTransactionWithStatusMeta> = self
            .rpc_client
            .send(
                RpcRequest::GetTransaction,
                json!([signature.to_string(), config]),
            )
            .await?;
        match response {
            None => Ok(None),
            Some(encoded) => decode_record(encoded).map(Some),
        }
    }
}

fn decode_record(
    encoded: EncodedConfirmedTransactionWithStatusMeta,
) -> Result<TransactionRecord, LedgerRpcError> {
    let settled_at = UnixTimestamp::from_secs(encoded.block_time.unwrap_or(0).max(0) as u64);
    let meta = encoded
        .transaction
        .meta
        .ok_or_else(|| LedgerRpcError::MalformedRecord("missing transaction meta".to_string()))?;
    let outcome = if meta.err.is_some() {
        TransactionOutcome::Failed
    } else {
        TransactionOutcome::Success
    };
    let pre_token_balances =
        decode_balances(Option::from(meta.pre_token_balances).unwrap_or_default())?;
    let post_token_balances =
        decode_balances(Option::from(meta.post_token_balances).unwrap_or_default())?;
    let account_keys = encoded
        .transaction
        .transaction
        .decode()
        .map(|transaction| {
            transaction
                .message
                .static_account_keys()
                .iter()
                .copied()
                .map(Address::new)
                .collect()
        })
        .unwrap_or_default();
    Ok(TransactionRecord {
        settled_at,
        outcome,
        pre_token_balances,
        post_token_balances,
        account_keys,
    })
}

fn decode_balances(
    raw: Vec<UiTransactionTokenBalance>,
) -> Result<Vec<TokenBalanceEntry>, LedgerRpcError> {
    raw.into_iter()
        .map(|balance| {
            let amount = Decimal::from_str(&balance.ui_token_amount.ui_amount_string).map_err(
                |e| {
                    LedgerRpcError::MalformedRecord(format!(
                        "token balance amount {:?}: {e}",
                        balance.ui_token_amount.ui_amount_string
                    ))
                },
            )?;
            let owner = Option::<String>::from(balance.owner)
                .map(|owner| Address::from_str(&owner))
                .transpose()
                .map_err(|e| LedgerRpcError::MalformedRecord(e.to_string()))?;
            Ok(TokenBalanceEntry {
                account_index: balance.account_index,
                owner,
                mint: balance.mint,
                amount,
            })
        })
        .collect()
}
