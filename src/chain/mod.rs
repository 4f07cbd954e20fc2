//! Chain-facing types and the ledger RPC boundary.

pub mod record;
pub mod rpc;
pub mod types;

pub use record::{TokenBalanceEntry, TransactionOutcome, TransactionRecord};
pub use rpc::{LedgerRpc, LedgerRpcError, SolanaLedgerRpc};
pub use types::{Address, AddressParseError};
