//! Payment-gated resources over HTTP 402, settled on Solana.
//!
//! A resource server declares a price and a recipient wallet; a client pays
//! on-chain and presents the transaction signature as proof. This crate
//! provides both halves of that exchange:
//!
//! - [`RequirementBuilder`](requirement::RequirementBuilder) turns a price
//!   into the x402 "payment required" payload the server responds with
//!   (the host wraps it in a 402 status and challenge header);
//! - [`PaymentGate`](gate::PaymentGate) independently verifies a submitted
//!   signature against the ledger: freshness, execution outcome, balance
//!   deltas, amount reconciliation, and replay prevention, in that order.
//!
//! The ledger is behind the [`LedgerRpc`](chain::LedgerRpc) trait;
//! [`SolanaLedgerRpc`](chain::SolanaLedgerRpc) is the production
//! implementation over a Solana JSON-RPC node, and tests run the whole flow
//! against an in-memory ledger.
//!
//! # Example
//!
//! ```no_run
//! use std::str::FromStr;
//! use rust_decimal::Decimal;
//! use solana_signature::Signature;
//! use x402_paygate::chain::SolanaLedgerRpc;
//! use x402_paygate::gate::{ExpectedPayment, PaymentGate};
//! use x402_paygate::networks::SolanaNetwork;
//! use x402_paygate::requirement::RequirementBuilder;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let network = SolanaNetwork::Devnet;
//! let recipient = "7vfCXTUXx5WJV5JADk17DUJ4ksgau7utNKj4b963voxs";
//!
//! // Advertise the price.
//! let builder = RequirementBuilder::usdc(network, recipient)?;
//! let requirements = builder.build("0.01", None)?;
//!
//! // Later, verify the client's proof of payment.
//! let gate = PaymentGate::new(SolanaLedgerRpc::new(network.default_rpc_url()));
//! let signature = Signature::from_str("...")?;
//! let expected = ExpectedPayment {
//!     amount: Decimal::from_str("0.01")?,
//!     token: network.usdc_mint().to_string(),
//!     recipient: recipient.parse()?,
//!     max_age_seconds: 300,
//! };
//! let verdict = gate.verify(&signature, &expected).await;
//! if verdict.valid {
//!     // serve the resource
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`proto`] - Wire format types (requirement payloads, verdicts)
//! - [`requirement`] - Payment requirement construction
//! - [`gate`] - Payment verification and status
//! - [`analyzer`] - Balance-delta extraction and sender attribution
//! - [`replay`] - At-most-once acceptance of signatures
//! - [`chain`] - Address type, transaction records, ledger RPC boundary
//! - [`networks`] - Known Solana networks and USDC deployments
//! - [`config`] - Host-facing configuration with env-var resolution
//! - [`timestamp`] - Unix timestamp utilities

pub mod analyzer;
pub mod chain;
pub mod config;
pub mod gate;
pub mod networks;
pub mod proto;
pub mod replay;
pub mod requirement;
pub mod timestamp;

pub use chain::{Address, LedgerRpc, SolanaLedgerRpc};
pub use gate::{ExpectedPayment, PaymentGate, VerificationError};
pub use proto::{PaymentOption, PaymentRequirements, PaymentStatus, VerificationResult};
pub use requirement::{RequirementBuilder, RequirementError};
