//! Gate configuration for hosts embedding the payment gate.
//!
//! A [`GateConfig`] is what a host (an HTTP middleware, a workflow node)
//! deserializes from its own credential or settings store and turns into a
//! working [`PaymentGate`] plus [`RequirementBuilder`]. Values may be given
//! literally or as environment variable references, so RPC endpoints and
//! wallet addresses can stay out of checked-in configuration:
//!
//! ```json
//! {
//!   "network": "devnet",
//!   "recipient": "$PAYGATE_WALLET",
//!   "rpcUrl": "${SOLANA_RPC_URL}"
//! }
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::str::FromStr;
use url::Url;

use crate::chain::{Address, SolanaLedgerRpc};
use crate::gate::{DEFAULT_MAX_AGE_SECONDS, GateOptions, PaymentGate, default_amount_tolerance};
use crate::networks::{SolanaNetwork, USDC_DECIMALS};
use crate::requirement::{RequirementBuilder, RequirementError};

/// A value that may be given literally or as a `$VAR` / `${VAR}`
/// environment variable reference, resolved during deserialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralOrEnv<T>(T);

impl<T> LiteralOrEnv<T> {
    pub fn from_literal(value: T) -> Self {
        Self(value)
    }

    pub fn into_inner(self) -> T {
        self.0
    }

    fn env_var_name(s: &str) -> Option<&str> {
        if let Some(inner) = s.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
            Some(inner)
        } else if let Some(name) = s.strip_prefix('$') {
            name.chars()
                .all(|c| c.is_alphanumeric() || c == '_')
                .then_some(name)
                .filter(|name| !name.is_empty())
        } else {
            None
        }
    }
}

impl<T> Deref for LiteralOrEnv<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de, T> Deserialize<'de> for LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let value = if let Some(var_name) = Self::env_var_name(&s) {
            std::env::var(var_name).map_err(|_| {
                serde::de::Error::custom(format!(
                    "Environment variable '{var_name}' not found (referenced as '{s}')"
                ))
            })?
        } else {
            s
        };
        let parsed = value
            .parse::<T>()
            .map_err(|e| serde::de::Error::custom(format!("Failed to parse value: {e}")))?;
        Ok(LiteralOrEnv(parsed))
    }
}

impl<T: Serialize> Serialize for LiteralOrEnv<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

fn default_network() -> SolanaNetwork {
    SolanaNetwork::Devnet
}

/// Configuration of one payment gate: where payments go and how they are
/// checked.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateConfig {
    /// Network to verify against. Defaults to devnet.
    #[serde(default = "default_network")]
    pub network: SolanaNetwork,
    /// Wallet address that receives payments.
    pub recipient: LiteralOrEnv<Address>,
    /// RPC endpoint override. Defaults to the network's public endpoint.
    #[serde(default)]
    pub rpc_url: Option<LiteralOrEnv<Url>>,
    /// Token mint override. Defaults to the network's USDC mint.
    #[serde(default)]
    pub token_mint: Option<Address>,
    /// Decimal places of the token. Defaults to USDC's 6.
    #[serde(default)]
    pub token_decimals: Option<u8>,
    /// Absolute amount tolerance in display units, as a decimal string.
    #[serde(default)]
    pub amount_tolerance: Option<Decimal>,
    /// Replay-guard TTL in seconds.
    #[serde(default)]
    pub replay_ttl_seconds: Option<u64>,
}

impl GateConfig {
    /// Minimal configuration: a recipient on a network, everything else
    /// defaulted.
    pub fn new(network: SolanaNetwork, recipient: Address) -> Self {
        Self {
            network,
            recipient: LiteralOrEnv::from_literal(recipient),
            rpc_url: None,
            token_mint: None,
            token_decimals: None,
            amount_tolerance: None,
            replay_ttl_seconds: None,
        }
    }

    /// The RPC endpoint this gate talks to.
    pub fn rpc_url(&self) -> String {
        self.rpc_url
            .as_ref()
            .map(|url| url.to_string())
            .unwrap_or_else(|| self.network.default_rpc_url().to_string())
    }

    /// The token mint payments are priced in.
    pub fn token_mint(&self) -> Address {
        self.token_mint.unwrap_or_else(|| self.network.usdc_mint())
    }

    /// Decimal places of the priced token.
    pub fn token_decimals(&self) -> u8 {
        self.token_decimals.unwrap_or(USDC_DECIMALS)
    }

    /// Gate tuning derived from this configuration.
    pub fn gate_options(&self) -> GateOptions {
        GateOptions {
            amount_tolerance: self.amount_tolerance.unwrap_or_else(default_amount_tolerance),
            replay_ttl_seconds: self.replay_ttl_seconds.unwrap_or(DEFAULT_MAX_AGE_SECONDS),
        }
    }

    /// Builds the requirement builder for this gate's recipient and token.
    pub fn requirement_builder(&self) -> Result<RequirementBuilder, RequirementError> {
        RequirementBuilder::new(
            self.network,
            &self.recipient.to_string(),
            self.token_mint().to_string(),
            self.token_decimals(),
        )
    }

    /// Connects a [`PaymentGate`] backed by a [`SolanaLedgerRpc`] for this
    /// configuration.
    pub fn gate(&self) -> PaymentGate<SolanaLedgerRpc> {
        PaymentGate::with_options(SolanaLedgerRpc::new(self.rpc_url()), self.gate_options())
    }
}
