//! Registry of Solana networks the payment gate can verify against.
//!
//! The x402 v1 wire format names networks by their human-readable labels
//! (`"mainnet-beta"`, `"devnet"`), so the registry keys off those labels
//! rather than genesis-hash chain references. Each network carries a default
//! public RPC endpoint and the canonical USDC deployment, which is the token
//! the original payment server priced everything in.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::LazyLock;

use crate::chain::Address;

/// Number of decimal places of the USDC mint on all Solana networks.
pub const USDC_DECIMALS: u8 = 6;

static USDC_MAINNET: LazyLock<Address> = LazyLock::new(|| {
    "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"
        .parse()
        .expect("valid USDC mainnet mint")
});

static USDC_DEVNET: LazyLock<Address> = LazyLock::new(|| {
    "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZ5nc4pb"
        .parse()
        .expect("valid USDC devnet mint")
});

/// A Solana network supported by the payment gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolanaNetwork {
    /// Solana mainnet, wire name `mainnet-beta`.
    #[serde(rename = "mainnet-beta")]
    MainnetBeta,
    /// Solana devnet, wire name `devnet`.
    #[serde(rename = "devnet")]
    Devnet,
}

impl SolanaNetwork {
    /// The wire label of this network.
    pub fn as_str(&self) -> &'static str {
        match self {
            SolanaNetwork::MainnetBeta => "mainnet-beta",
            SolanaNetwork::Devnet => "devnet",
        }
    }

    /// Default public RPC endpoint for this network.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            SolanaNetwork::MainnetBeta => "https://api.mainnet-beta.solana.com",
            SolanaNetwork::Devnet => "https://api.devnet.solana.com",
        }
    }

    /// Mint address of the canonical USDC deployment on this network.
    pub fn usdc_mint(&self) -> Address {
        match self {
            SolanaNetwork::MainnetBeta => *USDC_MAINNET,
            SolanaNetwork::Devnet => *USDC_DEVNET,
        }
    }
}

/// Error type for parsing network labels.
#[derive(Debug, thiserror::Error)]
#[error("Unknown Solana network: {0}")]
pub struct UnknownNetworkError(pub String);

impl FromStr for SolanaNetwork {
    type Err = UnknownNetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet-beta" => Ok(SolanaNetwork::MainnetBeta),
            "devnet" => Ok(SolanaNetwork::Devnet),
            other => Err(UnknownNetworkError(other.to_string())),
        }
    }
}

impl Display for SolanaNetwork {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
