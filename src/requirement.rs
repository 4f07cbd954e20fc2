//! Construction of "payment required" descriptions.
//!
//! The builder is the write side of the protocol: it turns a price into a
//! [`PaymentRequirements`] payload a client can act on. It is pure with
//! respect to the ledger; the only failure modes are a malformed recipient
//! address (checked eagerly at construction) and a malformed amount.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::chain::Address;
use crate::networks::{SolanaNetwork, USDC_DECIMALS};
use crate::proto::{PaymentOption, PaymentRequirements, PaymentScheme, X402Version1};
use crate::timestamp::UnixTimestamp;

/// Errors that can occur when building payment requirements.
#[derive(Debug, thiserror::Error)]
pub enum RequirementError {
    /// The recipient address does not parse for the target network.
    #[error("Invalid recipient address: {0}")]
    InvalidAddress(String),
    /// The amount is not a usable decimal price.
    #[error(transparent)]
    InvalidAmount(#[from] AmountError),
}

/// Ways a price string can be unusable.
#[derive(Debug, thiserror::Error)]
pub enum AmountError {
    /// The string does not parse as a decimal number.
    #[error("Invalid amount format: {0}")]
    InvalidFormat(String),
    /// The amount is zero or negative.
    #[error("Amount must be positive, got {0}")]
    NotPositive(Decimal),
    /// The amount has more fractional digits than the token supports.
    #[error("Amount has {scale} decimal places, token supports {decimals}")]
    TooPrecise {
        /// Fractional digits in the input.
        scale: u32,
        /// Fractional digits supported by the token.
        decimals: u8,
    },
}

/// Builds protocol-compliant payment requirements for one recipient, token,
/// and network.
///
/// # Example
///
/// ```
/// use x402_paygate::networks::SolanaNetwork;
/// use x402_paygate::requirement::RequirementBuilder;
///
/// let builder = RequirementBuilder::usdc(
///     SolanaNetwork::Devnet,
///     "7vfCXTUXx5WJV5JADk17DUJ4ksgau7utNKj4b963voxs",
/// ).unwrap();
/// let requirements = builder.build("0.01", Some("premium-article".to_string())).unwrap();
/// assert_eq!(requirements.payment_options.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct RequirementBuilder {
    network: SolanaNetwork,
    recipient: Address,
    token: String,
    decimals: u8,
}

impl RequirementBuilder {
    /// Creates a builder for an arbitrary token.
    ///
    /// The recipient address is validated eagerly; this is the only failure
    /// mode that can be reported before any network access, so it should
    /// surface at configuration time rather than per request.
    pub fn new(
        network: SolanaNetwork,
        recipient: &str,
        token: impl Into<String>,
        decimals: u8,
    ) -> Result<Self, RequirementError> {
        let recipient = Address::from_str(recipient)
            .map_err(|_| RequirementError::InvalidAddress(recipient.to_string()))?;
        Ok(Self {
            network,
            recipient,
            token: token.into(),
            decimals,
        })
    }

    /// Creates a builder priced in the network's canonical USDC deployment.
    pub fn usdc(network: SolanaNetwork, recipient: &str) -> Result<Self, RequirementError> {
        let mint = network.usdc_mint().to_string();
        Self::new(network, recipient, mint, USDC_DECIMALS)
    }

    /// The recipient all built requirements pay to.
    pub fn recipient(&self) -> &Address {
        &self.recipient
    }

    /// The token identifier all built requirements are priced in.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Builds a requirement with exactly one payment option for `amount`.
    ///
    /// `amount` must be a positive decimal string with at most the token's
    /// decimal places; it is carried into the wire payload verbatim. When
    /// `resource_id` is absent, a per-call-unique advisory id is
    /// synthesized for client-side correlation.
    pub fn build(
        &self,
        amount: &str,
        resource_id: Option<String>,
    ) -> Result<PaymentRequirements, RequirementError> {
        self.validate_amount(amount)?;
        let id = resource_id.unwrap_or_else(synthesize_resource_id);
        let option = PaymentOption {
            id,
            scheme: PaymentScheme::Solana,
            network: self.network,
            recipient: self.recipient,
            token: self.token.clone(),
            amount: amount.to_string(),
            decimals: self.decimals,
        };
        Ok(PaymentRequirements {
            version: X402Version1,
            payment_options: vec![option],
        })
    }

    fn validate_amount(&self, amount: &str) -> Result<(), AmountError> {
        let parsed = Decimal::from_str(amount)
            .map_err(|_| AmountError::InvalidFormat(amount.to_string()))?;
        if parsed <= Decimal::ZERO {
            return Err(AmountError::NotPositive(parsed));
        }
        if parsed.scale() > self.decimals as u32 {
            return Err(AmountError::TooPrecise {
                scale: parsed.scale(),
                decimals: self.decimals,
            });
        }
        Ok(())
    }
}

/// Advisory per-call id: unix time plus a random suffix. Uniqueness here is
/// for client-side correlation only, not a security property.
fn synthesize_resource_id() -> String {
    format!(
        "pay-{}-{:08x}",
        UnixTimestamp::now().as_secs(),
        rand::random::<u32>()
    )
}
