//! Wire format types for the x402 payment protocol.
//!
//! These structures are a hard compatibility contract: a "payment required"
//! payload produced here is consumed by arbitrary x402 clients, so field
//! names and shapes must round-trip exactly. Transport concerns (the 402
//! status code and the `WWW-Authenticate` challenge header naming the
//! protocol version) belong to the host serving the resource, not to this
//! crate.
//!
//! # Key Types
//!
//! - [`X402Version1`] - Version marker that serializes as `1`
//! - [`PaymentOption`] - One acceptable way to pay for a resource
//! - [`PaymentRequirements`] - HTTP 402 response body
//! - [`VerificationResult`] - Outcome of verifying a payment signature
//! - [`PaymentStatus`] - Confirmation state of a signature, payment-agnostic

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Display, Formatter};

use crate::chain::Address;
use crate::networks::SolanaNetwork;
use crate::timestamp::UnixTimestamp;

/// Version marker for x402 protocol version 1.
///
/// Serializes as the integer `1` and identifies v1 protocol messages in the
/// wire format.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct X402Version1;

impl X402Version1 {
    pub const VALUE: u8 = 1;
}

impl PartialEq<u8> for X402Version1 {
    fn eq(&self, other: &u8) -> bool {
        *other == Self::VALUE
    }
}

impl From<X402Version1> for u8 {
    fn from(_: X402Version1) -> Self {
        X402Version1::VALUE
    }
}

impl Serialize for X402Version1 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(Self::VALUE)
    }
}

impl<'de> Deserialize<'de> for X402Version1 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let num = u8::deserialize(deserializer)?;
        if num == Self::VALUE {
            Ok(X402Version1)
        } else {
            Err(serde::de::Error::custom(format!(
                "expected version {}, got {}",
                Self::VALUE,
                num
            )))
        }
    }
}

impl Display for X402Version1 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::VALUE)
    }
}

/// Payment scheme tag advertised in a [`PaymentOption`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentScheme {
    /// A ledger-native token transfer on Solana.
    Solana,
}

impl Display for PaymentScheme {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PaymentScheme::Solana => f.write_str("solana"),
        }
    }
}

/// One acceptable way to pay for a resource.
///
/// Wire shape: `{ id, scheme, network, recipient, token, amount, decimals }`.
/// The amount is a decimal string, never a floating-point number, so client
/// and server agree on it digit for digit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOption {
    /// Identifier of this option, unique within one requirement. Advisory,
    /// used by clients to correlate payment with resource.
    pub id: String,
    /// The payment scheme.
    pub scheme: PaymentScheme,
    /// The network to pay on.
    pub network: SolanaNetwork,
    /// The address receiving the payment.
    pub recipient: Address,
    /// Token identifier: an SPL mint address, or `"native"` for SOL.
    pub token: String,
    /// The amount to pay, in display units of the token.
    pub amount: String,
    /// Number of decimal places of the token.
    pub decimals: u8,
}

/// HTTP 402 Payment Required response body.
///
/// Carries the protocol version and an ordered list of acceptable payment
/// options. Created per request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// Protocol version (always 1).
    pub version: X402Version1,
    /// Acceptable payment options, in preference order.
    pub payment_options: Vec<PaymentOption>,
}

/// Outcome of verifying a payment signature against expected terms.
///
/// A valid result always carries the signature, settled amount, token,
/// sender, recipient, and settlement timestamp; an invalid one carries the
/// error reason instead. `from` is the empty string when the sender could
/// not be attributed at all; see
/// [`Sender`](crate::analyzer::Sender) for the typed attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// Whether the payment satisfies the expected terms.
    pub valid: bool,
    /// The verified transaction signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// The amount actually received, in display units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    /// The token the payment was made in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Best-effort sender address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// The recipient address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Settlement time of the transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<UnixTimestamp>,
    /// Reason the payment was rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerificationResult {
    /// Constructs a successful verification result.
    pub fn valid(
        signature: String,
        amount: Decimal,
        token: String,
        from: String,
        to: Address,
        timestamp: UnixTimestamp,
    ) -> Self {
        VerificationResult {
            valid: true,
            signature: Some(signature),
            amount: Some(amount),
            token: Some(token),
            from: Some(from),
            to: Some(to.to_string()),
            timestamp: Some(timestamp),
            error: None,
        }
    }

    /// Constructs a failed verification result with the given reason.
    pub fn invalid(reason: impl Display) -> Self {
        VerificationResult {
            valid: false,
            signature: None,
            amount: None,
            token: None,
            from: None,
            to: None,
            timestamp: None,
            error: Some(reason.to_string()),
        }
    }
}

/// Confirmation state of a transaction signature.
///
/// Each flag comes from an independent ledger query at the corresponding
/// commitment level; neither implies anything about payment semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatus {
    /// The transaction is known at confirmed commitment.
    pub confirmed: bool,
    /// The transaction is known at finalized commitment.
    pub finalized: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn recipient() -> Address {
        Address::from_str("7vfCXTUXx5WJV5JADk17DUJ4ksgau7utNKj4b963voxs").unwrap()
    }

    #[test]
    fn version_marker_serializes_as_integer_one() {
        assert_eq!(serde_json::to_value(X402Version1).unwrap(), json!(1));
        assert!(serde_json::from_value::<X402Version1>(json!(2)).is_err());
    }

    #[test]
    fn requirement_wire_shape_is_exact() {
        let requirements = PaymentRequirements {
            version: X402Version1,
            payment_options: vec![PaymentOption {
                id: "premium-article".to_string(),
                scheme: PaymentScheme::Solana,
                network: SolanaNetwork::Devnet,
                recipient: recipient(),
                token: SolanaNetwork::Devnet.usdc_mint().to_string(),
                amount: "0.01".to_string(),
                decimals: 6,
            }],
        };
        let value = serde_json::to_value(&requirements).unwrap();
        assert_eq!(
            value,
            json!({
                "version": 1,
                "paymentOptions": [{
                    "id": "premium-article",
                    "scheme": "solana",
                    "network": "devnet",
                    "recipient": "7vfCXTUXx5WJV5JADk17DUJ4ksgau7utNKj4b963voxs",
                    "token": "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZ5nc4pb",
                    "amount": "0.01",
                    "decimals": 6,
                }]
            })
        );
        let back: PaymentRequirements = serde_json::from_value(value).unwrap();
        assert_eq!(back, requirements);
    }

    #[test]
    fn invalid_result_carries_only_error() {
        let result = VerificationResult::invalid("Transaction not found");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({ "valid": false, "error": "Transaction not found" })
        );
    }

    #[test]
    fn valid_result_carries_settlement_fields() {
        let result = VerificationResult::valid(
            "5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnbJLgp8uirBgmQpjKhoR4tjF3ZpRzrFmBV6UjKdiSZkQUW"
                .to_string(),
            Decimal::new(1, 2),
            "USDC".to_string(),
            "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZ5nc4pb".to_string(),
            recipient(),
            UnixTimestamp::from_secs(1_700_000_000),
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["valid"], json!(true));
        assert_eq!(value["amount"], json!("0.01"));
        assert_eq!(value["timestamp"], json!(1_700_000_000u64));
        assert!(value.get("error").is_none());
    }
}
