//! Payment schemes and their scheme-specific payloads.
//!
//! A scheme names the rules a payment follows. Only `exact` (a fixed-amount
//! EIP-3009 `transferWithAuthorization`) is supported today; new schemes are
//! added as new [`Scheme`] and [`SchemePayload`] variants.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Supported payment schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Transfer of an exact amount via an off-chain signed authorization.
    Exact,
}

impl Scheme {
    /// Returns the wire identifier of the scheme.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The scheme-specific part of a [`PaymentPayload`](crate::PaymentPayload).
///
/// Serializes as the bare inner payload; the scheme tag travels next to it
/// in the enclosing payload's `scheme` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SchemePayload {
    /// Payload of the `exact` scheme on EVM networks.
    Exact(ExactEvmPayload),
}

impl SchemePayload {
    /// Returns the scheme this payload belongs to.
    #[must_use]
    pub const fn scheme(&self) -> Scheme {
        match self {
            Self::Exact(_) => Scheme::Exact,
        }
    }

    /// Parses a raw JSON payload according to the given scheme.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if `value` does not match the scheme's payload shape.
    pub fn from_value(scheme: Scheme, value: serde_json::Value) -> Result<Self, serde_json::Error> {
        match scheme {
            Scheme::Exact => serde_json::from_value(value).map(Self::Exact),
        }
    }
}

/// EIP-3009 payload for the `exact` scheme.
///
/// Carries the EIP-712 signature together with the authorization it signs.
/// The resource server never inspects the signature; verification is the
/// facilitator's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactEvmPayload {
    /// Hex-encoded signature over the authorization.
    pub signature: String,
    /// The signed transfer authorization.
    pub authorization: ExactEvmAuthorization,
}

/// The `transferWithAuthorization` message signed by the payer.
///
/// Numeric fields are decimal strings so that `uint256` values survive every
/// JSON implementation unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactEvmAuthorization {
    /// Payer address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Amount in the asset's smallest unit.
    pub value: String,
    /// Unix timestamp before which the authorization is not valid.
    pub valid_after: String,
    /// Unix timestamp after which the authorization expires.
    pub valid_before: String,
    /// 32-byte hex nonce, checked for replay by the token contract.
    pub nonce: String,
}
