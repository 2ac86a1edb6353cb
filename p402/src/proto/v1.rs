//! Protocol version 1 (V1) types for x402.
//!
//! V1 identifies networks by name (e.g. `"base-sepolia"`) and carries the
//! payment payload in the `X-PAYMENT` header.
//!
//! # Key Types
//!
//! - [`X402Version1`] - Version marker that serializes as `1`
//! - [`PaymentPayload`] - Signed payment authorization from the buyer
//! - [`PaymentRequirements`] - Payment terms set by the seller
//! - [`PaymentRequiredResponse`] - HTTP 402 response body
//! - [`VerifyResponse`] / [`SettleResponse`] - Facilitator answers

use serde::de::{self, Deserializer};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

use crate::networks::Network;
use crate::scheme::{Scheme, SchemePayload};

/// Version marker for x402 protocol version 1.
///
/// Serializes as the integer `1` and rejects any other value on
/// deserialization.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct X402Version1;

/// Convenience constant for constructing V1 protocol messages.
pub const V1: X402Version1 = X402Version1;

impl X402Version1 {
    /// The numeric value of this protocol version.
    pub const VALUE: u8 = 1;
}

impl Serialize for X402Version1 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(Self::VALUE)
    }
}

impl<'de> Deserialize<'de> for X402Version1 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = u8::deserialize(deserializer)?;
        if v == Self::VALUE {
            Ok(Self)
        } else {
            Err(de::Error::custom(format!(
                "expected x402Version {}, got {v}",
                Self::VALUE
            )))
        }
    }
}

/// Payment terms set by the seller.
///
/// Built fresh for every request and sent to the buyer in 402 responses and
/// to the facilitator with every verify/settle call.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// The payment scheme.
    pub scheme: Scheme,
    /// The network to pay on.
    pub network: Network,
    /// Amount in the asset's smallest unit, as a base-10 integer string.
    pub max_amount_required: String,
    /// URL of the resource being paid for.
    pub resource: String,
    /// Human-readable description of the resource.
    pub description: String,
    /// MIME type of the resource.
    pub mime_type: String,
    /// The recipient address for payment.
    pub pay_to: String,
    /// How long, in seconds, a signed authorization for this resource stays usable.
    pub max_timeout_seconds: u64,
    /// The token contract address.
    pub asset: String,
    /// Optional JSON schema for the resource output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,
    /// Asset metadata, e.g. the token's EIP-712 domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

/// A signed payment authorization from the buyer.
///
/// The protocol version is always [`V1`]: whatever the buyer claims in
/// `x402Version` is discarded during deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawPaymentPayload")]
pub struct PaymentPayload {
    /// Protocol version, always [`V1`].
    pub x402_version: X402Version1,
    /// The network name the buyer signed for.
    pub network: String,
    /// The scheme-specific signed payload.
    pub payload: SchemePayload,
}

impl PaymentPayload {
    /// Creates a V1 payload.
    #[must_use]
    pub fn new(network: impl Into<String>, payload: SchemePayload) -> Self {
        Self {
            x402_version: V1,
            network: network.into(),
            payload,
        }
    }

    /// Returns the scheme of the payload.
    #[must_use]
    pub const fn scheme(&self) -> Scheme {
        self.payload.scheme()
    }

    /// Returns `true` if the payload was signed for the given requirements'
    /// scheme and network.
    #[must_use]
    pub fn matches(&self, requirements: &PaymentRequirements) -> bool {
        self.scheme() == requirements.scheme && self.network == requirements.network.as_str()
    }
}

impl Serialize for PaymentPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("PaymentPayload", 4)?;
        s.serialize_field("x402Version", &self.x402_version)?;
        s.serialize_field("scheme", &self.scheme())?;
        s.serialize_field("network", &self.network)?;
        s.serialize_field("payload", &self.payload)?;
        s.end()
    }
}

/// Untyped payload as sent by the buyer; `x402Version` is not read.
#[derive(Deserialize)]
struct RawPaymentPayload {
    scheme: Scheme,
    network: String,
    payload: serde_json::Value,
}

impl TryFrom<RawPaymentPayload> for PaymentPayload {
    type Error = serde_json::Error;

    fn try_from(raw: RawPaymentPayload) -> Result<Self, Self::Error> {
        let payload = SchemePayload::from_value(raw.scheme, raw.payload)?;
        Ok(Self::new(raw.network, payload))
    }
}

/// Response from a facilitator's `/verify` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// Whether the payment is valid for the requirements.
    pub is_valid: bool,
    /// Why the payment is invalid, if it is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
    /// Payer address, if the facilitator recovered it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

impl VerifyResponse {
    /// A positive verification result.
    #[must_use]
    pub const fn valid(payer: Option<String>) -> Self {
        Self {
            is_valid: true,
            invalid_reason: None,
            payer,
        }
    }

    /// A negative verification result.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            invalid_reason: Some(reason.into()),
            payer: None,
        }
    }
}

/// Response from a facilitator's `/settle` endpoint.
///
/// Also the receipt returned to the buyer in the `X-PAYMENT-RESPONSE` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    /// Whether the transfer was settled.
    pub success: bool,
    /// Why settlement failed, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    /// Transaction hash of the settlement.
    #[serde(default)]
    pub transaction: String,
    /// Network the settlement happened on.
    #[serde(default)]
    pub network: String,
    /// Payer address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

/// HTTP 402 Payment Required response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequiredResponse {
    /// What went wrong with the payment.
    pub error: String,
    /// Payment methods the server accepts.
    #[serde(default)]
    pub accepts: Vec<PaymentRequirements>,
    /// Protocol version (always 1).
    pub x402_version: X402Version1,
    /// Payer address, when the facilitator reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

impl PaymentRequiredResponse {
    /// Creates a 402 body for a single set of requirements.
    #[must_use]
    pub fn new(error: impl Into<String>, requirements: PaymentRequirements) -> Self {
        Self {
            error: error.into(),
            accepts: vec![requirements],
            x402_version: V1,
            payer: None,
        }
    }

    /// Attaches the payer address.
    #[must_use]
    pub fn with_payer(mut self, payer: Option<String>) -> Self {
        self.payer = payer;
        self
    }
}

/// Body of internal-error responses, which never carry requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
    /// Protocol version (always 1).
    pub x402_version: X402Version1,
}

impl ErrorResponse {
    /// Creates an internal-error body.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            x402_version: V1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::{ExactEvmAuthorization, ExactEvmPayload};
    use serde_json::json;

    fn payload_json(version: serde_json::Value) -> serde_json::Value {
        json!({
            "x402Version": version,
            "scheme": "exact",
            "network": "base-sepolia",
            "payload": {
                "signature": "0xvalidSignature",
                "authorization": {
                    "from": "0xvalidFrom",
                    "to": "0xvalidTo",
                    "value": "1000000",
                    "validAfter": "1745323800",
                    "validBefore": "1745323985",
                    "nonce": "0xvalidNonce"
                }
            }
        })
    }

    #[test]
    fn test_payload_version_is_overwritten() {
        for claimed in [json!(1), json!(7), json!(0)] {
            let payload: PaymentPayload = serde_json::from_value(payload_json(claimed)).unwrap();
            assert_eq!(payload.x402_version, V1);
        }
        let mut without_version = payload_json(json!(1));
        without_version
            .as_object_mut()
            .unwrap()
            .remove("x402Version");
        let payload: PaymentPayload = serde_json::from_value(without_version).unwrap();
        assert_eq!(payload.x402_version, V1);
    }

    #[test]
    fn test_payload_serializes_scheme_tag() {
        let payload: PaymentPayload = serde_json::from_value(payload_json(json!(3))).unwrap();
        assert_eq!(payload.scheme(), Scheme::Exact);
        let SchemePayload::Exact(ExactEvmPayload {
            authorization: ExactEvmAuthorization { value, .. },
            ..
        }) = &payload.payload;
        assert_eq!(value, "1000000");
        assert_eq!(serde_json::to_value(&payload).unwrap(), payload_json(json!(1)));
    }

    #[test]
    fn test_payload_unknown_scheme_rejected() {
        let mut value = payload_json(json!(1));
        value["scheme"] = json!("streaming");
        assert!(serde_json::from_value::<PaymentPayload>(value).is_err());
    }

    #[test]
    fn test_payload_missing_authorization_rejected() {
        let mut value = payload_json(json!(1));
        value["payload"] = json!({ "signature": "0x00" });
        assert!(serde_json::from_value::<PaymentPayload>(value).is_err());
    }

    #[test]
    fn test_version_marker_rejects_other_versions() {
        assert_eq!(serde_json::to_string(&V1).unwrap(), "1");
        assert!(serde_json::from_str::<X402Version1>("1").is_ok());
        assert!(serde_json::from_str::<X402Version1>("2").is_err());
    }

    #[test]
    fn test_settle_response_tolerates_missing_fields() {
        let settle: SettleResponse =
            serde_json::from_value(json!({ "success": false, "errorReason": "expired" })).unwrap();
        assert!(!settle.success);
        assert_eq!(settle.error_reason.as_deref(), Some("expired"));
        assert!(settle.transaction.is_empty());
    }

    #[test]
    fn test_requirements_omit_empty_optionals() {
        let requirements = PaymentRequirements {
            scheme: Scheme::Exact,
            network: Network::Base,
            max_amount_required: "1000000".into(),
            resource: "https://example.com/joke".into(),
            description: String::new(),
            mime_type: String::new(),
            pay_to: "0x209693Bc6afc0C5328bA36FaF03C514EF312287C".into(),
            max_timeout_seconds: 60,
            asset: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".into(),
            output_schema: None,
            extra: None,
        };
        let value = serde_json::to_value(&requirements).unwrap();
        assert_eq!(value["maxAmountRequired"], "1000000");
        assert_eq!(value["network"], "base");
        assert!(value.get("outputSchema").is_none());
        assert!(value.get("extra").is_none());
    }
}
