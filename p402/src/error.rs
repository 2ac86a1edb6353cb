//! Error types for the x402 payment model.

/// Errors that can occur while decoding a client-supplied payment header.
///
/// Any of these means the request carried no valid payment; the resource
/// server answers with `402 Payment Required`.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// Base64 decoding failed.
    #[error("failed to decode base64 string: {0}")]
    Base64(#[from] base64::DecodeError),

    /// JSON deserialization failed.
    #[error("failed to unmarshal payment payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while encoding a settlement receipt for the
/// `X-PAYMENT-RESPONSE` header.
#[derive(Debug, thiserror::Error)]
#[error("failed to encode the settle response: {0}")]
pub struct EncodeError(#[from] pub serde_json::Error);

/// Errors that can occur while parsing a human-readable amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    /// The input has no parseable decimal number in it.
    #[error("invalid price {input:?}: must be in the form \"$3.10\", 0.10 or \"0.001\"")]
    Invalid {
        /// The rejected input.
        input: String,
    },

    /// The amount is outside the accepted range.
    #[error("price {value} is out of range: must be between {min} and {max}")]
    OutOfRange {
        /// The parsed amount.
        value: String,
        /// Smallest accepted amount.
        min: &'static str,
        /// Largest accepted amount.
        max: &'static str,
    },

    /// The amount overflows when converted to atomic units.
    #[error("price {0} overflows when converted to atomic units")]
    Overflow(String),
}
