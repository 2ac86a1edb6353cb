//! Error types for the x402 payment gate.
//!
//! Every failure on a request path ends up as a [`PaygateError`], which knows
//! the status it maps to. Nothing here propagates to the wrapped handler.

use http::StatusCode;
use p402::{MoneyError, PayloadError};

use crate::facilitator_client::FacilitatorClientError;

/// Invalid middleware setup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// `pay_to` is not an EVM address.
    #[error("invalid pay-to address {address:?}: {reason}")]
    InvalidPayTo {
        /// The rejected address.
        address: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The facilitator URL cannot be used.
    #[error("invalid facilitator URL: {0}")]
    InvalidFacilitatorUrl(#[source] FacilitatorClientError),
    /// The price cannot be converted to atomic units.
    #[error(transparent)]
    InvalidAmount(#[from] MoneyError),
    /// The asset metadata could not be serialized.
    #[error("failed to build asset extra: {0}")]
    AssetExtra(#[source] serde_json::Error),
    /// A route pattern did not compile.
    #[error("invalid route pattern {pattern:?}: {source}")]
    InvalidRoutePattern {
        /// The rejected pattern.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },
}

/// Why a request was not served the protected resource.
#[derive(Debug, thiserror::Error)]
pub enum PaygateError {
    /// The middleware is misconfigured.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// The request has no `X-PAYMENT` header.
    #[error("X-PAYMENT header is required")]
    PaymentHeaderRequired,
    /// The `X-PAYMENT` header could not be decoded.
    #[error("Invalid or malformed payment header: {0}")]
    InvalidPaymentHeader(#[source] PayloadError),
    /// The payment was made for a different scheme or network.
    #[error("Unable to find matching payment requirements")]
    NoMatchingRequirements,
    /// The facilitator could not be asked to verify the payment.
    #[error("Payment verification failed: {0}")]
    VerificationFailed(String),
    /// The facilitator said the payment is invalid.
    #[error("{reason}")]
    VerificationRejected {
        /// Reason reported by the facilitator.
        reason: String,
        /// Payer address, if reported.
        payer: Option<String>,
    },
    /// The handler's response body could not be read.
    #[error("Failed to read the response: {0}")]
    ResponseBuffering(String),
    /// The facilitator could not be asked to settle the payment.
    #[error("Settlement failed: {0}")]
    SettlementFailed(String),
    /// The facilitator said settlement failed.
    #[error("Settlement rejected: {0}")]
    SettlementRejected(String),
    /// The settlement receipt could not be encoded.
    #[error("Failed to encode the settlement receipt: {0}")]
    SettlementEncoding(String),
}

impl PaygateError {
    /// Returns the HTTP status this error is answered with.
    ///
    /// Payer-side problems and ambiguous settlements are `402`; anything the
    /// payer could not have caused before verification is `500`.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Configuration(_)
            | Self::VerificationFailed(_)
            | Self::ResponseBuffering(_)
            | Self::SettlementEncoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::PaymentHeaderRequired
            | Self::InvalidPaymentHeader(_)
            | Self::NoMatchingRequirements
            | Self::VerificationRejected { .. }
            | Self::SettlementFailed(_)
            | Self::SettlementRejected(_) => StatusCode::PAYMENT_REQUIRED,
        }
    }

    /// Returns the payer reported by the facilitator, if any.
    #[must_use]
    pub fn payer(&self) -> Option<&str> {
        match self {
            Self::VerificationRejected { payer, .. } => payer.as_deref(),
            _ => None,
        }
    }
}
