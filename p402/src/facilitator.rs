//! Core trait for verifying and settling x402 payments.
//!
//! A resource server never checks signatures or touches the chain itself. It
//! hands the buyer's [`PaymentPayload`] and its own [`PaymentRequirements`] to
//! a [`Facilitator`] and acts on the answer.
//!
//! The usual implementation is the HTTP client in `p402-http`; tests and
//! embedded deployments can implement the trait directly.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;

use crate::proto::{PaymentPayload, PaymentRequirements, SettleResponse, V1, VerifyResponse, X402Version1};

/// Verifies and settles payments on behalf of a resource server.
///
/// Implementations report protocol-level rejections through the response
/// values (`is_valid == false`, `success == false`). `Err` is reserved for
/// failures to obtain an answer at all.
pub trait Facilitator {
    /// The transport or internal error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Checks whether `payload` satisfies `requirements` without moving funds.
    fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> impl Future<Output = Result<VerifyResponse, Self::Error>> + Send;

    /// Executes the transfer authorized by `payload`.
    fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> impl Future<Output = Result<SettleResponse, Self::Error>> + Send;
}

impl<T: Facilitator + Sync + Send> Facilitator for Arc<T> {
    type Error = T::Error;

    fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> impl Future<Output = Result<VerifyResponse, Self::Error>> + Send {
        self.as_ref().verify(payload, requirements)
    }

    fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> impl Future<Output = Result<SettleResponse, Self::Error>> + Send {
        self.as_ref().settle(payload, requirements)
    }
}

/// JSON body of a facilitator `/verify` or `/settle` call.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitatorRequest<'a> {
    /// Protocol version (always 1).
    pub x402_version: X402Version1,
    /// The buyer's payment.
    pub payment_payload: &'a PaymentPayload,
    /// The requirements the payment is checked against.
    pub payment_requirements: &'a PaymentRequirements,
}

impl<'a> FacilitatorRequest<'a> {
    /// Pairs a payload with the requirements it must satisfy.
    #[must_use]
    pub const fn new(
        payment_payload: &'a PaymentPayload,
        payment_requirements: &'a PaymentRequirements,
    ) -> Self {
        Self {
            x402_version: V1,
            payment_payload,
            payment_requirements,
        }
    }
}
