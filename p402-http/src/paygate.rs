//! Core payment gate logic for enforcing x402 payments.
//!
//! A [`Paygate`] takes a request through the full lifecycle:
//!
//! 1. build the payment requirements for the request path
//! 2. read and decode the `X-PAYMENT` header
//! 3. verify the payment with the facilitator
//! 4. run the wrapped handler into a [`ResponseBuffer`]
//! 5. settle the payment with the facilitator
//! 6. release the buffered response with an `X-PAYMENT-RESPONSE` receipt
//!
//! Any failure short-circuits into a `402` or `500` response. The handler
//! only runs after a positive verification, and its output is only released
//! after a successful settlement.

use std::convert::Infallible;

use axum_core::body::Body;
use axum_core::extract::Request;
use axum_core::response::Response;
use http::header::{ACCESS_CONTROL_EXPOSE_HEADERS, CONTENT_TYPE};
use http::{HeaderValue, StatusCode};
use p402::facilitator::Facilitator;
use p402::proto::{decode_payment_payload, encode_settle_response};
use p402::{ErrorResponse, PaymentPayload, PaymentRequiredResponse, PaymentRequirements};
use serde::Serialize;
use tower::{Service, ServiceExt};

#[cfg(feature = "telemetry")]
use tracing::{Instrument, instrument};

use crate::buffer::{ResponseBuffer, SkipSettlement};
use crate::constants::{X_PAYMENT_HEADER, X_PAYMENT_RESPONSE_HEADER};
use crate::error::PaygateError;
use crate::paywall::{ClientKind, Paywall};
use crate::requirements::RequirementsTemplate;

/// Payment gate for a single price and recipient.
///
/// Immutable once built and shared across requests.
///
/// Side effects of the wrapped handler are not rolled back when settlement
/// fails afterwards; only its response is withheld.
#[allow(missing_debug_implementations)]
pub struct Paygate<F> {
    facilitator: F,
    requirements: RequirementsTemplate,
    paywall: Paywall,
}

impl<F> Paygate<F> {
    /// Creates a gate from its parts.
    pub const fn new(facilitator: F, requirements: RequirementsTemplate, paywall: Paywall) -> Self {
        Self {
            facilitator,
            requirements,
            paywall,
        }
    }

    /// Returns the facilitator.
    #[must_use]
    pub const fn facilitator(&self) -> &F {
        &self.facilitator
    }

    /// Returns the requirements template.
    #[must_use]
    pub const fn requirements(&self) -> &RequirementsTemplate {
        &self.requirements
    }

    /// Calls the inner service with proper telemetry instrumentation.
    async fn call_inner<S>(inner: S, req: Request) -> Response
    where
        S: Service<Request, Response = Response, Error = Infallible>,
        S::Future: Send,
    {
        #[cfg(feature = "telemetry")]
        let result = inner
            .oneshot(req)
            .instrument(tracing::info_span!("inner"))
            .await;
        #[cfg(not(feature = "telemetry"))]
        let result = inner.oneshot(req).await;

        match result {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }

    /// Turns a failure into the response the client sees.
    ///
    /// Browsers get the paywall page for every `402`. Everything else, and
    /// every `500`, gets a JSON envelope.
    fn reject(
        &self,
        err: &PaygateError,
        client: ClientKind,
        requirements: Option<&PaymentRequirements>,
    ) -> Response {
        let status = err.status();
        let Some(requirements) = requirements.filter(|_| status == StatusCode::PAYMENT_REQUIRED)
        else {
            return json_response(status, &ErrorResponse::new(err.to_string()));
        };
        if client == ClientKind::Browser {
            match self.paywall.render(
                self.requirements.amount(),
                requirements,
                &requirements.resource,
            ) {
                Ok(html) => return html_response(status, html),
                Err(_err) => {
                    #[cfg(feature = "telemetry")]
                    tracing::error!(error = %_err, "Failed to render paywall page");
                }
            }
        }
        let body = PaymentRequiredResponse::new(err.to_string(), requirements.clone())
            .with_payer(err.payer().map(str::to_owned));
        json_response(status, &body)
    }
}

impl<F> Paygate<F>
where
    F: Facilitator + Sync,
{
    /// Handles an incoming request, processing payment if required.
    ///
    /// Returns a `402` or `500` response if payment fails, otherwise the
    /// wrapped handler's response with the settlement receipt attached.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "x402.handle_request", skip_all, fields(path = %req.uri().path()))
    )]
    pub async fn handle_request<S>(&self, inner: S, req: Request) -> Response
    where
        S: Service<Request, Response = Response, Error = Infallible>,
        S::Future: Send,
    {
        let client = ClientKind::detect(req.headers());
        let requirements = match self.requirements.build(req.uri().path()) {
            Ok(requirements) => requirements,
            Err(err) => {
                #[cfg(feature = "telemetry")]
                tracing::error!(error = %err, "Failed to build payment requirements");
                return self.reject(&err.into(), client, None);
            }
        };
        match self.handle_request_fallible(inner, req, &requirements).await {
            Ok(response) => response,
            Err(err) => {
                #[cfg(feature = "telemetry")]
                tracing::debug!(error = %err, status = %err.status(), "Payment gate rejected request");
                self.reject(&err, client, Some(&requirements))
            }
        }
    }

    /// Handles an incoming request, returning errors as [`PaygateError`].
    ///
    /// This is the fallible version of [`Self::handle_request`] that returns
    /// the error instead of turning it into a response.
    ///
    /// # Errors
    ///
    /// Returns [`PaygateError`] if payment processing fails.
    pub async fn handle_request_fallible<S>(
        &self,
        inner: S,
        req: Request,
        requirements: &PaymentRequirements,
    ) -> Result<Response, PaygateError>
    where
        S: Service<Request, Response = Response, Error = Infallible>,
        S::Future: Send,
    {
        let payload = extract_payment_payload(&req)?;
        if !payload.matches(requirements) {
            return Err(PaygateError::NoMatchingRequirements);
        }

        let verification = self
            .facilitator
            .verify(&payload, requirements)
            .await
            .map_err(|e| PaygateError::VerificationFailed(e.to_string()))?;
        if !verification.is_valid {
            return Err(PaygateError::VerificationRejected {
                reason: verification
                    .invalid_reason
                    .unwrap_or_else(|| "Invalid payment".to_owned()),
                payer: verification.payer,
            });
        }

        #[cfg(feature = "telemetry")]
        tracing::debug!(payer = ?verification.payer, "Payment verified, running handler");

        let response = Self::call_inner(inner, req).await;
        if SkipSettlement::is_marked(&response) {
            #[cfg(feature = "telemetry")]
            tracing::debug!(status = %response.status(), "Handler skipped settlement");
            return Ok(response);
        }
        let buffer = ResponseBuffer::capture(response)
            .await
            .map_err(|e| PaygateError::ResponseBuffering(e.to_string()))?;

        let settlement = self
            .facilitator
            .settle(&payload, requirements)
            .await
            .map_err(|e| PaygateError::SettlementFailed(e.to_string()))?;
        if !settlement.success {
            return Err(PaygateError::SettlementRejected(
                settlement
                    .error_reason
                    .unwrap_or_else(|| "unknown reason".to_owned()),
            ));
        }

        let receipt = encode_settle_response(&settlement)
            .map_err(|e| PaygateError::SettlementEncoding(e.to_string()))?;
        let header_value = HeaderValue::try_from(receipt)
            .map_err(|e| PaygateError::SettlementEncoding(e.to_string()))?;

        #[cfg(feature = "telemetry")]
        tracing::info!(
            transaction = %settlement.transaction,
            network = %settlement.network,
            "Payment settled, releasing response"
        );

        let mut response = buffer.into_response();
        let headers = response.headers_mut();
        headers.insert(X_PAYMENT_RESPONSE_HEADER, header_value);
        headers.append(
            ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static(X_PAYMENT_RESPONSE_HEADER),
        );
        Ok(response)
    }
}

/// Reads and decodes the `X-PAYMENT` header.
fn extract_payment_payload(req: &Request) -> Result<PaymentPayload, PaygateError> {
    let header = req
        .headers()
        .get(X_PAYMENT_HEADER)
        .ok_or(PaygateError::PaymentHeaderRequired)?;
    decode_payment_payload(&String::from_utf8_lossy(header.as_bytes()))
        .map_err(PaygateError::InvalidPaymentHeader)
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => with_content_type(status, Body::from(bytes), "application/json"),
        Err(_err) => {
            #[cfg(feature = "telemetry")]
            tracing::error!(error = %_err, "Failed to serialize error body");
            with_content_type(
                StatusCode::INTERNAL_SERVER_ERROR,
                Body::from("internal error"),
                "text/plain; charset=utf-8",
            )
        }
    }
}

fn html_response(status: StatusCode, html: String) -> Response {
    with_content_type(status, Body::from(html), "text/html; charset=utf-8")
}

fn with_content_type(status: StatusCode, body: Body, content_type: &'static str) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
