//! HTTP client for a remote x402 facilitator.
//!
//! [`FacilitatorClient`] posts JSON to the facilitator's `/verify` and
//! `/settle` endpoints and implements [`p402::facilitator::Facilitator`] so
//! the payment gate can use it directly.
//!
//! Every call is a single HTTP exchange. There are no retries and nothing is
//! cached; retry policy belongs to the caller. Auth headers, when configured,
//! are requested from the [`AuthProvider`] again for every call.
//!
//! A non-`200` answer is reported as [`FacilitatorClientError::HttpStatus`]
//! with the body text, whatever the body contains.

use std::fmt::{self, Display};
use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, StatusCode};
use p402::facilitator::{Facilitator, FacilitatorRequest};
use p402::proto::{PaymentPayload, PaymentRequirements, SettleResponse, VerifyResponse};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::{Span, instrument};

use crate::auth::{AuthError, AuthHeaders, AuthProvider};
use crate::constants::DEFAULT_FACILITATOR_URL;

/// Where the facilitator lives and how to authenticate against it.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct FacilitatorConfig {
    /// Facilitator base URL.
    pub url: String,
    /// Optional provider of per-call auth headers. Set in code, never deserialized.
    #[serde(skip)]
    pub auth: Option<Arc<dyn AuthProvider>>,
}

impl Default for FacilitatorConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FACILITATOR_URL.to_owned(),
            auth: None,
        }
    }
}

impl FacilitatorConfig {
    /// Creates a config for the facilitator at `url`, without authentication.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth: None,
        }
    }

    /// Sets the auth header provider.
    #[must_use]
    pub fn with_auth(mut self, provider: impl AuthProvider + 'static) -> Self {
        self.auth = Some(Arc::new(provider));
        self
    }
}

impl fmt::Debug for FacilitatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacilitatorConfig")
            .field("url", &self.url)
            .field("auth", &self.auth.as_ref().map(|_| "<provider>"))
            .finish()
    }
}

/// Client for the `/verify` and `/settle` endpoints of one facilitator.
///
/// Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct FacilitatorClient {
    /// Always ends in `/`
    base_url: Url,
    verify_url: Url,
    settle_url: Url,
    client: Client,
    /// Sent with both operations
    headers: HeaderMap,
    timeout: Option<Duration>,
    auth: Option<Arc<dyn AuthProvider>>,
}

impl fmt::Debug for FacilitatorClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacilitatorClient")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("auth", &self.auth.is_some())
            .finish_non_exhaustive()
    }
}

impl Facilitator for FacilitatorClient {
    type Error = FacilitatorClientError;

    async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, FacilitatorClientError> {
        Self::verify(self, payload, requirements).await
    }

    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, FacilitatorClientError> {
        Self::settle(self, payload, requirements).await
    }
}

/// Errors returned by [`FacilitatorClient`].
///
/// `context` names the request that failed, e.g. `"POST /settle"`.
#[derive(Debug, thiserror::Error)]
pub enum FacilitatorClientError {
    /// URL parse error.
    #[error("{context}: invalid facilitator URL: {source}")]
    UrlParse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// The auth provider could not produce headers.
    #[error("auth provider failed: {source}")]
    AuthHeaders {
        /// The underlying provider error.
        #[source]
        source: AuthError,
    },
    /// HTTP transport error.
    #[error("{context}: request failed: {source}")]
    Http {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// JSON deserialization error.
    #[error("{context}: malformed response body: {source}")]
    JsonDeserialization {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Unexpected HTTP status code.
    #[error("{context}: facilitator answered {status}: {body}")]
    HttpStatus {
        /// Human-readable context.
        context: &'static str,
        /// The HTTP status code.
        status: StatusCode,
        /// The response body.
        body: String,
    },
    /// Failed to read response body.
    #[error("{context}: could not read response body: {source}")]
    ResponseBodyRead {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
}

/// Which facilitator endpoint a request is for.
#[derive(Debug, Clone, Copy)]
enum Operation {
    Verify,
    Settle,
}

impl FacilitatorClient {
    /// Facilitator base URL, with a trailing slash.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `POST` target for verification.
    #[must_use]
    pub const fn verify_url(&self) -> &Url {
        &self.verify_url
    }

    /// `POST` target for settlement.
    #[must_use]
    pub const fn settle_url(&self) -> &Url {
        &self.settle_url
    }

    /// Static headers sent with every call.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Per-call timeout, if one is set.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Creates a client for the facilitator at `base_url`.
    ///
    /// `./verify` and `./settle` are resolved relative to the base, so the
    /// base should end in `/`. [`TryFrom<&str>`] normalizes that for you.
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorClientError::UrlParse`] if the endpoint URLs cannot be derived.
    pub fn try_new(base_url: Url) -> Result<Self, FacilitatorClientError> {
        let verify_url =
            base_url
                .join("./verify")
                .map_err(|e| FacilitatorClientError::UrlParse {
                    context: "deriving /verify",
                    source: e,
                })?;
        let settle_url =
            base_url
                .join("./settle")
                .map_err(|e| FacilitatorClientError::UrlParse {
                    context: "deriving /settle",
                    source: e,
                })?;
        Ok(Self {
            base_url,
            verify_url,
            settle_url,
            client: Client::new(),
            headers: HeaderMap::new(),
            timeout: None,
            auth: None,
        })
    }

    /// Builds a client from a [`FacilitatorConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorClientError::UrlParse`] if the configured URL is invalid.
    pub fn from_config(config: &FacilitatorConfig) -> Result<Self, FacilitatorClientError> {
        let client = Self::try_from(config.url.as_str())?;
        Ok(Self {
            auth: config.auth.clone(),
            ..client
        })
    }

    /// Replaces the static headers sent with every call.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Bounds each call to `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the provider asked for auth headers before every call.
    #[must_use]
    pub fn with_auth(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(provider);
        self
    }

    /// Asks the facilitator whether `payload` satisfies `requirements`.
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorClientError`] if auth headers cannot be created,
    /// the HTTP request fails, the status is not `200`, or the body does not parse.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "x402.facilitator_client.verify",
            skip_all,
            fields(
                timeout = ?self.timeout,
                otel.status_code = tracing::field::Empty,
                error.message = tracing::field::Empty,
            )
        )
    )]
    pub async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, FacilitatorClientError> {
        let request = FacilitatorRequest::new(payload, requirements);
        self.post_json(Operation::Verify, "POST /verify", &request)
            .await
    }

    /// Asks the facilitator to execute the transfer in `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorClientError`] if auth headers cannot be created,
    /// the HTTP request fails, the status is not `200`, or the body does not parse.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "x402.facilitator_client.settle",
            skip_all,
            fields(
                timeout = ?self.timeout,
                otel.status_code = tracing::field::Empty,
                error.message = tracing::field::Empty,
            )
        )
    )]
    pub async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, FacilitatorClientError> {
        let request = FacilitatorRequest::new(payload, requirements);
        self.post_json(Operation::Settle, "POST /settle", &request)
            .await
    }

    /// Asks the auth provider, if any, for the headers of `operation`.
    fn auth_headers(&self, operation: Operation) -> Result<HeaderMap, FacilitatorClientError> {
        let Some(provider) = &self.auth else {
            return Ok(HeaderMap::new());
        };
        let AuthHeaders { verify, settle } = provider
            .auth_headers()
            .map_err(|source| FacilitatorClientError::AuthHeaders { source })?;
        Ok(match operation {
            Operation::Verify => verify,
            Operation::Settle => settle,
        })
    }

    /// Sends one request and marks the current span with its outcome.
    async fn post_json<R>(
        &self,
        operation: Operation,
        context: &'static str,
        payload: &FacilitatorRequest<'_>,
    ) -> Result<R, FacilitatorClientError>
    where
        R: serde::de::DeserializeOwned,
    {
        let result = self.send_json(operation, context, payload).await;
        record_result_on_span(&result);
        result
    }

    async fn send_json<R>(
        &self,
        operation: Operation,
        context: &'static str,
        payload: &FacilitatorRequest<'_>,
    ) -> Result<R, FacilitatorClientError>
    where
        R: serde::de::DeserializeOwned,
    {
        let auth = self.auth_headers(operation)?;
        let url = match operation {
            Operation::Verify => &self.verify_url,
            Operation::Settle => &self.settle_url,
        };
        // Auth headers replace static headers of the same name
        let mut headers = self.headers.clone();
        headers.extend(auth);
        let mut req = self.client.post(url.clone()).json(payload).headers(headers);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let http_response = req
            .send()
            .await
            .map_err(|e| FacilitatorClientError::Http { context, source: e })?;

        if http_response.status() == StatusCode::OK {
            http_response
                .json::<R>()
                .await
                .map_err(|e| FacilitatorClientError::JsonDeserialization { context, source: e })
        } else {
            let status = http_response.status();
            let body = http_response
                .text()
                .await
                .map_err(|e| FacilitatorClientError::ResponseBodyRead { context, source: e })?;
            Err(FacilitatorClientError::HttpStatus {
                context,
                status,
                body,
            })
        }
    }
}

/// Parses a base URL, adding the trailing slash if it is missing.
impl TryFrom<&str> for FacilitatorClient {
    type Error = FacilitatorClientError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        // One trailing slash, so ./verify lands under the base path
        let mut normalized = value.trim_end_matches('/').to_owned();
        normalized.push('/');
        let url = Url::parse(&normalized).map_err(|e| FacilitatorClientError::UrlParse {
            context: "parsing base URL",
            source: e,
        })?;
        Self::try_new(url)
    }
}

impl TryFrom<String> for FacilitatorClient {
    type Error = FacilitatorClientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

/// Records the outcome of a request on the current span.
#[cfg(feature = "telemetry")]
fn record_result_on_span<R, E: Display>(result: &Result<R, E>) {
    let span = Span::current();
    match result {
        Ok(_) => {
            span.record("otel.status_code", "OK");
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            span.record("error.message", tracing::field::display(err));
            tracing::error!(error = %err, "Facilitator call failed");
        }
    }
}

#[cfg(not(feature = "telemetry"))]
const fn record_result_on_span<R, E: Display>(_result: &Result<R, E>) {}
