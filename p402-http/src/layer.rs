//! Tower layer enforcing x402 payments on wrapped routes.
//!
//! Build one [`X402Middleware`] per price and recipient, then apply it to the
//! routes it protects:
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use p402::Money;
//! use p402_http::{PaymentMiddlewareConfig, X402Middleware};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let x402 = X402Middleware::try_new(
//!     Money::try_from(0.01)?,
//!     "0x209693Bc6afc0C5328bA36FaF03C514EF312287C",
//!     PaymentMiddlewareConfig::default().with_description("A joke"),
//! )?;
//! let app: Router = Router::new().route("/joke", get(|| async { "ok" }).layer(x402));
//! # Ok(())
//! # }
//! ```

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum_core::extract::Request;
use axum_core::response::Response;
use p402::Money;
use p402::facilitator::Facilitator;
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service};

use crate::config::PaymentMiddlewareConfig;
use crate::error::ConfigurationError;
use crate::facilitator_client::FacilitatorClient;
use crate::paygate::Paygate;
use crate::paywall::Paywall;
use crate::requirements::RequirementsTemplate;

/// The x402 payment layer.
///
/// Cheap to clone; all clones share one immutable [`Paygate`].
pub struct X402Middleware<F> {
    gate: Arc<Paygate<F>>,
}

impl<F> Clone for X402Middleware<F> {
    fn clone(&self) -> Self {
        Self {
            gate: Arc::clone(&self.gate),
        }
    }
}

impl<F> std::fmt::Debug for X402Middleware<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X402Middleware")
            .field("requirements", self.gate.requirements())
            .finish_non_exhaustive()
    }
}

impl X402Middleware<FacilitatorClient> {
    /// Creates a middleware charging `amount` USDC to `pay_to`, verifying and
    /// settling through the facilitator in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the facilitator URL, the recipient
    /// address or the amount is invalid.
    pub fn try_new(
        amount: Money,
        pay_to: &str,
        config: PaymentMiddlewareConfig,
    ) -> Result<Self, ConfigurationError> {
        let facilitator = FacilitatorClient::from_config(&config.facilitator)
            .map_err(ConfigurationError::InvalidFacilitatorUrl)?;
        Self::with_facilitator(facilitator, amount, pay_to, config)
    }
}

impl<F> X402Middleware<F> {
    /// Creates a middleware using the given facilitator.
    ///
    /// `config.facilitator` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the recipient address or the amount
    /// is invalid.
    #[allow(clippy::needless_pass_by_value)] // config is consumed for its paywall HTML
    pub fn with_facilitator(
        facilitator: F,
        amount: Money,
        pay_to: &str,
        config: PaymentMiddlewareConfig,
    ) -> Result<Self, ConfigurationError> {
        let requirements = RequirementsTemplate::new(amount, pay_to, &config)?;
        let paywall = Paywall::new(config.custom_paywall_html, config.testnet);
        Ok(Self {
            gate: Arc::new(Paygate::new(facilitator, requirements, paywall)),
        })
    }

    /// Returns a reference to the underlying facilitator.
    #[must_use]
    pub fn facilitator(&self) -> &F {
        self.gate.facilitator()
    }

    /// Returns the requirements template.
    #[must_use]
    pub fn requirements(&self) -> &RequirementsTemplate {
        self.gate.requirements()
    }

    pub(crate) fn gate(&self) -> Arc<Paygate<F>> {
        Arc::clone(&self.gate)
    }
}

impl<S, F> Layer<S> for X402Middleware<F>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
{
    type Service = X402MiddlewareService<F>;

    fn layer(&self, inner: S) -> Self::Service {
        X402MiddlewareService {
            gate: self.gate(),
            inner: BoxCloneSyncService::new(inner),
        }
    }
}

/// Axum service that enforces x402 payments on incoming requests.
#[allow(missing_debug_implementations)] // BoxCloneSyncService does not implement Debug
pub struct X402MiddlewareService<F> {
    /// The shared payment gate
    gate: Arc<Paygate<F>>,
    /// The inner Axum service being wrapped
    inner: BoxCloneSyncService<Request, Response, Infallible>,
}

impl<F> Clone for X402MiddlewareService<F> {
    fn clone(&self) -> Self {
        Self {
            gate: Arc::clone(&self.gate),
            inner: self.inner.clone(),
        }
    }
}

impl<F> Service<Request> for X402MiddlewareService<F>
where
    F: Facilitator + Send + Sync + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    /// Delegates readiness polling to the wrapped inner service.
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    /// Intercepts the request, injects payment enforcement logic, and forwards to the wrapped service.
    fn call(&mut self, req: Request) -> Self::Future {
        let gate = Arc::clone(&self.gate);
        let inner = self.inner.clone();
        Box::pin(async move { Ok(gate.handle_request(inner, req).await) })
    }
}
