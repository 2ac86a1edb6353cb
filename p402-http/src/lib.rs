#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Axum middleware for enforcing [x402](https://www.x402.org) payments on protected routes.
//!
//! The middleware answers unpaid requests with `402 Payment Required` and the
//! payment requirements. Paid requests are verified with a remote
//! facilitator, the wrapped handler runs, and its response is held back until
//! the facilitator has settled the payment. Only then is the response released,
//! with the settlement receipt in the `X-PAYMENT-RESPONSE` header.
//!
//! See [`X402Middleware`] for a single protected route and [`PaymentRoutes`]
//! for a table of patterns with their own prices. For low-level interaction
//! with the facilitator, see [`facilitator_client::FacilitatorClient`].
//!
//! ## Failure Responses
//!
//! - no, malformed or mismatched payment: `402` with the requirements
//! - facilitator rejects the payment: `402` with its reason
//! - facilitator unreachable during verification: `500`
//! - settlement fails or is rejected: `402`, the handler's response is discarded
//!
//! Browsers (`Accept: text/html` and a `Mozilla` user agent) get an HTML
//! paywall page instead of the JSON body for every `402`.
//!
//! ## Skipping Settlement
//!
//! A handler can return [`SkipSettlement`] as part of its response to opt
//! out of settlement after a successful verification. The response is sent
//! as-is and the payer is not charged.
//!
//! ## Feature Flags
//!
//! - `telemetry` (default) - Enables tracing instrumentation

pub mod auth;
pub mod buffer;
pub mod config;
pub mod constants;
pub mod error;
pub mod facilitator_client;
pub mod layer;
pub mod paygate;
pub mod paywall;
pub mod requirements;
pub mod routes;

pub use auth::{AuthError, AuthHeaders, AuthProvider, CallbackAuthProvider, StaticAuthProvider};
pub use buffer::{ResponseBuffer, SkipSettlement};
pub use config::PaymentMiddlewareConfig;
pub use error::{ConfigurationError, PaygateError};
pub use facilitator_client::{FacilitatorClient, FacilitatorClientError, FacilitatorConfig};
pub use layer::{X402Middleware, X402MiddlewareService};
pub use paygate::Paygate;
pub use paywall::{ClientKind, Paywall};
pub use requirements::RequirementsTemplate;
pub use routes::{PaymentRoutes, PaymentRoutesService, RoutePattern};
