#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the x402 pay-per-request protocol.
//!
//! This crate provides the value types exchanged between a paying client, a
//! resource server and a remote facilitator, plus the codecs used to carry
//! them in HTTP headers. It has no HTTP stack of its own; the enforcement
//! middleware and the HTTP facilitator client live in `p402-http`.
//!
//! # Overview
//!
//! A resource server answers an unpaid request with `402 Payment Required` and
//! a list of [`PaymentRequirements`]. The client signs a transfer
//! authorization and retries with an `X-PAYMENT` header carrying a
//! [`PaymentPayload`]. The server asks a [`Facilitator`](facilitator::Facilitator)
//! to verify the payload, runs the protected handler, asks the facilitator to
//! settle, and only then releases the response together with a base64
//! [`SettleResponse`] receipt.
//!
//! # Modules
//!
//! - [`amount`] - Human-readable USD amounts and atomic unit conversion
//! - [`error`] - Decode, encode and money parsing errors
//! - [`facilitator`] - Core trait for payment verification and settlement
//! - [`networks`] - Supported networks and their USDC deployments
//! - [`proto`] - Wire format types and header codecs
//! - [`scheme`] - Payment schemes and their scheme-specific payloads
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring

pub mod amount;
pub mod error;
pub mod facilitator;
pub mod networks;
pub mod proto;
pub mod scheme;

pub use amount::Money;
pub use error::{EncodeError, MoneyError, PayloadError};
pub use networks::Network;
pub use proto::{
    ErrorResponse, PaymentPayload, PaymentRequiredResponse, PaymentRequirements, SettleResponse,
    VerifyResponse,
};
pub use scheme::{ExactEvmAuthorization, ExactEvmPayload, Scheme, SchemePayload};
