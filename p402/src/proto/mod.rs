//! Protocol types for x402 payment messages.
//!
//! This module defines the wire format used between buyers, resource servers
//! and facilitators. Only protocol version 1 is spoken; see [`v1`].
//!
//! # Key Types
//!
//! - [`PaymentRequirements`] - Payment terms authored by the resource server
//! - [`PaymentPayload`] - Signed payment authorization presented by the buyer
//! - [`VerifyResponse`] / [`SettleResponse`] - Facilitator answers
//! - [`PaymentRequiredResponse`] / [`ErrorResponse`] - Error envelopes returned to buyers
//!
//! # Wire Format
//!
//! All types serialize to JSON using camelCase field names. Header values
//! carry that JSON base64-encoded (see [`encoding`]).

pub mod encoding;
pub mod v1;

pub use encoding::{
    Base64Bytes, decode_payment_payload, decode_settle_response, encode_payment_payload,
    encode_settle_response,
};
pub use v1::{
    ErrorResponse, PaymentPayload, PaymentRequiredResponse, PaymentRequirements, SettleResponse,
    V1, VerifyResponse, X402Version1,
};
