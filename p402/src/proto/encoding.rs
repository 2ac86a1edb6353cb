//! Base64 header codecs for the x402 wire format.
//!
//! `X-PAYMENT` and `X-PAYMENT-RESPONSE` carry JSON documents encoded with the
//! standard base64 alphabet (with padding).

use std::fmt::{self, Display, Formatter};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;

use super::v1::{PaymentPayload, SettleResponse};
use crate::error::{EncodeError, PayloadError};

/// Base64 text held as bytes, ready to go into a header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Bytes(pub Vec<u8>);

impl Base64Bytes {
    /// Decodes the base64 text to raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        b64.decode(&self.0)
    }

    /// Encodes raw bytes as base64 text.
    pub fn encode<T: AsRef<[u8]>>(input: T) -> Self {
        Self(b64.encode(input.as_ref()).into_bytes())
    }

    /// Serializes `value` to JSON and encodes the result.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized.
    pub fn encode_json<T: serde::Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_vec(value).map(Self::encode)
    }
}

impl AsRef<[u8]> for Base64Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Base64Bytes {
    fn from(s: &str) -> Self {
        Self(s.trim().as_bytes().to_vec())
    }
}

impl Display for Base64Bytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Decodes an `X-PAYMENT` header value into a [`PaymentPayload`].
///
/// Surrounding whitespace is ignored. Whatever `x402Version` the client sent
/// is replaced with version 1.
///
/// # Errors
///
/// Returns [`PayloadError::Base64`] for malformed base64 and
/// [`PayloadError::Json`] if the decoded bytes are not a valid payload.
pub fn decode_payment_payload(header: &str) -> Result<PaymentPayload, PayloadError> {
    let result = Base64Bytes::from(header)
        .decode()
        .map_err(PayloadError::from)
        .and_then(|bytes| serde_json::from_slice(&bytes).map_err(PayloadError::from));
    #[cfg(feature = "telemetry")]
    if let Err(err) = &result {
        tracing::debug!(error = %err, header_len = header.len(), "Malformed payment header");
    }
    result
}

/// Encodes a [`PaymentPayload`] for the `X-PAYMENT` header.
///
/// # Errors
///
/// Returns [`EncodeError`] if the payload cannot be serialized.
pub fn encode_payment_payload(payload: &PaymentPayload) -> Result<String, EncodeError> {
    Ok(Base64Bytes::encode_json(payload)?.to_string())
}

/// Encodes a [`SettleResponse`] for the `X-PAYMENT-RESPONSE` header.
///
/// # Errors
///
/// Returns [`EncodeError`] if the receipt cannot be serialized.
pub fn encode_settle_response(settle: &SettleResponse) -> Result<String, EncodeError> {
    Ok(Base64Bytes::encode_json(settle)?.to_string())
}

/// Decodes an `X-PAYMENT-RESPONSE` header value into a [`SettleResponse`].
///
/// # Errors
///
/// Returns [`PayloadError`] if the value is not base64 encoded receipt JSON.
pub fn decode_settle_response(header: &str) -> Result<SettleResponse, PayloadError> {
    let bytes = Base64Bytes::from(header).decode()?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::v1::V1;
    use crate::scheme::{ExactEvmAuthorization, ExactEvmPayload, SchemePayload};

    fn sample_payload() -> PaymentPayload {
        PaymentPayload::new(
            "base-sepolia",
            SchemePayload::Exact(ExactEvmPayload {
                signature: "0xvalidSignature".into(),
                authorization: ExactEvmAuthorization {
                    from: "0xvalidFrom".into(),
                    to: "0xvalidTo".into(),
                    value: "1000000".into(),
                    valid_after: "1745323800".into(),
                    valid_before: "1745323985".into(),
                    nonce: "0xvalidNonce".into(),
                },
            }),
        )
    }

    #[test]
    fn test_payment_payload_header_roundtrip() {
        let payload = sample_payload();
        let header = encode_payment_payload(&payload).unwrap();
        assert_eq!(decode_payment_payload(&header).unwrap(), payload);
    }

    #[test]
    fn test_decode_ignores_surrounding_whitespace() {
        let header = encode_payment_payload(&sample_payload()).unwrap();
        let padded = format!("  {header}\n");
        assert!(decode_payment_payload(&padded).is_ok());
    }

    #[test]
    fn test_decode_forces_version_one() {
        let json = serde_json::json!({
            "x402Version": 2,
            "scheme": "exact",
            "network": "base",
            "payload": serde_json::to_value(&sample_payload().payload).unwrap(),
        });
        let header = Base64Bytes::encode_json(&json).unwrap().to_string();
        let decoded = decode_payment_payload(&header).unwrap();
        assert_eq!(decoded.x402_version, V1);
        assert_eq!(decoded.network, "base");
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let err = decode_payment_payload("not base64!!").unwrap_err();
        assert!(matches!(err, PayloadError::Base64(_)));
    }

    #[test]
    fn test_decode_rejects_non_payload_json() {
        let header = Base64Bytes::encode(b"{\"hello\":\"world\"}").to_string();
        let err = decode_payment_payload(&header).unwrap_err();
        assert!(matches!(err, PayloadError::Json(_)));
    }

    #[test]
    fn test_settle_response_header() {
        let settle = SettleResponse {
            success: true,
            error_reason: None,
            transaction: "0xabc".into(),
            network: "base-sepolia".into(),
            payer: Some("0xpayer".into()),
        };
        let header = encode_settle_response(&settle).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&Base64Bytes::from(header.as_str()).decode().unwrap()).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["transaction"], "0xabc");
        assert_eq!(json["network"], "base-sepolia");
        assert_eq!(decode_settle_response(&header).unwrap(), settle);
    }

    #[cfg(feature = "telemetry")]
    #[test]
    fn test_decode_failure_is_logged() {
        use std::io;
        use std::sync::{Arc, Mutex};

        #[derive(Debug, Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl io::Write for Captured {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            assert!(decode_payment_payload("%%% not base64").is_err());
            let header = encode_payment_payload(&sample_payload()).unwrap();
            assert!(decode_payment_payload(&header).is_ok());
        });

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert_eq!(logs.matches("Malformed payment header").count(), 1);
    }
}
