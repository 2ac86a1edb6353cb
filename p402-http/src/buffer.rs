//! Holding a handler's response until settlement is known.
//!
//! The wrapped handler runs to completion and its response is drained into a
//! [`ResponseBuffer`]. Nothing reaches the client until the middleware calls
//! [`ResponseBuffer::into_response`], which it only does after settlement
//! succeeds. Otherwise the buffer is dropped together with the handler's
//! status, headers and body.

use std::convert::Infallible;

use axum_core::body::Body;
use axum_core::response::{IntoResponse, IntoResponseParts, Response, ResponseParts};
use bytes::{Bytes, BytesMut};
use http::{Extensions, HeaderMap, StatusCode};
use http_body_util::BodyExt;

/// In-memory sink for a handler's response.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    status: Option<StatusCode>,
    headers: HeaderMap,
    extensions: Extensions,
    body: BytesMut,
}

impl ResponseBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains `response` into a new buffer.
    ///
    /// The body is read frame by frame; trailers are dropped.
    ///
    /// # Errors
    ///
    /// Returns the body error if the handler's body fails mid-stream.
    pub async fn capture(response: Response) -> Result<Self, axum_core::Error> {
        let (parts, mut body) = response.into_parts();
        let mut buffer = Self {
            headers: parts.headers,
            extensions: parts.extensions,
            ..Self::default()
        };
        buffer.write_status(parts.status);
        while let Some(frame) = body.frame().await {
            if let Ok(data) = frame?.into_data() {
                buffer.write_body(&data);
            }
        }
        Ok(buffer)
    }

    /// Records the status code. Only the first call has an effect.
    pub fn write_status(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    /// Appends to the body. Writing a body before a status implies `200 OK`.
    pub fn write_body(&mut self, chunk: &[u8]) {
        self.write_status(StatusCode::OK);
        self.body.extend_from_slice(chunk);
    }

    /// Returns the buffered status, `200 OK` if none was written.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Returns the buffered headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the buffered headers for modification.
    pub const fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the body written so far.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Flushes the buffer into a response, verbatim.
    #[must_use]
    pub fn into_response(self) -> Response {
        let status = self.status();
        let mut response = Response::new(Body::from(Bytes::from(self.body)));
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        *response.extensions_mut() = self.extensions;
        response
    }
}

/// Marks a handler response as final: it is returned as-is and the payment is
/// never settled.
///
/// For handlers that turn a request down on business grounds after the
/// payment was verified but before doing anything worth charging for.
///
/// ```rust
/// use http::StatusCode;
/// use p402_http::SkipSettlement;
///
/// async fn handler() -> (StatusCode, SkipSettlement, &'static str) {
///     (StatusCode::CONFLICT, SkipSettlement, "sold out")
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipSettlement;

impl SkipSettlement {
    /// Returns `true` if `response` carries the marker.
    #[must_use]
    pub fn is_marked(response: &Response) -> bool {
        response.extensions().get::<Self>().is_some()
    }
}

impl IntoResponseParts for SkipSettlement {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        res.extensions_mut().insert(self);
        Ok(res)
    }
}

impl IntoResponse for SkipSettlement {
    fn into_response(self) -> Response {
        (self, ()).into_response()
    }
}
