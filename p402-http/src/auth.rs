//! Authentication headers for facilitator requests.
//!
//! Hosted facilitators usually require credentials such as API keys or
//! short-lived JWTs. An [`AuthProvider`] is asked for fresh headers before
//! every `/verify` and `/settle` call.

use std::collections::HashMap;
use std::fmt;

use http::header::{AUTHORIZATION, HeaderName, HeaderValue, InvalidHeaderName, InvalidHeaderValue};
use http::HeaderMap;

/// Errors that can occur while producing authentication headers.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A header name is not valid HTTP.
    #[error("invalid auth header name {name:?}: {source}")]
    InvalidHeaderName {
        /// The rejected name.
        name: String,
        /// The underlying error.
        #[source]
        source: InvalidHeaderName,
    },
    /// A header value is not valid HTTP.
    #[error("invalid value for auth header {name:?}: {source}")]
    InvalidHeaderValue {
        /// The header the value was meant for.
        name: String,
        /// The underlying error.
        #[source]
        source: InvalidHeaderValue,
    },
    /// The provider itself failed, e.g. could not sign a token.
    #[error("failed to create auth headers: {0}")]
    Provider(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Per-operation authentication headers.
#[derive(Debug, Clone, Default)]
pub struct AuthHeaders {
    /// Headers to include in verify requests.
    pub verify: HeaderMap,
    /// Headers to include in settle requests.
    pub settle: HeaderMap,
}

impl AuthHeaders {
    /// Builds headers from an `operation -> header name -> header value` map.
    ///
    /// Only the `"verify"` and `"settle"` entries are used; other operations
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if a header name or value is not valid HTTP.
    #[allow(clippy::implicit_hasher)]
    pub fn try_from_map(map: &HashMap<String, HashMap<String, String>>) -> Result<Self, AuthError> {
        let section = |operation: &str| {
            map.get(operation)
                .map_or_else(|| Ok(HeaderMap::new()), to_header_map)
        };
        Ok(Self {
            verify: section("verify")?,
            settle: section("settle")?,
        })
    }
}

fn to_header_map(headers: &HashMap<String, String>) -> Result<HeaderMap, AuthError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name =
            HeaderName::try_from(name.as_str()).map_err(|source| AuthError::InvalidHeaderName {
                name: name.clone(),
                source,
            })?;
        let header_value =
            HeaderValue::try_from(value.as_str()).map_err(|source| AuthError::InvalidHeaderValue {
                name: name.clone(),
                source,
            })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Generates authentication headers for facilitator requests.
///
/// Called once per facilitator call, so implementations may hand out
/// short-lived credentials.
pub trait AuthProvider: Send + Sync {
    /// Returns the headers for each facilitator operation.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the headers cannot be produced.
    fn auth_headers(&self) -> Result<AuthHeaders, AuthError>;
}

/// [`AuthProvider`] that sends the same fixed headers to both operations.
#[derive(Debug, Clone)]
pub struct StaticAuthProvider {
    headers: HeaderMap,
}

impl StaticAuthProvider {
    /// Creates a provider from a fixed set of headers.
    #[must_use]
    pub const fn new(headers: HeaderMap) -> Self {
        Self { headers }
    }

    /// Creates a provider sending `Authorization: Bearer <token>`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidHeaderValue`] if the token contains
    /// characters not allowed in a header value.
    pub fn bearer(token: &str) -> Result<Self, AuthError> {
        let value = HeaderValue::try_from(format!("Bearer {token}")).map_err(|source| {
            AuthError::InvalidHeaderValue {
                name: AUTHORIZATION.to_string(),
                source,
            }
        })?;
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(Self { headers })
    }
}

impl AuthProvider for StaticAuthProvider {
    fn auth_headers(&self) -> Result<AuthHeaders, AuthError> {
        Ok(AuthHeaders {
            verify: self.headers.clone(),
            settle: self.headers.clone(),
        })
    }
}

/// [`AuthProvider`] backed by a closure.
pub struct CallbackAuthProvider<F> {
    create_headers: F,
}

impl<F> fmt::Debug for CallbackAuthProvider<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackAuthProvider").finish_non_exhaustive()
    }
}

impl<F> CallbackAuthProvider<F>
where
    F: Fn() -> Result<AuthHeaders, AuthError> + Send + Sync,
{
    /// Creates a provider that calls `create_headers` before every request.
    pub const fn new(create_headers: F) -> Self {
        Self { create_headers }
    }
}

impl<F> AuthProvider for CallbackAuthProvider<F>
where
    F: Fn() -> Result<AuthHeaders, AuthError> + Send + Sync,
{
    fn auth_headers(&self) -> Result<AuthHeaders, AuthError> {
        (self.create_headers)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_map_splits_operations() {
        let map = HashMap::from([
            (
                "verify".to_owned(),
                HashMap::from([("x-api-key".to_owned(), "v-key".to_owned())]),
            ),
            (
                "settle".to_owned(),
                HashMap::from([("x-api-key".to_owned(), "s-key".to_owned())]),
            ),
            (
                "supported".to_owned(),
                HashMap::from([("x-api-key".to_owned(), "ignored".to_owned())]),
            ),
        ]);
        let headers = AuthHeaders::try_from_map(&map).unwrap();
        assert_eq!(headers.verify["x-api-key"], "v-key");
        assert_eq!(headers.settle["x-api-key"], "s-key");
    }

    #[test]
    fn test_try_from_map_missing_operation_is_empty() {
        let map = HashMap::from([(
            "settle".to_owned(),
            HashMap::from([("authorization".to_owned(), "Bearer t".to_owned())]),
        )]);
        let headers = AuthHeaders::try_from_map(&map).unwrap();
        assert!(headers.verify.is_empty());
        assert_eq!(headers.settle.len(), 1);
    }

    #[test]
    fn test_try_from_map_rejects_bad_header_name() {
        let map = HashMap::from([(
            "verify".to_owned(),
            HashMap::from([("bad header".to_owned(), "v".to_owned())]),
        )]);
        assert!(matches!(
            AuthHeaders::try_from_map(&map),
            Err(AuthError::InvalidHeaderName { .. })
        ));
    }

    #[test]
    fn test_bearer_provider() {
        let provider = StaticAuthProvider::bearer("secret").unwrap();
        let headers = provider.auth_headers().unwrap();
        assert_eq!(headers.verify[AUTHORIZATION], "Bearer secret");
        assert_eq!(headers.settle[AUTHORIZATION], "Bearer secret");
        assert!(StaticAuthProvider::bearer("line\nbreak").is_err());
    }

    #[test]
    fn test_callback_provider_runs_every_time() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = AtomicUsize::new(0);
        let provider = CallbackAuthProvider::new(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(AuthHeaders::default())
        });
        provider.auth_headers().unwrap();
        provider.auth_headers().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
