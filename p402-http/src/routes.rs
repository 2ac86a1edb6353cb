//! Route tables mapping request patterns to payment gates.
//!
//! Lets one layer wrap a whole router with different prices per route:
//!
//! ```rust,no_run
//! use p402::Money;
//! use p402_http::{PaymentMiddlewareConfig, PaymentRoutes, X402Middleware};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! const PAY_TO: &str = "0x209693Bc6afc0C5328bA36FaF03C514EF312287C";
//! let cheap = X402Middleware::try_new(Money::try_from(0.001)?, PAY_TO, PaymentMiddlewareConfig::default())?;
//! let premium = X402Middleware::try_new(Money::try_from(0.1)?, PAY_TO, PaymentMiddlewareConfig::default())?;
//! let routes = PaymentRoutes::new()
//!     .route("GET /weather/*", cheap)?
//!     .route("/weather/[city]/forecast", premium)?;
//! # Ok(())
//! # }
//! ```
//!
//! Each request goes to the most specific matching pattern (the longest one);
//! requests matching no pattern are passed through unpaid.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum_core::extract::Request;
use axum_core::response::Response;
use http::Method;
use p402::facilitator::Facilitator;
use regex::{Regex, RegexBuilder};
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service, ServiceExt};

use crate::error::ConfigurationError;
use crate::layer::X402Middleware;
use crate::paygate::Paygate;

/// A request pattern such as `"GET /weather/*"` or `"/items/[id]"`.
///
/// - an optional leading HTTP method; without one, every method matches
/// - `*` matches any run of characters, including `/`
/// - `[name]` matches exactly one path segment
///
/// Paths are matched as a whole and case-insensitively.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    method: Option<Method>,
    path: Regex,
}

impl RoutePattern {
    /// Parses a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidRoutePattern`] if the pattern does
    /// not compile.
    pub fn parse(pattern: &str) -> Result<Self, ConfigurationError> {
        let trimmed = pattern.trim();
        let (method, path) = match trimmed.split_once(char::is_whitespace) {
            Some((verb, path)) if !verb.starts_with('/') => {
                let method = Method::from_bytes(verb.to_ascii_uppercase().as_bytes())
                    .map_err(|_| invalid_pattern(pattern, "invalid HTTP method"))?;
                (Some(method), path.trim())
            }
            _ => (None, trimmed),
        };
        let regex = RegexBuilder::new(&path_to_regex(path))
            .case_insensitive(true)
            .build()
            .map_err(|source| ConfigurationError::InvalidRoutePattern {
                pattern: pattern.to_owned(),
                source,
            })?;
        Ok(Self {
            source: path.to_owned(),
            method,
            path: regex,
        })
    }

    /// Returns `true` if a request with `method` and `path` matches.
    #[must_use]
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.method.as_ref().is_none_or(|m| m == method) && self.path.is_match(path)
    }

    /// Length of the path pattern, used to rank overlapping patterns.
    fn specificity(&self) -> usize {
        self.source.len()
    }
}

fn invalid_pattern(pattern: &str, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidRoutePattern {
        pattern: pattern.to_owned(),
        source: regex::Error::Syntax(reason.to_owned()),
    }
}

/// Translates a path pattern into an anchored regex.
fn path_to_regex(path: &str) -> String {
    let mut regex = String::from("^");
    let mut literal = String::new();
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                regex.push_str(&regex::escape(&literal));
                literal.clear();
                regex.push_str(".*?");
            }
            '[' if chars.clone().any(|c| c == ']') => {
                regex.push_str(&regex::escape(&literal));
                literal.clear();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                }
                regex.push_str("[^/]+");
            }
            _ => literal.push(c),
        }
    }
    regex.push_str(&regex::escape(&literal));
    regex.push('$');
    regex
}

/// A table of route patterns, each guarded by its own payment gate.
pub struct PaymentRoutes<F> {
    routes: Vec<(RoutePattern, Arc<Paygate<F>>)>,
}

impl<F> Default for PaymentRoutes<F> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<F> Clone for PaymentRoutes<F> {
    fn clone(&self) -> Self {
        Self {
            routes: self.routes.clone(),
        }
    }
}

impl<F> std::fmt::Debug for PaymentRoutes<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|(pattern, _)| &pattern.source))
            .finish()
    }
}

impl<F> PaymentRoutes<F> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Protects requests matching `pattern` with `middleware`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidRoutePattern`] if the pattern
    /// does not parse.
    pub fn route(
        mut self,
        pattern: &str,
        middleware: X402Middleware<F>,
    ) -> Result<Self, ConfigurationError> {
        let pattern = RoutePattern::parse(pattern)?;
        self.routes.push((pattern, middleware.gate()));
        // Stable sort keeps registration order among equally specific patterns
        self.routes
            .sort_by_key(|(pattern, _)| std::cmp::Reverse(pattern.specificity()));
        Ok(self)
    }

    /// Returns the gate for a request, if any pattern matches.
    fn find(&self, method: &Method, path: &str) -> Option<&Arc<Paygate<F>>> {
        self.routes
            .iter()
            .find(|(pattern, _)| pattern.matches(method, path))
            .map(|(_, gate)| gate)
    }
}

impl<S, F> Layer<S> for PaymentRoutes<F>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
{
    type Service = PaymentRoutesService<F>;

    fn layer(&self, inner: S) -> Self::Service {
        PaymentRoutesService {
            routes: Arc::new(self.clone()),
            inner: BoxCloneSyncService::new(inner),
        }
    }
}

/// Service produced by [`PaymentRoutes`].
#[allow(missing_debug_implementations)] // BoxCloneSyncService does not implement Debug
pub struct PaymentRoutesService<F> {
    routes: Arc<PaymentRoutes<F>>,
    inner: BoxCloneSyncService<Request, Response, Infallible>,
}

impl<F> Clone for PaymentRoutesService<F> {
    fn clone(&self) -> Self {
        Self {
            routes: Arc::clone(&self.routes),
            inner: self.inner.clone(),
        }
    }
}

impl<F> Service<Request> for PaymentRoutesService<F>
where
    F: Facilitator + Send + Sync + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let gate = self
            .routes
            .find(req.method(), req.uri().path())
            .map(Arc::clone);
        let inner = self.inner.clone();
        Box::pin(async move {
            match gate {
                Some(gate) => Ok(gate.handle_request(inner, req).await),
                None => inner.oneshot(req).await,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_and_verb() {
        let pattern = RoutePattern::parse("GET /weather/*").unwrap();
        assert!(pattern.matches(&Method::GET, "/weather/london"));
        assert!(pattern.matches(&Method::GET, "/weather/london/today"));
        assert!(pattern.matches(&Method::GET, "/WEATHER/Paris"));
        assert!(!pattern.matches(&Method::POST, "/weather/london"));
        assert!(!pattern.matches(&Method::GET, "/forecast/london"));
    }

    #[test]
    fn test_param_matches_single_segment() {
        let pattern = RoutePattern::parse("/items/[id]").unwrap();
        assert!(pattern.matches(&Method::DELETE, "/items/42"));
        assert!(!pattern.matches(&Method::GET, "/items/42/reviews"));
        assert!(!pattern.matches(&Method::GET, "/items/"));
    }

    #[test]
    fn test_literals_are_escaped() {
        let pattern = RoutePattern::parse("/v1.0/joke").unwrap();
        assert!(pattern.matches(&Method::GET, "/v1.0/joke"));
        assert!(!pattern.matches(&Method::GET, "/v1x0/joke"));
    }

    #[test]
    fn test_lowercase_verb_accepted() {
        let pattern = RoutePattern::parse("post /orders").unwrap();
        assert!(pattern.matches(&Method::POST, "/orders"));
    }

    #[test]
    fn test_regex_translation() {
        assert_eq!(path_to_regex("/a/*"), "^/a/.*?$");
        assert_eq!(path_to_regex("/a/[id]/b"), "^/a/[^/]+/b$");
    }
}
