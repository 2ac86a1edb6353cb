//! Configuration for the payment middleware.

use serde::Deserialize;

use crate::facilitator_client::FacilitatorConfig;

/// Everything [`X402Middleware`](crate::X402Middleware) needs besides the
/// price and the recipient.
///
/// Deserializable so host applications can keep it in their own config files.
/// Missing fields take their defaults; the facilitator auth provider can only
/// be set in code.
///
/// ```rust
/// use p402_http::PaymentMiddlewareConfig;
///
/// let config = PaymentMiddlewareConfig::default()
///     .with_description("A fresh joke")
///     .with_mime_type("text/plain")
///     .with_testnet(false);
/// assert_eq!(config.max_timeout_seconds, 60);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaymentMiddlewareConfig {
    /// Human-readable description of the resource.
    pub description: String,
    /// MIME type of the resource.
    pub mime_type: String,
    /// How long a signed authorization stays usable. Advisory only.
    pub max_timeout_seconds: u64,
    /// JSON schema of the resource output.
    pub output_schema: Option<serde_json::Value>,
    /// Facilitator location and credentials.
    #[serde(rename = "facilitatorConfig")]
    pub facilitator: FacilitatorConfig,
    /// Charge on Base Sepolia instead of Base Mainnet.
    pub testnet: bool,
    /// HTML served to browsers instead of the built-in paywall page.
    #[serde(rename = "customPaywallHTML")]
    pub custom_paywall_html: Option<String>,
    /// Fixed resource URL. When unset, `resource_root_url` plus the request path is used.
    pub resource: Option<String>,
    /// Prefix for resource URLs derived from the request path.
    #[serde(rename = "resourceRootURL")]
    pub resource_root_url: String,
}

impl Default for PaymentMiddlewareConfig {
    fn default() -> Self {
        Self {
            description: String::new(),
            mime_type: String::new(),
            max_timeout_seconds: 60,
            output_schema: None,
            facilitator: FacilitatorConfig::default(),
            testnet: true,
            custom_paywall_html: None,
            resource: None,
            resource_root_url: String::new(),
        }
    }
}

impl PaymentMiddlewareConfig {
    /// Sets a description of what the payment grants access to.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the MIME type of the protected resource.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Sets the authorization validity advertised to payers.
    #[must_use]
    pub const fn with_max_timeout_seconds(mut self, seconds: u64) -> Self {
        self.max_timeout_seconds = seconds;
        self
    }

    /// Sets the JSON schema of the resource output.
    #[must_use]
    pub fn with_output_schema(mut self, schema: serde_json::Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Sets the facilitator.
    #[must_use]
    pub fn with_facilitator(mut self, facilitator: FacilitatorConfig) -> Self {
        self.facilitator = facilitator;
        self
    }

    /// Selects Base Sepolia (`true`) or Base Mainnet (`false`).
    #[must_use]
    pub const fn with_testnet(mut self, testnet: bool) -> Self {
        self.testnet = testnet;
        self
    }

    /// Replaces the built-in paywall page.
    #[must_use]
    pub fn with_custom_paywall_html(mut self, html: impl Into<String>) -> Self {
        self.custom_paywall_html = Some(html.into());
        self
    }

    /// Sets a fixed resource URL.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Sets the prefix for path-derived resource URLs.
    #[must_use]
    pub fn with_resource_root_url(mut self, root: impl Into<String>) -> Self {
        self.resource_root_url = root.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_FACILITATOR_URL;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = PaymentMiddlewareConfig::default();
        assert!(config.testnet);
        assert_eq!(config.max_timeout_seconds, 60);
        assert_eq!(config.facilitator.url, DEFAULT_FACILITATOR_URL);
        assert!(config.facilitator.auth.is_none());
        assert!(config.resource.is_none());
        assert!(config.resource_root_url.is_empty());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: PaymentMiddlewareConfig = serde_json::from_value(json!({
            "description": "Weather data",
            "testnet": false,
            "facilitatorConfig": {"url": "https://facilitator.example.com"},
            "resourceRootURL": "https://api.example.com",
            "customPaywallHTML": "<p>pay</p>",
        }))
        .unwrap();
        assert_eq!(config.description, "Weather data");
        assert!(!config.testnet);
        assert_eq!(config.facilitator.url, "https://facilitator.example.com");
        assert_eq!(config.resource_root_url, "https://api.example.com");
        assert_eq!(config.custom_paywall_html.as_deref(), Some("<p>pay</p>"));
        assert_eq!(config.max_timeout_seconds, 60);
    }
}
