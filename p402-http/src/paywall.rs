//! Browser detection and the HTML paywall page.
//!
//! Browsers that hit a protected route without a valid payment get an HTML
//! page instead of the JSON envelope. The classification is made once per
//! request so every rejection of that request has the same shape.

use http::HeaderMap;
use http::header::{ACCEPT, HeaderName, USER_AGENT};
use p402::{Money, PaymentRequirements};
use serde::Serialize;

use crate::constants::BROWSER_USER_AGENT_MARKER;

/// Who sent the request, as far as rejections are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    /// A web browser; rejected with the HTML paywall.
    Browser,
    /// Anything else; rejected with the JSON envelope.
    Api,
}

impl ClientKind {
    /// `Browser` iff `Accept` contains `text/html` and `User-Agent` contains `Mozilla`.
    #[must_use]
    pub fn detect(headers: &HeaderMap) -> Self {
        let contains = |name: HeaderName, needle: &str| {
            headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .any(|v| v.contains(needle))
        };
        if contains(ACCEPT, "text/html") && contains(USER_AGENT, BROWSER_USER_AGENT_MARKER) {
            Self::Browser
        } else {
            Self::Api
        }
    }
}

const DEFAULT_PAYWALL_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Payment Required</title>
<style>
body { font-family: system-ui, sans-serif; background: #f5f5f7; margin: 0; }
main { max-width: 28rem; margin: 10vh auto; background: #fff; border-radius: 12px; padding: 2rem; box-shadow: 0 2px 12px rgba(0, 0, 0, 0.08); }
h1 { font-size: 1.5rem; margin-top: 0; }
dl { display: grid; grid-template-columns: auto 1fr; gap: 0.5rem 1rem; }
dt { color: #6e6e73; }
dd { margin: 0; word-break: break-all; }
</style>
</head>
<body>
<main>
<h1>Payment Required</h1>
<p id="description">This resource requires payment before it can be accessed.</p>
<dl>
<dt>Amount</dt><dd id="amount"></dd>
<dt>Network</dt><dd id="network"></dd>
<dt>Pay to</dt><dd id="pay-to"></dd>
</dl>
<p>Connect an x402-capable wallet to pay and retry this request.</p>
</main>
<script>
(function () {
  var cfg = window.x402;
  if (!cfg) { return; }
  var req = cfg.paymentRequirements[0];
  document.getElementById("amount").textContent = "$" + cfg.amount + " USDC";
  document.getElementById("network").textContent = req.network;
  document.getElementById("pay-to").textContent = req.payTo;
  if (req.description) { document.getElementById("description").textContent = req.description; }
})();
</script>
</body>
</html>
"#;

/// Values handed to the paywall page's scripts as `window.x402`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaywallConfig<'a> {
    amount: &'a Money,
    payment_requirements: [&'a PaymentRequirements; 1],
    testnet: bool,
    current_url: &'a str,
}

/// Renders the 402 page for browsers.
#[derive(Debug, Clone, Default)]
pub struct Paywall {
    custom_html: Option<String>,
    testnet: bool,
}

impl Paywall {
    /// Creates a paywall. `custom_html`, if set, is served verbatim.
    #[must_use]
    pub const fn new(custom_html: Option<String>, testnet: bool) -> Self {
        Self {
            custom_html,
            testnet,
        }
    }

    /// Returns the page for a request to `current_url`.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the page config cannot be serialized.
    pub fn render(
        &self,
        amount: &Money,
        requirements: &PaymentRequirements,
        current_url: &str,
    ) -> Result<String, serde_json::Error> {
        if let Some(html) = &self.custom_html {
            return Ok(html.clone());
        }
        let config = PaywallConfig {
            amount,
            payment_requirements: [requirements],
            testnet: self.testnet,
            current_url,
        };
        let json = serde_json::to_string(&config)?.replace("</", "<\\/");
        let script = format!("<script>window.x402 = {json};</script>\n");
        Ok(DEFAULT_PAYWALL_HTML.replacen("</head>", &format!("{script}</head>"), 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use p402::{Network, Scheme};

    const FIREFOX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

    fn headers(accept: &str, user_agent: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(ACCEPT, HeaderValue::from_str(accept).unwrap());
        map.insert(USER_AGENT, HeaderValue::from_str(user_agent).unwrap());
        map
    }

    fn requirements(description: &str) -> PaymentRequirements {
        PaymentRequirements {
            scheme: Scheme::Exact,
            network: Network::BaseSepolia,
            max_amount_required: "10000".into(),
            resource: "http://localhost/joke".into(),
            description: description.into(),
            mime_type: String::new(),
            pay_to: "0x209693Bc6afc0C5328bA36FaF03C514EF312287C".into(),
            max_timeout_seconds: 60,
            asset: "0x036CbD53842c5426634e7929541eC2318f3dCF7e".into(),
            output_schema: None,
            extra: None,
        }
    }

    #[test]
    fn test_detect_browser() {
        assert_eq!(
            ClientKind::detect(&headers("text/html,application/xhtml+xml", FIREFOX)),
            ClientKind::Browser
        );
    }

    #[test]
    fn test_detect_requires_both_signals() {
        assert_eq!(
            ClientKind::detect(&headers("application/json", FIREFOX)),
            ClientKind::Api
        );
        assert_eq!(
            ClientKind::detect(&headers("text/html", "curl/8.5.0")),
            ClientKind::Api
        );
        assert_eq!(ClientKind::detect(&HeaderMap::new()), ClientKind::Api);
    }

    #[test]
    fn test_custom_html_is_verbatim() {
        let paywall = Paywall::new(Some("<p>pay up</p>".into()), true);
        let amount: Money = "0.01".parse().unwrap();
        let html = paywall
            .render(&amount, &requirements(""), "http://localhost/joke")
            .unwrap();
        assert_eq!(html, "<p>pay up</p>");
    }

    #[test]
    fn test_default_page_embeds_config() {
        let paywall = Paywall::new(None, true);
        let amount: Money = "0.01".parse().unwrap();
        let html = paywall
            .render(&amount, &requirements("</script><b>"), "http://localhost/joke")
            .unwrap();
        let head_end = html.find("</head>").unwrap();
        let script_at = html.find("window.x402 = ").unwrap();
        assert!(script_at < head_end);
        assert!(html.contains("\"testnet\":true"));
        assert!(html.contains("\"currentUrl\":\"http://localhost/joke\""));
        assert!(html.contains("<\\/script><b>"));
        assert!(!html[script_at..head_end].contains("</script><b>"));
    }
}
