//! HTTP-specific constants for the x402 protocol.

/// Request header carrying the base64 payment payload (client → server).
pub const X_PAYMENT_HEADER: &str = "X-PAYMENT";

/// Response header carrying the base64 settlement receipt (server → client).
pub const X_PAYMENT_RESPONSE_HEADER: &str = "X-PAYMENT-RESPONSE";

/// Public facilitator used when none is configured.
pub const DEFAULT_FACILITATOR_URL: &str = "https://x402.org/facilitator";

/// `User-Agent` substring that marks a browser.
pub const BROWSER_USER_AGENT_MARKER: &str = "Mozilla";
