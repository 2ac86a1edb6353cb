//! A single paid endpoint served behind the x402 middleware.
//!
//! # Usage
//!
//! ```bash
//! PAY_TO=0xYourAddress cargo run -p p402-http --example paid_joke
//! ```
//!
//! # Environment Variables
//!
//! - `PAY_TO` - Recipient of the payments (required)
//! - `FACILITATOR_URL` - Facilitator base URL (default: `https://x402.org/facilitator`)
//! - `PORT` - Listening port (default: `4021`)
//! - `RUST_LOG` - Log level filter (default: `info`)

use std::net::SocketAddr;

use axum::Router;
use axum::routing::get;
use p402::Money;
use p402_http::{FacilitatorConfig, PaymentMiddlewareConfig, X402Middleware};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("Server failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pay_to = std::env::var("PAY_TO").map_err(|_| "PAY_TO must be set")?;
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(4021u16);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let mut facilitator = FacilitatorConfig::default();
    if let Ok(url) = std::env::var("FACILITATOR_URL") {
        facilitator = FacilitatorConfig::new(url);
    }

    let config = PaymentMiddlewareConfig::default()
        .with_facilitator(facilitator)
        .with_description("A programming joke")
        .with_mime_type("text/plain")
        .with_resource_root_url(format!("http://localhost:{port}"));
    let x402 = X402Middleware::try_new(Money::try_from(0.0001)?, &pay_to, config)?;
    tracing::info!(
        network = %x402.requirements().network(),
        amount = %x402.requirements().amount(),
        "Payment middleware ready"
    );

    let app = Router::new()
        .route("/joke", get(joke).layer(x402))
        .route("/health", get(|| async { "ok" }));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn joke() -> &'static str {
    "There are 10 kinds of people: those who understand binary and those who don't."
}
