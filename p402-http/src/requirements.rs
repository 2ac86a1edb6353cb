//! Per-request [`PaymentRequirements`] construction.
//!
//! Everything that does not depend on the request is resolved once when the
//! middleware is built. [`RequirementsTemplate::build`] only fills in the
//! resource URL, so two calls with the same path yield identical requirements.

use std::str::FromStr;

use alloy_primitives::Address;
use p402::networks::{Network, derive_asset_extra};
use p402::{Money, PaymentRequirements, Scheme};

use crate::config::PaymentMiddlewareConfig;
use crate::error::ConfigurationError;

/// The request-independent part of the payment requirements.
#[derive(Debug, Clone)]
pub struct RequirementsTemplate {
    amount: Money,
    max_amount_required: String,
    pay_to: String,
    network: Network,
    description: String,
    mime_type: String,
    max_timeout_seconds: u64,
    output_schema: Option<serde_json::Value>,
    resource: Option<String>,
    resource_root_url: String,
}

impl RequirementsTemplate {
    /// Resolves network, asset amount and recipient from the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidPayTo`] if `pay_to` is not an EVM
    /// address and [`ConfigurationError::InvalidAmount`] if the amount cannot
    /// be expressed in USDC units.
    pub fn new(
        amount: Money,
        pay_to: &str,
        config: &PaymentMiddlewareConfig,
    ) -> Result<Self, ConfigurationError> {
        let address = Address::from_str(pay_to).map_err(|e| ConfigurationError::InvalidPayTo {
            address: pay_to.to_owned(),
            reason: e.to_string(),
        })?;
        let network = Network::for_testnet(config.testnet);
        let max_amount_required = amount.to_atomic_units(network.usdc().decimals)?;
        Ok(Self {
            amount,
            max_amount_required,
            pay_to: address.to_checksum(None),
            network,
            description: config.description.clone(),
            mime_type: config.mime_type.clone(),
            max_timeout_seconds: config.max_timeout_seconds,
            output_schema: config.output_schema.clone(),
            resource: config.resource.clone(),
            resource_root_url: config.resource_root_url.clone(),
        })
    }

    /// Returns the configured price.
    #[must_use]
    pub const fn amount(&self) -> &Money {
        &self.amount
    }

    /// Returns the network payments are requested on.
    #[must_use]
    pub const fn network(&self) -> Network {
        self.network
    }

    /// Returns the resource URL for a request to `path`.
    ///
    /// The root URL and path are concatenated as-is.
    #[must_use]
    pub fn resource_for(&self, path: &str) -> String {
        self.resource
            .clone()
            .unwrap_or_else(|| format!("{}{path}", self.resource_root_url))
    }

    /// Builds the requirements for a request to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::AssetExtra`] if the asset metadata cannot
    /// be serialized.
    pub fn build(&self, path: &str) -> Result<PaymentRequirements, ConfigurationError> {
        let usdc = self.network.usdc();
        let extra =
            derive_asset_extra(self.network.is_testnet()).map_err(ConfigurationError::AssetExtra)?;
        Ok(PaymentRequirements {
            scheme: Scheme::Exact,
            network: self.network,
            max_amount_required: self.max_amount_required.clone(),
            resource: self.resource_for(path),
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
            pay_to: self.pay_to.clone(),
            max_timeout_seconds: self.max_timeout_seconds,
            asset: usdc.checksum_address(),
            output_schema: self.output_schema.clone(),
            extra: Some(extra),
        })
    }
}
