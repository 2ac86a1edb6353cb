//! Supported networks and their USDC deployments.
//!
//! The resource server only prices in USDC on Base. The `testnet` flag picks
//! one of two fixed deployments.

use std::fmt;

use alloy_primitives::{Address, address};
use serde::{Deserialize, Serialize};

/// USDC contract address on Base Mainnet.
pub const USDC_BASE: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");

/// USDC contract address on Base Sepolia.
pub const USDC_BASE_SEPOLIA: Address = address!("036CbD53842c5426634e7929541eC2318f3dCF7e");

/// Token decimals for USDC.
pub const USDC_DECIMALS: u8 = 6;

/// EIP-712 domain version for USDC on both networks.
pub const USDC_EIP712_VERSION: &str = "2";

/// Networks a resource server can ask to be paid on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    /// Base Mainnet.
    Base,
    /// Base Sepolia testnet.
    BaseSepolia,
}

impl Network {
    /// Selects the network for the given `testnet` flag.
    #[must_use]
    pub const fn for_testnet(testnet: bool) -> Self {
        if testnet { Self::BaseSepolia } else { Self::Base }
    }

    /// Returns `true` for test networks.
    #[must_use]
    pub const fn is_testnet(&self) -> bool {
        matches!(self, Self::BaseSepolia)
    }

    /// Returns the wire name of the network.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::BaseSepolia => "base-sepolia",
        }
    }

    /// Returns the USDC deployment on this network.
    #[must_use]
    pub const fn usdc(&self) -> UsdcDeployment {
        match self {
            Self::Base => UsdcDeployment {
                network: Self::Base,
                address: USDC_BASE,
                decimals: USDC_DECIMALS,
                eip712: Eip712Domain {
                    name: "USD Coin",
                    version: USDC_EIP712_VERSION,
                },
            },
            Self::BaseSepolia => UsdcDeployment {
                network: Self::BaseSepolia,
                address: USDC_BASE_SEPOLIA,
                decimals: USDC_DECIMALS,
                eip712: Eip712Domain {
                    name: "USDC",
                    version: USDC_EIP712_VERSION,
                },
            },
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// EIP-712 domain metadata of a token.
///
/// Sent to the payer in `extra`; it must match what the payer's signer used
/// or the facilitator will reject the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Eip712Domain {
    /// Domain name.
    pub name: &'static str,
    /// Domain version.
    pub version: &'static str,
}

/// A USDC token deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsdcDeployment {
    /// Network the token is deployed on.
    pub network: Network,
    /// Token contract address.
    pub address: Address,
    /// Token decimals.
    pub decimals: u8,
    /// EIP-712 domain of the token contract.
    pub eip712: Eip712Domain,
}

impl UsdcDeployment {
    /// Returns the EIP-55 checksummed contract address.
    #[must_use]
    pub fn checksum_address(&self) -> String {
        self.address.to_checksum(None)
    }
}

/// Builds the `extra` object for payment requirements on the selected network.
///
/// Returns `{"name": "USDC", "version": "2"}` for testnet and
/// `{"name": "USD Coin", "version": "2"}` for mainnet.
///
/// # Errors
///
/// Returns the JSON error if serialization fails.
pub fn derive_asset_extra(is_testnet: bool) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(Network::for_testnet(is_testnet).usdc().eip712)
}
