//! # Protocol Configuration & Constants
//!
//! Every magic number in the custody stack lives here. If you're hardcoding
//! a chain id or a decimal count somewhere else, move it here.
//!
//! Runtime configuration (ports, log format, which network to pretend to be)
//! is the node's business and comes from CLI flags and the environment. This
//! module only defines the values those flags default to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full protocol version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Denominations
// ---------------------------------------------------------------------------

/// Decimal places of the native currency. Wei-style: 1 unit = 10^18.
pub const NATIVE_DECIMALS: u8 = 18;

/// Smallest units per whole native unit.
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Decimal places used by the reference fungible tokens.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

/// Name and symbol of the wrapped native token deployed on the devnet.
pub const WRAPPED_NATIVE_NAME: &str = "Wrapped Ether";
pub const WRAPPED_NATIVE_SYMBOL: &str = "WETH";

// ---------------------------------------------------------------------------
// Chain Identifiers
// ---------------------------------------------------------------------------

/// Local development chain (the usual `127.0.0.1:8545` node).
pub const CHAIN_ID_LOCALHOST: u64 = 31_337;

/// Sepolia public testnet.
pub const CHAIN_ID_SEPOLIA: u64 = 11_155_111;

/// In-process devnet. Never leaves the machine.
pub const CHAIN_ID_DEVNET: u64 = 1_337;

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default JSON-RPC / REST port of the custody node.
pub const DEFAULT_RPC_PORT: u16 = 9841;

/// Default Prometheus metrics port.
pub const DEFAULT_METRICS_PORT: u16 = 9842;

/// Native currency credited to every account seeded by the devnet faucet,
/// in whole units.
pub const DEVNET_FAUCET_ETHER: u128 = 10_000;

// ---------------------------------------------------------------------------
// Network Profiles
// ---------------------------------------------------------------------------

/// The network a node claims to represent.
///
/// The profile only selects identifiers (chain id, display name). It never
/// causes a connection to be made: the custody node always hosts the vault
/// on its in-process devnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkProfile {
    /// Local development node.
    Localhost,
    /// Sepolia testnet.
    Sepolia,
    /// In-process devnet.
    Devnet,
}

impl NetworkProfile {
    /// Returns the EIP-155 chain id for this profile.
    pub fn chain_id(&self) -> u64 {
        match self {
            NetworkProfile::Localhost => CHAIN_ID_LOCALHOST,
            NetworkProfile::Sepolia => CHAIN_ID_SEPOLIA,
            NetworkProfile::Devnet => CHAIN_ID_DEVNET,
        }
    }

    /// Returns the lowercase display name.
    pub fn name(&self) -> &'static str {
        match self {
            NetworkProfile::Localhost => "localhost",
            NetworkProfile::Sepolia => "sepolia",
            NetworkProfile::Devnet => "devnet",
        }
    }

    /// Looks a profile up by chain id.
    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            CHAIN_ID_LOCALHOST => Some(NetworkProfile::Localhost),
            CHAIN_ID_SEPOLIA => Some(NetworkProfile::Sepolia),
            CHAIN_ID_DEVNET => Some(NetworkProfile::Devnet),
            _ => None,
        }
    }
}

impl fmt::Display for NetworkProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NetworkProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "localhost" | "local" => Ok(NetworkProfile::Localhost),
            "sepolia" => Ok(NetworkProfile::Sepolia),
            "devnet" => Ok(NetworkProfile::Devnet),
            other => Err(format!("unknown network profile: {}", other)),
        }
    }
}

/// Returns a friendly name for a chain id, mainly for logging.
pub fn network_name(chain_id: u64) -> String {
    match NetworkProfile::from_chain_id(chain_id) {
        Some(profile) => profile.name().to_string(),
        None => format!("unknown({})", chain_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_ids_are_distinct() {
        assert_ne!(CHAIN_ID_LOCALHOST, CHAIN_ID_SEPOLIA);
        assert_ne!(CHAIN_ID_LOCALHOST, CHAIN_ID_DEVNET);
        assert_ne!(CHAIN_ID_SEPOLIA, CHAIN_ID_DEVNET);
    }

    #[test]
    fn test_wei_per_ether_matches_decimals() {
        assert_eq!(WEI_PER_ETHER, 10u128.pow(NATIVE_DECIMALS as u32));
    }

    #[test]
    fn test_profile_chain_id_roundtrip() {
        for profile in [
            NetworkProfile::Localhost,
            NetworkProfile::Sepolia,
            NetworkProfile::Devnet,
        ] {
            assert_eq!(NetworkProfile::from_chain_id(profile.chain_id()), Some(profile));
        }
    }

    #[test]
    fn test_profile_parsing() {
        assert_eq!("Sepolia".parse::<NetworkProfile>(), Ok(NetworkProfile::Sepolia));
        assert_eq!("local".parse::<NetworkProfile>(), Ok(NetworkProfile::Localhost));
        assert!("mainnet".parse::<NetworkProfile>().is_err());
    }

    #[test]
    fn test_network_name_formatting() {
        assert_eq!(network_name(CHAIN_ID_SEPOLIA), "sepolia");
        assert_eq!(network_name(42), "unknown(42)");
    }
}
