//! Chain registry - static table of supported chains and bridge bindings
//!
//! Loaded once at startup and read-only afterwards. Every other component
//! resolves contract addresses and display metadata through this table;
//! nothing else holds a second copy of it.

use std::collections::BTreeMap;

use alloy::primitives::Address;
use eyre::{Result, WrapErr};
use std::str::FromStr;

use crate::error::BridgeError;

/// The SuperETH bridge contract is deployed at the same address on every
/// supported chain.
const BRIDGE_CONTRACT_ADDRESS: &str = "0xEBE8Ca83dfFeaa2288a70B4f1e29EcD089d325E2";

/// Metadata for a single supported chain
#[derive(Debug, Clone)]
pub struct ChainDescriptor {
    /// Registry key. Decimal EVM chain id, kept as a string because it is an
    /// identifier, not a number we do arithmetic on.
    pub chain_id: String,
    /// Human-readable name (e.g., "Base Sepolia")
    pub name: String,
    /// SuperETH bridge contract address on this chain
    pub contract_address: Address,
    /// Block explorer base URL, no trailing slash
    pub explorer_url: String,
    /// RPC endpoint, overridable via `RPC_URL_<CHAIN_ID>`
    pub rpc_url: String,
}

/// Static table of supported chains, keyed by chain id
#[derive(Debug)]
pub struct ChainRegistry {
    chains: BTreeMap<String, ChainDescriptor>,
}

/// (chain_id, name, explorer_url, default_rpc_url)
const BUILTIN_CHAINS: &[(&str, &str, &str, &str)] = &[
    (
        "84532",
        "Base Sepolia",
        "https://sepolia.basescan.org",
        "https://sepolia.base.org",
    ),
    (
        "11155111",
        "Ethereum Sepolia",
        "https://sepolia.etherscan.io",
        "https://ethereum-sepolia-rpc.publicnode.com",
    ),
    (
        "421614",
        "Arbitrum Sepolia",
        "https://sepolia.arbiscan.io",
        "https://sepolia-rollup.arbitrum.io/rpc",
    ),
    (
        "11155420",
        "Optimism Sepolia",
        "https://sepolia-optimism.etherscan.io",
        "https://sepolia.optimism.io",
    ),
    (
        "8453",
        "Base Mainnet",
        "https://basescan.org",
        "https://mainnet.base.org",
    ),
    (
        "1",
        "Ethereum Mainnet",
        "https://etherscan.io",
        "https://ethereum-rpc.publicnode.com",
    ),
    (
        "42161",
        "Arbitrum One",
        "https://arbiscan.io",
        "https://arb1.arbitrum.io/rpc",
    ),
    (
        "10",
        "Optimism",
        "https://optimistic.etherscan.io",
        "https://mainnet.optimism.io",
    ),
    (
        "80001",
        "Polygon Mumbai",
        "https://mumbai.polygonscan.com",
        "https://rpc-mumbai.maticvigil.com",
    ),
    (
        "137",
        "Polygon",
        "https://polygonscan.com",
        "https://polygon-rpc.com",
    ),
];

impl ChainRegistry {
    /// Build the registry from the builtin table, applying any
    /// `RPC_URL_<CHAIN_ID>` environment overrides.
    pub fn load() -> Result<Self> {
        let contract_address = Address::from_str(BRIDGE_CONTRACT_ADDRESS)
            .wrap_err("Invalid builtin bridge contract address")?;

        let mut chains = BTreeMap::new();
        for (chain_id, name, explorer_url, default_rpc) in BUILTIN_CHAINS {
            let rpc_url = std::env::var(format!("RPC_URL_{}", chain_id))
                .unwrap_or_else(|_| default_rpc.to_string());

            chains.insert(
                chain_id.to_string(),
                ChainDescriptor {
                    chain_id: chain_id.to_string(),
                    name: name.to_string(),
                    contract_address,
                    explorer_url: explorer_url.to_string(),
                    rpc_url,
                },
            );
        }

        Ok(Self { chains })
    }

    /// Build a registry from explicit descriptors. Used by tests and by
    /// deployments that do not want the builtin table.
    pub fn from_descriptors(descriptors: Vec<ChainDescriptor>) -> Self {
        let chains = descriptors
            .into_iter()
            .map(|d| (d.chain_id.clone(), d))
            .collect();
        Self { chains }
    }

    /// Resolve the descriptor for a chain id.
    pub fn descriptor_for(&self, chain_id: &str) -> Result<&ChainDescriptor, BridgeError> {
        self.chains
            .get(chain_id)
            .ok_or_else(|| BridgeError::UnsupportedChain {
                chain_id: chain_id.to_string(),
                supported: self.supported_ids().join(", "),
            })
    }

    /// Whether a chain id is in the registry.
    pub fn is_supported(&self, chain_id: &str) -> bool {
        self.chains.contains_key(chain_id)
    }

    /// All supported chain ids. BTreeMap keeps the listing deterministic so
    /// user-facing error messages are stable.
    pub fn supported_ids(&self) -> Vec<String> {
        self.chains.keys().cloned().collect()
    }

    /// Iterate all descriptors in key order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains.values()
    }

    /// Number of registered chains.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// True when no chains are registered.
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// User-facing explorer link for a transaction, `{explorer}/tx/{hash}`.
    pub fn explorer_tx_url(&self, chain_id: &str, tx_hash: &str) -> Result<String, BridgeError> {
        let descriptor = self.descriptor_for(chain_id)?;
        Ok(format!("{}/tx/{}", descriptor.explorer_url, tx_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_has_ten_chains() {
        let registry = ChainRegistry::load().unwrap();
        assert_eq!(registry.len(), 10);
        assert!(registry.is_supported("84532"));
        assert!(registry.is_supported("11155111"));
        assert!(registry.is_supported("137"));
        assert!(!registry.is_supported("99999"));
    }

    #[test]
    fn test_descriptor_for_known_chain() {
        let registry = ChainRegistry::load().unwrap();
        let descriptor = registry.descriptor_for("84532").unwrap();
        assert_eq!(descriptor.name, "Base Sepolia");
        assert_eq!(descriptor.explorer_url, "https://sepolia.basescan.org");
        assert_eq!(
            format!("{:?}", descriptor.contract_address).to_lowercase(),
            BRIDGE_CONTRACT_ADDRESS.to_lowercase()
        );
    }

    #[test]
    fn test_unknown_chain_error_lists_supported_ids() {
        let registry = ChainRegistry::load().unwrap();
        let err = registry.descriptor_for("99999").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("not supported"));
        assert!(msg.contains("84532"));
        assert!(msg.contains("11155111"));
    }

    #[test]
    fn test_supported_ids_are_sorted_and_stable() {
        let registry = ChainRegistry::load().unwrap();
        let ids = registry.supported_ids();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(ids, registry.supported_ids());
    }

    #[test]
    fn test_explorer_tx_url_format() {
        let registry = ChainRegistry::load().unwrap();
        let url = registry.explorer_tx_url("84532", "0xabc123").unwrap();
        assert_eq!(url, "https://sepolia.basescan.org/tx/0xabc123");
    }
}
