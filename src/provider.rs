//! Chain-bound provider seam
//!
//! `ChainBackend` is the boundary between the bridge core and a chain's RPC:
//! one backend per chain, created by the provider cache, able to read native
//! balances, submit bridge-contract calls, and report the network identity it
//! observed at construction time. The EVM implementation wraps alloy; tests
//! substitute the mock backend from `testing`.

use async_trait::async_trait;

use alloy::{
    network::EthereumWallet,
    primitives::{Address, B256, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    signers::local::PrivateKeySigner,
    transports::http::{Client, Http},
};
use tracing::{debug, info, warn};

use crate::contracts::SuperEth;
use crate::error::BridgeError;
use crate::retry::classify_rpc_error;

/// A write call against the bridge contract. Typed variants instead of a
/// function-name string so invalid calls cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCall {
    /// crosschainMint(to, amount) - aiAgent only
    CrosschainMint { to: Address, amount: U256 },
    /// crosschainBurn(from, amount) - aiAgent only
    CrosschainBurn { from: Address, amount: U256 },
    /// deposit() with a payable native value in wei
    Deposit { value: U256 },
    /// withdraw(amount)
    Withdraw { amount: U256 },
}

impl BridgeCall {
    /// Contract function name, for logging and status messages.
    pub fn function_name(&self) -> &'static str {
        match self {
            BridgeCall::CrosschainMint { .. } => "crosschainMint",
            BridgeCall::CrosschainBurn { .. } => "crosschainBurn",
            BridgeCall::Deposit { .. } => "deposit",
            BridgeCall::Withdraw { .. } => "withdraw",
        }
    }

    /// Native value attached to the transaction.
    pub fn native_value(&self) -> U256 {
        match self {
            BridgeCall::Deposit { value } => *value,
            _ => U256::ZERO,
        }
    }
}

/// A read-only query against the bridge contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeQuery {
    BalanceOf { account: Address },
    TotalSupply,
}

impl BridgeQuery {
    pub fn function_name(&self) -> &'static str {
        match self {
            BridgeQuery::BalanceOf { .. } => "balanceOf",
            BridgeQuery::TotalSupply => "totalSupply",
        }
    }
}

/// A connection bound to exactly one chain at creation time.
///
/// Owned exclusively by the provider cache; the session holds a shared
/// reference, never a second owner. `reported_chain` is the network identity
/// the backend observed when it was constructed, so chain-affinity checks cost
/// no network I/O.
#[async_trait]
pub trait ChainBackend: Send + Sync {
    /// The chain id this backend was requested for.
    fn chain_id(&self) -> &str;

    /// The network identity the backend actually observed at construction.
    fn reported_chain(&self) -> &str;

    /// The signing address this backend submits transactions from.
    fn signer_address(&self) -> Address;

    /// Native balance of an address, in wei. Doubles as the liveness probe
    /// during a network switch.
    async fn native_balance(&self, address: Address) -> Result<U256, BridgeError>;

    /// Submit a bridge-contract call, returning the transaction hash without
    /// waiting for inclusion.
    async fn submit(&self, contract: Address, call: BridgeCall) -> Result<B256, BridgeError>;

    /// Receipt status for a submitted transaction. `None` means not yet mined.
    async fn receipt_status(&self, tx_hash: B256) -> Result<Option<TxReceipt>, BridgeError>;

    /// Execute a read-only contract query.
    async fn query(&self, contract: Address, query: BridgeQuery) -> Result<U256, BridgeError>;
}

/// The chain-defined confirmation record, reduced to what the core consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub success: bool,
    pub block_number: Option<u64>,
}

/// alloy-backed EVM implementation of `ChainBackend`
pub struct EvmProvider {
    chain_id: String,
    reported_chain: String,
    rpc_url: url::Url,
    signer: PrivateKeySigner,
    /// Read path. Write calls build a wallet-filled provider per submission.
    http: RootProvider<Http<Client>>,
}

impl EvmProvider {
    /// Connect to a chain's RPC and capture its reported network identity.
    pub async fn connect(
        chain_id: &str,
        rpc_url: &str,
        signer: PrivateKeySigner,
    ) -> Result<Self, BridgeError> {
        let parsed: url::Url = rpc_url
            .parse()
            .map_err(|e| BridgeError::Connectivity(format!("Invalid RPC URL {}: {}", rpc_url, e)))?;

        let http = ProviderBuilder::new().on_http(parsed.clone());

        let reported = http
            .get_chain_id()
            .await
            .map_err(|e| BridgeError::Connectivity(format!("eth_chainId failed: {}", e)))?
            .to_string();

        if reported != chain_id {
            warn!(
                requested = %chain_id,
                reported = %reported,
                "Provider reports a different network identity than requested"
            );
        }

        info!(
            chain_id = %chain_id,
            signer = %signer.address(),
            "EVM provider connected"
        );

        Ok(Self {
            chain_id: chain_id.to_string(),
            reported_chain: reported,
            rpc_url: parsed,
            signer,
            http,
        })
    }
}

#[async_trait]
impl ChainBackend for EvmProvider {
    fn chain_id(&self) -> &str {
        &self.chain_id
    }

    fn reported_chain(&self) -> &str {
        &self.reported_chain
    }

    fn signer_address(&self) -> Address {
        self.signer.address()
    }

    async fn native_balance(&self, address: Address) -> Result<U256, BridgeError> {
        self.http
            .get_balance(address)
            .await
            .map_err(|e| BridgeError::Connectivity(format!("eth_getBalance failed: {}", e)))
    }

    async fn submit(&self, contract: Address, call: BridgeCall) -> Result<B256, BridgeError> {
        // Recommended fillers are required: without them the wallet filler
        // cannot populate nonce/gas and submission fails locally.
        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(self.rpc_url.clone());

        let bridge = SuperEth::new(contract, &provider);

        debug!(
            chain_id = %self.chain_id,
            function = call.function_name(),
            value = %call.native_value(),
            "Submitting bridge contract call"
        );

        let pending = match call {
            BridgeCall::CrosschainMint { to, amount } => {
                bridge.crosschainMint(to, amount).send().await
            }
            BridgeCall::CrosschainBurn { from, amount } => {
                bridge.crosschainBurn(from, amount).send().await
            }
            BridgeCall::Deposit { value } => bridge.deposit().value(value).send().await,
            BridgeCall::Withdraw { amount } => bridge.withdraw(amount).send().await,
        }
        .map_err(|e| classify_rpc_error(&e.to_string()))?;

        Ok(*pending.tx_hash())
    }

    async fn receipt_status(&self, tx_hash: B256) -> Result<Option<TxReceipt>, BridgeError> {
        let receipt = self
            .http
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| {
                BridgeError::Connectivity(format!("eth_getTransactionReceipt failed: {}", e))
            })?;

        Ok(receipt.map(|r| TxReceipt {
            success: r.status(),
            block_number: r.block_number,
        }))
    }

    async fn query(&self, contract: Address, query: BridgeQuery) -> Result<U256, BridgeError> {
        let bridge = SuperEth::new(contract, &self.http);

        debug!(
            chain_id = %self.chain_id,
            function = query.function_name(),
            "Reading bridge contract"
        );

        let value = match query {
            BridgeQuery::BalanceOf { account } => {
                bridge
                    .balanceOf(account)
                    .call()
                    .await
                    .map_err(|e| classify_rpc_error(&e.to_string()))?
                    ._0
            }
            BridgeQuery::TotalSupply => {
                bridge
                    .totalSupply()
                    .call()
                    .await
                    .map_err(|e| classify_rpc_error(&e.to_string()))?
                    ._0
            }
        };

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_call_function_names() {
        let mint = BridgeCall::CrosschainMint {
            to: Address::ZERO,
            amount: U256::from(1),
        };
        assert_eq!(mint.function_name(), "crosschainMint");
        assert_eq!(mint.native_value(), U256::ZERO);

        let deposit = BridgeCall::Deposit {
            value: U256::from(42),
        };
        assert_eq!(deposit.function_name(), "deposit");
        assert_eq!(deposit.native_value(), U256::from(42));
    }

    #[test]
    fn test_bridge_query_function_names() {
        assert_eq!(
            BridgeQuery::BalanceOf {
                account: Address::ZERO
            }
            .function_name(),
            "balanceOf"
        );
        assert_eq!(BridgeQuery::TotalSupply.function_name(), "totalSupply");
    }
}
