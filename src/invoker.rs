//! Contract invocation layer
//!
//! Every read and write goes through here. The invoker enforces the chain
//! affinity precondition before any network traffic: the backend's captured
//! network identity must equal the session's active chain or the call is
//! rejected locally. Writes are submitted and then polled for a receipt with
//! bounded exponential backoff; the poll budget exhausting is a timeout, never
//! a resubmission.

use std::sync::Arc;

use alloy::primitives::{
    utils::{parse_units, ParseUnits},
    Address, B256, U256,
};
use tracing::{debug, info, warn};

use crate::error::BridgeError;
use crate::provider::{BridgeCall, BridgeQuery, ChainBackend};
use crate::registry::ChainRegistry;
use crate::retry::ReceiptWaitConfig;

/// Confirmed write outcome
#[derive(Debug, Clone)]
pub struct TxResult {
    pub tx_hash: B256,
    pub chain_id: String,
    pub block_number: Option<u64>,
    /// Block-explorer link for the transaction, when the chain has one.
    pub explorer_url: String,
}

impl TxResult {
    /// 0x-prefixed transaction hash for display.
    pub fn hash_hex(&self) -> String {
        format!("0x{:x}", self.tx_hash)
    }
}

/// Convert a decimal ETH amount string to wei at the fixed 18-decimal scale.
pub fn eth_to_wei(eth: &str) -> Result<U256, BridgeError> {
    match parse_units(eth, 18u8) {
        Ok(ParseUnits::U256(value)) => Ok(value),
        Ok(ParseUnits::I256(_)) => Err(BridgeError::InvalidArgument(format!(
            "Amount must be non-negative: {}",
            eth
        ))),
        Err(e) => Err(BridgeError::InvalidArgument(format!(
            "Invalid ETH amount '{}': {}",
            eth, e
        ))),
    }
}

/// Chain-affinity-checked reader/writer over a `ChainBackend`
pub struct ContractInvoker {
    registry: Arc<ChainRegistry>,
    receipt_wait: ReceiptWaitConfig,
}

impl ContractInvoker {
    pub fn new(registry: Arc<ChainRegistry>, receipt_wait: ReceiptWaitConfig) -> Self {
        Self {
            registry,
            receipt_wait,
        }
    }

    /// The affinity precondition: the backend's captured identity must match
    /// the session's active chain. Purely local, no network call.
    fn check_affinity(
        &self,
        active_chain_id: &str,
        backend: &dyn ChainBackend,
    ) -> Result<(), BridgeError> {
        if backend.reported_chain() != active_chain_id {
            return Err(BridgeError::ChainMismatch {
                expected: active_chain_id.to_string(),
                actual: backend.reported_chain().to_string(),
            });
        }
        Ok(())
    }

    /// Resolve the bridge contract address for the active chain.
    fn contract_for(&self, chain_id: &str) -> Result<Address, BridgeError> {
        Ok(self.registry.descriptor_for(chain_id)?.contract_address)
    }

    /// Submit a write call and wait for its receipt within the poll budget.
    pub async fn write(
        &self,
        active_chain_id: &str,
        backend: &Arc<dyn ChainBackend>,
        call: BridgeCall,
    ) -> Result<TxResult, BridgeError> {
        self.check_affinity(active_chain_id, backend.as_ref())?;
        let contract = self.contract_for(active_chain_id)?;

        let function = call.function_name();
        let tx_hash = backend.submit(contract, call).await?;

        info!(
            chain_id = %active_chain_id,
            function = function,
            tx_hash = %format!("0x{:x}", tx_hash),
            "Transaction submitted, waiting for receipt"
        );

        let receipt = self.wait_for_receipt(backend, tx_hash).await?;

        if !receipt.success {
            warn!(
                chain_id = %active_chain_id,
                tx_hash = %format!("0x{:x}", tx_hash),
                "Transaction reverted on-chain"
            );
            return Err(BridgeError::ContractRevert(format!(
                "{} transaction 0x{:x} reverted on chain {}",
                function, tx_hash, active_chain_id
            )));
        }

        let explorer_url = self
            .registry
            .explorer_tx_url(active_chain_id, &format!("0x{:x}", tx_hash))?;
        Ok(TxResult {
            tx_hash,
            chain_id: active_chain_id.to_string(),
            block_number: receipt.block_number,
            explorer_url,
        })
    }

    /// Execute a read-only query with the same affinity precondition.
    pub async fn read(
        &self,
        active_chain_id: &str,
        backend: &Arc<dyn ChainBackend>,
        query: BridgeQuery,
    ) -> Result<U256, BridgeError> {
        self.check_affinity(active_chain_id, backend.as_ref())?;
        let contract = self.contract_for(active_chain_id)?;
        backend.query(contract, query).await
    }

    /// Poll for a receipt within the attempt budget.
    ///
    /// Once the transaction is submitted its outcome is unknown until a
    /// receipt is observed, so nothing in here may steer the caller toward
    /// resubmitting: transient poll failures consume an attempt and the wait
    /// continues, and an exhausted budget surfaces `ReceiptTimeout` with the
    /// hash to re-poll. Only a permanent poll error aborts early.
    async fn wait_for_receipt(
        &self,
        backend: &Arc<dyn ChainBackend>,
        tx_hash: B256,
    ) -> Result<crate::provider::TxReceipt, BridgeError> {
        let mut guard = PendingTxGuard { tx_hash: Some(tx_hash) };

        let mut attempt = 0;
        while self.receipt_wait.should_poll(attempt) {
            match backend.receipt_status(tx_hash).await {
                Ok(Some(receipt)) => {
                    debug!(
                        tx_hash = %format!("0x{:x}", tx_hash),
                        block = ?receipt.block_number,
                        attempts = attempt + 1,
                        "Receipt found"
                    );
                    guard.disarm();
                    return Ok(receipt);
                }
                Ok(None) => {
                    debug!(
                        tx_hash = %format!("0x{:x}", tx_hash),
                        attempt = attempt + 1,
                        "Receipt not yet available"
                    );
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        tx_hash = %format!("0x{:x}", tx_hash),
                        attempt = attempt + 1,
                        error = %e,
                        "Receipt poll failed; transaction outcome still unknown, continuing to poll"
                    );
                }
                Err(e) => {
                    guard.disarm();
                    return Err(e);
                }
            }

            let backoff = self.receipt_wait.backoff_for_attempt(attempt);
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }

        guard.disarm();
        Err(BridgeError::ReceiptTimeout { tx_hash })
    }
}

/// Logs the pending transaction hash if a receipt wait is dropped before it
/// resolves (caller cancelled the future), so the hash survives for manual
/// re-polling instead of vanishing with the dropped future.
struct PendingTxGuard {
    tx_hash: Option<B256>,
}

impl PendingTxGuard {
    fn disarm(&mut self) {
        self.tx_hash = None;
    }
}

impl Drop for PendingTxGuard {
    fn drop(&mut self) {
        if let Some(tx_hash) = self.tx_hash {
            warn!(
                tx_hash = %format!("0x{:x}", tx_hash),
                "Receipt wait abandoned; poll this hash before resubmitting"
            );
        }
    }
}
