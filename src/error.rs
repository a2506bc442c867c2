//! Structured error taxonomy for bridge operations
//!
//! Low-level RPC and I/O failures are converted into these variants at the
//! cache/invoker boundary; callers above that line only ever see `BridgeError`.

use alloy::primitives::{Address, B256, U256};
use thiserror::Error;

use crate::orchestrator::BridgePhase;

/// Errors produced by the bridge core
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Target chain is not in the registry. Recoverable: retry with a valid id.
    #[error("Chain ID {chain_id} not supported. Must be one of: {supported}")]
    UnsupportedChain { chain_id: String, supported: String },

    /// Provider/session chain disagreement. Indicates a caching or switch bug;
    /// recoverable with invalidate + retry.
    #[error("Chain mismatch: provider on chain {actual}, but session chain is {expected}")]
    ChainMismatch { expected: String, actual: String },

    /// RPC/network failure during a probe, read, or submit. Retryable with backoff.
    #[error("Connectivity failure: {0}")]
    Connectivity(String),

    /// Transaction submitted but no receipt was observed within the wait
    /// budget. Callers must poll the hash, never resubmit.
    #[error("Receipt not observed within wait budget for transaction 0x{tx_hash:x}; poll before resubmitting")]
    ReceiptTimeout { tx_hash: B256 },

    /// The chain rejected the call (permission or balance related). Not
    /// retryable without changing inputs.
    #[error("Contract reverted: {0}")]
    ContractRevert(String),

    /// Burn succeeded on the source chain but the destination mint did not.
    /// Carries everything a caller needs for manual remediation.
    #[error(
        "Partial bridge failure ({source_chain} -> {dest_chain}, phase {phase}): \
         {amount} tokens burned from {address} in transaction 0x{burn_tx_hash:x} \
         but not minted on {dest_chain}: {cause}"
    )]
    PartialBridge {
        source_chain: String,
        dest_chain: String,
        address: Address,
        amount: U256,
        burn_tx_hash: B256,
        phase: BridgePhase,
        cause: String,
    },

    /// Wallet snapshot could not be read, parsed, or persisted.
    #[error("Wallet snapshot error: {0}")]
    Wallet(String),

    /// Command-boundary validation failure (bad address, amount, arity).
    #[error("{0}")]
    InvalidArgument(String),
}

impl BridgeError {
    /// True for errors worth retrying with backoff without changing inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BridgeError::Connectivity(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_chain_message_lists_ids() {
        let err = BridgeError::UnsupportedChain {
            chain_id: "99999".to_string(),
            supported: "1, 84532".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("not supported"));
        assert!(msg.contains("84532"));
    }

    #[test]
    fn test_chain_mismatch_message() {
        let err = BridgeError::ChainMismatch {
            expected: "84532".to_string(),
            actual: "11155111".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Chain mismatch"));
        assert!(msg.contains("11155111"));
    }

    #[test]
    fn test_only_connectivity_is_retryable() {
        assert!(BridgeError::Connectivity("rpc down".into()).is_retryable());
        assert!(!BridgeError::ContractRevert("execution reverted".into()).is_retryable());
        assert!(!BridgeError::ReceiptTimeout { tx_hash: B256::ZERO }.is_retryable());
    }
}
