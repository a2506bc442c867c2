//! Receipt-wait and error classification policy
//!
//! A submitted transaction is polled with exponential backoff up to a hard
//! attempt cap; exhausting the budget surfaces `ReceiptTimeout` (poll, never
//! resubmit). Raw RPC error text is classified into the structured taxonomy
//! so the caller can tell a dead endpoint from a reverted call.

use std::time::Duration;

use crate::error::BridgeError;

/// Bounded receipt-wait configuration
#[derive(Debug, Clone)]
pub struct ReceiptWaitConfig {
    /// Maximum number of receipt polls before giving up
    pub max_attempts: u32,
    /// Initial backoff between polls
    pub initial_backoff: Duration,
    /// Backoff ceiling
    pub max_backoff: Duration,
    /// Multiplier for exponential growth
    pub backoff_multiplier: f64,
}

impl Default for ReceiptWaitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 1.5,
        }
    }
}

impl ReceiptWaitConfig {
    /// Backoff before the given poll attempt (0-indexed), capped at the ceiling.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let secs =
            self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_secs_f64(secs.min(self.max_backoff.as_secs_f64()))
    }

    /// Whether another poll fits in the budget.
    pub fn should_poll(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Classify raw RPC error text into the structured taxonomy.
///
/// Reverts are permanent (not retryable without changing inputs); everything
/// else from the transport is treated as a connectivity failure to be retried
/// with backoff rather than silently swallowed.
pub fn classify_rpc_error(error: &str) -> BridgeError {
    let lower = error.to_lowercase();

    if lower.contains("revert")
        || lower.contains("insufficient funds")
        || lower.contains("out of gas")
        || lower.contains("nonce too low")
        || lower.contains("already known")
    {
        return BridgeError::ContractRevert(error.to_string());
    }

    BridgeError::Connectivity(error.to_string())
}
