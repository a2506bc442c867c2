//! Session state and network switching
//!
//! The session holds exactly one active chain at a time. Switching is
//! serialized by a dedicated lock so concurrent switch requests cannot
//! interleave their verification and commit steps; reads of the active chain
//! go through an `RwLock` and never block each other. A switch is
//! all-or-nothing: the active chain only changes after the replacement
//! provider has verified its network identity and passed a liveness probe, so
//! a failed switch leaves the previous chain fully usable.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use alloy::primitives::U256;

use crate::cache::ProviderCache;
use crate::error::BridgeError;
use crate::invoker::ContractInvoker;
use crate::provider::ChainBackend;
use crate::registry::ChainRegistry;

/// The committed active chain and its bound provider
#[derive(Clone)]
pub struct ActiveChain {
    pub chain_id: String,
    pub provider: Arc<dyn ChainBackend>,
}

/// Result of a switch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Target already active; nothing was touched.
    AlreadyActive { chain_id: String },
    /// Switch verified and committed.
    Switched {
        chain_id: String,
        chain_name: String,
        native_balance: U256,
    },
}

/// One live agent session: registry, provider cache, invoker, active chain.
pub struct BridgeSession {
    registry: Arc<ChainRegistry>,
    cache: ProviderCache,
    invoker: ContractInvoker,
    active: RwLock<ActiveChain>,
    /// Single-writer switch serialization, separate from the read lock.
    switch_lock: Mutex<()>,
}

impl BridgeSession {
    /// Connect to the initial chain and build the session. This is the only
    /// place a provider failure is fatal: without a first active chain there
    /// is no session to degrade to.
    pub async fn bootstrap(
        registry: Arc<ChainRegistry>,
        cache: ProviderCache,
        invoker: ContractInvoker,
        initial_chain_id: &str,
    ) -> Result<Self, BridgeError> {
        let descriptor = registry.descriptor_for(initial_chain_id)?;
        let provider = cache.get_or_create(descriptor).await?;

        info!(
            chain_id = %initial_chain_id,
            chain = %descriptor.name,
            signer = %provider.signer_address(),
            "Session bootstrapped"
        );

        Ok(Self {
            registry,
            cache,
            invoker,
            active: RwLock::new(ActiveChain {
                chain_id: initial_chain_id.to_string(),
                provider,
            }),
            switch_lock: Mutex::new(()),
        })
    }

    pub fn registry(&self) -> &Arc<ChainRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &ProviderCache {
        &self.cache
    }

    pub(crate) fn invoker(&self) -> &ContractInvoker {
        &self.invoker
    }

    /// Snapshot of the committed active chain.
    pub async fn active(&self) -> ActiveChain {
        self.active.read().await.clone()
    }

    /// Chain id of the committed active chain.
    pub async fn active_chain_id(&self) -> String {
        self.active.read().await.chain_id.clone()
    }

    /// Switch the session to another supported chain.
    ///
    /// Ordered steps, aborting without side effects at each failure:
    /// registry validation, same-chain no-op, fresh provider construction,
    /// network identity verification, liveness probe, then commit. Only the
    /// commit mutates session state.
    pub async fn switch(&self, target_chain_id: &str) -> Result<SwitchOutcome, BridgeError> {
        // Validate before taking the switch lock; unsupported targets never
        // serialize behind a real switch.
        let descriptor = self.registry.descriptor_for(target_chain_id)?.clone();

        let _guard = self.switch_lock.lock().await;

        if self.active.read().await.chain_id == target_chain_id {
            return Ok(SwitchOutcome::AlreadyActive {
                chain_id: target_chain_id.to_string(),
            });
        }

        // Always rebuild on a real switch: a stale cached provider must not
        // survive into a freshly switched session.
        self.cache.invalidate(target_chain_id).await;
        let provider = self.cache.get_or_create(&descriptor).await?;

        if provider.reported_chain() != target_chain_id {
            warn!(
                requested = %target_chain_id,
                reported = %provider.reported_chain(),
                "Switch aborted: provider failed network identity verification"
            );
            self.cache.invalidate(target_chain_id).await;
            return Err(BridgeError::ChainMismatch {
                expected: target_chain_id.to_string(),
                actual: provider.reported_chain().to_string(),
            });
        }

        // Liveness probe doubles as the first balance read of the new chain.
        let native_balance = match provider.native_balance(provider.signer_address()).await {
            Ok(balance) => balance,
            Err(e) => {
                warn!(
                    chain_id = %target_chain_id,
                    error = %e,
                    "Switch aborted: liveness probe failed"
                );
                self.cache.invalidate(target_chain_id).await;
                return Err(e);
            }
        };

        let mut active = self.active.write().await;
        let previous = active.chain_id.clone();
        *active = ActiveChain {
            chain_id: target_chain_id.to_string(),
            provider,
        };

        info!(
            from = %previous,
            to = %target_chain_id,
            chain = %descriptor.name,
            "Network switch committed"
        );

        Ok(SwitchOutcome::Switched {
            chain_id: target_chain_id.to_string(),
            chain_name: descriptor.name.clone(),
            native_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::ReceiptWaitConfig;
    use crate::testing::test_session;

    #[tokio::test]
    async fn test_bootstrap_sets_active_chain() {
        let (session, _factory) = test_session("84532").await;
        assert_eq!(session.active_chain_id().await, "84532");
    }

    #[tokio::test]
    async fn test_switch_to_unsupported_chain_leaves_state_unchanged() {
        let (session, factory) = test_session("84532").await;
        let connects_before = factory.connect_count();

        let err = session.switch("99999").await.unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedChain { .. }));
        assert_eq!(session.active_chain_id().await, "84532");
        // Rejected in validation; no provider work happened.
        assert_eq!(factory.connect_count(), connects_before);
    }

    #[tokio::test]
    async fn test_switch_to_active_chain_is_noop() {
        let (session, factory) = test_session("84532").await;
        let connects_before = factory.connect_count();

        let outcome = session.switch("84532").await.unwrap();
        assert_eq!(
            outcome,
            SwitchOutcome::AlreadyActive {
                chain_id: "84532".to_string()
            }
        );
        assert_eq!(factory.connect_count(), connects_before);
    }

    #[tokio::test]
    async fn test_switch_commits_on_verified_target() {
        let (session, _factory) = test_session("84532").await;

        let outcome = session.switch("11155111").await.unwrap();
        assert!(matches!(
            outcome,
            SwitchOutcome::Switched { ref chain_id, .. } if chain_id == "11155111"
        ));
        assert_eq!(session.active_chain_id().await, "11155111");
    }

    #[tokio::test]
    async fn test_switch_aborts_on_identity_mismatch() {
        let (session, factory) = test_session("84532").await;
        factory.misreport("11155111", "1");

        let err = session.switch("11155111").await.unwrap_err();
        assert!(matches!(err, BridgeError::ChainMismatch { .. }));
        assert_eq!(session.active_chain_id().await, "84532");
    }

    #[tokio::test]
    async fn test_switch_aborts_on_failed_liveness_probe() {
        let (session, factory) = test_session("84532").await;
        factory.fail_probe("11155111");

        let err = session.switch("11155111").await.unwrap_err();
        assert!(matches!(err, BridgeError::Connectivity(_)));
        assert_eq!(session.active_chain_id().await, "84532");

        // The failed provider was evicted; operations on the old chain work.
        let active = session.active().await;
        assert_eq!(active.provider.reported_chain(), "84532");
    }

    #[tokio::test]
    async fn test_switch_back_after_failure_recovers() {
        let (session, factory) = test_session("84532").await;
        factory.fail_connect("11155111");

        assert!(session.switch("11155111").await.is_err());
        factory.clear_failures();

        let outcome = session.switch("11155111").await.unwrap();
        assert!(matches!(outcome, SwitchOutcome::Switched { .. }));
    }

    #[tokio::test]
    async fn test_receipt_wait_config_default_is_bounded() {
        let config = ReceiptWaitConfig::default();
        assert!(config.max_attempts > 0);
        assert!(!config.should_poll(config.max_attempts));
    }
}
