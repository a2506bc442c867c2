//! Per-chain provider cache
//!
//! Providers are created lazily on first use and never evicted automatically;
//! the cache size is the number of chains visited in the process lifetime. An
//! entry can be explicitly invalidated and recreated, which the network
//! switcher does before every fresh switch attempt. Every cache miss loads the
//! wallet snapshot and persists it again immediately after construction, so
//! key material created while building the provider survives an immediate
//! process exit. Cache hits touch neither the snapshot nor the network.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::BridgeError;
use crate::provider::{ChainBackend, EvmProvider};
use crate::registry::ChainDescriptor;
use crate::wallet::{WalletSnapshot, WalletStore};

/// Constructs a chain backend for a descriptor. The seam exists so tests can
/// inject mock backends; production uses `EvmProviderFactory`.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn connect(
        &self,
        descriptor: &ChainDescriptor,
        snapshot: &WalletSnapshot,
    ) -> Result<Arc<dyn ChainBackend>, BridgeError>;
}

/// Production factory backed by alloy
pub struct EvmProviderFactory;

#[async_trait]
impl ProviderFactory for EvmProviderFactory {
    async fn connect(
        &self,
        descriptor: &ChainDescriptor,
        snapshot: &WalletSnapshot,
    ) -> Result<Arc<dyn ChainBackend>, BridgeError> {
        let signer = snapshot.signer()?;
        let provider =
            EvmProvider::connect(&descriptor.chain_id, &descriptor.rpc_url, signer).await?;
        Ok(Arc::new(provider))
    }
}

/// chain_id -> backend map with lazy creation
pub struct ProviderCache {
    factory: Arc<dyn ProviderFactory>,
    wallet: Arc<WalletStore>,
    entries: Mutex<HashMap<String, Arc<dyn ChainBackend>>>,
}

impl ProviderCache {
    pub fn new(factory: Arc<dyn ProviderFactory>, wallet: Arc<WalletStore>) -> Self {
        Self {
            factory,
            wallet,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached backend for a chain, constructing it on a miss.
    ///
    /// A hit returns the existing backend unchanged, with no re-validation;
    /// callers that need a freshness guarantee must `invalidate` first. A
    /// backend that reports a different network identity than requested is
    /// cached anyway and logged as degraded: the hard verification belongs to
    /// the switch path.
    pub async fn get_or_create(
        &self,
        descriptor: &ChainDescriptor,
    ) -> Result<Arc<dyn ChainBackend>, BridgeError> {
        // The map lock is held across construction so two concurrent misses
        // for the same chain cannot both build a provider.
        let mut entries = self.entries.lock().await;

        if let Some(existing) = entries.get(&descriptor.chain_id) {
            debug!(chain_id = %descriptor.chain_id, "Reusing cached provider");
            return Ok(Arc::clone(existing));
        }

        let snapshot = self.wallet.load_or_init().await?;
        let backend = self.factory.connect(descriptor, &snapshot).await?;

        if backend.reported_chain() != descriptor.chain_id {
            warn!(
                requested = %descriptor.chain_id,
                reported = %backend.reported_chain(),
                "Cached provider reports mismatched network identity (degraded)"
            );
        }

        // Persist before handing the backend out: keys created during
        // construction must survive even if the process dies right after.
        self.wallet.persist(&snapshot).await?;

        info!(
            chain_id = %descriptor.chain_id,
            signer = %backend.signer_address(),
            "Provider created and wallet snapshot persisted"
        );

        entries.insert(descriptor.chain_id.clone(), Arc::clone(&backend));
        Ok(backend)
    }

    /// Drop the cached backend for a chain, if any. The next `get_or_create`
    /// rebuilds it from a fresh snapshot load.
    pub async fn invalidate(&self, chain_id: &str) -> bool {
        let removed = self.entries.lock().await.remove(chain_id).is_some();
        if removed {
            debug!(chain_id = %chain_id, "Invalidated cached provider");
        }
        removed
    }

    /// Number of chains visited so far.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_descriptor, MockFactory};

    fn temp_wallet(tag: &str) -> Arc<WalletStore> {
        let path = std::env::temp_dir().join(format!(
            "seth-bridge-cache-{}-{}.json",
            tag,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        Arc::new(WalletStore::new(path))
    }

    #[tokio::test]
    async fn test_hit_returns_same_backend_and_persists_once() {
        let factory = Arc::new(MockFactory::new());
        let wallet = temp_wallet("hit");
        let cache = ProviderCache::new(factory.clone(), wallet.clone());
        let descriptor = test_descriptor("84532");

        let first = cache.get_or_create(&descriptor).await.unwrap();
        let second = cache.get_or_create(&descriptor).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.connect_count(), 1);
        assert_eq!(wallet.write_count(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reconstruction() {
        let factory = Arc::new(MockFactory::new());
        let wallet = temp_wallet("invalidate");
        let cache = ProviderCache::new(factory.clone(), wallet.clone());
        let descriptor = test_descriptor("84532");

        let first = cache.get_or_create(&descriptor).await.unwrap();
        assert!(cache.invalidate("84532").await);
        let second = cache.get_or_create(&descriptor).await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(factory.connect_count(), 2);
        assert_eq!(wallet.write_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_missing_entry_is_noop() {
        let factory = Arc::new(MockFactory::new());
        let cache = ProviderCache::new(factory, temp_wallet("noop"));
        assert!(!cache.invalidate("84532").await);
    }

    #[tokio::test]
    async fn test_misreported_identity_is_cached_degraded() {
        let factory = Arc::new(MockFactory::new());
        factory.misreport("84532", "11155111");
        let cache = ProviderCache::new(factory.clone(), temp_wallet("misreport"));

        let backend = cache.get_or_create(&test_descriptor("84532")).await.unwrap();
        assert_eq!(backend.reported_chain(), "11155111");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_entries_are_per_chain() {
        let factory = Arc::new(MockFactory::new());
        let cache = ProviderCache::new(factory.clone(), temp_wallet("perchain"));

        cache.get_or_create(&test_descriptor("84532")).await.unwrap();
        cache.get_or_create(&test_descriptor("11155111")).await.unwrap();

        assert_eq!(cache.len().await, 2);
        assert_eq!(factory.connect_count(), 2);
    }
}
