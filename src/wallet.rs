//! Wallet snapshot store
//!
//! One JSON blob per process holding the signing key material a provider
//! needs to be reconstructed. Read on every provider-cache miss, overwritten
//! (whole-file replace, never append) after every successful construction so
//! key material created along the way is never lost. Persistence has its own
//! lock, independent of the session lock: concurrent cache misses must not
//! interleave read-modify-write cycles on the file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use alloy::signers::local::PrivateKeySigner;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::error::BridgeError;

/// Serializable wallet state
#[derive(Clone, Serialize, Deserialize)]
pub struct WalletSnapshot {
    /// Hex-encoded secp256k1 signing key, 0x-prefixed
    pub signing_key: String,
    /// Checksummed address derived from the key, kept for display
    pub address: String,
}

/// Custom Debug that redacts the signing key to prevent accidental log leakage.
impl fmt::Debug for WalletSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSnapshot")
            .field("signing_key", &"<redacted>")
            .field("address", &self.address)
            .finish()
    }
}

impl WalletSnapshot {
    /// Generate a fresh random signing key.
    pub fn generate() -> Self {
        let signer = PrivateKeySigner::random();
        Self {
            signing_key: format!("0x{}", hex::encode(signer.to_bytes())),
            address: format!("{:?}", signer.address()),
        }
    }

    /// Reconstruct the signer from the stored key material.
    pub fn signer(&self) -> Result<PrivateKeySigner, BridgeError> {
        self.signing_key
            .parse()
            .map_err(|e| BridgeError::Wallet(format!("Invalid stored signing key: {}", e)))
    }
}

/// File-backed snapshot store with whole-file-replace persistence
pub struct WalletStore {
    path: PathBuf,
    /// Serializes persistence; independent of the session lock.
    persist_lock: Mutex<()>,
    writes: AtomicU64,
}

impl fmt::Debug for WalletStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletStore")
            .field("path", &self.path)
            .field("writes", &self.writes.load(Ordering::Relaxed))
            .finish()
    }
}

impl WalletStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            persist_lock: Mutex::new(()),
            writes: AtomicU64::new(0),
        }
    }

    /// Load the last-persisted snapshot, or generate a fresh wallet when no
    /// snapshot exists yet. The absent-file branch is expected, not an error.
    pub async fn load_or_init(&self) -> Result<WalletSnapshot, BridgeError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| BridgeError::Wallet(format!("Corrupt wallet snapshot: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No wallet snapshot found, generating a new wallet");
                Ok(WalletSnapshot::generate())
            }
            Err(e) => Err(BridgeError::Wallet(format!(
                "Failed to read wallet snapshot: {}",
                e
            ))),
        }
    }

    /// Persist the snapshot with a whole-file replace: write a temp file next
    /// to the target, then rename over it.
    pub async fn persist(&self, snapshot: &WalletSnapshot) -> Result<(), BridgeError> {
        let _guard = self.persist_lock.lock().await;

        let raw = serde_json::to_string_pretty(snapshot)
            .map_err(|e| BridgeError::Wallet(format!("Failed to serialize snapshot: {}", e)))?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, raw.as_bytes())
            .await
            .map_err(|e| BridgeError::Wallet(format!("Failed to write wallet snapshot: {}", e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| BridgeError::Wallet(format!("Failed to replace wallet snapshot: {}", e)))?;

        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of persistence writes performed so far. Exposed for health
    /// reporting; the provider cache contract is one write per miss.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_wallet_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "seth-bridge-wallet-{}-{}.json",
            tag,
            std::process::id()
        ))
    }

    #[tokio::test]
    async fn test_missing_file_generates_new_wallet() {
        let path = temp_wallet_path("missing");
        let _ = tokio::fs::remove_file(&path).await;

        let store = WalletStore::new(&path);
        let snapshot = store.load_or_init().await.unwrap();
        assert!(snapshot.signing_key.starts_with("0x"));
        assert!(snapshot.address.starts_with("0x"));
        // Nothing persisted until persist() is called explicitly.
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_persist_and_reload_round_trip() {
        let path = temp_wallet_path("roundtrip");
        let _ = tokio::fs::remove_file(&path).await;

        let store = WalletStore::new(&path);
        let snapshot = store.load_or_init().await.unwrap();
        store.persist(&snapshot).await.unwrap();
        assert_eq!(store.write_count(), 1);

        let reloaded = store.load_or_init().await.unwrap();
        assert_eq!(reloaded.signing_key, snapshot.signing_key);
        assert_eq!(reloaded.address, snapshot.address);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_snapshot_signer_matches_address() {
        let snapshot = WalletSnapshot::generate();
        let signer = snapshot.signer().unwrap();
        assert_eq!(format!("{:?}", signer.address()), snapshot.address);
    }

    #[test]
    fn test_debug_redacts_signing_key() {
        let snapshot = WalletSnapshot::generate();
        let debug = format!("{:?}", snapshot);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(&snapshot.signing_key));
    }
}
