//! Agent configuration
//!
//! Settings come from the environment (a `.env` file is loaded by `main`
//! before this runs). Everything has a default; the agent starts with no
//! configuration at all and lands on Base Sepolia with a fresh wallet.

use std::path::PathBuf;
use std::time::Duration;

use eyre::{eyre, Result};
use tracing::info;

use crate::registry::ChainRegistry;
use crate::retry::ReceiptWaitConfig;

/// Runtime configuration for the bridge agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Chain the session bootstraps onto
    pub default_chain_id: String,
    /// Wallet snapshot file path
    pub wallet_file: PathBuf,
    /// Receipt-wait policy applied to every write
    pub receipt_wait: ReceiptWaitConfig,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| eyre!("Invalid value for {}: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = ReceiptWaitConfig::default();

        let config = Self {
            default_chain_id: env_or("DEFAULT_CHAIN_ID", "84532".to_string())?,
            wallet_file: PathBuf::from(env_or(
                "WALLET_FILE",
                "wallet_data.json".to_string(),
            )?),
            receipt_wait: ReceiptWaitConfig {
                max_attempts: env_or("RECEIPT_MAX_ATTEMPTS", defaults.max_attempts)?,
                initial_backoff: Duration::from_secs(env_or(
                    "RECEIPT_INITIAL_BACKOFF_SECS",
                    defaults.initial_backoff.as_secs(),
                )?),
                max_backoff: Duration::from_secs(env_or(
                    "RECEIPT_MAX_BACKOFF_SECS",
                    defaults.max_backoff.as_secs(),
                )?),
                backoff_multiplier: env_or(
                    "RECEIPT_BACKOFF_MULTIPLIER",
                    defaults.backoff_multiplier,
                )?,
            },
        };

        info!(
            default_chain = %config.default_chain_id,
            wallet_file = %config.wallet_file.display(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Reject configurations the session could not bootstrap from.
    pub fn validate(&self, registry: &ChainRegistry) -> Result<()> {
        if !registry.is_supported(&self.default_chain_id) {
            return Err(eyre!(
                "DEFAULT_CHAIN_ID {} is not a supported chain (supported: {})",
                self.default_chain_id,
                registry.supported_ids().join(", ")
            ));
        }
        if self.receipt_wait.max_attempts == 0 {
            return Err(eyre!("RECEIPT_MAX_ATTEMPTS must be at least 1"));
        }
        if self.receipt_wait.backoff_multiplier < 1.0 {
            return Err(eyre!("RECEIPT_BACKOFF_MULTIPLIER must be >= 1.0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate_against_builtin_registry() {
        let registry = ChainRegistry::load().unwrap();
        let config = AgentConfig {
            default_chain_id: "84532".to_string(),
            wallet_file: PathBuf::from("wallet_data.json"),
            receipt_wait: ReceiptWaitConfig::default(),
        };
        assert!(config.validate(&registry).is_ok());
    }

    #[test]
    fn test_unsupported_default_chain_rejected() {
        let registry = ChainRegistry::load().unwrap();
        let config = AgentConfig {
            default_chain_id: "99999".to_string(),
            wallet_file: PathBuf::from("wallet_data.json"),
            receipt_wait: ReceiptWaitConfig::default(),
        };
        let err = config.validate(&registry).unwrap_err();
        assert!(err.to_string().contains("99999"));
    }

    #[test]
    fn test_zero_receipt_attempts_rejected() {
        let registry = ChainRegistry::load().unwrap();
        let config = AgentConfig {
            default_chain_id: "84532".to_string(),
            wallet_file: PathBuf::from("wallet_data.json"),
            receipt_wait: ReceiptWaitConfig {
                max_attempts: 0,
                ..Default::default()
            },
        };
        assert!(config.validate(&registry).is_err());
    }
}
