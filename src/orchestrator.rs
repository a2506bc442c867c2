//! Bridge operations
//!
//! High-level token operations over the session: mint, burn, deposit,
//! withdraw, balance reads, network inspection, and the two-phase bridge.
//! The bridge is burn-then-mint with no rollback: a burn that confirms
//! followed by any later failure is a partial bridge, reported with the burn
//! transaction hash and the phase reached so the mint can be completed
//! manually.

use std::fmt;

use alloy::primitives::{Address, B256, U256};
use tracing::{error, info, warn};

use crate::error::BridgeError;
use crate::invoker::{eth_to_wei, TxResult};
use crate::provider::{BridgeCall, BridgeQuery};
use crate::session::{BridgeSession, SwitchOutcome};

/// How far a bridge operation progressed before stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgePhase {
    /// Nothing irreversible happened; tokens are untouched.
    NotStarted,
    /// Burn confirmed on the source chain; mint still owed on the destination.
    Burned,
    /// Burn and mint both confirmed.
    Minted,
}

impl fmt::Display for BridgePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgePhase::NotStarted => write!(f, "not started"),
            BridgePhase::Burned => write!(f, "burned on source, not minted"),
            BridgePhase::Minted => write!(f, "completed"),
        }
    }
}

/// Completed two-phase bridge
#[derive(Debug, Clone)]
pub struct BridgeReceipt {
    pub source_chain: String,
    pub dest_chain: String,
    pub address: Address,
    pub amount: U256,
    pub burn: TxResult,
    pub mint: TxResult,
}

/// The session's view of its active network
#[derive(Debug, Clone)]
pub struct NetworkInfo {
    pub chain_id: String,
    pub chain_name: String,
    pub signer_address: Address,
    pub reported_chain: String,
    /// True when the provider's observed identity differs from the session's
    /// active chain id.
    pub degraded: bool,
}

/// Per-chain result from a full registry sweep
#[derive(Debug, Clone)]
pub struct ChainCheck {
    pub chain_id: String,
    pub chain_name: String,
    /// Token balance of the agent wallet, or the failure rendered as text.
    pub outcome: Result<U256, String>,
}

impl BridgeSession {
    /// Mint tokens to an address on the active chain.
    pub async fn mint(&self, to: Address, amount: U256) -> Result<TxResult, BridgeError> {
        let active = self.active().await;
        self.invoker()
            .write(
                &active.chain_id,
                &active.provider,
                BridgeCall::CrosschainMint { to, amount },
            )
            .await
    }

    /// Burn tokens from an address on the active chain.
    pub async fn burn(&self, from: Address, amount: U256) -> Result<TxResult, BridgeError> {
        let active = self.active().await;
        self.invoker()
            .write(
                &active.chain_id,
                &active.provider,
                BridgeCall::CrosschainBurn { from, amount },
            )
            .await
    }

    /// Wrap native ETH into tokens. `eth` is a decimal string ("0.5"),
    /// converted at the fixed 18-decimal scale.
    pub async fn deposit(&self, eth: &str) -> Result<TxResult, BridgeError> {
        let value = eth_to_wei(eth)?;
        let active = self.active().await;
        self.invoker()
            .write(&active.chain_id, &active.provider, BridgeCall::Deposit { value })
            .await
    }

    /// Unwrap tokens back to native ETH.
    pub async fn withdraw(&self, amount: U256) -> Result<TxResult, BridgeError> {
        let active = self.active().await;
        self.invoker()
            .write(&active.chain_id, &active.provider, BridgeCall::Withdraw { amount })
            .await
    }

    /// Token balance of an address on the active chain.
    pub async fn balance_of(&self, account: Address) -> Result<U256, BridgeError> {
        let active = self.active().await;
        self.invoker()
            .read(
                &active.chain_id,
                &active.provider,
                BridgeQuery::BalanceOf { account },
            )
            .await
    }

    /// Token total supply on the active chain.
    pub async fn total_supply(&self) -> Result<U256, BridgeError> {
        let active = self.active().await;
        self.invoker()
            .read(&active.chain_id, &active.provider, BridgeQuery::TotalSupply)
            .await
    }

    /// Native balance of the agent wallet on the active chain.
    pub async fn native_balance(&self) -> Result<U256, BridgeError> {
        let active = self.active().await;
        active
            .provider
            .native_balance(active.provider.signer_address())
            .await
    }

    /// Describe the active network, flagging a provider whose observed
    /// identity disagrees with the session.
    pub async fn current_network(&self) -> Result<NetworkInfo, BridgeError> {
        let active = self.active().await;
        let descriptor = self.registry().descriptor_for(&active.chain_id)?;
        let reported = active.provider.reported_chain().to_string();
        let degraded = reported != active.chain_id;

        if degraded {
            warn!(
                chain_id = %active.chain_id,
                reported = %reported,
                "Active provider reports a mismatched network identity"
            );
        }

        Ok(NetworkInfo {
            chain_id: active.chain_id.clone(),
            chain_name: descriptor.name.clone(),
            signer_address: active.provider.signer_address(),
            reported_chain: reported,
            degraded,
        })
    }

    /// Sweep every registered chain: build (or reuse) its provider and read
    /// the agent's token balance. Failures are collected per chain, never
    /// aborting the sweep, and the active chain is left untouched.
    pub async fn verify_chains(&self) -> Vec<ChainCheck> {
        let mut checks = Vec::new();

        for descriptor in self.registry().descriptors() {
            let outcome = match self.cache().get_or_create(descriptor).await {
                Ok(backend) => backend
                    .query(
                        descriptor.contract_address,
                        BridgeQuery::BalanceOf {
                            account: backend.signer_address(),
                        },
                    )
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            checks.push(ChainCheck {
                chain_id: descriptor.chain_id.clone(),
                chain_name: descriptor.name.clone(),
                outcome,
            });
        }

        checks
    }

    /// Two-phase bridge: burn on the source chain, then mint on the
    /// destination chain.
    ///
    /// Failures before the burn confirms surface as ordinary errors and leave
    /// balances untouched. Once the burn confirms, every later failure
    /// (destination switch, mint submission, mint receipt) is a
    /// `PartialBridge` carrying the burn hash; there is no rollback burn.
    pub async fn bridge(
        &self,
        source_chain: &str,
        dest_chain: &str,
        address: Address,
        amount: U256,
    ) -> Result<BridgeReceipt, BridgeError> {
        // Both endpoints validated up front so an unsupported destination is
        // caught before anything burns.
        self.registry().descriptor_for(source_chain)?;
        self.registry().descriptor_for(dest_chain)?;

        if source_chain == dest_chain {
            return Err(BridgeError::InvalidArgument(format!(
                "Source and destination chains are both {}",
                source_chain
            )));
        }

        if self.active_chain_id().await != source_chain {
            self.switch(source_chain).await?;
        }

        info!(
            source = %source_chain,
            dest = %dest_chain,
            address = %address,
            amount = %amount,
            "Bridge phase 1: burning on source chain"
        );

        let burn = self.burn(address, amount).await?;

        info!(
            burn_tx = %burn.hash_hex(),
            "Burn confirmed, switching to destination chain"
        );

        let partial = |phase: BridgePhase, cause: String| BridgeError::PartialBridge {
            source_chain: source_chain.to_string(),
            dest_chain: dest_chain.to_string(),
            address,
            amount,
            burn_tx_hash: burn.tx_hash,
            phase,
            cause,
        };

        match self.switch(dest_chain).await {
            Ok(SwitchOutcome::Switched { .. }) | Ok(SwitchOutcome::AlreadyActive { .. }) => {}
            Err(e) => {
                error!(
                    burn_tx = %burn.hash_hex(),
                    error = %e,
                    "Bridge stranded: destination switch failed after burn"
                );
                return Err(partial(BridgePhase::Burned, e.to_string()));
            }
        }

        info!(
            dest = %dest_chain,
            "Bridge phase 2: minting on destination chain"
        );

        let mint = match self.mint(address, amount).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    burn_tx = %burn.hash_hex(),
                    error = %e,
                    "Bridge stranded: mint failed after burn"
                );
                return Err(partial(BridgePhase::Burned, e.to_string()));
            }
        };

        info!(
            burn_tx = %burn.hash_hex(),
            mint_tx = %mint.hash_hex(),
            "Bridge completed"
        );

        Ok(BridgeReceipt {
            source_chain: source_chain.to_string(),
            dest_chain: dest_chain.to_string(),
            address,
            amount,
            burn,
            mint,
        })
    }
}

/// Strand record extracted from a `PartialBridge` error, for operator display.
#[derive(Debug, Clone)]
pub struct StrandedBridge {
    pub source_chain: String,
    pub dest_chain: String,
    pub address: Address,
    pub amount: U256,
    pub burn_tx_hash: B256,
    pub phase: BridgePhase,
}

impl StrandedBridge {
    /// Extract the strand record when the error is a partial bridge.
    pub fn from_error(err: &BridgeError) -> Option<Self> {
        match err {
            BridgeError::PartialBridge {
                source_chain,
                dest_chain,
                address,
                amount,
                burn_tx_hash,
                phase,
                ..
            } => Some(Self {
                source_chain: source_chain.clone(),
                dest_chain: dest_chain.clone(),
                address: *address,
                amount: *amount,
                burn_tx_hash: *burn_tx_hash,
                phase: *phase,
            }),
            _ => None,
        }
    }

    /// The exact mint call still owed on the destination chain.
    pub fn owed_mint(&self) -> BridgeCall {
        BridgeCall::CrosschainMint {
            to: self.address,
            amount: self.amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_session;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[tokio::test]
    async fn test_mint_then_balance_read() {
        let (session, factory) = test_session("84532").await;
        let user = addr(0x11);

        let result = session.mint(user, U256::from(500)).await.unwrap();
        assert_eq!(result.chain_id, "84532");
        assert_eq!(session.balance_of(user).await.unwrap(), U256::from(500));
        drop(factory);
    }

    #[tokio::test]
    async fn test_burn_reduces_balance() {
        let (session, _factory) = test_session("84532").await;
        let user = addr(0x22);

        session.mint(user, U256::from(300)).await.unwrap();
        session.burn(user, U256::from(100)).await.unwrap();
        assert_eq!(session.balance_of(user).await.unwrap(), U256::from(200));
    }

    #[tokio::test]
    async fn test_burn_more_than_balance_reverts() {
        let (session, _factory) = test_session("84532").await;
        let user = addr(0x33);

        session.mint(user, U256::from(10)).await.unwrap();
        let err = session.burn(user, U256::from(11)).await.unwrap_err();
        assert!(matches!(err, BridgeError::ContractRevert(_)));
        assert_eq!(session.balance_of(user).await.unwrap(), U256::from(10));
    }

    #[tokio::test]
    async fn test_deposit_and_withdraw_round_trip() {
        let (session, factory) = test_session("84532").await;
        let info = session.current_network().await.unwrap();
        let agent = info.signer_address;
        factory.fund_native("84532", agent, U256::from(10).pow(U256::from(18)));

        session.deposit("0.5").await.unwrap();
        let wrapped = U256::from(5) * U256::from(10).pow(U256::from(17));
        assert_eq!(session.balance_of(agent).await.unwrap(), wrapped);

        session.withdraw(wrapped).await.unwrap();
        assert_eq!(session.balance_of(agent).await.unwrap(), U256::ZERO);
    }

    #[tokio::test]
    async fn test_bridge_burns_then_mints_across_chains() {
        let (session, _factory) = test_session("84532").await;
        let user = addr(0x44);
        session.mint(user, U256::from(1_000)).await.unwrap();

        let receipt = session
            .bridge("84532", "11155420", user, U256::from(400))
            .await
            .unwrap();

        assert_eq!(receipt.source_chain, "84532");
        assert_eq!(receipt.dest_chain, "11155420");
        assert_ne!(receipt.burn.tx_hash, receipt.mint.tx_hash);

        // Session ends on the destination chain with the minted balance.
        assert_eq!(session.active_chain_id().await, "11155420");
        assert_eq!(session.balance_of(user).await.unwrap(), U256::from(400));

        // Source chain kept the reduced balance.
        session.switch("84532").await.unwrap();
        assert_eq!(session.balance_of(user).await.unwrap(), U256::from(600));
    }

    #[tokio::test]
    async fn test_bridge_same_chain_rejected_before_burn() {
        let (session, _factory) = test_session("84532").await;
        let err = session
            .bridge("84532", "84532", addr(0x55), U256::from(1))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_bridge_unsupported_destination_fails_before_burn() {
        let (session, _factory) = test_session("84532").await;
        let user = addr(0x66);
        session.mint(user, U256::from(100)).await.unwrap();

        let err = session
            .bridge("84532", "99999", user, U256::from(50))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedChain { .. }));
        // Nothing burned.
        assert_eq!(session.balance_of(user).await.unwrap(), U256::from(100));
    }

    #[tokio::test]
    async fn test_bridge_mint_failure_is_partial_with_burn_hash() {
        let (session, factory) = test_session("84532").await;
        let user = addr(0x77);
        session.mint(user, U256::from(100)).await.unwrap();
        factory.fail_submit("11155420", "crosschainMint");

        let err = session
            .bridge("84532", "11155420", user, U256::from(100))
            .await
            .unwrap_err();

        let stranded = StrandedBridge::from_error(&err).expect("partial bridge");
        assert_eq!(stranded.phase, BridgePhase::Burned);
        assert_eq!(stranded.amount, U256::from(100));
        assert_ne!(stranded.burn_tx_hash, B256::ZERO);
        assert_eq!(
            stranded.owed_mint(),
            crate::provider::BridgeCall::CrosschainMint {
                to: user,
                amount: U256::from(100)
            }
        );
    }

    #[tokio::test]
    async fn test_bridge_dest_switch_failure_is_partial() {
        let (session, factory) = test_session("84532").await;
        let user = addr(0x88);
        session.mint(user, U256::from(50)).await.unwrap();
        factory.fail_connect("11155420");

        let err = session
            .bridge("84532", "11155420", user, U256::from(50))
            .await
            .unwrap_err();

        assert!(StrandedBridge::from_error(&err).is_some());
        // Burn went through; source balance is gone.
        assert_eq!(session.balance_of(user).await.unwrap(), U256::ZERO);
    }

    #[tokio::test]
    async fn test_current_network_reports_identity() {
        let (session, _factory) = test_session("84532").await;
        let info = session.current_network().await.unwrap();
        assert_eq!(info.chain_id, "84532");
        assert_eq!(info.chain_name, "Base Sepolia");
        assert!(!info.degraded);
    }

    #[tokio::test]
    async fn test_verify_chains_collects_per_chain_failures() {
        let (session, factory) = test_session("84532").await;
        factory.fail_connect("137");

        let checks = session.verify_chains().await;
        assert_eq!(checks.len(), session.registry().len());

        let polygon = checks.iter().find(|c| c.chain_id == "137").unwrap();
        assert!(polygon.outcome.is_err());

        let base = checks.iter().find(|c| c.chain_id == "84532").unwrap();
        assert!(base.outcome.is_ok());
    }
}
