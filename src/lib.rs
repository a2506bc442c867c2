//! Cross-chain sETH bridge agent core
//!
//! A session-managed agent over the SuperETH bridge contract, deployed at the
//! same address on every supported chain. The agent holds one active chain at
//! a time, switches networks with all-or-nothing verification, and bridges
//! tokens with a two-phase burn-then-mint flow that reports partial failures
//! instead of pretending to roll them back.

pub mod cache;
pub mod commands;
pub mod config;
pub mod contracts;
pub mod error;
pub mod invoker;
pub mod orchestrator;
pub mod provider;
pub mod registry;
pub mod retry;
pub mod session;
pub mod testing;
pub mod wallet;

pub use cache::{EvmProviderFactory, ProviderCache, ProviderFactory};
pub use commands::{dispatch, Command};
pub use config::AgentConfig;
pub use error::BridgeError;
pub use invoker::{ContractInvoker, TxResult};
pub use orchestrator::{BridgePhase, BridgeReceipt, ChainCheck, NetworkInfo, StrandedBridge};
pub use provider::{BridgeCall, BridgeQuery, ChainBackend, EvmProvider};
pub use registry::{ChainDescriptor, ChainRegistry};
pub use retry::ReceiptWaitConfig;
pub use session::{BridgeSession, SwitchOutcome};
pub use wallet::{WalletSnapshot, WalletStore};
