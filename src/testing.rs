//! In-memory chain backends for tests
//!
//! `MockChain` implements `ChainBackend` against an in-memory ledger with
//! deterministic transaction hashes and immediate receipts. `MockFactory`
//! implements `ProviderFactory` and owns the per-chain ledger state, so a
//! backend rebuilt after cache invalidation sees the same balances the
//! previous backend left behind, matching how a real chain behaves across
//! reconnects. Failure injection covers connects, liveness probes, individual
//! submit functions, held receipts, and misreported network identities.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;

use crate::cache::{ProviderCache, ProviderFactory};
use crate::error::BridgeError;
use crate::invoker::ContractInvoker;
use crate::provider::{BridgeCall, BridgeQuery, ChainBackend, TxReceipt};
use crate::registry::{ChainDescriptor, ChainRegistry};
use crate::retry::ReceiptWaitConfig;
use crate::session::BridgeSession;
use crate::wallet::{WalletSnapshot, WalletStore};

/// Descriptor for a built-in chain, for tests that bypass the session.
pub fn test_descriptor(chain_id: &str) -> ChainDescriptor {
    ChainRegistry::load()
        .expect("builtin registry")
        .descriptor_for(chain_id)
        .unwrap_or_else(|_| panic!("chain {} not in built-in registry", chain_id))
        .clone()
}

#[derive(Default)]
struct ChainState {
    token_balances: HashMap<Address, U256>,
    native_balances: HashMap<Address, U256>,
    receipts: HashMap<B256, TxReceipt>,
    tx_counter: u64,
    hold_receipts: bool,
    revert_next_receipt: bool,
    fail_receipt_polls: u32,
    fail_submit: HashSet<String>,
    fail_probe: bool,
    reported_chain: Option<String>,
    call_log: Vec<String>,
}

/// In-memory `ChainBackend` over shared per-chain state
pub struct MockChain {
    chain_id: String,
    reported_chain: String,
    signer: Address,
    state: Arc<Mutex<ChainState>>,
}

impl MockChain {
    /// Standalone mock with its own private ledger.
    pub fn new(chain_id: &str) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            reported_chain: chain_id.to_string(),
            signer: Address::repeat_byte(0xAA),
            state: Arc::new(Mutex::new(ChainState::default())),
        }
    }

    /// Override the network identity this backend claims to have observed.
    pub fn with_reported_chain(mut self, reported: &str) -> Self {
        self.reported_chain = reported.to_string();
        self
    }

    /// Make every receipt poll report "not yet mined".
    pub fn hold_receipts(&self) {
        self.state.lock().unwrap().hold_receipts = true;
    }

    /// Resume answering receipt polls from the ledger.
    pub fn clear_hold_receipts(&self) {
        self.state.lock().unwrap().hold_receipts = false;
    }

    /// Make the next submitted transaction confirm with success=false.
    pub fn revert_next_receipt(&self) {
        self.state.lock().unwrap().revert_next_receipt = true;
    }

    /// Make the next `n` receipt polls fail with a connectivity error before
    /// the ledger answers normally again.
    pub fn fail_next_receipt_polls(&self, n: u32) {
        self.state.lock().unwrap().fail_receipt_polls = n;
    }

    /// Every network-shaped call recorded in order.
    pub fn call_log(&self) -> Vec<String> {
        self.state.lock().unwrap().call_log.clone()
    }

    pub fn fund_native(&self, address: Address, amount: U256) {
        self.state
            .lock()
            .unwrap()
            .native_balances
            .insert(address, amount);
    }

    fn deterministic_hash(chain_id: &str, counter: u64) -> B256 {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&counter.to_be_bytes());
        let id = chain_id.as_bytes();
        let n = id.len().min(16);
        bytes[8..8 + n].copy_from_slice(&id[..n]);
        B256::from(bytes)
    }
}

#[async_trait]
impl ChainBackend for MockChain {
    fn chain_id(&self) -> &str {
        &self.chain_id
    }

    fn reported_chain(&self) -> &str {
        &self.reported_chain
    }

    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn native_balance(&self, address: Address) -> Result<U256, BridgeError> {
        let mut state = self.state.lock().unwrap();
        state.call_log.push(format!("native_balance({})", address));
        if state.fail_probe {
            return Err(BridgeError::Connectivity(
                "injected probe failure".to_string(),
            ));
        }
        Ok(state
            .native_balances
            .get(&address)
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn submit(&self, _contract: Address, call: BridgeCall) -> Result<B256, BridgeError> {
        let mut state = self.state.lock().unwrap();
        state.call_log.push(format!("submit({})", call.function_name()));

        if state.fail_submit.contains(call.function_name()) {
            return Err(BridgeError::Connectivity(format!(
                "injected submit failure for {}",
                call.function_name()
            )));
        }

        match call {
            BridgeCall::CrosschainMint { to, amount } => {
                let balance = state.token_balances.entry(to).or_insert(U256::ZERO);
                *balance += amount;
            }
            BridgeCall::CrosschainBurn { from, amount } => {
                let balance = state
                    .token_balances
                    .get(&from)
                    .copied()
                    .unwrap_or(U256::ZERO);
                if balance < amount {
                    return Err(BridgeError::ContractRevert(
                        "execution reverted: burn amount exceeds balance".to_string(),
                    ));
                }
                state.token_balances.insert(from, balance - amount);
            }
            BridgeCall::Deposit { value } => {
                let native = state
                    .native_balances
                    .get(&self.signer)
                    .copied()
                    .unwrap_or(U256::ZERO);
                if native < value {
                    return Err(BridgeError::ContractRevert(
                        "execution reverted: insufficient funds for deposit".to_string(),
                    ));
                }
                state.native_balances.insert(self.signer, native - value);
                let balance = state.token_balances.entry(self.signer).or_insert(U256::ZERO);
                *balance += value;
            }
            BridgeCall::Withdraw { amount } => {
                let balance = state
                    .token_balances
                    .get(&self.signer)
                    .copied()
                    .unwrap_or(U256::ZERO);
                if balance < amount {
                    return Err(BridgeError::ContractRevert(
                        "execution reverted: withdraw amount exceeds balance".to_string(),
                    ));
                }
                state.token_balances.insert(self.signer, balance - amount);
                let native = state
                    .native_balances
                    .get(&self.signer)
                    .copied()
                    .unwrap_or(U256::ZERO);
                state.native_balances.insert(self.signer, native + amount);
            }
        }

        state.tx_counter += 1;
        let block = state.tx_counter;
        let tx_hash = Self::deterministic_hash(&self.chain_id, block);
        let success = !state.revert_next_receipt;
        state.revert_next_receipt = false;
        state.receipts.insert(
            tx_hash,
            TxReceipt {
                success,
                block_number: Some(block),
            },
        );

        Ok(tx_hash)
    }

    async fn receipt_status(&self, tx_hash: B256) -> Result<Option<TxReceipt>, BridgeError> {
        let mut state = self.state.lock().unwrap();
        state
            .call_log
            .push(format!("receipt_status(0x{:x})", tx_hash));
        if state.fail_receipt_polls > 0 {
            state.fail_receipt_polls -= 1;
            return Err(BridgeError::Connectivity(
                "injected receipt poll failure".to_string(),
            ));
        }
        if state.hold_receipts {
            return Ok(None);
        }
        Ok(state.receipts.get(&tx_hash).copied())
    }

    async fn query(&self, _contract: Address, query: BridgeQuery) -> Result<U256, BridgeError> {
        let mut state = self.state.lock().unwrap();
        state.call_log.push(format!("query({})", query.function_name()));
        match query {
            BridgeQuery::BalanceOf { account } => Ok(state
                .token_balances
                .get(&account)
                .copied()
                .unwrap_or(U256::ZERO)),
            BridgeQuery::TotalSupply => {
                Ok(state.token_balances.values().fold(U256::ZERO, |a, b| a + *b))
            }
        }
    }
}

/// `ProviderFactory` over shared per-chain ledgers, with failure injection
pub struct MockFactory {
    states: Mutex<HashMap<String, Arc<Mutex<ChainState>>>>,
    fail_connect: Mutex<HashSet<String>>,
    connects: AtomicU64,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            fail_connect: Mutex::new(HashSet::new()),
            connects: AtomicU64::new(0),
        }
    }

    fn state_for(&self, chain_id: &str) -> Arc<Mutex<ChainState>> {
        Arc::clone(
            self.states
                .lock()
                .unwrap()
                .entry(chain_id.to_string())
                .or_default(),
        )
    }

    /// Number of backend constructions performed.
    pub fn connect_count(&self) -> u64 {
        self.connects.load(Ordering::Relaxed)
    }

    /// Make `connect` fail for a chain.
    pub fn fail_connect(&self, chain_id: &str) {
        self.fail_connect
            .lock()
            .unwrap()
            .insert(chain_id.to_string());
    }

    /// Make the chain's liveness probe fail.
    pub fn fail_probe(&self, chain_id: &str) {
        self.state_for(chain_id).lock().unwrap().fail_probe = true;
    }

    /// Make one submit function fail on a chain.
    pub fn fail_submit(&self, chain_id: &str, function: &str) {
        self.state_for(chain_id)
            .lock()
            .unwrap()
            .fail_submit
            .insert(function.to_string());
    }

    /// Make backends for a chain report a different network identity.
    pub fn misreport(&self, chain_id: &str, reported: &str) {
        self.state_for(chain_id).lock().unwrap().reported_chain = Some(reported.to_string());
    }

    /// Pre-fund a native balance on a chain's ledger.
    pub fn fund_native(&self, chain_id: &str, address: Address, amount: U256) {
        self.state_for(chain_id)
            .lock()
            .unwrap()
            .native_balances
            .insert(address, amount);
    }

    /// Clear all injected failures, keeping ledger balances.
    pub fn clear_failures(&self) {
        self.fail_connect.lock().unwrap().clear();
        for state in self.states.lock().unwrap().values() {
            let mut state = state.lock().unwrap();
            state.fail_probe = false;
            state.fail_submit.clear();
            state.reported_chain = None;
            state.hold_receipts = false;
            state.fail_receipt_polls = 0;
        }
    }
}

impl Default for MockFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderFactory for MockFactory {
    async fn connect(
        &self,
        descriptor: &ChainDescriptor,
        snapshot: &WalletSnapshot,
    ) -> Result<Arc<dyn ChainBackend>, BridgeError> {
        if self
            .fail_connect
            .lock()
            .unwrap()
            .contains(&descriptor.chain_id)
        {
            return Err(BridgeError::Connectivity(format!(
                "injected connect failure for chain {}",
                descriptor.chain_id
            )));
        }

        self.connects.fetch_add(1, Ordering::Relaxed);

        let state = self.state_for(&descriptor.chain_id);
        let reported = state
            .lock()
            .unwrap()
            .reported_chain
            .clone()
            .unwrap_or_else(|| descriptor.chain_id.clone());

        let signer = snapshot
            .address
            .parse()
            .map_err(|e| BridgeError::Wallet(format!("Invalid snapshot address: {}", e)))?;

        Ok(Arc::new(MockChain {
            chain_id: descriptor.chain_id.clone(),
            reported_chain: reported,
            signer,
            state,
        }))
    }
}

/// Receipt-wait tuned for tests: tight budget, millisecond backoff.
pub fn fast_receipt_wait() -> ReceiptWaitConfig {
    ReceiptWaitConfig {
        max_attempts: 3,
        initial_backoff: std::time::Duration::from_millis(1),
        max_backoff: std::time::Duration::from_millis(2),
        backoff_multiplier: 1.5,
    }
}

/// Fully wired session over mock backends, plus the factory for injection.
pub async fn test_session(initial_chain_id: &str) -> (BridgeSession, Arc<MockFactory>) {
    let registry = Arc::new(ChainRegistry::load().expect("builtin registry"));
    let factory = Arc::new(MockFactory::new());
    let wallet_path = std::env::temp_dir().join(format!(
        "seth-bridge-session-{}-{:x}.json",
        std::process::id(),
        &*factory as *const MockFactory as usize
    ));
    let _ = std::fs::remove_file(&wallet_path);
    let wallet = Arc::new(WalletStore::new(wallet_path));

    let cache = ProviderCache::new(factory.clone(), wallet);
    let invoker = ContractInvoker::new(registry.clone(), fast_receipt_wait());

    let session = BridgeSession::bootstrap(registry, cache, invoker, initial_chain_id)
        .await
        .expect("bootstrap mock session");

    (session, factory)
}
