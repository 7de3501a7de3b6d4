//! In-memory fakes for the ledger, wallet and metadata store seams. Built
//! for the crate's own tests and exported behind the `testing` feature so
//! downstream consumers can exercise their integration code without a
//! network.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::ledger::{CallHandle, LedgerCall, LedgerReader, Receipt, TxRef, WalletBackend};
use crate::metadata::content::LessonMetadata;
use crate::metadata::remote::{PublishRequest, RemoteMetadataStore};
use crate::metadata::store_trait::MetadataCache;
use crate::types::{Address, Pool, PoolStatus, UserStake};

/// An allocated, active pool with sensible defaults for tests.
pub fn test_pool(id: u64, choices_count: u8) -> Pool {
    Pool {
        id,
        creator: Address::ZERO,
        metadata_uri: String::new(),
        choices_count,
        deadline: 4_000_000_000,
        min_stake: 1,
        max_stake: 1_000_000,
        creator_seed: 0,
        platform_fee_bps: 100,
        creator_fee_bps: 250,
        total_staked: 0,
        winning_choice: 0,
        status: PoolStatus::Active,
        created_at: 1_700_000_000 + id,
        resolved_at: 0,
    }
}

fn empty_slot(id: u64) -> Pool {
    Pool {
        id,
        creator: Address::ZERO,
        metadata_uri: String::new(),
        choices_count: 0,
        deadline: 0,
        min_stake: 0,
        max_stake: 0,
        creator_seed: 0,
        platform_fee_bps: 0,
        creator_fee_bps: 0,
        total_staked: 0,
        winning_choice: 0,
        status: PoolStatus::Active,
        created_at: 0,
        resolved_at: 0,
    }
}

// ── MockLedger ──────────────────────────────────────────────────────────────

/// In-memory ledger state. Reads for unknown pool ids return zeroed slots,
/// matching the real contract's behavior for never-allocated ids.
#[derive(Default)]
pub struct MockLedger {
    pools: Mutex<HashMap<u64, Pool>>,
    failing: Mutex<Vec<u64>>,
    allowances: Mutex<HashMap<Address, u128>>,
    rewards: Mutex<HashMap<(u64, Address), u128>>,
    stakes: Mutex<HashMap<(u64, Address, u8), UserStake>>,
    counter: AtomicU64,
}

impl MockLedger {
    /// Insert a pool, growing the counter to cover its id.
    pub fn insert_pool(&self, pool: Pool) {
        self.counter.fetch_max(pool.id, Ordering::SeqCst);
        self.pools.lock().unwrap().insert(pool.id, pool);
    }

    pub fn set_counter(&self, counter: u64) {
        self.counter.store(counter, Ordering::SeqCst);
    }

    /// Make reads of `id` fail with a query error.
    pub fn fail_pool(&self, id: u64) {
        self.failing.lock().unwrap().push(id);
    }

    pub fn set_allowance(&self, owner: Address, amount: u128) {
        self.allowances.lock().unwrap().insert(owner, amount);
    }

    pub fn set_reward(&self, id: u64, user: Address, amount: u128) {
        self.rewards.lock().unwrap().insert((id, user), amount);
    }

    pub fn set_stake(&self, id: u64, user: Address, choice: u8, stake: UserStake) {
        self.stakes.lock().unwrap().insert((id, user, choice), stake);
    }
}

impl LedgerReader for MockLedger {
    async fn pool_counter(&self) -> Result<u64> {
        Ok(self.counter.load(Ordering::SeqCst))
    }

    async fn get_pool(&self, id: u64) -> Result<Pool> {
        if self.failing.lock().unwrap().contains(&id) {
            return Err(Error::Query(format!("simulated read failure for pool {id}")));
        }
        let pool = self.pools.lock().unwrap().get(&id).cloned();
        Ok(pool.unwrap_or_else(|| empty_slot(id)))
    }

    async fn has_user_staked(&self, id: u64, user: Address) -> Result<bool> {
        let stakes = self.stakes.lock().unwrap();
        Ok(stakes
            .iter()
            .any(|((pid, owner, _), s)| *pid == id && *owner == user && s.amount > 0))
    }

    async fn calculate_reward(&self, id: u64, user: Address) -> Result<u128> {
        Ok(self
            .rewards
            .lock()
            .unwrap()
            .get(&(id, user))
            .copied()
            .unwrap_or(0))
    }

    async fn get_user_stake(&self, id: u64, user: Address, choice: u8) -> Result<UserStake> {
        Ok(self
            .stakes
            .lock()
            .unwrap()
            .get(&(id, user, choice))
            .copied()
            .unwrap_or(UserStake {
                amount: 0,
                claimed: false,
            }))
    }

    async fn allowance(&self, owner: Address, _spender: Address) -> Result<u128> {
        Ok(self
            .allowances
            .lock()
            .unwrap()
            .get(&owner)
            .copied()
            .unwrap_or(0))
    }
}

// ── MockWallet ──────────────────────────────────────────────────────────────

/// Scripted outcome for one wallet submission. The queue is consumed in
/// order; an empty queue means `Confirm`.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Confirm,
    /// Call lands on-chain but reverts with this reason.
    Revert(String),
    /// User rejects at the signing prompt; `submit` itself fails.
    Decline(String),
    /// Submission fails in transport.
    TransportError(String),
    /// Receipt never resolves.
    Hang,
}

/// Wallet fake. Confirmed `Approve` calls write the new allowance into the
/// shared [`MockLedger`] when their receipt resolves, so post-approval
/// allowance polling observes the state change in the same order a real
/// ledger would expose it.
pub struct MockWallet {
    address: Option<Address>,
    chain_id: u64,
    ledger: Arc<MockLedger>,
    script: Mutex<VecDeque<MockOutcome>>,
    submitted: Mutex<Vec<LedgerCall>>,
    in_flight: Mutex<HashMap<String, (MockOutcome, LedgerCall)>>,
    seq: AtomicU64,
}

impl MockWallet {
    pub fn new(address: Option<Address>, chain_id: u64, ledger: Arc<MockLedger>) -> Self {
        Self {
            address,
            chain_id,
            ledger,
            script: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            in_flight: Mutex::new(HashMap::new()),
            seq: AtomicU64::new(1),
        }
    }

    /// Queue outcomes for the next submissions.
    pub fn script(&self, outcomes: impl IntoIterator<Item = MockOutcome>) {
        self.script.lock().unwrap().extend(outcomes);
    }

    /// Every call submitted so far, in order.
    pub fn submitted(&self) -> Vec<LedgerCall> {
        self.submitted.lock().unwrap().clone()
    }
}

impl WalletBackend for MockWallet {
    fn address(&self) -> Option<Address> {
        self.address
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn submit(&self, call: LedgerCall) -> Result<CallHandle> {
        self.submitted.lock().unwrap().push(call.clone());
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(MockOutcome::Confirm);

        match outcome {
            MockOutcome::Decline(reason) => Err(Error::Declined(reason)),
            MockOutcome::TransportError(reason) => Err(Error::Transport(reason)),
            other => {
                let n = self.seq.fetch_add(1, Ordering::SeqCst);
                let handle = format!("call-{n}");
                self.in_flight
                    .lock()
                    .unwrap()
                    .insert(handle.clone(), (other, call));
                Ok(CallHandle(handle))
            }
        }
    }

    async fn wait_for_receipt(&self, handle: &CallHandle) -> Result<Receipt> {
        let entry = self.in_flight.lock().unwrap().remove(&handle.0);
        let Some((outcome, call)) = entry else {
            return Err(Error::Internal(format!("unknown call handle {}", handle.0)));
        };
        let tx_ref = TxRef(format!("0x{:064x}", self.seq.fetch_add(1, Ordering::SeqCst)));

        match outcome {
            MockOutcome::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            MockOutcome::Revert(reason) => Ok(Receipt {
                success: false,
                tx_ref,
                revert_reason: Some(reason),
            }),
            _ => {
                if let (LedgerCall::Approve { amount, .. }, Some(owner)) = (&call, self.address) {
                    self.ledger.set_allowance(owner, *amount);
                }
                Ok(Receipt {
                    success: true,
                    tx_ref,
                    revert_reason: None,
                })
            }
        }
    }
}

// ── Metadata fakes ──────────────────────────────────────────────────────────

/// Remote metadata store fake with an on/off failure switch.
#[derive(Default)]
pub struct MockRemoteStore {
    records: Mutex<HashMap<String, LessonMetadata>>,
    published: Mutex<Vec<PublishRequest>>,
    failing: AtomicBool,
    generated: AtomicU64,
}

impl MockRemoteStore {
    pub fn insert(&self, key: &str, metadata: LessonMetadata) {
        self.records.lock().unwrap().insert(key.to_string(), metadata);
    }

    /// When failing, every fetch and publish errors in transport.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every publish request received so far.
    pub fn published(&self) -> Vec<PublishRequest> {
        self.published.lock().unwrap().clone()
    }
}

impl RemoteMetadataStore for MockRemoteStore {
    async fn fetch(&self, key: &str) -> Result<Option<LessonMetadata>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Transport("simulated store outage".into()));
        }
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    async fn publish(&self, request: &PublishRequest) -> Result<String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Transport("simulated store outage".into()));
        }
        self.published.lock().unwrap().push(request.clone());

        let id = request.id.clone().unwrap_or_else(|| {
            format!("lesson-{}", self.generated.fetch_add(1, Ordering::SeqCst) + 1)
        });
        let mut records = self.records.lock().unwrap();
        records.insert(id.clone(), request.metadata.clone());
        for alias in &request.aliases {
            records.insert(alias.clone(), request.metadata.clone());
        }
        Ok(id)
    }
}

/// Plain in-memory [`MetadataCache`].
#[derive(Debug, Default)]
pub struct MemoryCache {
    records: HashMap<String, LessonMetadata>,
}

impl MetadataCache for MemoryCache {
    fn get(&mut self, key: &str) -> Option<LessonMetadata> {
        self.records.get(key).cloned()
    }

    fn put(
        &mut self,
        id: &str,
        metadata: &LessonMetadata,
        aliases: &[String],
    ) -> std::result::Result<String, String> {
        self.records.insert(id.to_string(), metadata.clone());
        for alias in aliases {
            self.records.insert(alias.clone(), metadata.clone());
        }
        Ok(id.to_string())
    }
}
