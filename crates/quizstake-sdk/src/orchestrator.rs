//! `TransactionOrchestrator` — drives the ordered multi-step commitment
//! pattern against the ledger: authorize token spending, then act.
//!
//! The step-chaining is an explicit finite-state machine: [`advance`] is a
//! pure transition function over (status, event), and the orchestrator is
//! just the driver that feeds it events as wallet calls resolve. One
//! [`TransactionRecord`] may be in flight at a time; the slot is a single
//! mutable cell, not a queue, so two conflicting authorizations can never
//! race. Status changes fan out on a `tokio::broadcast` channel.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::allowance::AllowanceGate;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::ledger::{LedgerCall, LedgerReader, PoolCreationParams, TxRef, WalletBackend};
use crate::types::Address;

// ── State machine ───────────────────────────────────────────────────────────

/// Status of the in-flight transaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Idle,
    CheckingAllowance,
    Approving,
    Approved,
    Staking,
    /// Single-step flows (resolve, cancel, claims, seedless create).
    Submitting,
    Confirmed,
    Failed,
}

impl TxStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TxStatus::Confirmed | TxStatus::Failed)
    }
}

/// What kind of commitment a record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Stake,
    CreatePool,
    Resolve,
    Cancel,
    ClaimReward,
    ClaimRefund,
}

/// Events fed to [`advance`] as wallet calls resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxEvent {
    /// Flow entry. Two-phase flows check allowance first; single-step flows
    /// go straight to submission.
    Begin { requires_allowance: bool },
    AllowanceChecked { sufficient: bool },
    ApprovalConfirmed,
    /// Allowance verified after approval; the action call is being dispatched.
    ActionSubmitted,
    ActionConfirmed,
    Failed,
}

/// Pure transition function. Returns `None` for illegal (status, event)
/// pairs, which the driver treats as an internal invariant violation.
pub fn advance(status: TxStatus, event: &TxEvent) -> Option<TxStatus> {
    use TxStatus::*;
    match (status, event) {
        (Idle, TxEvent::Begin { requires_allowance: true }) => Some(CheckingAllowance),
        (Idle, TxEvent::Begin { requires_allowance: false }) => Some(Submitting),
        (CheckingAllowance, TxEvent::AllowanceChecked { sufficient: true }) => Some(Staking),
        (CheckingAllowance, TxEvent::AllowanceChecked { sufficient: false }) => Some(Approving),
        (Approving, TxEvent::ApprovalConfirmed) => Some(Approved),
        (Approved, TxEvent::ActionSubmitted) => Some(Staking),
        (Staking | Submitting, TxEvent::ActionConfirmed) => Some(Confirmed),
        (s, TxEvent::Failed) if !s.is_terminal() => Some(Failed),
        _ => None,
    }
}

// ── Transaction record ──────────────────────────────────────────────────────

/// The single in-flight (or most recently completed) commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub kind: TxKind,
    pub pool_id: u64,
    pub amount: u128,
    pub choice: Option<u8>,
    pub created_at_ms: u64,
    pub status: TxStatus,
    pub approval_tx: Option<TxRef>,
    pub action_tx: Option<TxRef>,
    pub message: String,
    pub error: Option<String>,
}

impl TransactionRecord {
    fn new(kind: TxKind, pool_id: u64, amount: u128, choice: Option<u8>) -> Self {
        let created_at_ms = chrono::Utc::now().timestamp_millis() as u64;
        Self {
            id: format!("{pool_id}-{created_at_ms}"),
            kind,
            pool_id,
            amount,
            choice,
            created_at_ms,
            status: TxStatus::Idle,
            approval_tx: None,
            action_tx: None,
            message: "Preparing transaction…".into(),
            error: None,
        }
    }
}

// ── Orchestrator ────────────────────────────────────────────────────────────

pub struct TransactionOrchestrator<L: LedgerReader, W: WalletBackend> {
    reader: Arc<L>,
    wallet: Arc<W>,
    gate: AllowanceGate<L>,
    config: ClientConfig,
    pending: Arc<Mutex<Option<TransactionRecord>>>,
    history: Arc<Mutex<Vec<TransactionRecord>>>,
    tx: broadcast::Sender<TransactionRecord>,
}

impl<L: LedgerReader, W: WalletBackend> TransactionOrchestrator<L, W> {
    /// Returns the orchestrator and a receiver for record status updates.
    pub fn new(
        reader: Arc<L>,
        wallet: Arc<W>,
        config: ClientConfig,
    ) -> (Self, broadcast::Receiver<TransactionRecord>) {
        let (tx, rx) = broadcast::channel(64);
        let gate = AllowanceGate::new(reader.clone(), config.pool_contract);
        (
            Self {
                reader,
                wallet,
                gate,
                config,
                pending: Arc::new(Mutex::new(None)),
                history: Arc::new(Mutex::new(Vec::new())),
                tx,
            },
            rx,
        )
    }

    /// Get an additional receiver for record status updates.
    pub fn subscribe(&self) -> broadcast::Receiver<TransactionRecord> {
        self.tx.subscribe()
    }

    /// Snapshot of the in-flight record, if any.
    pub fn pending(&self) -> Option<TransactionRecord> {
        self.pending.lock().ok().and_then(|slot| slot.clone())
    }

    /// Status of the in-flight record, `Idle` when the slot is empty.
    pub fn current_status(&self) -> TxStatus {
        self.pending()
            .map(|r| r.status)
            .unwrap_or(TxStatus::Idle)
    }

    /// Immutable copies of all confirmed commitments this session.
    pub fn history(&self) -> Vec<TransactionRecord> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    /// Confirmed commitments for one pool.
    pub fn history_for_pool(&self, pool_id: u64) -> Vec<TransactionRecord> {
        self.history()
            .into_iter()
            .filter(|r| r.pool_id == pool_id)
            .collect()
    }

    /// Reset local tracking so a new intent can start.
    ///
    /// Advisory only: a call already broadcast to the network is not
    /// retracted and may still confirm later without this orchestrator
    /// observing it.
    pub fn clear_pending(&self) {
        if let Ok(mut slot) = self.pending.lock() {
            *slot = None;
        }
    }

    // ── Flows ───────────────────────────────────────────────────────────

    /// Commit `amount` to `choice` in `pool_id`, authorizing spending first
    /// when the current allowance does not cover the amount.
    pub async fn initiate_stake(
        &self,
        pool_id: u64,
        amount: u128,
        choice: u8,
    ) -> Result<TransactionRecord> {
        let owner = self.begin(TxKind::Stake, pool_id, amount, Some(choice))?;
        let action = LedgerCall::Stake {
            pool_id,
            choice,
            amount,
        };
        self.drive_two_phase(
            owner,
            amount,
            action,
            "Approving tokens for staking…",
            "Placing your stake…",
            "Stake",
        )
        .await
    }

    /// Open a new pool. A non-zero creator seed goes through the
    /// authorization phase first; a zero seed skips it entirely.
    pub async fn initiate_create_pool(
        &self,
        params: PoolCreationParams,
    ) -> Result<TransactionRecord> {
        let seed = params.creator_seed;
        let owner = self.begin(TxKind::CreatePool, params.pool_id, seed, None)?;
        let action = LedgerCall::CreatePool(params);
        if seed == 0 {
            self.drive_single_step(action, "Creating pool…", "Pool creation")
                .await
        } else {
            self.drive_two_phase(
                owner,
                seed,
                action,
                "Approving tokens for the creator seed…",
                "Creating pool…",
                "Pool creation",
            )
            .await
        }
    }

    /// Resolve a pool with the winning choice. The choice must be within
    /// the pool's range; an out-of-range selection is rejected before any
    /// call is issued.
    pub async fn initiate_resolve(
        &self,
        pool_id: u64,
        winning_choice: u8,
    ) -> Result<TransactionRecord> {
        self.begin(TxKind::Resolve, pool_id, 0, Some(winning_choice))?;
        let pool = match self.reader.get_pool(pool_id).await {
            Ok(p) if !p.is_empty_slot() => p,
            Ok(_) => {
                return Err(self.fail_pending("Pool not found", Error::PoolNotFound(pool_id)));
            }
            Err(e) => return Err(self.fail_pending("Pool lookup failed", e)),
        };
        if winning_choice >= pool.choices_count {
            return Err(self.fail_pending(
                "Invalid winning choice",
                Error::InvalidChoice {
                    choice: winning_choice,
                    count: pool.choices_count,
                },
            ));
        }
        self.drive_single_step(
            LedgerCall::ResolvePool {
                pool_id,
                winning_choice,
            },
            "Resolving pool…",
            "Resolution",
        )
        .await
    }

    /// Cancel a pool with a human-readable reason.
    pub async fn initiate_cancel(
        &self,
        pool_id: u64,
        reason: impl Into<String>,
    ) -> Result<TransactionRecord> {
        self.begin(TxKind::Cancel, pool_id, 0, None)?;
        self.drive_single_step(
            LedgerCall::CancelPool {
                pool_id,
                reason: reason.into(),
            },
            "Cancelling pool…",
            "Cancellation",
        )
        .await
    }

    /// Claim the reward from a resolved pool.
    pub async fn initiate_claim_reward(&self, pool_id: u64) -> Result<TransactionRecord> {
        self.begin(TxKind::ClaimReward, pool_id, 0, None)?;
        self.drive_single_step(
            LedgerCall::ClaimReward { pool_id },
            "Claiming reward…",
            "Reward claim",
        )
        .await
    }

    /// Claim a refund from a cancelled pool.
    pub async fn initiate_claim_refund(&self, pool_id: u64) -> Result<TransactionRecord> {
        self.begin(TxKind::ClaimRefund, pool_id, 0, None)?;
        self.drive_single_step(
            LedgerCall::ClaimRefund { pool_id },
            "Claiming refund…",
            "Refund claim",
        )
        .await
    }

    // ── Drivers ─────────────────────────────────────────────────────────

    async fn drive_two_phase(
        &self,
        owner: Address,
        required: u128,
        action: LedgerCall,
        approving_msg: &str,
        action_msg: &str,
        confirm_label: &str,
    ) -> Result<TransactionRecord> {
        self.apply_event(
            &TxEvent::Begin {
                requires_allowance: true,
            },
            "Checking token allowance…",
        )?;

        let check = match self.gate.ensure_allowance(owner, required).await {
            Ok(c) => c,
            Err(e) => return Err(self.fail_pending("Allowance check failed", e)),
        };

        if check.sufficient {
            self.apply_event(&TxEvent::AllowanceChecked { sufficient: true }, action_msg)?;
        } else {
            self.apply_event(
                &TxEvent::AllowanceChecked { sufficient: false },
                approving_msg,
            )?;

            let approve = LedgerCall::Approve {
                spender: self.config.pool_contract,
                amount: required,
            };
            let handle = match self.wallet.submit(approve).await {
                Ok(h) => h,
                Err(e) => return Err(self.fail_pending("Approval failed", e)),
            };
            let receipt = match self.wallet.wait_for_receipt(&handle).await {
                Ok(r) => r,
                Err(e) => return Err(self.fail_pending("Approval failed", e)),
            };
            if !receipt.success {
                let reason = receipt
                    .revert_reason
                    .unwrap_or_else(|| "approval reverted".into());
                return Err(self.fail_pending("Approval failed", Error::Reverted(reason)));
            }
            self.update_pending(|r| r.approval_tx = Some(receipt.tx_ref.clone()))?;
            self.apply_event(
                &TxEvent::ApprovalConfirmed,
                "Approval confirmed. Verifying allowance…",
            )?;

            // The approval receipt alone is not proof the new allowance is
            // readable yet; poll until it is.
            if let Err(e) = self
                .gate
                .wait_until_allowance(
                    owner,
                    required,
                    self.config.allowance_poll_initial,
                    self.config.allowance_poll_max,
                    self.config.allowance_poll_timeout,
                )
                .await
            {
                return Err(self.fail_pending("Allowance not visible", e));
            }
            self.apply_event(&TxEvent::ActionSubmitted, action_msg)?;
        }

        self.submit_action(action, confirm_label).await
    }

    async fn drive_single_step(
        &self,
        action: LedgerCall,
        submit_msg: &str,
        confirm_label: &str,
    ) -> Result<TransactionRecord> {
        self.apply_event(
            &TxEvent::Begin {
                requires_allowance: false,
            },
            submit_msg,
        )?;
        self.submit_action(action, confirm_label).await
    }

    /// Shared tail: submit the action call, await its receipt, finish the
    /// record either way.
    async fn submit_action(
        &self,
        action: LedgerCall,
        confirm_label: &str,
    ) -> Result<TransactionRecord> {
        let label = action.label();
        let handle = match self.wallet.submit(action).await {
            Ok(h) => h,
            Err(e) => return Err(self.fail_pending(&format!("{confirm_label} failed"), e)),
        };
        let receipt = match self.wallet.wait_for_receipt(&handle).await {
            Ok(r) => r,
            Err(e) => return Err(self.fail_pending(&format!("{confirm_label} failed"), e)),
        };

        if !receipt.success {
            let reason = receipt
                .revert_reason
                .unwrap_or_else(|| format!("{label} reverted"));
            return Err(self.fail_pending(&format!("{confirm_label} failed"), Error::Reverted(reason)));
        }

        self.update_pending(|r| r.action_tx = Some(receipt.tx_ref.clone()))?;
        let msg = format!("{confirm_label} confirmed! TX: {}", receipt.tx_ref.short());
        let record = self.apply_event(&TxEvent::ActionConfirmed, &msg)?;
        if let Ok(mut history) = self.history.lock() {
            history.push(record.clone());
        }
        self.schedule_clear(record.id.clone());
        log::info!(
            "{label} confirmed for pool {} ({})",
            record.pool_id,
            receipt.tx_ref
        );
        Ok(record)
    }

    // ── Slot management ─────────────────────────────────────────────────

    /// Install a fresh record after checking preconditions. A violated
    /// precondition installs a `Failed` record and never contacts the wallet.
    fn begin(
        &self,
        kind: TxKind,
        pool_id: u64,
        amount: u128,
        choice: Option<u8>,
    ) -> Result<Address> {
        let mut record = TransactionRecord::new(kind, pool_id, amount, choice);

        let identity = self.wallet.address();
        let expected = self.config.network.chain_id();
        let actual = self.wallet.chain_id();

        let mut slot = self
            .pending
            .lock()
            .map_err(|_| Error::Internal("pending slot mutex poisoned".into()))?;
        if slot.as_ref().is_some_and(|r| !r.status.is_terminal()) {
            return Err(Error::TransactionPending);
        }

        let Some(owner) = identity else {
            record.status = TxStatus::Failed;
            record.message = "Wallet not connected".into();
            record.error = Some(Error::NoIdentity.to_string());
            *slot = Some(record.clone());
            drop(slot);
            let _ = self.tx.send(record);
            return Err(Error::NoIdentity);
        };

        if expected != actual {
            let err = Error::WrongNetwork { expected, actual };
            record.status = TxStatus::Failed;
            record.message = "Wrong network".into();
            record.error = Some(err.to_string());
            *slot = Some(record.clone());
            drop(slot);
            let _ = self.tx.send(record);
            return Err(err);
        }

        *slot = Some(record.clone());
        drop(slot);
        let _ = self.tx.send(record);
        Ok(owner)
    }

    /// Mutate the pending record and publish the updated copy.
    fn update_pending<F>(&self, f: F) -> Result<TransactionRecord>
    where
        F: FnOnce(&mut TransactionRecord),
    {
        let record = {
            let mut slot = self
                .pending
                .lock()
                .map_err(|_| Error::Internal("pending slot mutex poisoned".into()))?;
            let record = slot
                .as_mut()
                .ok_or_else(|| Error::Internal("no pending record".into()))?;
            f(record);
            record.clone()
        };
        let _ = self.tx.send(record.clone());
        Ok(record)
    }

    /// Advance the state machine and update the status message.
    fn apply_event(&self, event: &TxEvent, message: &str) -> Result<TransactionRecord> {
        let mut illegal = None;
        let record = self.update_pending(|r| match advance(r.status, event) {
            Some(next) => {
                r.status = next;
                r.message = message.to_string();
            }
            None => {
                let from = r.status;
                illegal = Some((from, *event));
                r.status = TxStatus::Failed;
                r.error = Some(format!("illegal transition from {from:?} on {event:?}"));
            }
        })?;
        if let Some((status, event)) = illegal {
            return Err(Error::Internal(format!(
                "illegal transition from {status:?} on {event:?}"
            )));
        }
        Ok(record)
    }

    /// Fail the pending record with a short message plus the raw detail,
    /// then hand the error back for propagation.
    fn fail_pending(&self, short: &str, err: Error) -> Error {
        log::warn!("{short}: {err}");
        let _ = self.update_pending(|r| {
            r.status = TxStatus::Failed;
            r.message = short.to_string();
            r.error = Some(err.to_string());
        });
        err
    }

    /// Clear the slot after a grace window, but only if the same confirmed
    /// record is still in it.
    fn schedule_clear(&self, id: String) {
        let pending = self.pending.clone();
        let grace = self.config.clear_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Ok(mut slot) = pending.lock()
                && slot
                    .as_ref()
                    .is_some_and(|r| r.id == id && r.status == TxStatus::Confirmed)
            {
                *slot = None;
            }
        });
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
