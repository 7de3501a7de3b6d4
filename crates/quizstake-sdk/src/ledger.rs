//! Trait seams for the external ledger contract and the wallet/signing
//! provider. Both are consumed, never owned: read operations go through
//! [`LedgerReader`], write operations are submitted as [`LedgerCall`]s
//! through a [`WalletBackend`] and observed as [`Receipt`]s.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Address, Pool, UserStake};

/// Opaque reference to a confirmed transaction, usable for audit links.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxRef(pub String);

impl std::fmt::Display for TxRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TxRef {
    /// Shortened form for status messages (`0x12345678…`).
    pub fn short(&self) -> String {
        if self.0.len() > 10 {
            format!("{}…", &self.0[..10])
        } else {
            self.0.clone()
        }
    }
}

/// Handle returned by a wallet submission; resolves to a [`Receipt`] later.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallHandle(pub String);

/// The resolved outcome of a previously submitted call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub success: bool,
    pub tx_ref: TxRef,
    /// Revert reason reported by the ledger, when the call failed on-chain.
    pub revert_reason: Option<String>,
}

/// Parameters for opening a new pool. The creator picks the identifier;
/// a non-zero seed is the creator's own initial commitment and requires
/// token authorization before the create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolCreationParams {
    pub pool_id: u64,
    pub metadata_uri: String,
    pub choices_count: u8,
    pub deadline: u64,
    pub min_stake: u128,
    pub max_stake: u128,
    pub creator_seed: u128,
    pub creator_fee_bps: u32,
}

/// The write set of the ledger and token-authorization contracts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    Approve { spender: Address, amount: u128 },
    CreatePool(PoolCreationParams),
    Stake { pool_id: u64, choice: u8, amount: u128 },
    ResolvePool { pool_id: u64, winning_choice: u8 },
    CancelPool { pool_id: u64, reason: String },
    ClaimReward { pool_id: u64 },
    ClaimRefund { pool_id: u64 },
}

impl LedgerCall {
    pub fn label(&self) -> &'static str {
        match self {
            LedgerCall::Approve { .. } => "approve",
            LedgerCall::CreatePool(_) => "create_pool",
            LedgerCall::Stake { .. } => "stake",
            LedgerCall::ResolvePool { .. } => "resolve_pool",
            LedgerCall::CancelPool { .. } => "cancel_pool",
            LedgerCall::ClaimReward { .. } => "claim_reward",
            LedgerCall::ClaimRefund { .. } => "claim_refund",
        }
    }
}

/// Read side of the ledger and token-authorization contracts.
pub trait LedgerReader: Send + Sync {
    fn pool_counter(&self) -> impl Future<Output = Result<u64>> + Send;

    fn get_pool(&self, id: u64) -> impl Future<Output = Result<Pool>> + Send;

    fn has_user_staked(&self, id: u64, user: Address) -> impl Future<Output = Result<bool>> + Send;

    fn calculate_reward(&self, id: u64, user: Address)
    -> impl Future<Output = Result<u128>> + Send;

    fn get_user_stake(
        &self,
        id: u64,
        user: Address,
        choice: u8,
    ) -> impl Future<Output = Result<UserStake>> + Send;

    /// Current spending authorization `owner` has granted to `spender`.
    fn allowance(
        &self,
        owner: Address,
        spender: Address,
    ) -> impl Future<Output = Result<u128>> + Send;
}

/// Wallet/signing provider: submit a signed call, get a handle; the handle
/// eventually resolves to a success or failure receipt.
pub trait WalletBackend: Send + Sync {
    /// The connected account, if any.
    fn address(&self) -> Option<Address>;

    /// Chain id the wallet is currently on.
    fn chain_id(&self) -> u64;

    fn submit(&self, call: LedgerCall) -> impl Future<Output = Result<CallHandle>> + Send;

    fn wait_for_receipt(
        &self,
        handle: &CallHandle,
    ) -> impl Future<Output = Result<Receipt>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_ref_short_truncates() {
        let long = TxRef("0xdeadbeefcafebabe0123".into());
        assert_eq!(long.short(), "0xdeadbeef…");
        let short = TxRef("0xab".into());
        assert_eq!(short.short(), "0xab");
    }

    #[test]
    fn call_labels() {
        let call = LedgerCall::Stake {
            pool_id: 1,
            choice: 0,
            amount: 5,
        };
        assert_eq!(call.label(), "stake");
        assert_eq!(LedgerCall::ClaimRefund { pool_id: 2 }.label(), "claim_refund");
    }
}
