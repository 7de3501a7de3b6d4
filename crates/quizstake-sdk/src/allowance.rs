//! Decides whether a prior spending authorization covers an amount about to
//! be committed. The gate is a pure read; callers use the result to decide
//! whether an authorization call is needed.
//!
//! Authorization state only becomes externally visible after the approval
//! receipt confirms, so the gate is always re-queried at the decision points
//! rather than trusted from a stale read. After an approval confirms,
//! [`AllowanceGate::wait_until_allowance`] polls with backoff until the new
//! value is actually observed, bounded by a timeout.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::ledger::LedgerReader;
use crate::types::Address;

/// Result of a single allowance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowanceCheck {
    pub sufficient: bool,
    pub current: u128,
}

pub struct AllowanceGate<L: LedgerReader> {
    reader: Arc<L>,
    spender: Address,
}

impl<L: LedgerReader> AllowanceGate<L> {
    pub fn new(reader: Arc<L>, spender: Address) -> Self {
        Self { reader, spender }
    }

    /// Fresh read of `owner`'s authorization for the configured spender.
    pub async fn ensure_allowance(&self, owner: Address, required: u128) -> Result<AllowanceCheck> {
        let current = self.reader.allowance(owner, self.spender).await?;
        Ok(AllowanceCheck {
            sufficient: current >= required,
            current,
        })
    }

    /// Poll the allowance with exponential backoff until it reflects at
    /// least `required`, or the total budget runs out.
    ///
    /// Used after an approval receipt confirms: the ledger may lag behind
    /// the receipt, and a single early read yields a false negative.
    pub async fn wait_until_allowance(
        &self,
        owner: Address,
        required: u128,
        initial: Duration,
        max_delay: Duration,
        timeout: Duration,
    ) -> Result<u128> {
        let start = tokio::time::Instant::now();
        let mut delay = initial;
        loop {
            let current = self.reader.allowance(owner, self.spender).await?;
            if current >= required {
                return Ok(current);
            }
            if start.elapsed() + delay > timeout {
                return Err(Error::Transport(format!(
                    "allowance of {required} not visible after {}ms",
                    start.elapsed().as_millis()
                )));
            }
            log::debug!(
                "allowance {current} < {required} for {owner}, retrying in {delay:?}"
            );
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(max_delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLedger;

    fn owner() -> Address {
        "0x1111111111111111111111111111111111111111".parse().unwrap()
    }

    fn spender() -> Address {
        "0x2222222222222222222222222222222222222222".parse().unwrap()
    }

    #[tokio::test]
    async fn sufficient_when_allowance_covers_amount() {
        let ledger = Arc::new(MockLedger::default());
        ledger.set_allowance(owner(), 10);
        let gate = AllowanceGate::new(ledger, spender());

        let check = gate.ensure_allowance(owner(), 5).await.unwrap();
        assert!(check.sufficient);
        assert_eq!(check.current, 10);

        let check = gate.ensure_allowance(owner(), 11).await.unwrap();
        assert!(!check.sufficient);
    }

    #[tokio::test]
    async fn exact_amount_is_sufficient() {
        let ledger = Arc::new(MockLedger::default());
        ledger.set_allowance(owner(), 5);
        let gate = AllowanceGate::new(ledger, spender());
        assert!(gate.ensure_allowance(owner(), 5).await.unwrap().sufficient);
    }

    #[tokio::test]
    async fn wait_returns_once_allowance_appears() {
        let ledger = Arc::new(MockLedger::default());
        let gate = AllowanceGate::new(ledger.clone(), spender());

        let waiter = {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                ledger.set_allowance(owner(), 7);
            })
        };

        let seen = gate
            .wait_until_allowance(
                owner(),
                7,
                Duration::from_millis(5),
                Duration::from_millis(50),
                Duration::from_secs(2),
            )
            .await
            .unwrap();
        assert_eq!(seen, 7);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn wait_times_out_as_transport_error() {
        let ledger = Arc::new(MockLedger::default());
        let gate = AllowanceGate::new(ledger, spender());

        let err = gate
            .wait_until_allowance(
                owner(),
                1,
                Duration::from_millis(5),
                Duration::from_millis(10),
                Duration::from_millis(30),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
