use std::time::Duration;

use crate::network::Network;
use crate::types::Address;

/// Configuration shared by the orchestrator, aggregator and metadata client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub network: Network,
    /// Address of the pool ledger contract (the token spender).
    pub pool_contract: Address,
    /// Address of the staking token contract.
    pub token_contract: Address,
    /// Base URL of the metadata store service, if one is configured.
    pub metadata_base_url: Option<String>,
    /// How long a confirmed record stays in the pending slot before
    /// auto-clearing.
    pub clear_grace: Duration,
    /// Initial delay for the post-approval allowance poll.
    pub allowance_poll_initial: Duration,
    /// Upper bound on a single allowance poll delay.
    pub allowance_poll_max: Duration,
    /// Total budget for the post-approval allowance poll.
    pub allowance_poll_timeout: Duration,
}

impl ClientConfig {
    pub fn new(network: Network, pool_contract: Address, token_contract: Address) -> Self {
        Self {
            network,
            pool_contract,
            token_contract,
            metadata_base_url: None,
            clear_grace: Duration::from_secs(3),
            allowance_poll_initial: Duration::from_millis(250),
            allowance_poll_max: Duration::from_secs(4),
            allowance_poll_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_metadata_store(mut self, base_url: impl Into<String>) -> Self {
        self.metadata_base_url = Some(base_url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ClientConfig::new(Network::CeloSepolia, Address::ZERO, Address::ZERO);
        assert_eq!(cfg.clear_grace, Duration::from_secs(3));
        assert_eq!(cfg.allowance_poll_initial, Duration::from_millis(250));
        assert!(cfg.metadata_base_url.is_none());

        let cfg = cfg.with_metadata_store("http://localhost:3000/api");
        assert_eq!(cfg.metadata_base_url.as_deref(), Some("http://localhost:3000/api"));
    }
}
