use serde::Deserialize;

/// Network variants the ledger contract is deployed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Celo,
    CeloSepolia,
    Devnet,
}

impl Network {
    pub fn chain_id(self) -> u64 {
        match self {
            Network::Celo => 42220,
            Network::CeloSepolia => 11_142_220,
            Network::Devnet => 31337,
        }
    }

    pub fn is_mainnet(self) -> bool {
        matches!(self, Network::Celo)
    }

    pub fn explorer_url(self) -> &'static str {
        match self {
            Network::Celo => "https://celo.blockscout.com",
            Network::CeloSepolia => "https://celo-sepolia.blockscout.com",
            Network::Devnet => "http://localhost:4000",
        }
    }

    pub fn default_rpc_url(self) -> &'static str {
        match self {
            Network::Celo => "https://forno.celo.org",
            Network::CeloSepolia => "https://forno.celo-sepolia.celo-testnet.org",
            Network::Devnet => "http://localhost:8545",
        }
    }

    /// Audit link for a confirmed transaction reference.
    pub fn tx_url(self, tx_ref: &str) -> String {
        format!("{}/tx/{tx_ref}", self.explorer_url())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Celo => "celo",
            Network::CeloSepolia => "celo-sepolia",
            Network::Devnet => "devnet",
        }
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "celo" | "mainnet" => Ok(Network::Celo),
            "celo-sepolia" | "celosepolia" | "sepolia" | "testnet" => Ok(Network::CeloSepolia),
            "devnet" | "localnet" => Ok(Network::Devnet),
            _ => Err(format!("invalid network: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_ids_are_distinct() {
        assert_ne!(Network::Celo.chain_id(), Network::CeloSepolia.chain_id());
        assert_ne!(Network::CeloSepolia.chain_id(), Network::Devnet.chain_id());
    }

    #[test]
    fn parse_roundtrip() {
        for net in [Network::Celo, Network::CeloSepolia, Network::Devnet] {
            assert_eq!(net.as_str().parse::<Network>().unwrap(), net);
        }
        assert!("mars".parse::<Network>().is_err());
    }

    #[test]
    fn tx_url_embeds_reference() {
        let url = Network::CeloSepolia.tx_url("0xabc123");
        assert!(url.ends_with("/tx/0xabc123"));
    }
}
