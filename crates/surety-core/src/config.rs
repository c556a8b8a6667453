//! Configuration types for Surety

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::types::ChainId;

/// Registry entry for a token made known through configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenEntry {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

/// Registry entry for a price feed made known through configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Symbol of the asset the feed prices
    pub symbol: String,
    pub feed: Address,
    /// Decimal places of the feed's raw answer
    pub decimals: u8,
    /// Maximum age of an answer before it is considered stale
    pub heartbeat_secs: u64,
}

/// Per-chain connection and registry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: ChainId,

    /// JSON-RPC endpoint (e.g. "https://mainnet.base.org")
    pub rpc_url: String,

    /// Marketplace contract override; built-in deployments apply when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<Address>,

    /// Tokens to add on top of the built-in registry
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,

    /// Price feeds to add on top of the built-in registry
    #[serde(default)]
    pub feeds: Vec<FeedEntry>,
}

impl ChainConfig {
    pub fn new(chain_id: ChainId, rpc_url: impl Into<String>) -> Self {
        Self {
            chain_id,
            rpc_url: rpc_url.into(),
            market: None,
            tokens: Vec::new(),
            feeds: Vec::new(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chains the client can reach
    pub chains: Vec<ChainConfig>,

    /// Receipt poll interval while waiting for confirmation
    #[serde(default = "default_confirm_poll_secs")]
    pub confirm_poll_secs: u64,
}

fn default_confirm_poll_secs() -> u64 {
    4
}

impl AppConfig {
    pub fn chain(&self, chain_id: ChainId) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chains: vec![
                ChainConfig::new(ChainId::new(1), "https://eth.llamarpc.com"),
                ChainConfig::new(ChainId::new(137), "https://polygon-rpc.com"),
                ChainConfig::new(ChainId::new(8453), "https://mainnet.base.org"),
            ],
            confirm_poll_secs: default_confirm_poll_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.chains.len(), 3);
        assert_eq!(config.confirm_poll_secs, 4);
        assert!(config.chain(ChainId::new(8453)).is_some());
        assert!(config.chain(ChainId::new(999)).is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.chains.len(), config.chains.len());
        assert_eq!(parsed.chains[0].rpc_url, config.chains[0].rpc_url);
    }

    #[test]
    fn test_chain_config_defaults_apply() {
        let json = r#"{"chains":[{"chain_id":11155111,"rpc_url":"https://rpc.sepolia.org"}]}"#;
        let parsed: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.confirm_poll_secs, 4);
        assert!(parsed.chains[0].tokens.is_empty());
    }
}
