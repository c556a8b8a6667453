//! Feed registry: which aggregator answers for which asset
//!
//! Ships with a built-in table for the supported chains; configuration can
//! add assets or override an entry (configuration wins on conflict).

use std::collections::HashMap;

use alloy_primitives::{address, Address};
use surety_core::{AppConfig, ChainId};

/// Where to read an asset's USD price and how long to trust an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedInfo {
    pub feed: Address,
    /// Decimals the feed reports its answer in
    pub decimals: u8,
    /// Trust window: an update older than this is stale
    pub heartbeat_secs: u64,
}

const BUILTIN_FEEDS: [(u64, &str, Address, u8, u64); 12] = [
    // Ethereum
    (
        1,
        "WETH",
        address!("5f4ec3df9cbd43714fe2740f5e3616155c5b8419"),
        8,
        3_600,
    ),
    (
        1,
        "WBTC",
        address!("f4030086522a5beea4988f8ca5b36dbc97bce88c"),
        8,
        3_600,
    ),
    (
        1,
        "USDC",
        address!("8fffffd4afb6115b954bd326cbe7b4ba576818f6"),
        8,
        86_400,
    ),
    (
        1,
        "DAI",
        address!("aed0c38402a5d19df6e4c03f4e2dced6e29c1ee9"),
        8,
        3_600,
    ),
    // Polygon
    (
        137,
        "WETH",
        address!("f9680d99d6c9589e2a93a78a04a279e509205945"),
        8,
        3_600,
    ),
    (
        137,
        "USDC",
        address!("fe4a8cc5b5b2366c1b58bea3858e81843581b2f7"),
        8,
        86_400,
    ),
    // Base
    (
        8453,
        "WETH",
        address!("71041dddad3595f9ced3dccfbe3d1f4b0a16bb70"),
        8,
        3_600,
    ),
    (
        8453,
        "USDC",
        address!("7e860098f58bbfc8648a4311b374b1d669a2bc6b"),
        8,
        86_400,
    ),
    // Sepolia
    (
        11155111,
        "WETH",
        address!("694aa1769357215de4fac081bf1f309adc325306"),
        8,
        3_600,
    ),
    (
        11155111,
        "WBTC",
        address!("1b44f3514812d835eb1bdb0acb33d3fa3351ee43"),
        8,
        3_600,
    ),
    (
        11155111,
        "USDC",
        address!("a2f78ab2355fe2f984d808b5cee7fd0a93d5270e"),
        8,
        86_400,
    ),
    // Base Sepolia
    (
        84532,
        "WETH",
        address!("4adc67696ba383f43dd60a9e78f2c97fbbfc7cb1"),
        8,
        3_600,
    ),
];

/// Per-chain map of asset symbol to price feed.
#[derive(Debug, Clone, Default)]
pub struct FeedRegistry {
    feeds: HashMap<ChainId, HashMap<String, FeedInfo>>,
}

impl FeedRegistry {
    /// Registry with no entries at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the built-in feed table.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (chain, symbol, feed, decimals, heartbeat_secs) in BUILTIN_FEEDS {
            registry.insert(
                ChainId::new(chain),
                symbol,
                FeedInfo {
                    feed,
                    decimals,
                    heartbeat_secs,
                },
            );
        }
        registry
    }

    /// Built-in table plus any feeds declared in configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut registry = Self::builtin();
        registry.extend_from_config(config);
        registry
    }

    /// Insert or replace the feed for an asset. Symbols are case-insensitive.
    pub fn insert(&mut self, chain_id: ChainId, symbol: &str, info: FeedInfo) {
        self.feeds
            .entry(chain_id)
            .or_default()
            .insert(symbol.to_uppercase(), info);
    }

    pub fn extend_from_config(&mut self, config: &AppConfig) {
        for chain in &config.chains {
            for entry in &chain.feeds {
                self.insert(
                    chain.chain_id,
                    &entry.symbol,
                    FeedInfo {
                        feed: entry.feed,
                        decimals: entry.decimals,
                        heartbeat_secs: entry.heartbeat_secs,
                    },
                );
            }
        }
    }

    pub fn lookup(&self, chain_id: ChainId, symbol: &str) -> Option<&FeedInfo> {
        self.feeds
            .get(&chain_id)
            .and_then(|by_symbol| by_symbol.get(&symbol.to_uppercase()))
    }

    /// Symbols with a feed on the given chain, sorted for display.
    pub fn symbols(&self, chain_id: ChainId) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .feeds
            .get(&chain_id)
            .map(|by_symbol| by_symbol.keys().cloned().collect())
            .unwrap_or_default();
        symbols.sort();
        symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surety_core::config::{ChainConfig, FeedEntry};

    #[test]
    fn test_builtin_lookup_is_case_insensitive() {
        let registry = FeedRegistry::builtin();
        let upper = registry.lookup(ChainId::new(1), "WETH").unwrap();
        let lower = registry.lookup(ChainId::new(1), "weth").unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.heartbeat_secs, 3_600);
    }

    #[test]
    fn test_missing_entries() {
        let registry = FeedRegistry::builtin();
        assert!(registry.lookup(ChainId::new(1), "SHIB").is_none());
        assert!(registry.lookup(ChainId::new(31337), "WETH").is_none());
    }

    #[test]
    fn test_config_overrides_builtin() {
        let override_feed = address!("00000000000000000000000000000000000000aa");
        let mut chain = ChainConfig::new(ChainId::new(1), "https://example.invalid");
        chain.feeds.push(FeedEntry {
            symbol: "WETH".to_string(),
            feed: override_feed,
            decimals: 18,
            heartbeat_secs: 600,
        });
        let config = AppConfig {
            chains: vec![chain],
            ..AppConfig::default()
        };

        let registry = FeedRegistry::from_config(&config);
        let info = registry.lookup(ChainId::new(1), "WETH").unwrap();
        assert_eq!(info.feed, override_feed);
        assert_eq!(info.decimals, 18);
        assert_eq!(info.heartbeat_secs, 600);
    }

    #[test]
    fn test_symbols_are_sorted() {
        let registry = FeedRegistry::builtin();
        let symbols = registry.symbols(ChainId::new(1));
        assert_eq!(symbols, vec!["DAI", "USDC", "WBTC", "WETH"]);
    }
}
