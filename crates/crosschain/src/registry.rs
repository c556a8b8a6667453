//! Per-chain token registry
//!
//! Within one chain a symbol resolves to exactly one address and an address
//! to exactly one symbol; inserts that would break either direction are
//! rejected. The same symbol may exist on many chains with different
//! addresses, which is what route resolution feeds on.

use std::collections::HashMap;

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use surety_core::{AppConfig, ChainId};
use thiserror::Error;

/// A token as it exists on one specific chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenIdentity {
    pub symbol: String,
    pub chain_id: ChainId,
    pub address: Address,
    pub decimals: u8,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{symbol} is already registered on chain {chain_id} at {existing}")]
    DuplicateSymbol {
        symbol: String,
        chain_id: ChainId,
        existing: Address,
    },

    #[error("Address {address} on chain {chain_id} is already registered as {existing}")]
    DuplicateAddress {
        address: Address,
        chain_id: ChainId,
        existing: String,
    },
}

const BUILTIN_TOKENS: [(u64, &str, Address, u8); 18] = [
    // Ethereum
    (
        1,
        "USDC",
        address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
        6,
    ),
    (
        1,
        "WETH",
        address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"),
        18,
    ),
    (
        1,
        "DAI",
        address!("6b175474e89094c44da98b954eedeac495271d0f"),
        18,
    ),
    (
        1,
        "WBTC",
        address!("2260fac5e5542a773aa44fbcfedf7c193bc2c599"),
        8,
    ),
    // Polygon
    (
        137,
        "USDC",
        address!("3c499c542cef5e3811e1192ce70d8cc03d5c3359"),
        6,
    ),
    (
        137,
        "WETH",
        address!("7ceb23fd6bc0add59e62ac25578270cff1b9f619"),
        18,
    ),
    (
        137,
        "DAI",
        address!("8f3cf7ad23cd3cadbd9735aff958023239c6a063"),
        18,
    ),
    (
        137,
        "WBTC",
        address!("1bfd67037b42cf73acf2047067bd4f2c47d9bfd6"),
        8,
    ),
    // Base
    (
        8453,
        "USDC",
        address!("833589fcd6edb6e08f4c7c32d4f71b54bda02913"),
        6,
    ),
    (
        8453,
        "WETH",
        address!("4200000000000000000000000000000000000006"),
        18,
    ),
    (
        8453,
        "DAI",
        address!("50c5725949a6f0c72e6c4a641f24049a917db0cb"),
        18,
    ),
    // Arbitrum One
    (
        42161,
        "USDC",
        address!("af88d065e77c8cc2239327c5edb3a432268e5831"),
        6,
    ),
    (
        42161,
        "WETH",
        address!("82af49447d8a07e3bd95bd0d56f35241523fbab1"),
        18,
    ),
    (
        42161,
        "WBTC",
        address!("2f2a2543b76a4166549f7aab2e75bef0aefc5b0f"),
        8,
    ),
    // Sepolia
    (
        11155111,
        "USDC",
        address!("1c7d4b196cb0c7b01d743fbc6116a902379c7238"),
        6,
    ),
    (
        11155111,
        "WETH",
        address!("fff9976782d46cc05630d1f6ebab18b2324d6b14"),
        18,
    ),
    // Base Sepolia
    (
        84532,
        "USDC",
        address!("036cbd53842c5426634e7929541ec2318f3dcf7e"),
        6,
    ),
    (
        84532,
        "WETH",
        address!("4200000000000000000000000000000000000006"),
        18,
    ),
];

/// All known [`TokenIdentity`] entries, indexed per chain.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    by_chain: HashMap<ChainId, Vec<TokenIdentity>>,
}

impl TokenRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the built-in token table.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (chain, symbol, address, decimals) in BUILTIN_TOKENS {
            let identity = TokenIdentity {
                symbol: symbol.to_string(),
                chain_id: ChainId::new(chain),
                address,
                decimals,
            };
            // Collision-freedom of the built-in table is covered by a test.
            let _ = registry.insert(identity);
        }
        registry
    }

    /// Built-in table plus tokens declared in configuration. Configuration
    /// entries that collide with an existing registration are an error, not
    /// a silent override.
    pub fn from_config(config: &AppConfig) -> Result<Self, RegistryError> {
        let mut registry = Self::builtin();
        for chain in &config.chains {
            for entry in &chain.tokens {
                registry.insert(TokenIdentity {
                    symbol: entry.symbol.clone(),
                    chain_id: chain.chain_id,
                    address: entry.address,
                    decimals: entry.decimals,
                })?;
            }
        }
        Ok(registry)
    }

    pub fn insert(&mut self, identity: TokenIdentity) -> Result<(), RegistryError> {
        let tokens = self.by_chain.entry(identity.chain_id).or_default();
        for existing in tokens.iter() {
            if existing.symbol.eq_ignore_ascii_case(&identity.symbol) {
                return Err(RegistryError::DuplicateSymbol {
                    symbol: identity.symbol,
                    chain_id: identity.chain_id,
                    existing: existing.address,
                });
            }
            if existing.address == identity.address {
                return Err(RegistryError::DuplicateAddress {
                    address: identity.address,
                    chain_id: identity.chain_id,
                    existing: existing.symbol.clone(),
                });
            }
        }
        tokens.push(identity);
        Ok(())
    }

    /// Look up by symbol, case-insensitively.
    pub fn by_symbol(&self, chain_id: ChainId, symbol: &str) -> Option<&TokenIdentity> {
        self.by_chain
            .get(&chain_id)?
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Look up by address. `Address` compares raw bytes, so mixed-case hex
    /// input resolves the same entry.
    pub fn by_address(&self, chain_id: ChainId, address: Address) -> Option<&TokenIdentity> {
        self.by_chain
            .get(&chain_id)?
            .iter()
            .find(|t| t.address == address)
    }

    pub fn contains(&self, chain_id: ChainId, address: Address) -> bool {
        self.by_address(chain_id, address).is_some()
    }

    pub fn decimals(&self, chain_id: ChainId, address: Address) -> Option<u8> {
        self.by_address(chain_id, address).map(|t| t.decimals)
    }

    /// Chains that know this address, ascending by chain id.
    pub fn chains_with(&self, address: Address) -> Vec<ChainId> {
        let mut chains: Vec<ChainId> = self
            .by_chain
            .iter()
            .filter(|(_, tokens)| tokens.iter().any(|t| t.address == address))
            .map(|(chain_id, _)| *chain_id)
            .collect();
        chains.sort_by_key(|c| c.as_u64());
        chains
    }

    /// All tokens registered on a chain, sorted by symbol for display.
    pub fn tokens(&self, chain_id: ChainId) -> Vec<&TokenIdentity> {
        let mut tokens: Vec<&TokenIdentity> = self
            .by_chain
            .get(&chain_id)
            .map(|t| t.iter().collect())
            .unwrap_or_default();
        tokens.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        tokens
    }
}
