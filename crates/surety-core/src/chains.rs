//! Known chains
//!
//! Static registry of the chains the marketplace is deployed to. Chains can
//! also arrive through configuration; anything not listed here is treated as
//! a main network, so test-only affordances stay off by default.

use crate::types::ChainId;

/// Descriptive data for a known chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainInfo {
    pub id: ChainId,
    pub name: &'static str,
    pub is_testnet: bool,
}

/// Chains with built-in support
pub const KNOWN_CHAINS: [ChainInfo; 7] = [
    ChainInfo {
        id: ChainId::new(1),
        name: "Ethereum",
        is_testnet: false,
    },
    ChainInfo {
        id: ChainId::new(137),
        name: "Polygon",
        is_testnet: false,
    },
    ChainInfo {
        id: ChainId::new(8453),
        name: "Base",
        is_testnet: false,
    },
    ChainInfo {
        id: ChainId::new(42161),
        name: "Arbitrum One",
        is_testnet: false,
    },
    ChainInfo {
        id: ChainId::new(11155111),
        name: "Sepolia",
        is_testnet: true,
    },
    ChainInfo {
        id: ChainId::new(84532),
        name: "Base Sepolia",
        is_testnet: true,
    },
    ChainInfo {
        id: ChainId::new(80002),
        name: "Polygon Amoy",
        is_testnet: true,
    },
];

/// Look up a known chain by id.
pub fn chain_info(id: ChainId) -> Option<&'static ChainInfo> {
    KNOWN_CHAINS.iter().find(|c| c.id == id)
}

/// Whether a chain is a test network. Unknown chains count as production.
pub fn is_testnet(id: ChainId) -> bool {
    chain_info(id).map(|c| c.is_testnet).unwrap_or(false)
}

/// Human-readable chain name for messages.
pub fn chain_name(id: ChainId) -> String {
    match chain_info(id) {
        Some(info) => info.name.to_string(),
        None => format!("chain {}", id),
    }
}
