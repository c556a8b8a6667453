//! Core type definitions for Surety

use std::fmt;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// EVM chain id (EIP-155)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction hash (32 bytes, 0x-prefixed hex)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Basis points (10000 = 100%)
pub type Bps = u32;

/// Marketplace loan-request identifier (uint256 on chain)
pub type RequestId = U256;

/// Marketplace lender-offer identifier (uint256 on chain)
pub type OfferId = U256;

/// Marketplace active-loan identifier (uint256 on chain)
pub type LoanId = U256;

/// Constants
pub mod constants {
    use super::Bps;

    /// Basis-point denominator (100%)
    pub const BPS_DENOM: Bps = 10_000;

    /// Decimal places of the USD fixed-point convention
    pub const USD_DECIMALS: u8 = 8;

    /// One dollar in USD fixed-point units
    pub const USD_SCALE: u64 = 100_000_000;
}

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_display() {
        assert_eq!(ChainId::new(8453).to_string(), "8453");
        assert_eq!(ChainId::from(137).as_u64(), 137);
    }

    #[test]
    fn test_tx_hash_roundtrip() {
        let hash = TxHash::new("0xabc123");
        assert_eq!(hash.as_str(), "0xabc123");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, "\"0xabc123\"");
    }
}
