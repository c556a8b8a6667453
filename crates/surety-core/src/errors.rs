//! Error types for Surety

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ChainId;

/// Core errors that can occur in Surety
#[derive(Debug, Error)]
pub enum Error {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Market error: {0}")]
    Market(#[from] MarketError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Transport-level errors from a chain endpoint
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Endpoint unreachable at {url}")]
    Unreachable { url: String },

    #[error("Request timed out: {method}")]
    Timeout { method: String },

    #[error("RPC returned error {code}: {message}")]
    ApiError {
        code: i64,
        message: String,
        /// Raw revert payload carried in the error's `data` field, if any
        data: Option<String>,
    },

    #[error("Rejected by wallet: {message}")]
    Rejected { message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("No endpoint configured for chain {chain_id}")]
    ChainNotConfigured { chain_id: ChainId },
}

impl RpcError {
    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unreachable { .. } | Self::Timeout { .. } | Self::Rejected { .. } => true,
            Self::ApiError { .. } | Self::ParseError(_) | Self::ChainNotConfigured { .. } => false,
        }
    }
}

/// Marketplace domain errors surfaced to the rendering layer
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    #[error("No {symbol} balance in the connected wallet")]
    ZeroBalance { symbol: String },

    #[error("Insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: U256, available: U256 },

    #[error("Price unavailable for {symbol} on chain {chain_id}: {reason}")]
    PriceUnavailable {
        symbol: String,
        chain_id: ChainId,
        reason: String,
    },

    #[error("Price for {symbol} expired {expired_for_secs}s ago")]
    PriceStale { symbol: String, expired_for_secs: u64 },

    #[error("No LTV policy for {asset} at {duration_days} days")]
    PolicyMissing { asset: String, duration_days: u32 },

    #[error("Token {address} not known on chain {chain_id}")]
    UnknownToken { address: Address, chain_id: ChainId },

    #[error("Connected to chain {connected}, expected {expected}")]
    WrongNetwork { expected: ChainId, connected: ChainId },

    #[error("Cannot compute: {reason}")]
    CannotCompute { reason: String },

    #[error("Action not allowed: {reason}")]
    ActionNotAllowed { reason: String },
}

impl MarketError {
    /// Stable code for surface-side branching on the failure kind.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::ZeroBalance { .. } => "zero_balance",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::PriceUnavailable { .. } => "price_unavailable",
            Self::PriceStale { .. } => "price_stale",
            Self::PolicyMissing { .. } => "policy_missing",
            Self::UnknownToken { .. } => "unknown_token",
            Self::WrongNetwork { .. } => "wrong_network",
            Self::CannotCompute { .. } => "cannot_compute",
            Self::ActionNotAllowed { .. } => "action_not_allowed",
        }
    }
}

/// Result type alias for Surety operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Classified revert reason.
///
/// Classification order is strict: ABI decoding of the revert payload first,
/// then pattern extraction from the raw message, then the raw text as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DecodedError {
    /// Revert payload decoded against a known error ABI
    AbiDecoded { name: String, args: Vec<String> },
    /// Human-readable revert string extracted from the raw message text
    PatternMatched { text: String },
    /// Nothing recognizable; raw message or hex payload preserved verbatim
    Unknown { raw: String },
}

impl DecodedError {
    /// Extract a revert string from common node/wallet message shapes.
    ///
    /// Returns `PatternMatched` only when a reason string is actually
    /// present; a bare failure message stays `Unknown`.
    pub fn from_message(raw: &str) -> Self {
        const PATTERNS: [&str; 3] = [
            "execution reverted:",
            "reverted with reason string '",
            "VM Exception while processing transaction: revert ",
        ];

        for pattern in PATTERNS {
            if let Some(idx) = raw.find(pattern) {
                let tail = &raw[idx + pattern.len()..];
                let text = if pattern.ends_with('\'') {
                    tail.split('\'').next().unwrap_or(tail)
                } else {
                    tail
                };
                let text = text.trim().trim_end_matches('.');
                if !text.is_empty() {
                    return Self::PatternMatched {
                        text: text.to_string(),
                    };
                }
            }
        }

        Self::Unknown {
            raw: raw.to_string(),
        }
    }

    /// Wrap an undecodable revert payload, preserving it as hex.
    pub fn unknown_from_bytes(raw: &[u8]) -> Self {
        Self::Unknown {
            raw: format!("0x{}", hex::encode(raw)),
        }
    }

    /// Human-readable message for the `Failed` reason string.
    pub fn message(&self) -> String {
        match self {
            Self::AbiDecoded { name, args } if args.is_empty() => name.clone(),
            Self::AbiDecoded { name, args } => format!("{}({})", name, args.join(", ")),
            Self::PatternMatched { text } => text.clone(),
            Self::Unknown { raw } => raw.clone(),
        }
    }
}

impl std::fmt::Display for DecodedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_error_reason_codes() {
        let err = MarketError::InvalidAmount {
            message: "test".into(),
        };
        assert_eq!(err.reason_code(), "invalid_amount");

        let err = MarketError::InsufficientBalance {
            required: U256::from(100u64),
            available: U256::from(50u64),
        };
        assert_eq!(err.reason_code(), "insufficient_balance");
        assert_eq!(err.to_string(), "Insufficient balance: need 100, have 50");
    }

    #[test]
    fn test_pattern_extracts_geth_reason() {
        let decoded = DecodedError::from_message("execution reverted: insufficient collateral");
        assert_eq!(
            decoded,
            DecodedError::PatternMatched {
                text: "insufficient collateral".into()
            }
        );
    }

    #[test]
    fn test_pattern_extracts_quoted_reason() {
        let decoded =
            DecodedError::from_message("Error: reverted with reason string 'LTV exceeded'");
        assert_eq!(
            decoded,
            DecodedError::PatternMatched {
                text: "LTV exceeded".into()
            }
        );
    }

    #[test]
    fn test_bare_revert_stays_unknown() {
        let decoded = DecodedError::from_message("execution reverted");
        assert!(matches!(decoded, DecodedError::Unknown { .. }));
    }

    #[test]
    fn test_unknown_preserves_raw_hex() {
        let decoded = DecodedError::unknown_from_bytes(&[0xde, 0xad]);
        assert_eq!(decoded, DecodedError::Unknown { raw: "0xdead".into() });
    }

    #[test]
    fn test_rpc_retryability() {
        assert!(RpcError::Timeout {
            method: "eth_call".into()
        }
        .is_retryable());
        assert!(!RpcError::ParseError("bad json".into()).is_retryable());
    }
}
