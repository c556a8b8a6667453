//! Flow failure taxonomy

use surety_core::{DecodedError, MarketError, RpcError};
use thiserror::Error;

/// Everything that can stop an [`ApprovalThenAction`] attempt.
///
/// [`ApprovalThenAction`]: crate::flow::ApprovalThenAction
#[derive(Debug, Error)]
pub enum FlowError {
    /// A guard refused the submission before anything touched the network.
    #[error("{0}")]
    Blocked(MarketError),

    /// The dry run rejected the transaction; nothing was submitted.
    #[error("Simulation rejected: {0}")]
    SimulationRejected(DecodedError),

    /// The transaction was broadcast and reverted on chain. Fatal for this
    /// attempt; resubmitting automatically is never safe.
    #[error("Reverted on chain: {0}")]
    Reverted(DecodedError),

    /// Approval confirmed but the re-fetched allowance still falls short.
    #[error("Allowance did not reach the required amount after approval")]
    AllowanceUnchanged,

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl FlowError {
    /// Whether the user can simply try again without changing anything.
    pub fn is_retryable(&self) -> bool {
        match self {
            FlowError::Rpc(e) => e.is_retryable(),
            FlowError::Blocked(_) => false,
            FlowError::SimulationRejected(_) => false,
            FlowError::Reverted(_) => false,
            FlowError::AllowanceUnchanged => false,
        }
    }

    /// Wallet rejections abandon the attempt; the machine goes back to
    /// `Idle` instead of `Failed`.
    pub fn resets_to_idle(&self) -> bool {
        matches!(self, FlowError::Rpc(RpcError::Rejected { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_rejection_is_retryable_and_resets() {
        let err = FlowError::Rpc(RpcError::Rejected {
            message: "User rejected the request".to_string(),
        });
        assert!(err.is_retryable());
        assert!(err.resets_to_idle());
    }

    #[test]
    fn test_revert_is_fatal() {
        let err = FlowError::Reverted(DecodedError::Unknown {
            raw: "transaction reverted".to_string(),
        });
        assert!(!err.is_retryable());
        assert!(!err.resets_to_idle());
    }

    #[test]
    fn test_simulation_rejection_reads_like_the_revert() {
        let err = FlowError::SimulationRejected(DecodedError::AbiDecoded {
            name: "Error".to_string(),
            args: vec!["amount is zero".to_string()],
        });
        assert_eq!(err.to_string(), "Simulation rejected: Error(amount is zero)");
    }
}
