//! Observable state of one transaction flow

use serde::{Deserialize, Serialize};

/// What a flow is doing right now. Owned by the engine; surfaces only
/// observe it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum TransactionState {
    /// Nothing in flight; submission is possible once guards pass.
    Idle,
    /// Approval transaction is being simulated or sits in the wallet.
    Approving,
    /// Approval was submitted; waiting for on-chain confirmation and the
    /// allowance re-check.
    Confirming,
    /// The economic action itself, from simulation through confirmation.
    Creating,
    /// Action confirmed. Held briefly so the user can read the outcome.
    Success,
    Failed { reason: String },
}

impl TransactionState {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// A transaction is in flight; starting another attempt is not allowed.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Approving | Self::Confirming | Self::Creating)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Approving => "approving",
            Self::Confirming => "confirming",
            Self::Creating => "creating",
            Self::Success => "success",
            Self::Failed { .. } => "failed",
        }
    }
}

impl Default for TransactionState {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "failed: {reason}"),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_covers_in_flight_states_only() {
        assert!(TransactionState::Approving.is_busy());
        assert!(TransactionState::Confirming.is_busy());
        assert!(TransactionState::Creating.is_busy());
        assert!(!TransactionState::Idle.is_busy());
        assert!(!TransactionState::Success.is_busy());
        assert!(!TransactionState::failed("nope").is_busy());
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(TransactionState::failed("simulation rejected")).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["reason"], "simulation rejected");

        let json = serde_json::to_value(TransactionState::Approving).unwrap();
        assert_eq!(json["state"], "approving");
    }

    #[test]
    fn test_display() {
        assert_eq!(TransactionState::Creating.to_string(), "creating");
        assert_eq!(
            TransactionState::failed("out of funds").to_string(),
            "failed: out of funds"
        );
    }
}
