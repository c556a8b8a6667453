//! The approval-then-action flow contract
//!
//! Creating a request, posting an offer, funding, accepting and extending
//! all reduce to the same two-phase shape. Flows describe their calls and
//! guards; the engine owns sequencing, simulation, and state transitions.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use surety_core::ContractCall;

use crate::error::FlowError;

/// An allowance gap that must be approved before the action can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalNeed {
    pub token: Address,
    pub spender: Address,
    /// Amount the action will pull
    pub required: U256,
    /// Allowance currently granted on chain
    pub current: U256,
}

/// One marketplace action, expressed as the pieces the engine needs.
///
/// Implementations fetch live chain state (balances, allowances, prices)
/// inside these methods rather than caching it at construction, so a wallet
/// that switches networks or spends funds mid-flow is caught by the next
/// check instead of a stale snapshot.
#[async_trait]
pub trait ApprovalThenAction: Send + Sync {
    /// Short description for logs, e.g. "create loan request".
    fn describe(&self) -> String;

    /// Guards evaluated before anything is sent. An error here means the
    /// submission never starts; the machine stays idle.
    async fn preflight(&self) -> Result<(), FlowError>;

    /// Re-read the on-chain allowance and report the gap, if any. Called
    /// again after every confirmed approval.
    async fn allowance_shortfall(&self) -> Result<Option<ApprovalNeed>, FlowError>;

    /// Build the approval transaction covering `need`.
    async fn approval_call(&self, need: &ApprovalNeed) -> Result<ContractCall, FlowError>;

    /// Build the economic action itself.
    async fn action_call(&self) -> Result<ContractCall, FlowError>;
}
