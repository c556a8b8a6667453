//! Chain gateway seam
//!
//! Everything above this trait is testable against an in-memory fake; the
//! JSON-RPC implementation lives in `evm-client`.

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{DecodedError, RpcError};
use crate::types::{ChainId, TxHash};

/// A prepared contract interaction: target, sender, and encoded calldata.
///
/// The same value is used for reads (`call`), dry runs (`simulate`), and
/// submission (`submit`) so a simulated call is guaranteed to carry identical
/// arguments to the transaction that follows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCall {
    pub chain_id: ChainId,
    pub from: Address,
    pub to: Address,
    #[serde(default)]
    pub value: U256,
    pub data: Bytes,
}

impl ContractCall {
    pub fn new(chain_id: ChainId, from: Address, to: Address, data: Bytes) -> Self {
        Self {
            chain_id,
            from,
            to,
            value: U256::ZERO,
            data,
        }
    }
}

/// Result of a dry-run simulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationOutcome {
    /// The call would succeed
    Pass,
    /// The call would revert; classified reason attached
    Reverted(DecodedError),
}

impl SimulationOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Mined-transaction status from a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// Transaction receipt, present once the transaction is mined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub status: ReceiptStatus,
}

/// Access to a set of EVM chains.
///
/// The five primitives the marketplace needs: read, dry-run, submit, poll a
/// receipt, and report the wallet's active chain. Implementations route by
/// `ContractCall::chain_id`.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Execute a read-only call and return the raw return data.
    async fn call(&self, call: &ContractCall) -> Result<Bytes, RpcError>;

    /// Dry-run a state-changing call without broadcasting it.
    ///
    /// A revert is a normal outcome here, not a transport error.
    async fn simulate(&self, call: &ContractCall) -> Result<SimulationOutcome, RpcError>;

    /// Broadcast a state-changing call, returning its hash on acceptance.
    async fn submit(&self, call: &ContractCall) -> Result<TxHash, RpcError>;

    /// Fetch the receipt for a transaction. `None` while still pending.
    async fn receipt(&self, chain_id: ChainId, tx: &TxHash)
        -> Result<Option<TxReceipt>, RpcError>;

    /// The wallet's currently active chain.
    ///
    /// May change underneath an in-flight flow; callers re-derive from it on
    /// every chain-sensitive computation instead of caching it.
    async fn connected_chain_id(&self) -> Result<ChainId, RpcError>;
}
