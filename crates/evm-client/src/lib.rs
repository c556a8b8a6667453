//! evm-client: JSON-RPC gateway for EVM chains
//!
//! This crate provides the concrete transport behind the `ChainGateway` seam:
//! a JSON-RPC client with per-request timeouts, a minimal ABI codec for the
//! marketplace's fixed call surface, revert-reason decoding, and receipt
//! polling for confirmation tracking.

pub mod abi;
pub mod erc20;
pub mod feed;
pub mod gateway;
pub mod market;
pub mod receipts;
pub mod revert;
pub mod rpc;

pub use gateway::RpcGateway;
pub use rpc::JsonRpcClient;
