//! ERC-20 reads and the approval calldata builder

use alloy_primitives::{Address, U256};
use surety_core::{ChainGateway, ChainId, ContractCall, RpcError};

use crate::abi::{decode_uint, CallData};

/// Read-only calls carry a zero sender; nodes accept it for `eth_call`.
fn view_call(chain_id: ChainId, token: Address, data: alloy_primitives::Bytes) -> ContractCall {
    ContractCall::new(chain_id, Address::ZERO, token, data)
}

/// Current token balance of `owner`.
pub async fn balance_of(
    gateway: &dyn ChainGateway,
    chain_id: ChainId,
    token: Address,
    owner: Address,
) -> Result<U256, RpcError> {
    let data = CallData::new("balanceOf(address)").address(owner).build();
    let raw = gateway.call(&view_call(chain_id, token, data)).await?;
    decode_uint(&raw)
}

/// Current allowance granted by `owner` to `spender`.
pub async fn allowance(
    gateway: &dyn ChainGateway,
    chain_id: ChainId,
    token: Address,
    owner: Address,
    spender: Address,
) -> Result<U256, RpcError> {
    let data = CallData::new("allowance(address,address)")
        .address(owner)
        .address(spender)
        .build();
    let raw = gateway.call(&view_call(chain_id, token, data)).await?;
    decode_uint(&raw)
}

/// Build the `approve(spender, amount)` transaction for `owner` to sign.
pub fn approve_call(
    chain_id: ChainId,
    owner: Address,
    token: Address,
    spender: Address,
    amount: U256,
) -> ContractCall {
    let data = CallData::new("approve(address,uint256)")
        .address(spender)
        .uint(amount)
        .build();
    ContractCall::new(chain_id, owner, token, data)
}
