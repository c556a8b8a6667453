//! Marketplace contract surface
//!
//! Policy reads plus the calldata builders for every economic action a flow
//! submits. Builders only assemble `ContractCall` values; validation happens
//! in the flows, simulation and submission go through the gateway.

use alloy_primitives::{Address, U256};
use surety_core::types::{Bps, LoanId, OfferId, RequestId};
use surety_core::{ChainGateway, ChainId, ContractCall, RpcError};

use crate::abi::{decode_uint, CallData};

/// Read the LTV cap in basis points for an asset at a duration bucket.
/// The contract answers zero for an unconfigured (asset, duration) pair.
pub async fn ltv(
    gateway: &dyn ChainGateway,
    chain_id: ChainId,
    market: Address,
    collateral_asset: Address,
    duration_days: u32,
) -> Result<U256, RpcError> {
    let data = CallData::new("ltv(address,uint256)")
        .address(collateral_asset)
        .uint64(duration_days as u64)
        .build();
    let call = ContractCall::new(chain_id, Address::ZERO, market, data);
    let raw = gateway.call(&call).await?;
    decode_uint(&raw)
}

/// Read the liquidation threshold in basis points for an asset.
pub async fn liquidation_threshold(
    gateway: &dyn ChainGateway,
    chain_id: ChainId,
    market: Address,
    collateral_asset: Address,
) -> Result<U256, RpcError> {
    let data = CallData::new("liquidationThreshold(address)")
        .address(collateral_asset)
        .build();
    let call = ContractCall::new(chain_id, Address::ZERO, market, data);
    let raw = gateway.call(&call).await?;
    decode_uint(&raw)
}

/// `createLoanRequest`: borrower posts a request, locking collateral.
#[allow(clippy::too_many_arguments)]
pub fn create_loan_request_call(
    chain_id: ChainId,
    sender: Address,
    market: Address,
    collateral_token: Address,
    collateral_amount: U256,
    borrow_token: Address,
    borrow_amount: U256,
    interest_rate_bps: Bps,
    duration_secs: u64,
) -> ContractCall {
    let data = CallData::new("createLoanRequest(address,uint256,address,uint256,uint256,uint256)")
        .address(collateral_token)
        .uint(collateral_amount)
        .address(borrow_token)
        .uint(borrow_amount)
        .uint64(interest_rate_bps as u64)
        .uint64(duration_secs)
        .build();
    ContractCall::new(chain_id, sender, market, data)
}

/// `createLenderOffer`: lender posts principal, naming minimum collateral.
#[allow(clippy::too_many_arguments)]
pub fn create_lender_offer_call(
    chain_id: ChainId,
    sender: Address,
    market: Address,
    lend_token: Address,
    lend_amount: U256,
    collateral_token: Address,
    min_collateral_amount: U256,
    interest_rate_bps: Bps,
    duration_secs: u64,
) -> ContractCall {
    let data = CallData::new("createLenderOffer(address,uint256,address,uint256,uint256,uint256)")
        .address(lend_token)
        .uint(lend_amount)
        .address(collateral_token)
        .uint(min_collateral_amount)
        .uint64(interest_rate_bps as u64)
        .uint64(duration_secs)
        .build();
    ContractCall::new(chain_id, sender, market, data)
}

/// `fundLoanRequest`: lender funds a same-chain request.
pub fn fund_loan_request_call(
    chain_id: ChainId,
    sender: Address,
    market: Address,
    request_id: RequestId,
) -> ContractCall {
    let data = CallData::new("fundLoanRequest(uint256)")
        .uint(request_id)
        .build();
    ContractCall::new(chain_id, sender, market, data)
}

/// `fundCrossChainLoanRequest`: funding leg for a request whose collateral
/// sits on another chain.
pub fn fund_cross_chain_request_call(
    chain_id: ChainId,
    sender: Address,
    market: Address,
    request_id: RequestId,
    source_chain_id: ChainId,
    source_loan_id: LoanId,
) -> ContractCall {
    let data = CallData::new("fundCrossChainLoanRequest(uint256,uint256,uint256)")
        .uint(request_id)
        .uint64(source_chain_id.as_u64())
        .uint(source_loan_id)
        .build();
    ContractCall::new(chain_id, sender, market, data)
}

/// `acceptFiatLoanOffer`: borrower locks collateral against a fiat offer.
pub fn accept_fiat_offer_call(
    chain_id: ChainId,
    sender: Address,
    market: Address,
    offer_id: OfferId,
    collateral_amount: U256,
) -> ContractCall {
    let data = CallData::new("acceptFiatLoanOffer(uint256,uint256)")
        .uint(offer_id)
        .uint(collateral_amount)
        .build();
    ContractCall::new(chain_id, sender, market, data)
}

/// `requestLoanExtension`: borrower asks for more time on an active loan.
pub fn request_extension_call(
    chain_id: ChainId,
    sender: Address,
    market: Address,
    loan_id: LoanId,
    additional_secs: u64,
) -> ContractCall {
    let data = CallData::new("requestLoanExtension(uint256,uint256)")
        .uint(loan_id)
        .uint64(additional_secs)
        .build();
    ContractCall::new(chain_id, sender, market, data)
}
