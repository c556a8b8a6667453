//! Chain reads specific to the marketplace contract

use alloy_primitives::Address;
use evm_client::{erc20, market};
use futures::future::try_join;
use surety_core::{types::Bps, ChainGateway, ChainId, RpcError};
use tracing::debug;

use crate::state::{LtvPolicy, WalletPosition};

/// Fetch the LTV policy for a (collateral asset, duration bucket) pair.
///
/// The contract answers zero for pairs it has no policy for; that is
/// reported as `None` rather than a zero-LTV policy, so callers surface a
/// missing-policy error instead of quoting an unborrowable loan.
pub async fn ltv_policy(
    gateway: &dyn ChainGateway,
    chain_id: ChainId,
    market_addr: Address,
    collateral_asset: Address,
    duration_days: u32,
) -> Result<Option<LtvPolicy>, RpcError> {
    let (ltv, threshold) = try_join(
        market::ltv(gateway, chain_id, market_addr, collateral_asset, duration_days),
        market::liquidation_threshold(gateway, chain_id, market_addr, collateral_asset),
    )
    .await?;

    if ltv.is_zero() {
        debug!(asset = %collateral_asset, duration_days, "no LTV policy published");
        return Ok(None);
    }

    let ltv_bps = to_bps(ltv, "ltv")?;
    let liquidation_threshold_bps = to_bps(threshold, "liquidationThreshold")?;
    Ok(Some(LtvPolicy {
        collateral_asset,
        duration_days,
        ltv_bps,
        liquidation_threshold_bps,
    }))
}

/// Balance and marketplace allowance for one token, fetched together.
pub async fn wallet_position(
    gateway: &dyn ChainGateway,
    chain_id: ChainId,
    token: Address,
    owner: Address,
    spender: Address,
) -> Result<WalletPosition, RpcError> {
    let (balance, allowance) = try_join(
        erc20::balance_of(gateway, chain_id, token, owner),
        erc20::allowance(gateway, chain_id, token, owner, spender),
    )
    .await?;
    Ok(WalletPosition { balance, allowance })
}

fn to_bps(value: alloy_primitives::U256, what: &str) -> Result<Bps, RpcError> {
    u32::try_from(value).map_err(|_| RpcError::ParseError(format!("{what} exceeds u32 range")))
}
