//! Collateralization math
//!
//! Pure fixed-point arithmetic; nothing here touches the network or the
//! clock. USD values are 8-decimal fixed point throughout, amounts are in
//! each token's own decimals, and rates are basis points. Interest is flat
//! for the whole term, not annualized. Conversions that hand value to the
//! protocol round up, conversions that take value out round down, so
//! rounding never favors the caller.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use surety_core::{
    types::{constants::BPS_DENOM, Bps},
    units::{mul_div, mul_div_ceil, pow10},
    MarketError,
};
use thiserror::Error;

/// A calculation that cannot produce a number. Callers must surface these;
/// substituting zero or infinity would misprice a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CalcError {
    #[error("an LTV of zero cannot secure a loan")]
    ZeroLtv,

    #[error("a price of zero cannot convert amounts")]
    ZeroPrice,

    #[error("amounts overflow the calculation space")]
    Overflow,
}

impl From<CalcError> for MarketError {
    fn from(err: CalcError) -> Self {
        MarketError::CannotCompute {
            reason: err.to_string(),
        }
    }
}

/// Price and scale of one asset, enough to convert between token units and
/// 8-decimal USD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetPrice {
    /// USD per whole token, 8-decimal fixed point
    pub usd_e8: U256,
    /// The token's own decimal count
    pub decimals: u8,
}

impl AssetPrice {
    pub fn new(usd_e8: U256, decimals: u8) -> Self {
        Self { usd_e8, decimals }
    }
}

/// Principal plus flat interest, in the same units as the principal.
pub fn total_repayment(principal: U256, interest_rate_bps: Bps) -> Result<U256, CalcError> {
    let numerator = U256::from(BPS_DENOM) + U256::from(interest_rate_bps);
    mul_div_ceil(principal, numerator, U256::from(BPS_DENOM)).ok_or(CalcError::Overflow)
}

/// USD value of a token amount, rounded down.
pub fn usd_value(amount: U256, price: &AssetPrice) -> Result<U256, CalcError> {
    mul_div(amount, price.usd_e8, pow10(price.decimals)).ok_or(CalcError::Overflow)
}

/// Token units worth `usd_e8`, rounded up. Used when the caller must
/// provide at least this much value.
pub fn units_from_usd_ceil(usd_e8: U256, price: &AssetPrice) -> Result<U256, CalcError> {
    if price.usd_e8.is_zero() {
        return Err(CalcError::ZeroPrice);
    }
    mul_div_ceil(usd_e8, pow10(price.decimals), price.usd_e8).ok_or(CalcError::Overflow)
}

/// Token units worth `usd_e8`, rounded down. Used when the caller takes
/// value out.
pub fn units_from_usd_floor(usd_e8: U256, price: &AssetPrice) -> Result<U256, CalcError> {
    if price.usd_e8.is_zero() {
        return Err(CalcError::ZeroPrice);
    }
    mul_div(usd_e8, pow10(price.decimals), price.usd_e8).ok_or(CalcError::Overflow)
}

/// Collateral, in collateral-token units, required to secure a loan of
/// `principal` at the given flat rate and LTV.
pub fn required_collateral(
    principal: U256,
    interest_rate_bps: Bps,
    ltv_bps: Bps,
    collateral: &AssetPrice,
    borrow: &AssetPrice,
) -> Result<U256, CalcError> {
    if ltv_bps == 0 {
        return Err(CalcError::ZeroLtv);
    }
    let repayment = total_repayment(principal, interest_rate_bps)?;
    // The debt ceiling is on the full repayment, so the collateral must
    // cover repayment / LTV in USD terms.
    let repayment_usd = mul_div_ceil(repayment, borrow.usd_e8, pow10(borrow.decimals))
        .ok_or(CalcError::Overflow)?;
    let required_usd = mul_div_ceil(repayment_usd, U256::from(BPS_DENOM), U256::from(ltv_bps))
        .ok_or(CalcError::Overflow)?;
    units_from_usd_ceil(required_usd, collateral)
}

/// Largest borrow, in borrow-token units, a given collateral supports.
pub fn max_borrow(
    collateral_amount: U256,
    ltv_bps: Bps,
    collateral: &AssetPrice,
    borrow: &AssetPrice,
) -> Result<U256, CalcError> {
    if ltv_bps == 0 {
        return Err(CalcError::ZeroLtv);
    }
    let collateral_usd = usd_value(collateral_amount, collateral)?;
    let max_loan_usd = mul_div(collateral_usd, U256::from(ltv_bps), U256::from(BPS_DENOM))
        .ok_or(CalcError::Overflow)?;
    units_from_usd_floor(max_loan_usd, borrow)
}

/// Health factor scaled by 1e4, or `None` when there is no debt to be
/// healthy against. 1e4 means the position sits exactly at the
/// liquidation boundary.
pub fn health_factor(
    collateral_value_usd: U256,
    liquidation_threshold_bps: Bps,
    loan_value_usd: U256,
) -> Result<Option<U256>, CalcError> {
    if loan_value_usd.is_zero() {
        return Ok(None);
    }
    mul_div(
        collateral_value_usd,
        U256::from(liquidation_threshold_bps),
        loan_value_usd,
    )
    .map(Some)
    .ok_or(CalcError::Overflow)
}

/// Presentation severity for a health factor. These bands drive styling
/// only; liquidation eligibility is the contract's call, made at 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthBand {
    Healthy,
    Caution,
    Risk,
}

/// Health factors at or above this (scaled 1e4) render as healthy.
pub const HEALTHY_MIN_E4: u64 = 15_000;

/// Health factors at or above this but below healthy render as caution.
pub const CAUTION_MIN_E4: u64 = 12_000;

impl HealthBand {
    pub fn classify(health_factor_e4: U256) -> Self {
        if health_factor_e4 >= U256::from(HEALTHY_MIN_E4) {
            HealthBand::Healthy
        } else if health_factor_e4 >= U256::from(CAUTION_MIN_E4) {
            HealthBand::Caution
        } else {
            HealthBand::Risk
        }
    }
}
