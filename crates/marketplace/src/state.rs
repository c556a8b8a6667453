//! Marketplace domain types

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use surety_core::{
    types::{Bps, LoanId, RequestId},
    ChainId,
};

use crate::calculator::HealthBand;
use crate::constants::SECONDS_PER_DAY;

/// What a borrower asks for. Immutable once handed to a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanTerms {
    pub collateral_token: Address,
    pub borrow_token: Address,
    /// Principal in borrow-token units
    pub principal: U256,
    /// Flat interest for the whole term, not annualized
    pub interest_rate_bps: Bps,
    pub duration_secs: u64,
}

impl LoanTerms {
    /// Term length in whole days, rounded up for policy lookup.
    pub fn duration_days(&self) -> u32 {
        days_ceil(self.duration_secs)
    }
}

/// What a lender puts up. Immutable once handed to a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferTerms {
    pub lend_token: Address,
    pub lend_amount: U256,
    pub collateral_token: Address,
    pub min_collateral_amount: U256,
    pub interest_rate_bps: Bps,
    pub duration_secs: u64,
}

impl OfferTerms {
    pub fn duration_days(&self) -> u32 {
        days_ceil(self.duration_secs)
    }
}

/// An open request a lender wants to fund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundTarget {
    pub request_id: RequestId,
    /// Collateral token as recorded on the request's origin chain
    pub collateral_token: Address,
    pub borrow_token: Address,
    /// Amount the lender pays out, in borrow-token units
    pub borrow_amount: U256,
    /// Chain the request was recorded on
    pub origin_chain_id: ChainId,
    /// Loan id on the source chain, required for cross-chain funding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_loan_id: Option<LoanId>,
}

/// LTV policy for one (collateral asset, duration bucket) pair, as
/// published by the marketplace contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LtvPolicy {
    pub collateral_asset: Address,
    pub duration_days: u32,
    pub ltv_bps: Bps,
    pub liquidation_threshold_bps: Bps,
}

/// Output of a quote: either the collateral required for a desired loan or
/// the maximum loan a given collateral supports, plus solvency context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollateralizationResult {
    /// Required collateral (borrow direction) or maximum borrow (lend
    /// direction), in the respective token's units
    pub required_or_max_amount: U256,
    /// Principal plus flat interest, in borrow-token units
    pub total_repayment: U256,
    /// Health factor scaled by 1e4; `None` when there is no debt
    pub health_factor_e4: Option<U256>,
    pub ltv_bps: Bps,
}

impl CollateralizationResult {
    /// Presentation band for the health factor, if one is defined.
    pub fn health_band(&self) -> Option<HealthBand> {
        self.health_factor_e4.map(HealthBand::classify)
    }
}

/// A wallet's standing for one token against the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletPosition {
    pub balance: U256,
    pub allowance: U256,
}

fn days_ceil(secs: u64) -> u32 {
    let days = secs.div_ceil(SECONDS_PER_DAY);
    u32::try_from(days).unwrap_or(u32::MAX)
}
