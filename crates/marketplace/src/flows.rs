//! One flow type per marketplace action
//!
//! Each flow packages the guard checks and the two calls (approval and
//! action) for its operation; the [`orchestrator`] engine drives them. Live
//! state (balances, allowances, the connected chain) is re-read inside the
//! checks rather than captured at construction, so wallets that switch
//! networks or spend funds mid-flow are caught.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use crosschain::{ChainRoute, TokenRegistry};
use evm_client::{erc20, market};
use orchestrator::{ApprovalNeed, ApprovalThenAction, FlowError};
use pricefeed::{PriceError, PriceResolver};
use surety_core::{
    types::{unix_now, Bps, LoanId, OfferId},
    ChainGateway, ChainId, ContractCall, Error, MarketError,
};

use crate::constants::MAX_INTEREST_RATE_BPS;
use crate::state::{FundTarget, LoanTerms, OfferTerms};

/// Lookups and targets shared by every flow.
#[derive(Clone)]
pub struct FlowContext {
    pub gateway: Arc<dyn ChainGateway>,
    pub prices: Arc<PriceResolver>,
    pub tokens: Arc<TokenRegistry>,
    /// Marketplace contract on the execution chain
    pub market: Address,
    /// Chain the action executes on
    pub chain_id: ChainId,
    /// Connected wallet account
    pub sender: Address,
}

impl FlowContext {
    fn blocked(err: MarketError) -> FlowError {
        FlowError::Blocked(err)
    }

    /// The wallet's chain is read fresh on every evaluation, never cached;
    /// wallets switch networks underneath in-flight flows.
    async fn require_connected_network(&self) -> Result<(), FlowError> {
        let connected = self.gateway.connected_chain_id().await?;
        if connected != self.chain_id {
            return Err(Self::blocked(MarketError::WrongNetwork {
                expected: self.chain_id,
                connected,
            }));
        }
        Ok(())
    }

    fn require_positive(&self, amount: U256, what: &str) -> Result<(), FlowError> {
        if amount.is_zero() {
            return Err(Self::blocked(MarketError::InvalidAmount {
                message: format!("{what} must be greater than zero"),
            }));
        }
        Ok(())
    }

    fn require_duration(&self, duration_secs: u64) -> Result<(), FlowError> {
        if duration_secs == 0 {
            return Err(Self::blocked(MarketError::InvalidAmount {
                message: "duration must be greater than zero".to_string(),
            }));
        }
        Ok(())
    }

    fn require_sane_rate(&self, rate: Bps) -> Result<(), FlowError> {
        if rate > MAX_INTEREST_RATE_BPS {
            return Err(Self::blocked(MarketError::InvalidAmount {
                message: format!("interest rate {rate} bps exceeds 100%"),
            }));
        }
        Ok(())
    }

    fn symbol_of(&self, token: Address) -> Result<String, FlowError> {
        self.tokens
            .by_address(self.chain_id, token)
            .map(|t| t.symbol.clone())
            .ok_or_else(|| {
                Self::blocked(MarketError::UnknownToken {
                    address: token,
                    chain_id: self.chain_id,
                })
            })
    }

    /// Zero balance and insufficient balance are distinct refusals; the
    /// first sends the user to funding, the second to a smaller amount.
    async fn require_funds(&self, token: Address, required: U256) -> Result<(), FlowError> {
        let symbol = self.symbol_of(token)?;
        let balance =
            erc20::balance_of(self.gateway.as_ref(), self.chain_id, token, self.sender).await?;
        if balance.is_zero() {
            return Err(Self::blocked(MarketError::ZeroBalance { symbol }));
        }
        if balance < required {
            return Err(Self::blocked(MarketError::InsufficientBalance {
                required,
                available: balance,
            }));
        }
        Ok(())
    }

    async fn require_fresh_price(&self, token: Address) -> Result<(), FlowError> {
        let symbol = self.symbol_of(token)?;
        self.prices
            .fetch_usable(self.chain_id, &symbol, unix_now())
            .await
            .map(|_| ())
            .map_err(|err| price_to_flow(err, self.chain_id))
    }

    async fn shortfall_for(
        &self,
        token: Address,
        required: U256,
    ) -> Result<Option<ApprovalNeed>, FlowError> {
        let current = erc20::allowance(
            self.gateway.as_ref(),
            self.chain_id,
            token,
            self.sender,
            self.market,
        )
        .await?;
        if current >= required {
            return Ok(None);
        }
        Ok(Some(ApprovalNeed {
            token,
            spender: self.market,
            required,
            current,
        }))
    }

    /// Approvals cover exactly the required amount, not unlimited.
    fn approval(&self, need: &ApprovalNeed) -> ContractCall {
        erc20::approve_call(self.chain_id, self.sender, need.token, need.spender, need.required)
    }
}

fn price_to_flow(err: PriceError, chain_id: ChainId) -> FlowError {
    match err.into_error(chain_id) {
        Error::Rpc(e) => FlowError::Rpc(e),
        Error::Market(e) => FlowError::Blocked(e),
        other => FlowError::Blocked(MarketError::ActionNotAllowed {
            reason: other.to_string(),
        }),
    }
}

/// Borrower escrows collateral and posts a request to borrow.
pub struct CreateLoanRequestFlow {
    ctx: FlowContext,
    terms: LoanTerms,
    collateral_amount: U256,
}

impl CreateLoanRequestFlow {
    pub fn new(ctx: FlowContext, terms: LoanTerms, collateral_amount: U256) -> Self {
        Self {
            ctx,
            terms,
            collateral_amount,
        }
    }
}

#[async_trait]
impl ApprovalThenAction for CreateLoanRequestFlow {
    fn describe(&self) -> String {
        "create loan request".to_string()
    }

    async fn preflight(&self) -> Result<(), FlowError> {
        let ctx = &self.ctx;
        ctx.require_positive(self.terms.principal, "principal")?;
        ctx.require_positive(self.collateral_amount, "collateral amount")?;
        ctx.require_sane_rate(self.terms.interest_rate_bps)?;
        ctx.require_duration(self.terms.duration_secs)?;
        ctx.require_connected_network().await?;
        ctx.require_funds(self.terms.collateral_token, self.collateral_amount)
            .await?;
        ctx.require_fresh_price(self.terms.collateral_token).await?;
        ctx.require_fresh_price(self.terms.borrow_token).await?;
        Ok(())
    }

    async fn allowance_shortfall(&self) -> Result<Option<ApprovalNeed>, FlowError> {
        self.ctx
            .shortfall_for(self.terms.collateral_token, self.collateral_amount)
            .await
    }

    async fn approval_call(&self, need: &ApprovalNeed) -> Result<ContractCall, FlowError> {
        Ok(self.ctx.approval(need))
    }

    async fn action_call(&self) -> Result<ContractCall, FlowError> {
        Ok(market::create_loan_request_call(
            self.ctx.chain_id,
            self.ctx.sender,
            self.ctx.market,
            self.terms.collateral_token,
            self.collateral_amount,
            self.terms.borrow_token,
            self.terms.principal,
            self.terms.interest_rate_bps,
            self.terms.duration_secs,
        ))
    }
}

/// Lender locks funds behind an offer borrowers can take.
pub struct CreateLenderOfferFlow {
    ctx: FlowContext,
    offer: OfferTerms,
}

impl CreateLenderOfferFlow {
    pub fn new(ctx: FlowContext, offer: OfferTerms) -> Self {
        Self { ctx, offer }
    }
}

#[async_trait]
impl ApprovalThenAction for CreateLenderOfferFlow {
    fn describe(&self) -> String {
        "create lender offer".to_string()
    }

    async fn preflight(&self) -> Result<(), FlowError> {
        let ctx = &self.ctx;
        ctx.require_positive(self.offer.lend_amount, "lend amount")?;
        ctx.require_positive(self.offer.min_collateral_amount, "minimum collateral")?;
        ctx.require_sane_rate(self.offer.interest_rate_bps)?;
        ctx.require_duration(self.offer.duration_secs)?;
        ctx.require_connected_network().await?;
        ctx.require_funds(self.offer.lend_token, self.offer.lend_amount)
            .await?;
        ctx.require_fresh_price(self.offer.lend_token).await?;
        ctx.require_fresh_price(self.offer.collateral_token).await?;
        Ok(())
    }

    async fn allowance_shortfall(&self) -> Result<Option<ApprovalNeed>, FlowError> {
        self.ctx
            .shortfall_for(self.offer.lend_token, self.offer.lend_amount)
            .await
    }

    async fn approval_call(&self, need: &ApprovalNeed) -> Result<ContractCall, FlowError> {
        Ok(self.ctx.approval(need))
    }

    async fn action_call(&self) -> Result<ContractCall, FlowError> {
        Ok(market::create_lender_offer_call(
            self.ctx.chain_id,
            self.ctx.sender,
            self.ctx.market,
            self.offer.lend_token,
            self.offer.lend_amount,
            self.offer.collateral_token,
            self.offer.min_collateral_amount,
            self.offer.interest_rate_bps,
            self.offer.duration_secs,
        ))
    }
}

/// Lender pays out an open request, locally or across chains.
pub struct FundLoanRequestFlow {
    ctx: FlowContext,
    target: FundTarget,
    route: ChainRoute,
}

impl FundLoanRequestFlow {
    pub fn new(ctx: FlowContext, target: FundTarget, route: ChainRoute) -> Self {
        Self { ctx, target, route }
    }

    fn source_chain(&self) -> Result<ChainId, FlowError> {
        self.route.source_chain_id.ok_or_else(|| {
            FlowError::Blocked(MarketError::ActionNotAllowed {
                reason: "cross-chain route is missing its source chain".to_string(),
            })
        })
    }

    fn source_loan(&self) -> Result<LoanId, FlowError> {
        self.target.source_loan_id.ok_or_else(|| {
            FlowError::Blocked(MarketError::ActionNotAllowed {
                reason: "cross-chain funding requires the source loan id".to_string(),
            })
        })
    }
}

#[async_trait]
impl ApprovalThenAction for FundLoanRequestFlow {
    fn describe(&self) -> String {
        if self.route.is_cross_chain {
            "fund cross-chain loan request".to_string()
        } else {
            "fund loan request".to_string()
        }
    }

    async fn preflight(&self) -> Result<(), FlowError> {
        let ctx = &self.ctx;
        ctx.require_positive(self.target.borrow_amount, "funding amount")?;
        if self.route.is_cross_chain {
            // Fail in preflight, not at call-building time after approval.
            self.source_chain()?;
            self.source_loan()?;
        }
        ctx.require_connected_network().await?;
        ctx.require_funds(self.target.borrow_token, self.target.borrow_amount)
            .await?;
        ctx.require_fresh_price(self.target.borrow_token).await?;
        Ok(())
    }

    async fn allowance_shortfall(&self) -> Result<Option<ApprovalNeed>, FlowError> {
        self.ctx
            .shortfall_for(self.target.borrow_token, self.target.borrow_amount)
            .await
    }

    async fn approval_call(&self, need: &ApprovalNeed) -> Result<ContractCall, FlowError> {
        Ok(self.ctx.approval(need))
    }

    async fn action_call(&self) -> Result<ContractCall, FlowError> {
        if !self.route.is_cross_chain {
            return Ok(market::fund_loan_request_call(
                self.ctx.chain_id,
                self.ctx.sender,
                self.ctx.market,
                self.target.request_id,
            ));
        }
        Ok(market::fund_cross_chain_request_call(
            self.ctx.chain_id,
            self.ctx.sender,
            self.ctx.market,
            self.target.request_id,
            self.source_chain()?,
            self.source_loan()?,
        ))
    }
}

/// Borrower takes a fiat-side lender offer by escrowing collateral.
pub struct AcceptFiatOfferFlow {
    ctx: FlowContext,
    offer_id: OfferId,
    collateral_token: Address,
    collateral_amount: U256,
}

impl AcceptFiatOfferFlow {
    pub fn new(
        ctx: FlowContext,
        offer_id: OfferId,
        collateral_token: Address,
        collateral_amount: U256,
    ) -> Self {
        Self {
            ctx,
            offer_id,
            collateral_token,
            collateral_amount,
        }
    }
}

#[async_trait]
impl ApprovalThenAction for AcceptFiatOfferFlow {
    fn describe(&self) -> String {
        "accept fiat loan offer".to_string()
    }

    async fn preflight(&self) -> Result<(), FlowError> {
        let ctx = &self.ctx;
        ctx.require_positive(self.collateral_amount, "collateral amount")?;
        ctx.require_connected_network().await?;
        ctx.require_funds(self.collateral_token, self.collateral_amount)
            .await?;
        ctx.require_fresh_price(self.collateral_token).await?;
        Ok(())
    }

    async fn allowance_shortfall(&self) -> Result<Option<ApprovalNeed>, FlowError> {
        self.ctx
            .shortfall_for(self.collateral_token, self.collateral_amount)
            .await
    }

    async fn approval_call(&self, need: &ApprovalNeed) -> Result<ContractCall, FlowError> {
        Ok(self.ctx.approval(need))
    }

    async fn action_call(&self) -> Result<ContractCall, FlowError> {
        Ok(market::accept_fiat_offer_call(
            self.ctx.chain_id,
            self.ctx.sender,
            self.ctx.market,
            self.offer_id,
            self.collateral_amount,
        ))
    }
}

/// Borrower asks for more time on an active loan. Spends no tokens, so
/// the approval leg never engages.
pub struct RequestExtensionFlow {
    ctx: FlowContext,
    loan_id: LoanId,
    additional_secs: u64,
}

impl RequestExtensionFlow {
    pub fn new(ctx: FlowContext, loan_id: LoanId, additional_secs: u64) -> Self {
        Self {
            ctx,
            loan_id,
            additional_secs,
        }
    }
}

#[async_trait]
impl ApprovalThenAction for RequestExtensionFlow {
    fn describe(&self) -> String {
        "request loan extension".to_string()
    }

    async fn preflight(&self) -> Result<(), FlowError> {
        self.ctx.require_duration(self.additional_secs)?;
        self.ctx.require_connected_network().await?;
        Ok(())
    }

    async fn allowance_shortfall(&self) -> Result<Option<ApprovalNeed>, FlowError> {
        Ok(None)
    }

    async fn approval_call(&self, _need: &ApprovalNeed) -> Result<ContractCall, FlowError> {
        Err(FlowError::Blocked(MarketError::ActionNotAllowed {
            reason: "loan extensions require no approval".to_string(),
        }))
    }

    async fn action_call(&self) -> Result<ContractCall, FlowError> {
        Ok(market::request_extension_call(
            self.ctx.chain_id,
            self.ctx.sender,
            self.ctx.market,
            self.loan_id,
            self.additional_secs,
        ))
    }
}
