//! Marketplace service facade
//!
//! Wires configuration, the registries, and the chain gateway into the two
//! things a surface consumes: quotes (prices + policy + calculator in one
//! call) and flows ready to hand to an engine. Everything here recomputes
//! from live inputs; the only cache is the price snapshot book, which the
//! resolver owns.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use crosschain::{resolve_route, ChainRoute, RouteQuery, TokenIdentity, TokenRegistry};
use evm_client::RpcGateway;
use futures::future::try_join;
use orchestrator::FlowEngine;
use pricefeed::{FeedRegistry, PriceLookup, PriceQuote, PriceResolver};
use surety_core::{
    types::{unix_now, LoanId, OfferId},
    AppConfig, ChainGateway, ChainId, Error, MarketError, Result,
};
use tracing::debug;

use crate::calculator::{self, AssetPrice, CalcError};
use crate::constants;
use crate::fetch;
use crate::flows::{
    AcceptFiatOfferFlow, CreateLenderOfferFlow, CreateLoanRequestFlow, FlowContext,
    FundLoanRequestFlow, RequestExtensionFlow,
};
use crate::state::{
    CollateralizationResult, FundTarget, LoanTerms, LtvPolicy, OfferTerms, WalletPosition,
};

struct ServiceInner {
    config: AppConfig,
    gateway: Arc<dyn ChainGateway>,
    prices: Arc<PriceResolver>,
    tokens: Arc<TokenRegistry>,
}

/// Cheaply clonable handle over the whole client core.
#[derive(Clone)]
pub struct MarketplaceService {
    inner: Arc<ServiceInner>,
}

impl MarketplaceService {
    /// Build the full stack from configuration, connecting over JSON-RPC.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let gateway: Arc<dyn ChainGateway> = Arc::new(RpcGateway::from_config(&config)?);
        Self::with_gateway(config, gateway)
    }

    /// Assemble on top of an existing gateway. Tests inject fakes here.
    pub fn with_gateway(config: AppConfig, gateway: Arc<dyn ChainGateway>) -> Result<Self> {
        let feeds = FeedRegistry::from_config(&config);
        let tokens =
            TokenRegistry::from_config(&config).map_err(|e| Error::Config(e.to_string()))?;
        let prices = Arc::new(PriceResolver::new(Arc::clone(&gateway), feeds));
        Ok(Self {
            inner: Arc::new(ServiceInner {
                config,
                gateway,
                prices,
                tokens: Arc::new(tokens),
            }),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn tokens(&self) -> &TokenRegistry {
        &self.inner.tokens
    }

    pub fn prices(&self) -> &PriceResolver {
        &self.inner.prices
    }

    /// Marketplace contract on a chain. Configuration overrides the
    /// built-in deployment table.
    pub fn market_address(&self, chain_id: ChainId) -> Result<Address> {
        if let Some(chain) = self.inner.config.chain(chain_id) {
            if let Some(market) = chain.market {
                return Ok(market);
            }
        }
        constants::market_deployment(chain_id)
            .ok_or_else(|| Error::Config(format!("no marketplace deployment on chain {chain_id}")))
    }

    /// Synchronous snapshot read; `Pending` until a fetch has landed.
    pub fn price(&self, chain_id: ChainId, symbol: &str) -> PriceLookup {
        self.inner.prices.get_price(chain_id, symbol)
    }

    pub async fn refresh_price(&self, chain_id: ChainId, symbol: &str) -> Result<PriceQuote> {
        self.inner
            .prices
            .fetch(chain_id, symbol)
            .await
            .map_err(|e| e.into_error(chain_id))
    }

    /// Testnet-only affordance; refuses on production chains.
    pub async fn force_refresh_price(&self, chain_id: ChainId, symbol: &str) -> Result<PriceQuote> {
        self.inner
            .prices
            .force_refresh(chain_id, symbol)
            .await
            .map_err(|e| e.into_error(chain_id))
    }

    /// Balance and marketplace allowance for one token, fetched together.
    pub async fn wallet_position(
        &self,
        chain_id: ChainId,
        token: Address,
        owner: Address,
    ) -> Result<WalletPosition> {
        let market = self.market_address(chain_id)?;
        let position =
            fetch::wallet_position(self.inner.gateway.as_ref(), chain_id, token, owner, market)
                .await?;
        Ok(position)
    }

    /// Collateral required to secure `terms`, with repayment and health
    /// factor at exactly that collateral.
    ///
    /// Both prices must be fresh and the policy bucket published; anything
    /// less is an error, never a zero or defaulted number.
    pub async fn borrow_quote(
        &self,
        chain_id: ChainId,
        terms: &LoanTerms,
    ) -> Result<CollateralizationResult> {
        let collateral = self.token(chain_id, terms.collateral_token)?;
        let borrow = self.token(chain_id, terms.borrow_token)?;

        let now = unix_now();
        let (collateral_quote, borrow_quote) = try_join(
            self.inner
                .prices
                .fetch_usable(chain_id, &collateral.symbol, now),
            self.inner.prices.fetch_usable(chain_id, &borrow.symbol, now),
        )
        .await
        .map_err(|e| e.into_error(chain_id))?;

        let policy = self
            .ltv_policy(chain_id, collateral, terms.duration_days())
            .await?;

        let collateral_price = AssetPrice::new(collateral_quote.price, collateral.decimals);
        let borrow_price = AssetPrice::new(borrow_quote.price, borrow.decimals);

        let repayment = calculator::total_repayment(terms.principal, terms.interest_rate_bps)
            .map_err(calc_error)?;
        let required = calculator::required_collateral(
            terms.principal,
            terms.interest_rate_bps,
            policy.ltv_bps,
            &collateral_price,
            &borrow_price,
        )
        .map_err(calc_error)?;

        let health = self.health(required, repayment, &policy, &collateral_price, &borrow_price)?;

        debug!(
            chain = %chain_id,
            collateral = %collateral.symbol,
            borrow = %borrow.symbol,
            %required,
            "borrow quote assembled"
        );

        Ok(CollateralizationResult {
            required_or_max_amount: required,
            total_repayment: repayment,
            health_factor_e4: health,
            ltv_bps: policy.ltv_bps,
        })
    }

    /// Largest loan `collateral_amount` of the offer's collateral supports,
    /// with repayment and health factor at that edge.
    pub async fn max_borrow_quote(
        &self,
        chain_id: ChainId,
        offer: &OfferTerms,
        collateral_amount: U256,
    ) -> Result<CollateralizationResult> {
        let collateral = self.token(chain_id, offer.collateral_token)?;
        let borrow = self.token(chain_id, offer.lend_token)?;

        let now = unix_now();
        let (collateral_quote, borrow_quote) = try_join(
            self.inner
                .prices
                .fetch_usable(chain_id, &collateral.symbol, now),
            self.inner.prices.fetch_usable(chain_id, &borrow.symbol, now),
        )
        .await
        .map_err(|e| e.into_error(chain_id))?;

        let policy = self
            .ltv_policy(chain_id, collateral, offer.duration_days())
            .await?;

        let collateral_price = AssetPrice::new(collateral_quote.price, collateral.decimals);
        let borrow_price = AssetPrice::new(borrow_quote.price, borrow.decimals);

        let max = calculator::max_borrow(
            collateral_amount,
            policy.ltv_bps,
            &collateral_price,
            &borrow_price,
        )
        .map_err(calc_error)?;
        let repayment =
            calculator::total_repayment(max, offer.interest_rate_bps).map_err(calc_error)?;

        let health =
            self.health(collateral_amount, repayment, &policy, &collateral_price, &borrow_price)?;

        Ok(CollateralizationResult {
            required_or_max_amount: max,
            total_repayment: repayment,
            health_factor_e4: health,
            ltv_bps: policy.ltv_bps,
        })
    }

    /// Resolve where a funding transaction executes. The connected chain is
    /// read fresh on every call; it changes underneath open flows.
    pub async fn funding_route(
        &self,
        target: &FundTarget,
        explicit_target: Option<ChainId>,
    ) -> Result<ChainRoute> {
        let connected = self.inner.gateway.connected_chain_id().await?;
        Ok(resolve_route(
            &self.inner.tokens,
            &RouteQuery {
                collateral_token: target.collateral_token,
                borrow_token: target.borrow_token,
                origin_chain_id: target.origin_chain_id,
                connected_chain_id: connected,
                explicit_target,
            },
        ))
    }

    pub fn create_loan_request_flow(
        &self,
        chain_id: ChainId,
        sender: Address,
        terms: LoanTerms,
        collateral_amount: U256,
    ) -> Result<CreateLoanRequestFlow> {
        let ctx = self.flow_context(chain_id, sender)?;
        Ok(CreateLoanRequestFlow::new(ctx, terms, collateral_amount))
    }

    pub fn create_lender_offer_flow(
        &self,
        chain_id: ChainId,
        sender: Address,
        offer: OfferTerms,
    ) -> Result<CreateLenderOfferFlow> {
        let ctx = self.flow_context(chain_id, sender)?;
        Ok(CreateLenderOfferFlow::new(ctx, offer))
    }

    /// Funding executes on the route's target chain, which is derived from
    /// the connected wallet at call time.
    pub async fn fund_loan_request_flow(
        &self,
        sender: Address,
        target: FundTarget,
        explicit_target: Option<ChainId>,
    ) -> Result<FundLoanRequestFlow> {
        let route = self.funding_route(&target, explicit_target).await?;
        let ctx = self.flow_context(route.target_chain_id, sender)?;
        Ok(FundLoanRequestFlow::new(ctx, target, route))
    }

    pub fn accept_fiat_offer_flow(
        &self,
        chain_id: ChainId,
        sender: Address,
        offer_id: OfferId,
        collateral_token: Address,
        collateral_amount: U256,
    ) -> Result<AcceptFiatOfferFlow> {
        let ctx = self.flow_context(chain_id, sender)?;
        Ok(AcceptFiatOfferFlow::new(
            ctx,
            offer_id,
            collateral_token,
            collateral_amount,
        ))
    }

    pub fn request_extension_flow(
        &self,
        chain_id: ChainId,
        sender: Address,
        loan_id: LoanId,
        additional_secs: u64,
    ) -> Result<RequestExtensionFlow> {
        let ctx = self.flow_context(chain_id, sender)?;
        Ok(RequestExtensionFlow::new(ctx, loan_id, additional_secs))
    }

    /// Engines are per-flow; a surface spawns one for each open dialog.
    pub fn flow_engine(&self) -> FlowEngine {
        FlowEngine::new(
            Arc::clone(&self.inner.gateway),
            Duration::from_secs(self.inner.config.confirm_poll_secs),
        )
    }

    fn token(&self, chain_id: ChainId, address: Address) -> Result<&TokenIdentity> {
        self.inner
            .tokens
            .by_address(chain_id, address)
            .ok_or_else(|| Error::Market(MarketError::UnknownToken { address, chain_id }))
    }

    fn flow_context(&self, chain_id: ChainId, sender: Address) -> Result<FlowContext> {
        Ok(FlowContext {
            gateway: Arc::clone(&self.inner.gateway),
            prices: Arc::clone(&self.inner.prices),
            tokens: Arc::clone(&self.inner.tokens),
            market: self.market_address(chain_id)?,
            chain_id,
            sender,
        })
    }

    async fn ltv_policy(
        &self,
        chain_id: ChainId,
        collateral: &TokenIdentity,
        requested_days: u32,
    ) -> Result<LtvPolicy> {
        let missing = || {
            Error::Market(MarketError::PolicyMissing {
                asset: collateral.symbol.clone(),
                duration_days: requested_days,
            })
        };
        let bucket = constants::duration_bucket_days(requested_days).ok_or_else(missing)?;
        let market = self.market_address(chain_id)?;
        fetch::ltv_policy(
            self.inner.gateway.as_ref(),
            chain_id,
            market,
            collateral.address,
            bucket,
        )
        .await?
        .ok_or_else(missing)
    }

    /// Debt side of the health factor is the full repayment, not just the
    /// principal; the borrower owes interest from day one.
    fn health(
        &self,
        collateral_amount: U256,
        repayment: U256,
        policy: &LtvPolicy,
        collateral_price: &AssetPrice,
        borrow_price: &AssetPrice,
    ) -> Result<Option<U256>> {
        let collateral_value =
            calculator::usd_value(collateral_amount, collateral_price).map_err(calc_error)?;
        let loan_value = calculator::usd_value(repayment, borrow_price).map_err(calc_error)?;
        calculator::health_factor(
            collateral_value,
            policy.liquidation_threshold_bps,
            loan_value,
        )
        .map_err(calc_error)
    }
}

fn calc_error(err: CalcError) -> Error {
    Error::Market(err.into())
}
