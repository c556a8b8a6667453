//! Marketplace client core: quoting, guard-checking, and executing
//! collateralized loans
//!
//! Ties the other crates together: prices come from [`pricefeed`], routes
//! from [`crosschain`], transactions run through [`orchestrator`], and the
//! wire work happens in [`evm_client`]. The [`MarketplaceService`] facade is
//! what an application embeds.

pub mod calculator;
pub mod constants;
pub mod fetch;
pub mod flows;
pub mod service;
pub mod state;

pub use calculator::{CalcError, HealthBand};
pub use flows::{
    AcceptFiatOfferFlow, CreateLenderOfferFlow, CreateLoanRequestFlow, FlowContext,
    FundLoanRequestFlow, RequestExtensionFlow,
};
pub use service::MarketplaceService;
pub use state::{
    CollateralizationResult, FundTarget, LoanTerms, LtvPolicy, OfferTerms, WalletPosition,
};
