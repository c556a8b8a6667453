//! Fetch a live borrow quote from Base Sepolia.
//!
//! Run with `cargo run -p marketplace --example borrow_quote`. Set
//! `RUST_LOG=marketplace=debug` to watch the quote assembly.

use alloy_primitives::{address, U256};
use anyhow::Result;
use marketplace::{LoanTerms, MarketplaceService};
use surety_core::{units, AppConfig, ChainConfig, ChainId};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let chain_id = ChainId::new(84532);
    let config = AppConfig {
        chains: vec![ChainConfig::new(chain_id, "https://sepolia.base.org")],
        confirm_poll_secs: 4,
    };
    let service = MarketplaceService::from_config(config)?;

    // Borrow 100 USDC against WETH for 30 days at 10% flat.
    let terms = LoanTerms {
        collateral_token: address!("4200000000000000000000000000000000000006"),
        borrow_token: address!("036cbd53842c5426634e7929541ec2318f3dcf7e"),
        principal: U256::from(100_000_000u64),
        interest_rate_bps: 1_000,
        duration_secs: 30 * 86_400,
    };

    let quote = service.borrow_quote(chain_id, &terms).await?;

    println!(
        "collateral required: {} WETH",
        units::format_units(quote.required_or_max_amount, 18)
    );
    println!(
        "total repayment:     {} USDC",
        units::format_units(quote.total_repayment, 6)
    );
    if let (Some(hf), Some(band)) = (quote.health_factor_e4, quote.health_band()) {
        println!(
            "health factor:       {} ({band:?})",
            units::format_units(hf, 4)
        );
    }

    Ok(())
}
