//! Live price resolution against on-chain feeds

use std::sync::Arc;

use evm_client::feed;
use surety_core::{
    chains,
    types::constants::USD_DECIMALS,
    units::scale_decimals,
    ChainGateway, ChainId, Error, MarketError, RpcError,
};
use thiserror::Error as ThisError;
use tracing::{debug, warn};

use crate::book::PriceBook;
use crate::quote::{PriceLookup, PriceQuote};
use crate::registry::FeedRegistry;

#[derive(Debug, ThisError)]
pub enum PriceError {
    #[error("No price feed configured for {symbol} on chain {chain_id}")]
    FeedMissing { symbol: String, chain_id: ChainId },

    #[error("Feed answered a non-positive value for {symbol}")]
    NonPositiveAnswer { symbol: String },

    #[error("Feed round for {symbol} has not completed")]
    RoundIncomplete { symbol: String },

    #[error("Price for {symbol} does not fit the quote scale")]
    OutOfRange { symbol: String },

    #[error("Price for {symbol} went stale {expired_for_secs}s ago")]
    Stale { symbol: String, expired_for_secs: u64 },

    #[error("Manual refresh is only available on test networks, not on {chain_id}")]
    RefreshNotAllowed { chain_id: ChainId },

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl PriceError {
    /// Whether the same request could succeed if simply repeated.
    pub fn is_retryable(&self) -> bool {
        match self {
            PriceError::Rpc(e) => e.is_retryable(),
            PriceError::RoundIncomplete { .. } | PriceError::Stale { .. } => true,
            _ => false,
        }
    }

    /// Fold into the shared error taxonomy for callers above this crate.
    pub fn into_error(self, chain_id: ChainId) -> Error {
        match self {
            PriceError::Rpc(e) => Error::Rpc(e),
            PriceError::Stale {
                symbol,
                expired_for_secs,
            } => Error::Market(MarketError::PriceStale {
                symbol,
                expired_for_secs,
            }),
            PriceError::RefreshNotAllowed { .. } => Error::Market(MarketError::ActionNotAllowed {
                reason: self.to_string(),
            }),
            PriceError::FeedMissing { ref symbol, .. }
            | PriceError::NonPositiveAnswer { ref symbol }
            | PriceError::RoundIncomplete { ref symbol }
            | PriceError::OutOfRange { ref symbol } => {
                let symbol = symbol.clone();
                Error::Market(MarketError::PriceUnavailable {
                    symbol,
                    chain_id,
                    reason: self.to_string(),
                })
            }
        }
    }
}

/// Resolves USD prices through aggregator feeds and records outcomes in a
/// [`PriceBook`] for synchronous observers.
pub struct PriceResolver {
    gateway: Arc<dyn ChainGateway>,
    registry: FeedRegistry,
    book: PriceBook,
}

impl PriceResolver {
    pub fn new(gateway: Arc<dyn ChainGateway>, registry: FeedRegistry) -> Self {
        Self {
            gateway,
            registry,
            book: PriceBook::new(),
        }
    }

    pub fn registry(&self) -> &FeedRegistry {
        &self.registry
    }

    pub fn book(&self) -> &PriceBook {
        &self.book
    }

    /// Latest known state without touching the network.
    pub fn get_price(&self, chain_id: ChainId, symbol: &str) -> PriceLookup {
        self.book.get(chain_id, symbol)
    }

    /// Read the feed once and record the outcome.
    ///
    /// Definitive feed problems (missing feed, bad answer) are recorded as
    /// unavailable. Transport errors are returned but leave the book alone,
    /// so a previously good quote keeps serving observers.
    pub async fn fetch(&self, chain_id: ChainId, symbol: &str) -> Result<PriceQuote, PriceError> {
        let symbol = symbol.to_uppercase();
        let info = match self.registry.lookup(chain_id, &symbol) {
            Some(info) => *info,
            None => {
                let err = PriceError::FeedMissing {
                    symbol: symbol.clone(),
                    chain_id,
                };
                self.book
                    .record_unavailable(chain_id, &symbol, err.to_string());
                return Err(err);
            }
        };

        let round = feed::latest_round(self.gateway.as_ref(), chain_id, info.feed).await?;

        let raw = match round.answer {
            Some(value) if !value.is_zero() => value,
            _ => {
                let err = PriceError::NonPositiveAnswer {
                    symbol: symbol.clone(),
                };
                return Err(self.record_bad(chain_id, &symbol, err));
            }
        };
        if round.updated_at == 0 {
            let err = PriceError::RoundIncomplete {
                symbol: symbol.clone(),
            };
            return Err(self.record_bad(chain_id, &symbol, err));
        }

        let price = match scale_decimals(raw, info.decimals, USD_DECIMALS) {
            Some(price) => price,
            None => {
                let err = PriceError::OutOfRange {
                    symbol: symbol.clone(),
                };
                return Err(self.record_bad(chain_id, &symbol, err));
            }
        };

        let quote = PriceQuote {
            symbol,
            chain_id,
            price,
            observed_at: round.updated_at,
            stale_after: round.updated_at.saturating_add(info.heartbeat_secs),
        };
        debug!(
            symbol = %quote.symbol,
            chain_id = %chain_id,
            price = %quote.price,
            observed_at = quote.observed_at,
            "price updated"
        );
        self.book.record(quote.clone());
        Ok(quote)
    }

    /// Fetch and additionally require the quote to be fresh at `now`.
    pub async fn fetch_usable(
        &self,
        chain_id: ChainId,
        symbol: &str,
        now: u64,
    ) -> Result<PriceQuote, PriceError> {
        let quote = self.fetch(chain_id, symbol).await?;
        if quote.is_stale(now) {
            return Err(PriceError::Stale {
                symbol: quote.symbol,
                expired_for_secs: now - quote.stale_after,
            });
        }
        Ok(quote)
    }

    /// Re-read a feed on user request. Only test networks allow this; the
    /// production feeds update on their own cadence.
    pub async fn force_refresh(
        &self,
        chain_id: ChainId,
        symbol: &str,
    ) -> Result<PriceQuote, PriceError> {
        if !chains::is_testnet(chain_id) {
            return Err(PriceError::RefreshNotAllowed { chain_id });
        }
        self.fetch(chain_id, symbol).await
    }

    fn record_bad(&self, chain_id: ChainId, symbol: &str, err: PriceError) -> PriceError {
        warn!(symbol, %chain_id, error = %err, "price unavailable");
        self.book.record_unavailable(chain_id, symbol, err.to_string());
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FeedInfo;
    use alloy_primitives::{address, Address, Bytes, U256};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use surety_core::{ContractCall, SimulationOutcome, TxHash, TxReceipt};

    type AnswerTable = Arc<Mutex<HashMap<Address, Result<Vec<u8>, RpcError>>>>;

    /// Gateway that answers `eth_call` from a canned per-contract table.
    struct FixtureGateway {
        answers: AnswerTable,
    }

    impl FixtureGateway {
        fn new() -> Self {
            Self {
                answers: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        fn answer(self, contract: Address, payload: Vec<u8>) -> Self {
            self.answers
                .lock()
                .unwrap()
                .insert(contract, Ok(payload));
            self
        }

        /// Handle for rewriting answers after the resolver took ownership.
        fn handle(&self) -> AnswerTable {
            Arc::clone(&self.answers)
        }
    }

    #[async_trait]
    impl ChainGateway for FixtureGateway {
        async fn call(&self, call: &ContractCall) -> Result<Bytes, RpcError> {
            match self.answers.lock().unwrap().get(&call.to) {
                Some(Ok(payload)) => Ok(Bytes::from(payload.clone())),
                Some(Err(e)) => Err(clone_err(e)),
                None => Err(RpcError::ParseError("no fixture for contract".into())),
            }
        }

        async fn simulate(&self, _call: &ContractCall) -> Result<SimulationOutcome, RpcError> {
            Ok(SimulationOutcome::Pass)
        }

        async fn submit(&self, _call: &ContractCall) -> Result<TxHash, RpcError> {
            Err(RpcError::ParseError("not a submitting fixture".into()))
        }

        async fn receipt(
            &self,
            _chain_id: ChainId,
            _tx: &TxHash,
        ) -> Result<Option<TxReceipt>, RpcError> {
            Ok(None)
        }

        async fn connected_chain_id(&self) -> Result<ChainId, RpcError> {
            Ok(ChainId::new(11155111))
        }
    }

    fn clone_err(e: &RpcError) -> RpcError {
        match e {
            RpcError::Unreachable { url } => RpcError::Unreachable { url: url.clone() },
            other => RpcError::ParseError(other.to_string()),
        }
    }

    fn round_payload(answer: U256, updated_at: u64) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&U256::from(7u64).to_be_bytes::<32>());
        data.extend_from_slice(&answer.to_be_bytes::<32>());
        data.extend_from_slice(&U256::from(updated_at).to_be_bytes::<32>());
        data.extend_from_slice(&U256::from(updated_at).to_be_bytes::<32>());
        data.extend_from_slice(&U256::from(7u64).to_be_bytes::<32>());
        data
    }

    const FEED: Address = address!("00000000000000000000000000000000000000f1");
    const SEPOLIA: ChainId = ChainId::new(11155111);

    fn registry_with_feed(decimals: u8, heartbeat_secs: u64) -> FeedRegistry {
        let mut registry = FeedRegistry::empty();
        registry.insert(
            SEPOLIA,
            "WETH",
            FeedInfo {
                feed: FEED,
                decimals,
                heartbeat_secs,
            },
        );
        registry
    }

    #[tokio::test]
    async fn test_fetch_normalizes_to_eight_decimals() {
        // Feed reports 18 decimals: 2500 USD = 2500 * 1e18.
        let answer = U256::from(2_500u64) * U256::from(10u64).pow(U256::from(18u64));
        let gateway = FixtureGateway::new().answer(FEED, round_payload(answer, 1_700_000_000));
        let resolver = PriceResolver::new(Arc::new(gateway), registry_with_feed(18, 3_600));

        let quote = resolver.fetch(SEPOLIA, "weth").await.unwrap();
        assert_eq!(quote.price, U256::from(250_000_000_000u64));
        assert_eq!(quote.observed_at, 1_700_000_000);
        assert_eq!(quote.stale_after, 1_700_003_600);
        assert_eq!(quote.symbol, "WETH");
    }

    #[tokio::test]
    async fn test_fetch_records_into_the_book() {
        let gateway = FixtureGateway::new().answer(
            FEED,
            round_payload(U256::from(250_000_000_000u64), 1_700_000_000),
        );
        let resolver = PriceResolver::new(Arc::new(gateway), registry_with_feed(8, 3_600));

        assert_eq!(resolver.get_price(SEPOLIA, "WETH"), PriceLookup::Pending);
        resolver.fetch(SEPOLIA, "WETH").await.unwrap();
        assert!(matches!(
            resolver.get_price(SEPOLIA, "WETH"),
            PriceLookup::Available(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_feed_is_unavailable() {
        let gateway = FixtureGateway::new();
        let resolver = PriceResolver::new(Arc::new(gateway), FeedRegistry::empty());

        let err = resolver.fetch(SEPOLIA, "WETH").await.unwrap_err();
        assert!(matches!(err, PriceError::FeedMissing { .. }));
        assert!(!err.is_retryable());
        assert!(matches!(
            resolver.get_price(SEPOLIA, "WETH"),
            PriceLookup::Unavailable { .. }
        ));
    }

    #[tokio::test]
    async fn test_zero_answer_is_unavailable() {
        let gateway = FixtureGateway::new().answer(FEED, round_payload(U256::ZERO, 1_700_000_000));
        let resolver = PriceResolver::new(Arc::new(gateway), registry_with_feed(8, 3_600));

        let err = resolver.fetch(SEPOLIA, "WETH").await.unwrap_err();
        assert!(matches!(err, PriceError::NonPositiveAnswer { .. }));
    }

    #[tokio::test]
    async fn test_unstarted_round_is_unavailable() {
        let gateway = FixtureGateway::new().answer(
            FEED,
            round_payload(U256::from(250_000_000_000u64), 0),
        );
        let resolver = PriceResolver::new(Arc::new(gateway), registry_with_feed(8, 3_600));

        let err = resolver.fetch(SEPOLIA, "WETH").await.unwrap_err();
        assert!(matches!(err, PriceError::RoundIncomplete { .. }));
    }

    #[tokio::test]
    async fn test_transport_error_keeps_previous_quote() {
        let gateway = FixtureGateway::new().answer(
            FEED,
            round_payload(U256::from(250_000_000_000u64), 1_700_000_000),
        );
        let answers = gateway.handle();
        let resolver = PriceResolver::new(Arc::new(gateway), registry_with_feed(8, 3_600));
        resolver.fetch(SEPOLIA, "WETH").await.unwrap();

        // Transport starts failing; the book must keep the last good quote.
        answers.lock().unwrap().insert(
            FEED,
            Err(RpcError::Unreachable {
                url: "https://rpc.sepolia.org".to_string(),
            }),
        );
        let err = resolver.fetch(SEPOLIA, "WETH").await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(
            resolver.get_price(SEPOLIA, "WETH"),
            PriceLookup::Available(_)
        ));
    }

    #[tokio::test]
    async fn test_fetch_usable_rejects_stale_rounds() {
        let observed = 1_700_000_000u64;
        let gateway = FixtureGateway::new().answer(
            FEED,
            round_payload(U256::from(250_000_000_000u64), observed),
        );
        let resolver = PriceResolver::new(Arc::new(gateway), registry_with_feed(8, 3_600));

        // One second past the trust window.
        let now = observed + 3_601;
        let err = resolver.fetch_usable(SEPOLIA, "WETH", now).await.unwrap_err();
        match err {
            PriceError::Stale {
                expired_for_secs, ..
            } => assert_eq!(expired_for_secs, 1),
            other => panic!("expected stale, got {other:?}"),
        }

        // At exactly the deadline the quote still counts.
        let quote = resolver
            .fetch_usable(SEPOLIA, "WETH", observed + 3_600)
            .await
            .unwrap();
        assert_eq!(quote.observed_at, observed);
    }

    #[tokio::test]
    async fn test_force_refresh_gated_to_testnets() {
        let gateway = FixtureGateway::new().answer(
            FEED,
            round_payload(U256::from(250_000_000_000u64), 1_700_000_000),
        );
        let mut registry = registry_with_feed(8, 3_600);
        registry.insert(
            ChainId::new(1),
            "WETH",
            FeedInfo {
                feed: FEED,
                decimals: 8,
                heartbeat_secs: 3_600,
            },
        );
        let resolver = PriceResolver::new(Arc::new(gateway), registry);

        assert!(resolver.force_refresh(SEPOLIA, "WETH").await.is_ok());
        let err = resolver.force_refresh(ChainId::new(1), "WETH").await.unwrap_err();
        assert!(matches!(err, PriceError::RefreshNotAllowed { .. }));
    }

    #[test]
    fn test_price_error_folds_into_shared_taxonomy() {
        let err = PriceError::Stale {
            symbol: "WETH".to_string(),
            expired_for_secs: 42,
        };
        match err.into_error(SEPOLIA) {
            Error::Market(MarketError::PriceStale {
                expired_for_secs, ..
            }) => assert_eq!(expired_for_secs, 42),
            other => panic!("unexpected mapping: {other:?}"),
        }

        let err = PriceError::FeedMissing {
            symbol: "WETH".to_string(),
            chain_id: SEPOLIA,
        };
        assert!(matches!(
            err.into_error(SEPOLIA),
            Error::Market(MarketError::PriceUnavailable { .. })
        ));
    }
}
