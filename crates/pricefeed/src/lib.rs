//! USD price resolution for marketplace assets
//!
//! Prices come from on-chain aggregator feeds. Every quote carries the
//! timestamp it was observed at and the moment it goes stale, so callers
//! can judge freshness against their own clock instead of trusting ours.

pub mod book;
pub mod quote;
pub mod registry;
pub mod resolver;

pub use book::PriceBook;
pub use quote::{Freshness, PriceLookup, PriceQuote, STALE_WARNING_WINDOW_SECS};
pub use registry::{FeedInfo, FeedRegistry};
pub use resolver::{PriceError, PriceResolver};
