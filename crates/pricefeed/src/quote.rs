//! Price quote types and staleness accounting

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use surety_core::ChainId;

/// Quotes closer than this to their deadline should be flagged to the user.
pub const STALE_WARNING_WINDOW_SECS: u64 = 300;

/// A USD price observed from an on-chain feed.
///
/// `price` is a fixed-point value with 8 decimal places regardless of how
/// many decimals the underlying feed reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub symbol: String,
    pub chain_id: ChainId,
    /// USD price, 8-decimal fixed point
    pub price: U256,
    /// Unix timestamp the feed last updated
    pub observed_at: u64,
    /// Unix timestamp after which the quote must not be trusted
    pub stale_after: u64,
}

impl PriceQuote {
    /// A quote is stale strictly after its deadline. At `now == stale_after`
    /// it is still usable.
    pub fn is_stale(&self, now: u64) -> bool {
        now > self.stale_after
    }

    /// Seconds of trust remaining, zero once the deadline has passed.
    pub fn seconds_until_stale(&self, now: u64) -> u64 {
        self.stale_after.saturating_sub(now)
    }

    pub fn freshness(&self, now: u64) -> Freshness {
        if self.is_stale(now) {
            Freshness::Stale {
                expired_for_secs: now - self.stale_after,
            }
        } else {
            let seconds_left = self.seconds_until_stale(now);
            if seconds_left < STALE_WARNING_WINDOW_SECS {
                Freshness::ExpiringSoon { seconds_left }
            } else {
                Freshness::Fresh
            }
        }
    }
}

/// How much life a quote has left relative to the warning window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    ExpiringSoon { seconds_left: u64 },
    Stale { expired_for_secs: u64 },
}

/// Outcome of asking for a price without blocking on the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceLookup {
    /// A quote exists; callers still need to check its freshness.
    Available(PriceQuote),
    /// No fetch has completed yet for this asset.
    Pending,
    /// The feed answered but the value cannot be used.
    Unavailable { reason: String },
}

impl PriceLookup {
    /// The quote, if one is available and not stale at `now`.
    pub fn usable(&self, now: u64) -> Option<&PriceQuote> {
        match self {
            PriceLookup::Available(quote) if !quote.is_stale(now) => Some(quote),
            _ => None,
        }
    }
}
