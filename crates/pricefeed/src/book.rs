//! Latest-known price per asset
//!
//! Read-mostly snapshot store so render paths and guards can consult prices
//! without touching the network. Fetches happen elsewhere and are recorded
//! here; an asset nobody has fetched yet reads as `Pending`.

use std::collections::HashMap;
use std::sync::RwLock;

use surety_core::ChainId;

use crate::quote::{PriceLookup, PriceQuote};

#[derive(Debug)]
enum BookEntry {
    Quote(PriceQuote),
    Unavailable { reason: String },
}

/// Shared snapshot of the most recent lookup outcome per (chain, symbol).
#[derive(Debug, Default)]
pub struct PriceBook {
    entries: RwLock<HashMap<(ChainId, String), BookEntry>>,
}

fn key(chain_id: ChainId, symbol: &str) -> (ChainId, String) {
    (chain_id, symbol.to_uppercase())
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful observation.
    pub fn record(&self, quote: PriceQuote) {
        let k = key(quote.chain_id, &quote.symbol);
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(k, BookEntry::Quote(quote));
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(k, BookEntry::Quote(quote));
            }
        }
    }

    /// Record that the feed definitively cannot price this asset right now.
    ///
    /// Transient transport failures are not recorded; the previous quote, if
    /// any, remains the latest knowledge.
    pub fn record_unavailable(&self, chain_id: ChainId, symbol: &str, reason: String) {
        let k = key(chain_id, symbol);
        let entry = BookEntry::Unavailable { reason };
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(k, entry);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(k, entry);
            }
        }
    }

    /// Latest known state for an asset. Never blocks on the network.
    pub fn get(&self, chain_id: ChainId, symbol: &str) -> PriceLookup {
        let entries = match self.entries.read() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        match entries.get(&key(chain_id, symbol)) {
            Some(BookEntry::Quote(quote)) => PriceLookup::Available(quote.clone()),
            Some(BookEntry::Unavailable { reason }) => PriceLookup::Unavailable {
                reason: reason.clone(),
            },
            None => PriceLookup::Pending,
        }
    }

    pub fn clear(&self) {
        match self.entries.write() {
            Ok(mut entries) => entries.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}
