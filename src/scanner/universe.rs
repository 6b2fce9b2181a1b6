use std::collections::HashMap;
use tracing::info;

use crate::models::MarketMetadata;

/// Tracks the set of active perpetual-swap symbols and detects symbols
/// that appeared since the previous metadata snapshot.
#[derive(Debug, Default)]
pub struct UniverseTracker {
    markets: HashMap<String, MarketMetadata>,
}

impl UniverseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    pub fn market(&self, symbol: &str) -> Option<&MarketMetadata> {
        self.markets.get(symbol)
    }

    /// Symbols eligible for scanning: active perpetual swaps only.
    pub fn active_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .markets
            .values()
            .filter(|m| m.active && m.market_type == "swap")
            .map(|m| m.symbol.clone())
            .collect();
        symbols.sort();
        symbols
    }

    /// Replaces the snapshot and returns symbols not present before.
    pub fn refresh(&mut self, markets: HashMap<String, MarketMetadata>) -> Vec<String> {
        let mut new_symbols: Vec<String> = markets
            .keys()
            .filter(|s| !self.markets.contains_key(*s))
            .cloned()
            .collect();
        new_symbols.sort();

        if !self.markets.is_empty() && !new_symbols.is_empty() {
            info!("New listings detected: {:?}", new_symbols);
        }

        self.markets = markets;
        new_symbols
    }
}
