use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::exchange::Gateway;
use crate::models::Timeframe;
use crate::scanner::detector::SignalDetector;
use crate::scanner::signal::Signal;
use crate::scanner::universe::UniverseTracker;

const CANDLE_LIMIT: usize = 50;
const THROTTLE_EVERY: usize = 10;
const THROTTLE_PAUSE: Duration = Duration::from_secs(1);

/// Runs one scan cycle over the active universe: per-symbol evaluation
/// with per-symbol failure isolation and gateway throttling.
pub struct Scanner {
    gateway: Arc<dyn Gateway>,
    detector: SignalDetector,
    universe: UniverseTracker,
    timeframe_main: Timeframe,
    timeframe_fib: Timeframe,
    new_listings: Vec<String>,
}

impl Scanner {
    pub fn new(cfg: &Config, gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            detector: SignalDetector::new(cfg),
            universe: UniverseTracker::new(),
            timeframe_main: cfg.timeframe_main,
            timeframe_fib: cfg.timeframe_fib,
            new_listings: Vec::new(),
        }
    }

    /// Symbols that appeared in the metadata snapshot during the most
    /// recent refresh.
    pub fn new_listings(&self) -> &[String] {
        &self.new_listings
    }

    /// Reloads market metadata and records newly listed symbols.
    pub async fn refresh_universe(&mut self) -> Result<()> {
        let markets = self.gateway.load_markets().await?;
        info!("Loaded {} markets", markets.len());
        self.new_listings = self.universe.refresh(markets);
        Ok(())
    }

    /// One full cycle. A failure on one symbol is logged and skipped;
    /// only a universe-load failure aborts the cycle.
    pub async fn scan_all(&mut self) -> Result<Vec<Signal>> {
        if self.universe.is_empty() {
            self.refresh_universe().await?;
        }

        let symbols = self.universe.active_symbols();
        info!("Scanning {} active swap symbols", symbols.len());

        let mut signals = Vec::new();
        for (i, symbol) in symbols.iter().enumerate() {
            match self.scan_symbol(symbol).await {
                Ok(Some(signal)) => signals.push(signal),
                Ok(None) => {}
                Err(e) => warn!("Scan {symbol} skipped: {e}"),
            }

            if (i + 1) % THROTTLE_EVERY == 0 {
                tokio::time::sleep(THROTTLE_PAUSE).await;
            }
        }

        info!("Scan complete: {} signal(s) detected", signals.len());
        Ok(signals)
    }

    async fn scan_symbol(&self, symbol: &str) -> Result<Option<Signal>> {
        let market = match self.universe.market(symbol) {
            Some(m) => m.clone(),
            None => return Ok(None),
        };

        let h4 = self
            .gateway
            .fetch_candles(symbol, self.timeframe_main, CANDLE_LIMIT)
            .await?;
        let m15 = self
            .gateway
            .fetch_candles(symbol, self.timeframe_fib, CANDLE_LIMIT)
            .await?;

        self.detector.evaluate(symbol, &h4, &m15, &market)
    }
}
