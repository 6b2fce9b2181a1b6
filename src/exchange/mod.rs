pub mod kucoin;

pub use kucoin::KucoinFuturesClient;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;
use crate::models::{
    AccountBalance, CandleSeries, MarketMetadata, OpenPosition, OrderRef, Side, Timeframe,
};

/// Market data & order gateway. Every call is fallible and every failure
/// is already converted to a `BotError` kind; callers treat failures as a
/// typed absence, never as a reason to abort an unrelated symbol's scan.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn load_markets(&self) -> Result<HashMap<String, MarketMetadata>>;
    async fn fetch_candles(&self, symbol: &str, tf: Timeframe, limit: usize)
        -> Result<CandleSeries>;
    async fn fetch_balance(&self) -> Result<AccountBalance>;
    async fn fetch_open_positions(&self) -> Result<Vec<OpenPosition>>;
    async fn place_market_order(&self, symbol: &str, side: Side, size: f64) -> Result<OrderRef>;
    async fn place_limit_order(
        &self,
        symbol: &str,
        side: Side,
        size: f64,
        price: f64,
    ) -> Result<OrderRef>;
    async fn place_stop_order(
        &self,
        symbol: &str,
        side: Side,
        size: f64,
        stop_price: f64,
    ) -> Result<OrderRef>;
    async fn cancel_order(&self, order_id: &str, symbol: &str) -> Result<()>;
    async fn fetch_order_status(&self, order_id: &str, symbol: &str) -> Result<OrderRef>;
    async fn fetch_ticker(&self, symbol: &str) -> Result<f64>;
}
