use serde::{Deserialize, Serialize};

use super::types::{OrderType, Side};

/// Snapshot of exchange market info for one contract. Frozen into each
/// Signal so execution never re-fetches metadata for pricing decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketMetadata {
    pub symbol: String,
    pub active: bool,
    /// Contract class as reported by the exchange; only "swap"
    /// (perpetual) markets are eligible for scanning.
    pub market_type: String,
    pub min_order_size: f64,
    pub max_leverage: f64,
    pub maker_fee: f64,
    pub taker_fee: f64,
}

/// Quote-currency balance snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AccountBalance {
    pub free: f64,
    pub used: f64,
    pub total: f64,
}

/// An open position row as reported by the exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenPosition {
    pub symbol: String,
    pub size: f64,
    pub entry_price: f64,
    pub unrealized_pnl: f64,
}

/// Handle to an order resting on (or filled by) the exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRef {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub size: f64,
    pub price: Option<f64>,
}

/// Live unrealized P&L for a trade against the current market price.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PnlSnapshot {
    pub current_price: f64,
    pub entry_price: f64,
    pub pnl_points: f64,
    pub pnl_percent: f64,
    pub pnl_usdt: f64,
}
