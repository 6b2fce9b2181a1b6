use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{MarketMetadata, SignalStrength};
use crate::scanner::swing::SwingLevelSet;

/// One detected entry opportunity. Immutable once created; the execution
/// engine freezes its contents into the trade record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    /// Close of the triggering 4h candle.
    pub price: f64,
    pub volume_increase: f64,
    pub ema_value: f64,
    /// Absent when 15m history was too short; downstream falls back to
    /// fixed percentage targets.
    pub levels: Option<SwingLevelSet>,
    pub strength: SignalStrength,
    pub market: MarketMetadata,
}
