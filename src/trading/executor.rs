use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{BotError, Result};
use crate::exchange::Gateway;
use crate::models::{OrderRef, PnlSnapshot, Side, TradeStatus};
use crate::scanner::Signal;
use crate::trading::risk::{PositionSizing, PriceLevels, RiskEngine};

/// One executed (or failed) trade. Append-only history; records are
/// mutated only by the manual-close path, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub symbol: String,
    pub signal: Signal,
    /// Absent only on records that never got an entry fill.
    pub entry_order: Option<OrderRef>,
    /// Missing legs mean the protective placement failed after entry; the
    /// position is live without full protection.
    pub stop_order: Option<OrderRef>,
    pub tp_orders: Vec<OrderRef>,
    pub sizing: PositionSizing,
    pub levels: PriceLevels,
    pub status: TradeStatus,
}

/// Sequences the entry order and its dependent protective orders, and
/// tracks the resulting trades. Pricing decisions are frozen into the
/// record at execution time; only P&L reads the live market.
pub struct TradeExecutor {
    gateway: Arc<dyn Gateway>,
    risk: RiskEngine,
    risk_fraction: f64,
    trades: Mutex<Vec<TradeRecord>>,
    next_id: AtomicU64,
}

impl TradeExecutor {
    pub fn new(cfg: &Config, gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            risk: RiskEngine::new(cfg),
            risk_fraction: cfg.risk_fraction,
            trades: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Snapshot copy of the append-only trade history.
    pub fn history(&self) -> Vec<TradeRecord> {
        self.trades.lock().expect("trade history lock").clone()
    }

    fn push_record(&self, record: TradeRecord) {
        self.trades.lock().expect("trade history lock").push(record);
    }

    /// Executes an accepted signal against `budget` quote currency with
    /// the fixed risk fraction applied.
    ///
    /// Sizing or level failures abort before any order is placed. A
    /// rejected entry is recorded as `execution_failed`. Protective-order
    /// failures after a filled entry are best-effort: the entry stands
    /// and the record simply lacks that leg.
    pub async fn execute(&self, signal: &Signal, budget: f64) -> Result<TradeRecord> {
        let risk_amount = budget * self.risk_fraction;
        let sizing = self
            .risk
            .size_position(&signal.market, signal.price, risk_amount)?;
        let levels = self.risk.price_levels(signal, signal.price)?;

        let entry = match self
            .gateway
            .place_market_order(&signal.symbol, Side::Buy, sizing.quantity)
            .await
        {
            Ok(order) => order,
            Err(e) => {
                warn!("{}: entry order failed: {e}", signal.symbol);
                let record = TradeRecord {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed),
                    created_at: Utc::now(),
                    symbol: signal.symbol.clone(),
                    signal: signal.clone(),
                    entry_order: None,
                    stop_order: None,
                    tp_orders: Vec::new(),
                    sizing,
                    levels,
                    status: TradeStatus::ExecutionFailed,
                };
                self.push_record(record);
                return Err(BotError::OrderRejected(format!(
                    "{}: entry order failed: {e}",
                    signal.symbol
                )));
            }
        };

        let stop_order = match self
            .gateway
            .place_stop_order(&signal.symbol, Side::Sell, sizing.quantity, levels.stop_loss)
            .await
        {
            Ok(order) => Some(order),
            Err(e) => {
                warn!(
                    "{}: stop-loss placement failed, position unprotected: {e}",
                    signal.symbol
                );
                None
            }
        };

        let tp_size = sizing.quantity / 3.0;
        let mut tp_orders = Vec::with_capacity(3);
        for tp_price in levels.take_profits {
            match self
                .gateway
                .place_limit_order(&signal.symbol, Side::Sell, tp_size, tp_price)
                .await
            {
                Ok(order) => tp_orders.push(order),
                Err(e) => warn!(
                    "{}: take-profit at {tp_price} failed: {e}",
                    signal.symbol
                ),
            }
        }

        let record = TradeRecord {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            created_at: Utc::now(),
            symbol: signal.symbol.clone(),
            signal: signal.clone(),
            entry_order: Some(entry),
            stop_order,
            tp_orders,
            sizing,
            levels,
            status: TradeStatus::Active,
        };

        info!(
            "Trade #{} executed for {}: entry={} sl={} tps={:?}",
            record.id, record.symbol, record.levels.entry, record.levels.stop_loss,
            record.levels.take_profits
        );

        self.push_record(record.clone());
        Ok(record)
    }

    /// Closes an active trade at market, then cancels whatever protective
    /// orders are still resting. Cancellation failures are logged, not
    /// fatal: the market close already flattened the position.
    pub async fn close(&self, trade_id: u64) -> Result<TradeRecord> {
        let (symbol, quantity, resting) = {
            let trades = self.trades.lock().expect("trade history lock");
            let record = trades
                .iter()
                .find(|t| t.id == trade_id)
                .ok_or_else(|| BotError::Computation(format!("trade #{trade_id} not found")))?;
            if record.status != TradeStatus::Active {
                return Err(BotError::Computation(format!(
                    "trade #{trade_id} is {}, not active",
                    record.status
                )));
            }

            let mut resting: Vec<String> = Vec::new();
            if let Some(stop) = &record.stop_order {
                resting.push(stop.id.clone());
            }
            resting.extend(record.tp_orders.iter().map(|o| o.id.clone()));
            (record.symbol.clone(), record.sizing.quantity, resting)
        };

        self.gateway
            .place_market_order(&symbol, Side::Sell, quantity)
            .await
            .map_err(|e| BotError::OrderRejected(format!("{symbol}: close failed: {e}")))?;

        for order_id in resting {
            if let Err(e) = self.gateway.cancel_order(&order_id, &symbol).await {
                warn!("{symbol}: cancel {order_id} failed: {e}");
            }
        }

        let mut trades = self.trades.lock().expect("trade history lock");
        let record = trades
            .iter_mut()
            .find(|t| t.id == trade_id)
            .ok_or_else(|| BotError::Computation(format!("trade #{trade_id} not found")))?;
        record.status = TradeStatus::ClosedManually;
        info!("Trade #{trade_id} closed manually for {symbol}");
        Ok(record.clone())
    }

    /// Live unrealized P&L against the current market price. A failed
    /// quote is an error ("unknown"), never a zero P&L.
    pub async fn pnl(&self, trade_id: u64) -> Result<PnlSnapshot> {
        let (symbol, entry_price, quantity) = {
            let trades = self.trades.lock().expect("trade history lock");
            let record = trades
                .iter()
                .find(|t| t.id == trade_id)
                .ok_or_else(|| BotError::Computation(format!("trade #{trade_id} not found")))?;
            (
                record.symbol.clone(),
                record.levels.entry,
                record.sizing.quantity,
            )
        };

        let current_price = self
            .gateway
            .fetch_ticker(&symbol)
            .await
            .map_err(|e| BotError::Transient(format!("{symbol}: no quote: {e}")))?;

        let pnl_points = current_price - entry_price;
        Ok(PnlSnapshot {
            current_price,
            entry_price,
            pnl_points,
            pnl_percent: pnl_points / entry_price * 100.0,
            pnl_usdt: pnl_points * quantity,
        })
    }
}
