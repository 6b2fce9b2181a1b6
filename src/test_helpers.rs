use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::error::{BotError, Result};
use crate::exchange::Gateway;
use crate::models::{
    AccountBalance, Candle, CandleSeries, MarketMetadata, OpenPosition, OrderRef, OrderType,
    Side, Timeframe,
};
use crate::scanner::swing::SwingLevelSet;
use crate::scanner::Signal;

/// Candles from (open, high, low, close, volume) tuples with
/// auto-incrementing 15m timestamps.
pub fn make_candles(data: &[(f64, f64, f64, f64, f64)]) -> CandleSeries {
    let base = DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc);

    let candles: Vec<Candle> = data
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c, v))| Candle {
            timestamp: base + Duration::minutes(15 * i as i64),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: v,
        })
        .collect();

    CandleSeries::new(candles)
}

/// Flat-bodied candles from parallel close/volume columns.
pub fn make_closes(closes: &[f64], volumes: &[f64]) -> CandleSeries {
    let rows: Vec<(f64, f64, f64, f64, f64)> = closes
        .iter()
        .zip(volumes)
        .map(|(&c, &v)| (c, c, c, c, v))
        .collect();
    make_candles(&rows)
}

/// A Config suitable for testing — sandbox, no API keys needed.
pub fn default_test_config() -> Config {
    Config {
        api_key: String::new(),
        api_secret: String::new(),
        api_passphrase: String::new(),
        sandbox: true,
        scan_interval: 60,
        volume_threshold: 150.0,
        ema_period: 20,
        timeframe_main: Timeframe::H4,
        timeframe_fib: Timeframe::M15,
        default_position_size: 100.0,
        risk_fraction: 0.02,
        default_leverage: 1.0,
        fib_retracements: vec![0.236, 0.382, 0.5, 0.618, 0.786],
        fib_extensions: vec![1.272, 1.414, 1.618, 2.0, 2.618],
        sl_percent: 2.0,
        tp_percents: [1.5, 3.0, 5.0],
        log_level: "ERROR".to_string(),
    }
}

pub fn test_market(symbol: &str) -> MarketMetadata {
    MarketMetadata {
        symbol: symbol.to_string(),
        active: true,
        market_type: "swap".to_string(),
        min_order_size: 0.001,
        max_leverage: 100.0,
        maker_fee: 0.0002,
        taker_fee: 0.0006,
    }
}

pub fn test_signal(symbol: &str, price: f64, levels: Option<SwingLevelSet>) -> Signal {
    Signal {
        symbol: symbol.to_string(),
        timestamp: Utc::now(),
        price,
        volume_increase: 160.0,
        ema_value: price * 0.99,
        levels,
        strength: crate::models::SignalStrength::Medium,
        market: test_market(symbol),
    }
}

/// Canned 4h series whose final candle crosses above the EMA(20) on a
/// 160% volume spike.
pub fn crossover_h4() -> CandleSeries {
    let mut closes = vec![100.0; 21];
    closes.push(98.0);
    closes.push(100.5);
    let mut volumes = vec![1000.0; 22];
    volumes.push(2600.0);
    make_closes(&closes, &volumes)
}

/// In-memory gateway double with switchable failure modes.
pub struct MockGateway {
    pub markets: HashMap<String, MarketMetadata>,
    pub candles: HashMap<(String, Timeframe), CandleSeries>,
    pub ticker_price: f64,
    pub positions: Vec<OpenPosition>,
    pub orders: Arc<Mutex<Vec<OrderRef>>>,
    pub cancelled: Arc<Mutex<Vec<String>>>,
    fail_market: bool,
    fail_stop: bool,
    fail_limit: bool,
    fail_ticker: bool,
    order_counter: AtomicU64,
}

impl MockGateway {
    pub fn new(ticker_price: f64) -> Self {
        Self {
            markets: HashMap::new(),
            candles: HashMap::new(),
            ticker_price,
            positions: Vec::new(),
            orders: Arc::new(Mutex::new(Vec::new())),
            cancelled: Arc::new(Mutex::new(Vec::new())),
            fail_market: false,
            fail_stop: false,
            fail_limit: false,
            fail_ticker: false,
            order_counter: AtomicU64::new(1),
        }
    }

    /// One active swap symbol carrying a crossover + volume spike.
    pub fn with_crossover_data() -> Self {
        let symbol = "XBTUSDTM";
        let mut gateway = Self::new(100.5);
        gateway
            .markets
            .insert(symbol.to_string(), test_market(symbol));
        gateway
            .candles
            .insert((symbol.to_string(), Timeframe::H4), crossover_h4());
        gateway.candles.insert(
            (symbol.to_string(), Timeframe::M15),
            make_closes(&vec![100.0; 50], &vec![10.0; 50]),
        );
        gateway
    }

    pub fn fail_market_orders(mut self) -> Self {
        self.fail_market = true;
        self
    }

    pub fn fail_stop_orders(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn fail_limit_orders(mut self) -> Self {
        self.fail_limit = true;
        self
    }

    pub fn fail_ticker(mut self) -> Self {
        self.fail_ticker = true;
        self
    }

    pub fn with_positions(mut self, rows: Vec<(&str, f64)>) -> Self {
        self.positions = rows
            .into_iter()
            .map(|(symbol, size)| OpenPosition {
                symbol: symbol.to_string(),
                size,
                entry_price: 100.0,
                unrealized_pnl: 0.0,
            })
            .collect();
        self
    }

    fn record_order(
        &self,
        symbol: &str,
        side: Side,
        order_type: OrderType,
        size: f64,
        price: Option<f64>,
    ) -> OrderRef {
        let order = OrderRef {
            id: format!("mock-{}", self.order_counter.fetch_add(1, Ordering::Relaxed)),
            symbol: symbol.to_string(),
            side,
            order_type,
            size,
            price,
        };
        self.orders.lock().unwrap().push(order.clone());
        order
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn load_markets(&self) -> Result<HashMap<String, MarketMetadata>> {
        Ok(self.markets.clone())
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        tf: Timeframe,
        _limit: usize,
    ) -> Result<CandleSeries> {
        Ok(self
            .candles
            .get(&(symbol.to_string(), tf))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_balance(&self) -> Result<AccountBalance> {
        Ok(AccountBalance {
            free: 1000.0,
            used: 0.0,
            total: 1000.0,
        })
    }

    async fn fetch_open_positions(&self) -> Result<Vec<OpenPosition>> {
        Ok(self.positions.clone())
    }

    async fn place_market_order(&self, symbol: &str, side: Side, size: f64) -> Result<OrderRef> {
        if self.fail_market {
            return Err(BotError::OrderRejected(format!("{symbol}: mock rejection")));
        }
        Ok(self.record_order(symbol, side, OrderType::Market, size, None))
    }

    async fn place_limit_order(
        &self,
        symbol: &str,
        side: Side,
        size: f64,
        price: f64,
    ) -> Result<OrderRef> {
        if self.fail_limit {
            return Err(BotError::OrderRejected(format!("{symbol}: mock rejection")));
        }
        Ok(self.record_order(symbol, side, OrderType::Limit, size, Some(price)))
    }

    async fn place_stop_order(
        &self,
        symbol: &str,
        side: Side,
        size: f64,
        stop_price: f64,
    ) -> Result<OrderRef> {
        if self.fail_stop {
            return Err(BotError::OrderRejected(format!("{symbol}: mock rejection")));
        }
        Ok(self.record_order(symbol, side, OrderType::Stop, size, Some(stop_price)))
    }

    async fn cancel_order(&self, order_id: &str, _symbol: &str) -> Result<()> {
        self.cancelled.lock().unwrap().push(order_id.to_string());
        Ok(())
    }

    async fn fetch_order_status(&self, order_id: &str, _symbol: &str) -> Result<OrderRef> {
        self.orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == order_id)
            .cloned()
            .ok_or_else(|| BotError::Transient(format!("order {order_id} not found")))
    }

    async fn fetch_ticker(&self, _symbol: &str) -> Result<f64> {
        if self.fail_ticker {
            return Err(BotError::Transient("mock ticker outage".to_string()));
        }
        Ok(self.ticker_price)
    }
}
