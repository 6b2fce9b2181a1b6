use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use kucoin_perp_bot::config::Config;
use kucoin_perp_bot::error::{BotError, Result};
use kucoin_perp_bot::exchange::Gateway;
use kucoin_perp_bot::models::{
    AccountBalance, Candle, CandleSeries, MarketMetadata, OpenPosition, OrderRef, OrderType,
    Side, Timeframe,
};

pub fn test_config() -> Config {
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

pub fn flat_series(closes: &[f64], volumes: &[f64]) -> CandleSeries {
    let base = DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc);

    let candles: Vec<Candle> = closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&c, &v))| Candle {
            timestamp: base + Duration::minutes(15 * i as i64),
            open: c,
            high: c,
            low: c,
            close: c,
            volume: v,
        })
        .collect();

    CandleSeries::new(candles)
}

fn swap_market(symbol: &str) -> MarketMetadata {
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

/// A mock gateway serving one crossover symbol, one quiet symbol and one
/// symbol whose candle fetches always fail.
pub struct MockGateway {
    markets: HashMap<String, MarketMetadata>,
    candles: HashMap<(String, Timeframe), CandleSeries>,
    ticker_price: f64,
    pub orders: Arc<Mutex<Vec<OrderRef>>>,
    pub cancelled: Arc<Mutex<Vec<String>>>,
    order_counter: AtomicU64,
}

impl MockGateway {
    pub fn new() -> Self {
        let mut markets = HashMap::new();
        let mut candles = HashMap::new();

        // Symbol with a fresh EMA(20) crossover and a 160% volume spike.
        let hot = "XBTUSDTM";
        markets.insert(hot.to_string(), swap_market(hot));
        let mut closes = vec![100.0; 21];
        closes.push(98.0);
        closes.push(100.5);
        let mut volumes = vec![1000.0; 22];
        volumes.push(2600.0);
        candles.insert(
            (hot.to_string(), Timeframe::H4),
            flat_series(&closes, &volumes),
        );
        candles.insert(
            (hot.to_string(), Timeframe::M15),
            flat_series(&vec![100.0; 50], &vec![10.0; 50]),
        );

        // Symbol with no setup at all.
        let quiet = "ETHUSDTM";
        markets.insert(quiet.to_string(), swap_market(quiet));
        candles.insert(
            (quiet.to_string(), Timeframe::H4),
            flat_series(&vec![200.0; 30], &vec![500.0; 30]),
        );
        candles.insert(
            (quiet.to_string(), Timeframe::M15),
            flat_series(&vec![200.0; 50], &vec![10.0; 50]),
        );

        // Symbol whose data fetch fails; the cycle must skip it.
        let broken = "SOLUSDTM";
        markets.insert(broken.to_string(), swap_market(broken));

        Self {
            markets,
            candles,
            ticker_price: 102.0,
            orders: Arc::new(Mutex::new(Vec::new())),
            cancelled: Arc::new(Mutex::new(Vec::new())),
            order_counter: AtomicU64::new(1),
        }
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
            id: format!("it-{}", self.order_counter.fetch_add(1, Ordering::Relaxed)),
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
        self.candles
            .get(&(symbol.to_string(), tf))
            .cloned()
            .ok_or_else(|| BotError::Transient(format!("{symbol}: no kline data")))
    }

    async fn fetch_balance(&self) -> Result<AccountBalance> {
        Ok(AccountBalance {
            free: 950.0,
            used: 50.0,
            total: 1000.0,
        })
    }

    async fn fetch_open_positions(&self) -> Result<Vec<OpenPosition>> {
        Ok(vec![
            OpenPosition {
                symbol: "XBTUSDTM".to_string(),
                size: 1.0,
                entry_price: 100.0,
                unrealized_pnl: 2.0,
            },
            OpenPosition {
                symbol: "ETHUSDTM".to_string(),
                size: 0.0,
                entry_price: 0.0,
                unrealized_pnl: 0.0,
            },
        ])
    }

    async fn place_market_order(&self, symbol: &str, side: Side, size: f64) -> Result<OrderRef> {
        Ok(self.record_order(symbol, side, OrderType::Market, size, None))
    }

    async fn place_limit_order(
        &self,
        symbol: &str,
        side: Side,
        size: f64,
        price: f64,
    ) -> Result<OrderRef> {
        Ok(self.record_order(symbol, side, OrderType::Limit, size, Some(price)))
    }

    async fn place_stop_order(
        &self,
        symbol: &str,
        side: Side,
        size: f64,
        stop_price: f64,
    ) -> Result<OrderRef> {
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
        Ok(self.ticker_price)
    }
}
