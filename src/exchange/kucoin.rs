use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::Config;
use crate::error::{BotError, Result};
use crate::exchange::Gateway;
use crate::models::{
    AccountBalance, Candle, CandleSeries, MarketMetadata, OpenPosition, OrderRef, OrderType,
    Side, Timeframe,
};

const LIVE_URL: &str = "https://api-futures.kucoin.com";
const SANDBOX_URL: &str = "https://api-sandbox-futures.kucoin.com";
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(100);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::Deserialize<'de>"))]
struct Envelope<T> {
    code: String,
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    msg: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContract {
    symbol: String,
    status: String,
    lot_size: f64,
    max_leverage: f64,
    maker_fee_rate: f64,
    taker_fee_rate: f64,
    #[serde(default)]
    expire_date: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAccountOverview {
    available_balance: f64,
    position_margin: f64,
    order_margin: f64,
    account_equity: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPosition {
    symbol: String,
    current_qty: f64,
    #[serde(default)]
    avg_entry_price: f64,
    #[serde(default)]
    unrealised_pnl: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderCreated {
    order_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrder {
    id: String,
    symbol: String,
    side: String,
    #[serde(rename = "type")]
    order_type: String,
    size: f64,
    #[serde(default)]
    price: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTicker {
    price: String,
}

/// KuCoin Futures REST gateway. All methods take `&self`; the rate-limit
/// clock sits behind a tokio mutex so the client can be shared between the
/// background scanner and the control surface.
pub struct KucoinFuturesClient {
    client: Client,
    base_url: &'static str,
    api_key: String,
    api_secret: String,
    api_passphrase: String,
    last_request: Mutex<Option<Instant>>,
    oid_counter: AtomicU64,
}

impl KucoinFuturesClient {
    /// Fails when credentials are missing or the HTTP client cannot be
    /// built; the engine then degrades to a no-op state.
    pub fn new(cfg: &Config) -> Result<Self> {
        if cfg.api_key.is_empty() || cfg.api_secret.is_empty() || cfg.api_passphrase.is_empty() {
            return Err(BotError::Unavailable);
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BotError::transient("http client init", e))?;

        Ok(Self {
            client,
            base_url: if cfg.sandbox { SANDBOX_URL } else { LIVE_URL },
            api_key: cfg.api_key.clone(),
            api_secret: cfg.api_secret.clone(),
            api_passphrase: cfg.api_passphrase.clone(),
            last_request: Mutex::new(None),
            oid_counter: AtomicU64::new(0),
        })
    }

    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn sign(&self, payload: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| BotError::transient("hmac key", e))?;
        mac.update(payload.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    fn next_client_oid(&self) -> String {
        let n = self.oid_counter.fetch_add(1, Ordering::Relaxed);
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        format!("bot-{ms}-{n}")
    }

    /// Signed request per KC-API v2: the signature covers
    /// `timestamp + METHOD + endpoint + body`.
    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        self.rate_limit().await;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| BotError::transient("system clock", e))?
            .as_millis()
            .to_string();

        let body_str = body
            .as_ref()
            .map(|b| b.to_string())
            .unwrap_or_default();
        let prehash = format!("{timestamp}{method}{endpoint}{body_str}");
        let signature = self.sign(&prehash)?;
        let passphrase = self.sign(&self.api_passphrase)?;

        let mut req = self
            .client
            .request(method, format!("{}{}", self.base_url, endpoint))
            .header("KC-API-KEY", &self.api_key)
            .header("KC-API-SIGN", signature)
            .header("KC-API-TIMESTAMP", timestamp)
            .header("KC-API-PASSPHRASE", passphrase)
            .header("KC-API-KEY-VERSION", "2");

        if let Some(b) = body {
            req = req.json(&b);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| BotError::transient(endpoint, e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(BotError::Transient(format!(
                "{endpoint}: HTTP {status}: {text}"
            )));
        }

        let envelope: Envelope<T> = resp
            .json()
            .await
            .map_err(|e| BotError::transient(endpoint, e))?;

        if envelope.code != "200000" {
            return Err(BotError::Transient(format!(
                "{endpoint}: API code {}: {}",
                envelope.code,
                envelope.msg.unwrap_or_default()
            )));
        }

        envelope
            .data
            .ok_or_else(|| BotError::Transient(format!("{endpoint}: empty data")))
    }

    async fn place_order(&self, body: serde_json::Value, symbol: &str) -> Result<OrderCreated> {
        self.send::<OrderCreated>(Method::POST, "/api/v1/orders", Some(body))
            .await
            .map_err(|e| match e {
                BotError::Transient(msg) => BotError::OrderRejected(format!("{symbol}: {msg}")),
                other => other,
            })
    }
}

#[async_trait]
impl Gateway for KucoinFuturesClient {
    async fn load_markets(&self) -> Result<HashMap<String, MarketMetadata>> {
        let contracts: Vec<RawContract> = self
            .send(Method::GET, "/api/v1/contracts/active", None)
            .await?;

        let markets = contracts
            .into_iter()
            .map(|c| {
                let meta = MarketMetadata {
                    symbol: c.symbol.clone(),
                    active: c.status == "Open",
                    // No expiry means a perpetual swap.
                    market_type: if c.expire_date.is_none() {
                        "swap".to_string()
                    } else {
                        "futures".to_string()
                    },
                    min_order_size: c.lot_size,
                    max_leverage: c.max_leverage,
                    maker_fee: c.maker_fee_rate,
                    taker_fee: c.taker_fee_rate,
                };
                (c.symbol, meta)
            })
            .collect();

        Ok(markets)
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        tf: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries> {
        let granularity = tf.granularity_minutes();
        let span_ms = (granularity * 60_000) as i64 * limit as i64;
        let to = Utc::now().timestamp_millis();
        let from = to - span_ms;
        let endpoint = format!(
            "/api/v1/kline/query?symbol={symbol}&granularity={granularity}&from={from}&to={to}"
        );

        // Rows come back as [time_ms, open, high, low, close, volume].
        let rows: Vec<[f64; 6]> = self.send(Method::GET, &endpoint, None).await?;

        let mut candles: Vec<Candle> = rows
            .into_iter()
            .filter_map(|row| {
                let timestamp = DateTime::from_timestamp_millis(row[0] as i64)?;
                Some(Candle {
                    timestamp,
                    open: row[1],
                    high: row[2],
                    low: row[3],
                    close: row[4],
                    volume: row[5],
                })
            })
            .collect();

        candles.sort_by_key(|c| c.timestamp);
        debug!("{symbol} {tf}: fetched {} candles", candles.len());

        Ok(CandleSeries::new(candles))
    }

    async fn fetch_balance(&self) -> Result<AccountBalance> {
        let overview: RawAccountOverview = self
            .send(Method::GET, "/api/v1/account-overview?currency=USDT", None)
            .await?;

        Ok(AccountBalance {
            free: overview.available_balance,
            used: overview.position_margin + overview.order_margin,
            total: overview.account_equity,
        })
    }

    async fn fetch_open_positions(&self) -> Result<Vec<OpenPosition>> {
        let positions: Vec<RawPosition> =
            self.send(Method::GET, "/api/v1/positions", None).await?;

        Ok(positions
            .into_iter()
            .map(|p| OpenPosition {
                symbol: p.symbol,
                size: p.current_qty,
                entry_price: p.avg_entry_price,
                unrealized_pnl: p.unrealised_pnl,
            })
            .collect())
    }

    async fn place_market_order(&self, symbol: &str, side: Side, size: f64) -> Result<OrderRef> {
        let body = json!({
            "clientOid": self.next_client_oid(),
            "symbol": symbol,
            "side": side.as_str(),
            "type": "market",
            "size": size,
        });
        let created = self.place_order(body, symbol).await?;

        Ok(OrderRef {
            id: created.order_id,
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            size,
            price: None,
        })
    }

    async fn place_limit_order(
        &self,
        symbol: &str,
        side: Side,
        size: f64,
        price: f64,
    ) -> Result<OrderRef> {
        let body = json!({
            "clientOid": self.next_client_oid(),
            "symbol": symbol,
            "side": side.as_str(),
            "type": "limit",
            "size": size,
            "price": price.to_string(),
        });
        let created = self.place_order(body, symbol).await?;

        Ok(OrderRef {
            id: created.order_id,
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Limit,
            size,
            price: Some(price),
        })
    }

    async fn place_stop_order(
        &self,
        symbol: &str,
        side: Side,
        size: f64,
        stop_price: f64,
    ) -> Result<OrderRef> {
        // Sell stop below market = "down" trigger.
        let stop_dir = match side {
            Side::Sell => "down",
            Side::Buy => "up",
        };
        let body = json!({
            "clientOid": self.next_client_oid(),
            "symbol": symbol,
            "side": side.as_str(),
            "type": "market",
            "size": size,
            "stop": stop_dir,
            "stopPrice": stop_price.to_string(),
            "stopPriceType": "TP",
        });
        let created = self.place_order(body, symbol).await?;

        Ok(OrderRef {
            id: created.order_id,
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Stop,
            size,
            price: Some(stop_price),
        })
    }

    async fn cancel_order(&self, order_id: &str, symbol: &str) -> Result<()> {
        let endpoint = format!("/api/v1/orders/{order_id}");
        let _: serde_json::Value = self
            .send(Method::DELETE, &endpoint, None)
            .await
            .map_err(|e| match e {
                BotError::Transient(msg) => {
                    BotError::OrderRejected(format!("cancel {order_id} ({symbol}): {msg}"))
                }
                other => other,
            })?;
        Ok(())
    }

    async fn fetch_order_status(&self, order_id: &str, symbol: &str) -> Result<OrderRef> {
        let endpoint = format!("/api/v1/orders/{order_id}");
        let raw: RawOrder = self.send(Method::GET, &endpoint, None).await?;

        let side = match raw.side.as_str() {
            "buy" => Side::Buy,
            _ => Side::Sell,
        };
        let order_type = match raw.order_type.as_str() {
            "limit" => OrderType::Limit,
            "market" => OrderType::Market,
            _ => OrderType::Stop,
        };

        Ok(OrderRef {
            id: raw.id,
            symbol: if raw.symbol.is_empty() {
                symbol.to_string()
            } else {
                raw.symbol
            },
            side,
            order_type,
            size: raw.size,
            price: raw.price.and_then(|p| p.parse().ok()),
        })
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<f64> {
        let endpoint = format!("/api/v1/ticker?symbol={symbol}");
        let ticker: RawTicker = self.send(Method::GET, &endpoint, None).await?;

        ticker
            .price
            .parse()
            .map_err(|e| BotError::transient(&format!("{symbol} ticker"), e))
    }
}
