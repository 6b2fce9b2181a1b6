use serde::{Deserialize, Serialize};

use crate::models::Timeframe;

/// Immutable runtime configuration, built once in `main` and passed by
/// reference into each component at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // KuCoin Futures API
    pub api_key: String,
    pub api_secret: String,
    pub api_passphrase: String,
    pub sandbox: bool,

    // Scanner
    pub scan_interval: u64,
    pub volume_threshold: f64,
    pub ema_period: usize,
    pub timeframe_main: Timeframe,
    pub timeframe_fib: Timeframe,

    // Orders
    pub default_position_size: f64,
    pub risk_fraction: f64,
    pub default_leverage: f64,

    // Fibonacci ratio sets
    pub fib_retracements: Vec<f64>,
    pub fib_extensions: Vec<f64>,

    // Stop loss / take profit
    pub sl_percent: f64,
    pub tp_percents: [f64; 3],

    // Logging
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };

        Config {
            api_key: env("KUCOIN_API_KEY", ""),
            api_secret: env("KUCOIN_API_SECRET", ""),
            api_passphrase: env("KUCOIN_PASSPHRASE", ""),
            sandbox: env("KUCOIN_SANDBOX", "true").to_lowercase() == "true",
            scan_interval: env("SCAN_INTERVAL", "60").parse().unwrap_or(60),
            volume_threshold: env("VOLUME_THRESHOLD", "150").parse().unwrap_or(150.0),
            ema_period: env("EMA_PERIOD", "20").parse().unwrap_or(20),
            timeframe_main: Timeframe::from_str_loose(&env("TIMEFRAME_MAIN", "4h"))
                .unwrap_or(Timeframe::H4),
            timeframe_fib: Timeframe::from_str_loose(&env("TIMEFRAME_FIBONACCI", "15m"))
                .unwrap_or(Timeframe::M15),
            default_position_size: env("DEFAULT_POSITION_SIZE", "100")
                .parse()
                .unwrap_or(100.0),
            risk_fraction: 0.02,
            default_leverage: env("DEFAULT_LEVERAGE", "1").parse().unwrap_or(1.0),
            fib_retracements: vec![0.236, 0.382, 0.5, 0.618, 0.786],
            fib_extensions: vec![1.272, 1.414, 1.618, 2.0, 2.618],
            sl_percent: env("DEFAULT_SL_PERCENT", "2").parse().unwrap_or(2.0),
            tp_percents: [
                env("TP1_PERCENT", "1.5").parse().unwrap_or(1.5),
                env("TP2_PERCENT", "3").parse().unwrap_or(3.0),
                env("TP3_PERCENT", "5").parse().unwrap_or(5.0),
            ],
            log_level: env("LOG_LEVEL", "INFO"),
        }
    }
}
