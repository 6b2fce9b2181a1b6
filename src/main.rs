use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use kucoin_perp_bot::config::Config;
use kucoin_perp_bot::engine::TradingEngine;
use kucoin_perp_bot::exchange::KucoinFuturesClient;

const STATUS_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    info!("{}", "=".repeat(60));
    info!("KuCoin perpetual-swap scanner starting up");
    info!(
        "Mode: {}",
        if cfg.sandbox { "SANDBOX" } else { "LIVE" }
    );
    info!(
        "EMA({}) on {} | volume threshold {}% | scan every {}s",
        cfg.ema_period, cfg.timeframe_main, cfg.volume_threshold, cfg.scan_interval
    );
    info!("{}", "=".repeat(60));

    let engine = match KucoinFuturesClient::new(&cfg) {
        Ok(client) => TradingEngine::new(&cfg, Arc::new(client)),
        Err(e) => {
            error!("Gateway initialization failed ({e}); running as no-op");
            TradingEngine::disabled(&cfg)
        }
    };

    if let Err(e) = engine.start_scanning() {
        warn!("Scanner not started: {e}");
    }

    let mut status = tokio::time::interval(std::time::Duration::from_secs(STATUS_INTERVAL_SECS));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                engine.stop_scanning();
                break;
            }
            _ = status.tick() => {
                let signals = engine.current_signals();
                let trades = engine.trade_history();
                info!(
                    "Status: {} signal(s) in latest cycle | {} trade(s) recorded",
                    signals.len(),
                    trades.len()
                );
                for s in &signals {
                    info!(
                        "  {} @ {} (+{:.1}% vol, {})",
                        s.symbol, s.price, s.volume_increase, s.strength
                    );
                }
            }
        }
    }

    info!("Bot stopped.");
    Ok(())
}
