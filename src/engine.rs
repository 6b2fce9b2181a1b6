use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{BotError, Result};
use crate::exchange::Gateway;
use crate::models::{AccountBalance, OpenPosition, PnlSnapshot};
use crate::scanner::{Scanner, Signal};
use crate::trading::{TradeExecutor, TradeRecord};

struct Core {
    gateway: Arc<dyn Gateway>,
    /// The scanner mutex serializes manual cycles with the background
    /// worker; both publish into the same snapshot.
    scanner: AsyncMutex<Scanner>,
    executor: TradeExecutor,
}

/// Control surface over the scanner, risk engine and executor.
///
/// One background worker at most is in flight, guarded by an atomic run
/// flag settable only by start/stop; cancellation is cooperative between
/// cycles and across the inter-cycle sleep. Readers of the signal
/// snapshot and the trade history only ever get copies.
///
/// Built without a gateway (failed initialization) the engine is a no-op:
/// every operation reports `Unavailable`.
pub struct TradingEngine {
    scan_interval: u64,
    core: Option<Arc<Core>>,
    signals: Arc<Mutex<Vec<Signal>>>,
    running: Arc<AtomicBool>,
}

impl TradingEngine {
    pub fn new(cfg: &Config, gateway: Arc<dyn Gateway>) -> Self {
        Self {
            scan_interval: cfg.scan_interval,
            core: Some(Arc::new(Core {
                gateway: gateway.clone(),
                scanner: AsyncMutex::new(Scanner::new(cfg, gateway.clone())),
                executor: TradeExecutor::new(cfg, gateway),
            })),
            signals: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Degraded engine for when the gateway failed to initialize.
    pub fn disabled(cfg: &Config) -> Self {
        Self {
            scan_interval: cfg.scan_interval,
            core: None,
            signals: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    fn core(&self) -> Result<&Arc<Core>> {
        self.core.as_ref().ok_or(BotError::Unavailable)
    }

    pub fn is_scanning(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Starts the background scan worker. Idempotent: a second start
    /// while the worker is alive does nothing.
    pub fn start_scanning(&self) -> Result<()> {
        let core = self.core()?.clone();
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let signals = self.signals.clone();
        let running = self.running.clone();
        let interval = self.scan_interval;

        tokio::spawn(async move {
            info!("Background scanner started (interval {interval}s)");
            while running.load(Ordering::SeqCst) {
                match core.scanner.lock().await.scan_all().await {
                    Ok(found) => {
                        *signals.lock().expect("signal snapshot lock") = found;
                    }
                    Err(e) => error!("Scan cycle failed: {e}"),
                }

                // Sleep in one-second slices so stop requests take effect
                // promptly.
                for _ in 0..interval {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
            info!("Background scanner stopped");
        });

        Ok(())
    }

    pub fn stop_scanning(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Runs a single scan cycle in the caller's context and publishes the
    /// result as the current snapshot.
    pub async fn run_once(&self) -> Result<Vec<Signal>> {
        let core = self.core()?;
        let found = core.scanner.lock().await.scan_all().await?;
        *self.signals.lock().expect("signal snapshot lock") = found.clone();
        Ok(found)
    }

    /// Signals from the latest completed cycle only.
    pub fn current_signals(&self) -> Vec<Signal> {
        self.signals.lock().expect("signal snapshot lock").clone()
    }

    pub async fn execute_signal(&self, signal: &Signal, budget: f64) -> Result<TradeRecord> {
        self.core()?.executor.execute(signal, budget).await
    }

    pub async fn close_trade(&self, trade_id: u64) -> Result<TradeRecord> {
        self.core()?.executor.close(trade_id).await
    }

    pub async fn compute_pnl(&self, trade_id: u64) -> Result<PnlSnapshot> {
        self.core()?.executor.pnl(trade_id).await
    }

    /// Snapshot copy of the append-only trade history.
    pub fn trade_history(&self) -> Vec<TradeRecord> {
        self.core
            .as_ref()
            .map(|c| c.executor.history())
            .unwrap_or_default()
    }

    pub async fn account_balance(&self) -> Result<AccountBalance> {
        self.core()?.gateway.fetch_balance().await
    }

    /// Open positions with the zero-size rows filtered out.
    pub async fn open_positions(&self) -> Result<Vec<OpenPosition>> {
        let positions = self.core()?.gateway.fetch_open_positions().await?;
        Ok(positions.into_iter().filter(|p| p.size != 0.0).collect())
    }

    /// Symbols newly listed at the most recent universe refresh.
    pub async fn new_listings(&self) -> Result<Vec<String>> {
        let core = self.core()?;
        let mut scanner = core.scanner.lock().await;
        scanner.refresh_universe().await?;
        Ok(scanner.new_listings().to_vec())
    }
}
