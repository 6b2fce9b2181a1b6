use tracing::info;

use crate::config::Config;
use crate::error::{BotError, Result};
use crate::models::{CandleSeries, MarketMetadata, SignalStrength};
use crate::scanner::signal::Signal;
use crate::scanner::swing;

/// Exponential moving average, smoothing factor `2 / (period + 1)`,
/// seeded with the simple average of the first `period` values. Returns
/// one value per input from index `period - 1` onward; empty when there
/// are fewer than `period` inputs.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let seed: f64 = values[..period].iter().sum::<f64>() / period as f64;

    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(seed);
    let mut prev = seed;
    for &v in &values[period..] {
        prev = alpha * v + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// True only on the candle where price first crosses above the average:
/// previous close at or below the previous EMA and current close strictly
/// above the current EMA.
pub fn ema_crossover(closes: &[f64], period: usize) -> Result<bool> {
    if closes.len() < period + 2 {
        return Err(BotError::InsufficientData(format!(
            "need {} closes for EMA({period}) crossover, have {}",
            period + 2,
            closes.len()
        )));
    }

    let ema_series = ema(closes, period);
    let n = ema_series.len();
    let current_ema = ema_series[n - 1];
    let previous_ema = ema_series[n - 2];
    let current_close = closes[closes.len() - 1];
    let previous_close = closes[closes.len() - 2];

    Ok(previous_close <= previous_ema && current_close > current_ema)
}

/// Percentage volume change of the latest candle vs. the one before it.
/// A zero previous volume is an undefined ratio and never qualifies.
pub fn volume_increase(volumes: &[f64], threshold: f64) -> (bool, f64) {
    if volumes.len() < 2 {
        return (false, 0.0);
    }
    let current = volumes[volumes.len() - 1];
    let previous = volumes[volumes.len() - 2];
    if previous == 0.0 {
        return (false, 0.0);
    }
    let increase = (current - previous) / previous * 100.0;
    (increase >= threshold, increase)
}

fn strictly_increasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[1] > w[0])
}

/// Additive strength heuristic, a pure function of the close window, the
/// current EMA value and the measured volume increase. Not a probability.
pub fn strength_score(closes: &[f64], ema_value: f64, volume_increase: f64) -> SignalStrength {
    let mut score = if volume_increase > 100.0 {
        3
    } else if volume_increase > 75.0 {
        2
    } else {
        1
    };

    if closes.len() >= 5 {
        let last5 = &closes[closes.len() - 5..];
        if strictly_increasing(last5) {
            score += 2;
        } else if strictly_increasing(&last5[2..]) {
            score += 1;
        }
    }

    if let Some(&current) = closes.last() {
        if current > ema_value * 1.02 {
            score += 1;
        }
    }

    if score >= 5 {
        SignalStrength::Strong
    } else if score >= 3 {
        SignalStrength::Medium
    } else {
        SignalStrength::Weak
    }
}

/// Per-symbol technical evaluation: EMA crossover on the 4h series gated
/// by a volume spike, with swing levels and a strength grade attached.
pub struct SignalDetector {
    ema_period: usize,
    volume_threshold: f64,
    retracement_ratios: Vec<f64>,
    extension_ratios: Vec<f64>,
}

impl SignalDetector {
    pub fn new(cfg: &Config) -> Self {
        Self {
            ema_period: cfg.ema_period,
            volume_threshold: cfg.volume_threshold,
            retracement_ratios: cfg.fib_retracements.clone(),
            extension_ratios: cfg.fib_extensions.clone(),
        }
    }

    /// Evaluates one symbol. `Ok(None)` means "no signal this cycle";
    /// `Err` only for insufficient 4h history.
    pub fn evaluate(
        &self,
        symbol: &str,
        h4: &CandleSeries,
        m15: &CandleSeries,
        market: &MarketMetadata,
    ) -> Result<Option<Signal>> {
        let closes = h4.closes();
        if !ema_crossover(&closes, self.ema_period)? {
            return Ok(None);
        }

        let (qualifies, increase) = volume_increase(&h4.volumes(), self.volume_threshold);
        if !qualifies {
            return Ok(None);
        }

        let ema_series = ema(&closes, self.ema_period);
        let ema_value = *ema_series.last().ok_or_else(|| {
            BotError::InsufficientData(format!("{symbol}: EMA window empty"))
        })?;

        // Swing-level failure is non-fatal; sizing falls back to fixed
        // percentage targets.
        let levels = swing::compute_levels(
            m15.as_slice(),
            &self.retracement_ratios,
            &self.extension_ratios,
        );

        let price = closes[closes.len() - 1];
        let strength = strength_score(&closes, ema_value, increase);

        info!(
            "Signal {symbol}: price={price} volume=+{increase:.1}% strength={strength}"
        );

        Ok(Some(Signal {
            symbol: symbol.to_string(),
            timestamp: h4.last().map(|c| c.timestamp).unwrap_or_else(chrono::Utc::now),
            price,
            volume_increase: (increase * 100.0).round() / 100.0,
            ema_value,
            levels,
            strength,
            market: market.clone(),
        }))
    }
}
