use serde::{Deserialize, Serialize};

use crate::models::{Candle, SwingDirection};

const LOOKBACK: usize = 50;
const ROLLING_WINDOW: usize = 10;
const MIN_CANDLES: usize = 20;

/// Retracement and extension prices anchored on the most recent swing
/// high/low of the 15-minute window. Derived once per signal, never
/// mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwingLevelSet {
    pub swing_high: f64,
    pub swing_low: f64,
    pub direction: SwingDirection,
    /// (ratio, price) pairs in configured ratio order.
    pub retracements: Vec<(f64, f64)>,
    pub extensions: Vec<(f64, f64)>,
}

impl SwingLevelSet {
    pub fn extension_prices(&self) -> Vec<f64> {
        self.extensions.iter().map(|(_, p)| *p).collect()
    }
}

/// Rolling maximum over `window` values; one output per input from index
/// `window - 1` onward.
fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    if values.len() < window {
        return Vec::new();
    }
    values
        .windows(window)
        .map(|w| w.iter().copied().fold(f64::NEG_INFINITY, f64::max))
        .collect()
}

fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    if values.len() < window {
        return Vec::new();
    }
    values
        .windows(window)
        .map(|w| w.iter().copied().fold(f64::INFINITY, f64::min))
        .collect()
}

/// First index of the maximum value (ties resolve to the earliest).
fn idx_max(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, bv)) if v <= bv => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

fn idx_min(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, bv)) if v >= bv => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Computes the swing-level set over the most recent 50 candles of the
/// 15-minute series. Returns `None` when fewer than 20 candles are
/// available; the caller treats that as a non-fatal empty level set.
pub fn compute_levels(
    candles: &[Candle],
    retracement_ratios: &[f64],
    extension_ratios: &[f64],
) -> Option<SwingLevelSet> {
    if candles.len() < MIN_CANDLES {
        return None;
    }

    let start = candles.len().saturating_sub(LOOKBACK);
    let window = &candles[start..];
    let highs: Vec<f64> = window.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = window.iter().map(|c| c.low).collect();

    let high_rolling = rolling_max(&highs, ROLLING_WINDOW);
    let low_rolling = rolling_min(&lows, ROLLING_WINDOW);

    // The rolling series starts at index window-1 of the raw series; add
    // the offset back so the two extremum indices are comparable in time.
    let high_pos = idx_max(&high_rolling)?;
    let low_pos = idx_min(&low_rolling)?;
    let swing_high = high_rolling[high_pos];
    let swing_low = low_rolling[low_pos];
    let high_idx = high_pos + ROLLING_WINDOW - 1;
    let low_idx = low_pos + ROLLING_WINDOW - 1;

    let direction = if high_idx > low_idx {
        SwingDirection::Bullish
    } else {
        SwingDirection::Bearish
    };
    let diff = swing_high - swing_low;

    let retracements = retracement_ratios
        .iter()
        .map(|&r| {
            let price = match direction {
                SwingDirection::Bullish => swing_high - diff * r,
                SwingDirection::Bearish => swing_low + diff * r,
            };
            (r, price)
        })
        .collect();

    let extensions = extension_ratios
        .iter()
        .map(|&r| {
            let price = match direction {
                SwingDirection::Bullish => swing_high + diff * (r - 1.0),
                SwingDirection::Bearish => swing_low - diff * (r - 1.0),
            };
            (r, price)
        })
        .collect();

    Some(SwingLevelSet {
        swing_high,
        swing_low,
        direction,
        retracements,
        extensions,
    })
}
