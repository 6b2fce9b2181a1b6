use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{BotError, Result};
use crate::models::MarketMetadata;
use crate::scanner::Signal;

/// Leverage-adjusted position size for one execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSizing {
    pub quantity: f64,
    pub notional: f64,
    pub margin_required: f64,
    pub risk_amount: f64,
    pub stop_distance: f64,
    pub leverage: f64,
    pub max_leverage: f64,
}

/// Entry/stop/take-profit ladder for a long. Computed once per execution
/// attempt, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceLevels {
    pub entry: f64,
    pub stop_loss: f64,
    /// Exactly three, strictly increasing, all strictly above entry.
    pub take_profits: [f64; 3],
}

/// Converts an accepted signal plus a risk budget into a sized position
/// and a price ladder.
pub struct RiskEngine {
    sl_percent: f64,
    tp_percents: [f64; 3],
    default_leverage: f64,
}

impl RiskEngine {
    pub fn new(cfg: &Config) -> Self {
        Self {
            sl_percent: cfg.sl_percent,
            tp_percents: cfg.tp_percents,
            default_leverage: cfg.default_leverage,
        }
    }

    /// Sizes a position for `risk_amount` quote currency at risk.
    ///
    /// The quantity is floored at the market minimum, which can silently
    /// push realized risk above the nominal budget; that is accepted, not
    /// corrected. Notional and margin are derived from the floored
    /// quantity so margin * leverage tracks notional.
    pub fn size_position(
        &self,
        market: &MarketMetadata,
        price: f64,
        risk_amount: f64,
    ) -> Result<PositionSizing> {
        let stop_distance = price * (self.sl_percent / 100.0);
        if stop_distance <= 0.0 {
            return Err(BotError::Computation(format!(
                "{}: zero stop distance at price {price}",
                market.symbol
            )));
        }

        let max_leverage = market.max_leverage;
        let leverage = if max_leverage > 0.0 {
            self.default_leverage.min(max_leverage)
        } else {
            self.default_leverage
        }
        .max(1.0);

        let base_quantity = risk_amount / stop_distance;
        let leveraged_quantity = (base_quantity * leverage).max(market.min_order_size);

        let notional = leveraged_quantity * price;
        let margin_required = notional / leverage;

        Ok(PositionSizing {
            quantity: leveraged_quantity,
            notional,
            margin_required,
            risk_amount,
            stop_distance,
            leverage,
            max_leverage,
        })
    }

    /// Derives the stop and the three-tier take-profit ladder for a long
    /// entry. Prefers the three lowest swing-extension prices strictly
    /// above entry; falls back to fixed percentage offsets otherwise.
    pub fn price_levels(&self, signal: &Signal, entry: f64) -> Result<PriceLevels> {
        if entry <= 0.0 {
            return Err(BotError::Computation(format!(
                "{}: non-positive entry price",
                signal.symbol
            )));
        }

        let stop_loss = entry * (1.0 - self.sl_percent / 100.0);

        let mut ladder: Vec<f64> = signal
            .levels
            .as_ref()
            .map(|l| {
                l.extension_prices()
                    .into_iter()
                    .filter(|p| *p > entry)
                    .collect()
            })
            .unwrap_or_default();
        ladder.sort_by(|a, b| a.partial_cmp(b).unwrap());
        ladder.truncate(3);

        let take_profits: [f64; 3] = if ladder.len() == 3 {
            [ladder[0], ladder[1], ladder[2]]
        } else {
            [
                entry * (1.0 + self.tp_percents[0] / 100.0),
                entry * (1.0 + self.tp_percents[1] / 100.0),
                entry * (1.0 + self.tp_percents[2] / 100.0),
            ]
        };

        Ok(PriceLevels {
            entry,
            stop_loss,
            take_profits,
        })
    }
}
