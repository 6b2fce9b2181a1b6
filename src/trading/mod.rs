pub mod executor;
pub mod risk;

pub use executor::{TradeExecutor, TradeRecord};
pub use risk::{PositionSizing, PriceLevels, RiskEngine};
