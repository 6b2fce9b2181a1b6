pub mod candle;
pub mod market;
pub mod timeframe;
pub mod types;

pub use candle::{Candle, CandleSeries};
pub use market::{AccountBalance, MarketMetadata, OpenPosition, OrderRef, PnlSnapshot};
pub use timeframe::Timeframe;
pub use types::*;
