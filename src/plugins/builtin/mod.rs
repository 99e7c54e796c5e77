//! Producer kinds shipped with the relay

mod candles;
mod price_levels;
mod static_payload;

pub use candles::{parse_kline, BinanceKlines, Candle, CandleSource, FileCandles};
pub use price_levels::{detect_levels, format_level, PriceLevels, PRICE_LEVELS_KIND};
pub use static_payload::{StaticPayload, STATIC_KIND};
