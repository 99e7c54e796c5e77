//! Support / resistance level detector
//!
//! Finds swing highs and lows in a window of candles, merges pivots that sit
//! within a relative tolerance of an already kept level, and counts how many
//! highs and lows touch each level. Levels touched at least `touches_min`
//! times are published as `{"<level>": touches}`.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::candles::{BinanceKlines, Candle, CandleSource, FileCandles};
use crate::error::{LoadError, ProduceError};
use crate::plugins::Producer;
use crate::types::Payload;

pub const PRICE_LEVELS_KIND: &str = "price_levels";

fn default_tolerance() -> f64 {
    0.005
}

fn default_touches_min() -> u32 {
    2
}

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_timeframe() -> String {
    "1h".to_string()
}

fn default_lookback() -> usize {
    200
}

fn default_base_url() -> String {
    "https://api.binance.com".to_string()
}

#[derive(Debug, Clone, Deserialize)]
struct LevelSettings {
    #[serde(default = "default_tolerance")]
    tolerance: f64,
    #[serde(default = "default_touches_min")]
    touches_min: u32,
    /// Read candles from this file instead of the exchange
    #[serde(default)]
    candles_file: Option<PathBuf>,
    #[serde(default = "default_symbol")]
    symbol: String,
    #[serde(default = "default_timeframe")]
    timeframe: String,
    #[serde(default = "default_lookback")]
    lookback: usize,
    #[serde(default = "default_base_url")]
    base_url: String,
}

pub struct PriceLevels {
    name: String,
    source: Arc<dyn CandleSource>,
    tolerance: f64,
    touches_min: u32,
}

impl PriceLevels {
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn CandleSource>,
        tolerance: f64,
        touches_min: u32,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            tolerance,
            touches_min,
        }
    }

    pub fn from_settings(name: &str, settings: &Value) -> Result<Self, LoadError> {
        let invalid = |reason: String| LoadError::InvalidSettings {
            name: name.to_string(),
            reason,
        };

        let settings = if settings.is_null() {
            Value::Object(Map::new())
        } else {
            settings.clone()
        };
        let settings: LevelSettings =
            serde_json::from_value(settings).map_err(|e| invalid(e.to_string()))?;

        if !(settings.tolerance.is_finite() && settings.tolerance > 0.0) {
            return Err(invalid(format!("tolerance must be positive, got {}", settings.tolerance)));
        }
        if settings.lookback < 5 {
            return Err(invalid(format!("lookback must be at least 5, got {}", settings.lookback)));
        }

        let source: Arc<dyn CandleSource> = match settings.candles_file {
            Some(path) => Arc::new(FileCandles::new(path)),
            None => Arc::new(BinanceKlines::new(
                settings.base_url,
                settings.symbol,
                settings.timeframe,
                settings.lookback,
            )),
        };

        Ok(Self::new(name, source, settings.tolerance, settings.touches_min))
    }
}

impl Producer for PriceLevels {
    fn produce(&self) -> Result<Option<Payload>, ProduceError> {
        tracing::debug!(
            plugin = %self.name,
            at = %chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            "Fetching candles"
        );
        let candles = self.source.fetch()?;
        let levels = detect_levels(&candles, self.tolerance, self.touches_min);

        let map: Map<String, Value> = levels
            .into_iter()
            .map(|(level, touches)| (format_level(level), Value::from(touches)))
            .collect();
        Ok(Some(Value::Object(map)))
    }
}

/// Relative distance check used for both clustering and touch counting
fn is_touched(level: f64, price: f64, tolerance: f64) -> bool {
    ((level - price) / price).abs() < tolerance
}

/// Detect levels and their touch counts, in discovery order
///
/// Levels are rounded to two decimals.
pub fn detect_levels(candles: &[Candle], tolerance: f64, touches_min: u32) -> Vec<(f64, u32)> {
    let mut levels: Vec<f64> = Vec::new();

    for i in 2..candles.len().saturating_sub(2) {
        let (prev, cur, next) = (&candles[i - 1], &candles[i], &candles[i + 1]);
        let level = if cur.high > prev.high && cur.high > next.high {
            cur.high
        } else if cur.low < prev.low && cur.low < next.low {
            cur.low
        } else {
            continue;
        };

        if !levels.iter().any(|&kept| is_touched(kept, level, tolerance)) {
            levels.push(level);
        }
    }

    levels
        .into_iter()
        .filter_map(|level| {
            let touches = candles
                .iter()
                .map(|c| {
                    u32::from(is_touched(level, c.high, tolerance))
                        + u32::from(is_touched(level, c.low, tolerance))
                })
                .sum::<u32>();
            (touches >= touches_min).then(|| ((level * 100.0).round() / 100.0, touches))
        })
        .collect()
}

/// Render a level as a JSON object key: `41980.0`, `42150.25`
pub fn format_level(level: f64) -> String {
    if level.fract() == 0.0 {
        format!("{:.1}", level)
    } else {
        format!("{}", level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixed(Vec<Candle>);

    impl CandleSource for Fixed {
        fn fetch(&self) -> Result<Vec<Candle>, ProduceError> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl CandleSource for Failing {
        fn fetch(&self) -> Result<Vec<Candle>, ProduceError> {
            Err(ProduceError::Fetch("exchange unavailable".into()))
        }
    }

    fn ranges(bars: &[(f64, f64)]) -> Vec<Candle> {
        bars.iter().map(|&(h, l)| Candle::range(h, l)).collect()
    }

    #[test]
    fn test_detects_swing_high_with_touches() {
        // Bar 2 is a swing high at 110; bar 5 touches it again
        let candles = ranges(&[
            (100.0, 95.0),
            (104.0, 99.0),
            (110.0, 103.0),
            (105.0, 104.0),
            (107.0, 105.0),
            (110.2, 104.0),
            (106.0, 102.0),
        ]);

        let levels = detect_levels(&candles, 0.005, 2);
        assert_eq!(levels, vec![(110.0, 2)]);
    }

    #[test]
    fn test_detects_swing_low() {
        let candles = ranges(&[
            (100.0, 95.0),
            (99.0, 94.0),
            (98.0, 90.0),
            (99.0, 93.0),
            (100.0, 90.1),
            (101.0, 96.0),
        ]);

        let levels = detect_levels(&candles, 0.005, 2);
        assert_eq!(levels, vec![(90.0, 2)]);
    }

    #[test]
    fn test_below_touch_minimum_is_dropped() {
        let candles = ranges(&[
            (100.0, 95.0),
            (104.0, 99.0),
            (110.0, 103.0),
            (105.0, 100.0),
            (106.0, 101.0),
        ]);

        assert!(detect_levels(&candles, 0.005, 2).is_empty());
        assert_eq!(detect_levels(&candles, 0.005, 1), vec![(110.0, 1)]);
    }

    #[test]
    fn test_too_few_candles() {
        let candles = ranges(&[(1.0, 0.5), (2.0, 1.0), (1.0, 0.5)]);
        assert!(detect_levels(&candles, 0.005, 1).is_empty());
    }

    #[test]
    fn test_format_level() {
        assert_eq!(format_level(41980.0), "41980.0");
        assert_eq!(format_level(42150.25), "42150.25");
    }

    #[test]
    fn test_produce_builds_level_map() {
        let candles = ranges(&[
            (100.0, 95.0),
            (104.0, 99.0),
            (110.0, 103.0),
            (105.0, 104.0),
            (107.0, 105.0),
            (110.2, 104.0),
            (106.0, 102.0),
        ]);
        let producer = PriceLevels::new("levels", Arc::new(Fixed(candles)), 0.005, 2);

        assert_eq!(producer.produce().unwrap(), Some(json!({"110.0": 2})));
    }

    #[test]
    fn test_fetch_failure_propagates() {
        let producer = PriceLevels::new("levels", Arc::new(Failing), 0.005, 2);
        assert!(matches!(producer.produce(), Err(ProduceError::Fetch(_))));
    }

    #[test]
    fn test_settings_validation() {
        assert!(PriceLevels::from_settings("p", &Value::Null).is_ok());
        assert!(PriceLevels::from_settings("p", &json!({"candles_file": "c.json"})).is_ok());
        assert!(matches!(
            PriceLevels::from_settings("p", &json!({"tolerance": 0})),
            Err(LoadError::InvalidSettings { .. })
        ));
        assert!(matches!(
            PriceLevels::from_settings("p", &json!({"lookback": 2})),
            Err(LoadError::InvalidSettings { .. })
        ));
    }
}
