//! OHLC candle feeds for the price level producer

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProduceError;

/// One OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Open time, unix milliseconds
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    /// Shorthand for tests and fixtures that only care about the range
    pub fn range(high: f64, low: f64) -> Self {
        Self {
            open_time: 0,
            open: low,
            high,
            low,
            close: high,
            volume: 0.0,
        }
    }
}

/// Somewhere candles can be fetched from
pub trait CandleSource: Send + Sync {
    fn fetch(&self) -> Result<Vec<Candle>, ProduceError>;
}

/// Candles stored as a JSON array in a file, re-read on every fetch
#[derive(Debug, Clone)]
pub struct FileCandles {
    path: PathBuf,
}

impl FileCandles {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CandleSource for FileCandles {
    fn fetch(&self) -> Result<Vec<Candle>, ProduceError> {
        let text = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&text)
            .map_err(|e| ProduceError::Data(format!("{}: {}", self.path.display(), e)))
    }
}

/// Binance public klines endpoint
#[derive(Debug, Clone)]
pub struct BinanceKlines {
    base_url: String,
    symbol: String,
    timeframe: String,
    lookback: usize,
    timeout: Duration,
}

impl BinanceKlines {
    pub fn new(
        base_url: impl Into<String>,
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
        lookback: usize,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            lookback,
            timeout: Duration::from_secs(10),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url.trim_end_matches('/'),
            self.symbol,
            self.timeframe,
            self.lookback
        )
    }
}

impl CandleSource for BinanceKlines {
    fn fetch(&self) -> Result<Vec<Candle>, ProduceError> {
        // Built per call: the blocking client owns a runtime and must be
        // dropped off the async workers.
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ProduceError::Fetch(e.to_string()))?;

        let rows: Vec<Vec<Value>> = client
            .get(self.url())
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json())
            .map_err(|e| ProduceError::Fetch(e.to_string()))?;

        rows.iter().map(|row| parse_kline(row)).collect()
    }
}

/// Parse `[open_time, "open", "high", "low", "close", "volume", ...]`
pub fn parse_kline(row: &[Value]) -> Result<Candle, ProduceError> {
    fn number(row: &[Value], index: usize) -> Result<f64, ProduceError> {
        let value = row
            .get(index)
            .ok_or_else(|| ProduceError::Data(format!("kline is missing field {}", index)))?;
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
        .ok_or_else(|| ProduceError::Data(format!("kline field {} is not numeric: {}", index, value)))
    }

    Ok(Candle {
        open_time: number(row, 0)? as i64,
        open: number(row, 1)?,
        high: number(row, 2)?,
        low: number(row, 3)?,
        close: number(row, 4)?,
        volume: number(row, 5)?,
    })
}
