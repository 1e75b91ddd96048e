//! Basic data structures exchanged with the backtest backend.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

use super::constant::OrderSide;

/// OHLC(V) price bar for one time interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    #[serde(deserialize_with = "deserialize_datetime")]
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl Candle {
    /// Create a new candle without volume
    pub fn new(time: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    /// Attach a traded volume
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Whether the bar closed at or above its open
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }
}

// Lets candles feed the `ta` indicators directly.
impl ta::Open for Candle {
    fn open(&self) -> f64 {
        self.open
    }
}

impl ta::High for Candle {
    fn high(&self) -> f64 {
        self.high
    }
}

impl ta::Low for Candle {
    fn low(&self) -> f64 {
        self.low
    }
}

impl ta::Close for Candle {
    fn close(&self) -> f64 {
        self.close
    }
}

impl ta::Volume for Candle {
    fn volume(&self) -> f64 {
        self.volume.unwrap_or(0.0)
    }
}

/// An executed backtest order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(deserialize_with = "deserialize_datetime")]
    pub time: DateTime<Utc>,
    pub price: f64,
    #[serde(rename = "type")]
    pub order_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit: Option<f64>,
}

impl Order {
    /// Create a new order of the given side
    pub fn new(time: DateTime<Utc>, price: f64, side: OrderSide) -> Self {
        Self {
            time,
            price,
            order_type: side.value().to_string(),
            size: None,
            profit: None,
        }
    }

    /// Side of the order, if the type string names one
    pub fn side(&self) -> Option<OrderSide> {
        OrderSide::from_order_type(&self.order_type)
    }
}

/// Equity at the start and end of a backtest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquitySummary {
    pub initial: f64,
    #[serde(rename = "final")]
    pub final_value: f64,
}

/// A stored backtest result as returned by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub timestamp: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub final_value: f64,
    #[serde(default)]
    pub equity: EquitySummary,
    #[serde(default)]
    pub metrics: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub candles: Vec<Candle>,
    #[serde(default)]
    pub archived: bool,
}

impl BacktestResult {
    /// Get a numeric metric by name
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).and_then(|v| v.as_f64())
    }
}

/// Parse the datetime spellings the backend produces.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and bare
/// dates; naive values are taken as UTC.
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTime {
    Seconds(i64),
    FractionalSeconds(f64),
    Text(String),
}

fn deserialize_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = RawTime::deserialize(deserializer)?;
    let parsed = match &raw {
        RawTime::Seconds(secs) => Utc.timestamp_opt(*secs, 0).single(),
        RawTime::FractionalSeconds(secs) => {
            DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
        }
        RawTime::Text(text) => parse_datetime(text),
    };
    parsed.ok_or_else(|| serde::de::Error::custom("unrecognized datetime value"))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Int(i64),
    Float(f64),
}

fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Text(s) => s,
        StringOrNumber::Int(i) => i.to_string(),
        StringOrNumber::Float(f) => f.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candle_from_unix_seconds() {
        let candle: Candle = serde_json::from_str(
            r#"{"time": 1700000000, "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5}"#,
        )
        .unwrap();
        assert_eq!(candle.time.timestamp(), 1_700_000_000);
        assert_eq!(candle.volume, None);
        assert!(candle.is_up());
    }

    #[test]
    fn test_candle_from_string_time() {
        let candle: Candle = serde_json::from_str(
            r#"{"time": "2024-01-02 03:04:05", "open": 2.0, "high": 2.0, "low": 1.0, "close": 1.0, "volume": 10}"#,
        )
        .unwrap();
        assert_eq!(candle.time.to_rfc3339(), "2024-01-02T03:04:05+00:00");
        assert_eq!(candle.volume, Some(10.0));
        assert!(!candle.is_up());
    }

    #[test]
    fn test_parse_datetime_variants() {
        assert!(parse_datetime("2024-01-02T03:04:05Z").is_some());
        assert!(parse_datetime("2024-01-02T03:04:05").is_some());
        assert!(parse_datetime("2024-01-02").is_some());
        assert!(parse_datetime("yesterday").is_none());
    }

    #[test]
    fn test_order_side() {
        let order: Order = serde_json::from_str(
            r#"{"time": "2024-01-02T00:00:00Z", "type": "BUY", "price": 100.0, "size": 1.0, "profit": 0.0}"#,
        )
        .unwrap();
        assert_eq!(order.side(), Some(OrderSide::Buy));
        assert_eq!(order.size, Some(1.0));
    }

    #[test]
    fn test_backtest_result_decode() {
        let json = r#"{
            "timestamp": 20240102,
            "name": "run",
            "params": {"symbol": "BTCUSDT"},
            "orders": [],
            "final_value": 10500.0,
            "equity": {"initial": 10000.0, "final": 10500.0},
            "metrics": {"win_rate": 0.5, "total_trades": 4}
        }"#;
        let result: BacktestResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.timestamp, "20240102");
        assert_eq!(result.equity.final_value, 10500.0);
        assert_eq!(result.metric("win_rate"), Some(0.5));
        assert!(result.candles.is_empty());
        assert!(!result.archived);
    }
}
