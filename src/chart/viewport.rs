//! Visible range navigation: zoom, pan and time range presets.

use chrono::{DateTime, Duration, Months, Utc};
use std::str::FromStr;

use crate::trader::Candle;

/// Fraction of the visible width removed or added per zoom step
const ZOOM_FACTOR: f64 = 0.25;

/// Fraction of the visible width scrolled per pan step
const PAN_FACTOR: f64 = 0.2;

/// Visible range in bar indices; fractional bounds are allowed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogicalRange {
    pub from: f64,
    pub to: f64,
}

impl LogicalRange {
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    /// Range covering every bar
    pub fn full(bar_count: usize) -> Self {
        Self::new(0.0, bar_count.saturating_sub(1) as f64)
    }

    pub fn width(&self) -> f64 {
        self.to - self.from
    }

    /// Shrink by a quarter of the width on each side
    pub fn zoom_in(&self) -> Self {
        let width = self.width();
        Self::new(self.from + width * ZOOM_FACTOR, self.to - width * ZOOM_FACTOR)
    }

    /// Grow by a quarter of the width on each side, never left of bar zero
    pub fn zoom_out(&self) -> Self {
        let width = self.width();
        Self::new(
            (self.from - width * ZOOM_FACTOR).max(0.0),
            self.to + width * ZOOM_FACTOR,
        )
    }

    pub fn pan_left(&self) -> Self {
        self.shift(-self.width() * PAN_FACTOR)
    }

    pub fn pan_right(&self) -> Self {
        self.shift(self.width() * PAN_FACTOR)
    }

    fn shift(&self, delta: f64) -> Self {
        Self::new(self.from + delta, self.to + delta)
    }
}

/// Navigation command, as bound to keyboard shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportAction {
    ZoomIn,
    ZoomOut,
    PanLeft,
    PanRight,
    Reset,
}

impl ViewportAction {
    /// Map a key name to its action
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "+" | "=" => Some(ViewportAction::ZoomIn),
            "-" | "_" => Some(ViewportAction::ZoomOut),
            "ArrowLeft" => Some(ViewportAction::PanLeft),
            "ArrowRight" => Some(ViewportAction::PanRight),
            "Home" => Some(ViewportAction::Reset),
            _ => None,
        }
    }

    /// Apply the action to a range over `bar_count` bars
    pub fn apply(&self, range: LogicalRange, bar_count: usize) -> LogicalRange {
        match self {
            ViewportAction::ZoomIn => range.zoom_in(),
            ViewportAction::ZoomOut => range.zoom_out(),
            ViewportAction::PanLeft => range.pan_left(),
            ViewportAction::PanRight => range.pan_right(),
            ViewportAction::Reset => LogicalRange::full(bar_count),
        }
    }
}

/// Time range preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    Day,
    Week,
    Month,
    Year,
    #[default]
    All,
}

impl TimeRange {
    pub fn value(&self) -> &'static str {
        match self {
            TimeRange::Day => "day",
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::Year => "year",
            TimeRange::All => "all",
        }
    }

    /// Earliest instant inside the range, `None` for `All`
    pub fn start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeRange::Day => Some(now - Duration::days(1)),
            TimeRange::Week => Some(now - Duration::days(7)),
            TimeRange::Month => now.checked_sub_months(Months::new(1)),
            TimeRange::Year => now.checked_sub_months(Months::new(12)),
            TimeRange::All => None,
        }
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" => Ok(TimeRange::Day),
            "week" => Ok(TimeRange::Week),
            "month" => Ok(TimeRange::Month),
            "year" => Ok(TimeRange::Year),
            "all" => Ok(TimeRange::All),
            other => Err(format!("unknown time range: {}", other)),
        }
    }
}

/// Logical range showing the candles inside a preset.
///
/// Spans from the first candle at or after the range start to the last
/// candle. `All` and ranges that start before the first candle show every
/// bar; `None` when no candle falls inside the range.
pub fn visible_range_for(
    candles: &[Candle],
    range: TimeRange,
    now: DateTime<Utc>,
) -> Option<LogicalRange> {
    if candles.is_empty() {
        return None;
    }
    let last = (candles.len() - 1) as f64;
    let Some(start) = range.start(now) else {
        return Some(LogicalRange::full(candles.len()));
    };
    let from = candles.iter().position(|c| c.time >= start)?;
    Some(LogicalRange::new(from as f64, last))
}
