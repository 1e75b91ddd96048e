//! Chart module for indicator overlays on a candlestick chart.
//!
//! This module provides:
//! - `IndicatorEngine` - Pure technical indicator computation
//! - `ChartOverlayManager` - Indicator lifecycle and rendered series bookkeeping
//! - `ChartApi` - Rendering collaborator, with the in-memory `MemoryChart`
//! - Trade markers and viewport navigation helpers
//!
//! # Example
//!
//! ```ignore
//! use backtest_chart::chart::{ChartOverlayManager, IndicatorKind, MemoryChart};
//!
//! let mut manager = ChartOverlayManager::new(MemoryChart::new());
//! let id = manager.add(IndicatorKind::Rsi)?;
//! manager.recompute(&candles, &orders);
//! ```

mod base;
mod engine;
mod indicator;
mod manager;
mod marker;
mod series;
mod viewport;

pub use base::*;
pub use engine::{
    calculate_bollinger_bands, calculate_ema, calculate_macd, calculate_rsi, calculate_sma,
    calculate_stochastic, BollingerOutput, IndicatorEngine, IndicatorOutput, IndicatorValues,
    MacdOutput, PriceSource, StochasticOutput,
};
pub use indicator::{
    available_indicators, max_period, IndicatorConfig, IndicatorKind, IndicatorParams, Pane,
    ParamMap, ParamSpec,
};
pub use manager::{ChartOverlayManager, RecomputeReport, PRICE_SERIES_TITLE, VOLUME_SERIES_TITLE};
pub use marker::{build_trade_markers, MarkerPosition, MarkerShape, SeriesMarker};
pub use series::{
    align_points, level_points, ChartApi, LineStyle, MemoryChart, MemorySeries, SeriesData,
    SeriesId, SeriesOptions, SeriesPoint, SeriesType,
};
pub use viewport::{visible_range_for, LogicalRange, TimeRange, ViewportAction};
