//! Backtest Chart - Technical indicators and chart overlays for backtest review
//!
//! This crate provides:
//!
//! - Technical indicator computation (SMA, EMA, RSI, MACD, Bollinger Bands, Stochastic)
//! - Overlay management: adding, toggling, editing and removing indicators on a chart
//! - Trade markers and volume for backtest results
//! - A read-only client for the backtest REST backend
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use backtest_chart::chart::{ChartOverlayManager, IndicatorKind, MemoryChart};
//!
//! let mut manager = ChartOverlayManager::new(MemoryChart::new());
//! manager.add(IndicatorKind::Sma).unwrap();
//! let report = manager.recompute(&[], &[]);
//! assert!(report.is_ok());
//! ```

pub mod chart;
pub mod error;
pub mod service;
pub mod trader;

// Re-export commonly used types
pub use chart::{
    ChartApi, ChartOverlayManager, IndicatorConfig, IndicatorEngine, IndicatorKind,
    IndicatorParams, MemoryChart, RecomputeReport,
};
pub use error::{OverlayError, RenderError, ServiceError};
pub use service::BacktestService;
pub use trader::{BacktestResult, Candle, Order, OrderSide, Settings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
