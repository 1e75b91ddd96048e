//! Trader module - Backtest data model and application plumbing.
//!
//! - **constant**: Order side
//! - **object**: Candles, orders and stored backtest results
//! - **setting**: Global settings management
//! - **logger**: Logging setup
//! - **utility**: Application folder helpers

pub mod constant;
pub mod logger;
pub mod object;
pub mod setting;
pub mod utility;

// Re-exports for convenience
pub use constant::OrderSide;
pub use logger::{init_logger, CRITICAL, DEBUG, ERROR, INFO, WARNING};
pub use object::{parse_datetime, BacktestResult, Candle, EquitySummary, Order};
pub use setting::{SettingValue, Settings, SETTINGS};
pub use utility::{get_file_path, get_folder_path, APP_DIR};
