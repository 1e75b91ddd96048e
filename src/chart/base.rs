//! Base constants and utility functions for the chart module.

// Theme colors
pub const PRIMARY_COLOR: &str = "#1976d2";
pub const SECONDARY_COLOR: &str = "#9c27b0";
pub const INFO_COLOR: &str = "#0288d1";
pub const WARNING_COLOR: &str = "#ed6c02";
pub const SUCCESS_COLOR: &str = "#2e7d32";
pub const ERROR_COLOR: &str = "#d32f2f";

// Secondary line and level colors
pub const SIGNAL_COLOR: &str = "rgba(255, 152, 0, 0.8)";
pub const OVERBOUGHT_COLOR: &str = "rgba(255, 0, 0, 0.5)";
pub const OVERSOLD_COLOR: &str = "rgba(0, 255, 0, 0.5)";
pub const MIDDLE_LEVEL_COLOR: &str = "rgba(128, 128, 128, 0.5)";

// Histogram colors
pub const HISTOGRAM_UP_COLOR: &str = "rgba(0, 150, 136, 0.8)";
pub const HISTOGRAM_DOWN_COLOR: &str = "rgba(255, 82, 82, 0.8)";
pub const VOLUME_UP_COLOR: &str = "rgba(46, 125, 50, 0.5)";
pub const VOLUME_DOWN_COLOR: &str = "rgba(211, 47, 47, 0.5)";

// Price scale ids
pub const RSI_SCALE_ID: &str = "rsi";
pub const MACD_SCALE_ID: &str = "macd";
pub const STOCH_SCALE_ID: &str = "stoch";
pub const VOLUME_SCALE_ID: &str = "volume";

// Line widths
pub const MAIN_LINE_WIDTH: f32 = 2.0;
pub const THIN_LINE_WIDTH: f32 = 1.0;

/// Decimals shown in marker labels
pub const MARKER_PRICE_DECIMALS: usize = 2;

/// Format price with appropriate precision
pub fn format_price(price: f64, decimals: usize) -> String {
    format!("{:.prec$}", price, prec = decimals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(101.256, 2), "101.26");
        assert_eq!(format_price(100.0, 2), "100.00");
        assert_eq!(format_price(42.0, 0), "42");
    }
}
