//! General constant enums shared by the chart and the backtest data model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of a backtest order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Wire value used by the backend
    pub fn value(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }

    /// Classify a free-form order type string.
    ///
    /// The backend emits variants such as `"BUY"`, `"buy_open"` or
    /// `"sell_close"`; matching is case-insensitive by substring. A string
    /// mentioning both sides is ambiguous and yields `None`.
    pub fn from_order_type(order_type: &str) -> Option<Self> {
        let lower = order_type.to_lowercase();
        match (lower.contains("buy"), lower.contains("sell")) {
            (true, false) => Some(OrderSide::Buy),
            (false, true) => Some(OrderSide::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "Buy"),
            OrderSide::Sell => write!(f, "Sell"),
        }
    }
}
