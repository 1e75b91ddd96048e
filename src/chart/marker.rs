//! Trade markers drawn on the price series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::base::{format_price, ERROR_COLOR, MARKER_PRICE_DECIMALS, SUCCESS_COLOR};
use crate::trader::{Order, OrderSide};

/// Marker placement relative to the bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerPosition {
    AboveBar,
    BelowBar,
}

/// Marker glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerShape {
    ArrowUp,
    ArrowDown,
}

/// One marker attached to a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMarker {
    pub time: DateTime<Utc>,
    pub position: MarkerPosition,
    pub color: String,
    pub shape: MarkerShape,
    pub text: String,
    pub side: OrderSide,
}

impl SeriesMarker {
    /// Marker for an executed order of a known side
    pub fn for_order(order: &Order, side: OrderSide) -> Self {
        let price = format_price(order.price, MARKER_PRICE_DECIMALS);
        match side {
            OrderSide::Buy => Self {
                time: order.time,
                position: MarkerPosition::BelowBar,
                color: SUCCESS_COLOR.to_string(),
                shape: MarkerShape::ArrowUp,
                text: format!("Buy @ {}", price),
                side,
            },
            OrderSide::Sell => Self {
                time: order.time,
                position: MarkerPosition::AboveBar,
                color: ERROR_COLOR.to_string(),
                shape: MarkerShape::ArrowDown,
                text: format!("Sell @ {}", price),
                side,
            },
        }
    }
}

/// Build one combined marker set for buy and sell orders, sorted by time.
///
/// Orders whose type names neither side are skipped. Orders sharing a
/// timestamp keep their input order.
pub fn build_trade_markers(orders: &[Order]) -> Vec<SeriesMarker> {
    let mut markers: Vec<SeriesMarker> = orders
        .iter()
        .filter_map(|order| match order.side() {
            Some(side) => Some(SeriesMarker::for_order(order, side)),
            None => {
                tracing::warn!(order_type = %order.order_type, "skipping order with unknown side");
                None
            }
        })
        .collect();
    markers.sort_by(|a, b| a.time.cmp(&b.time));
    markers
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    #[test]
    fn test_markers_merged_and_sorted() {
        let orders = vec![
            Order::new(t(5), 110.0, OrderSide::Sell),
            Order::new(t(1), 100.0, OrderSide::Buy),
            Order::new(t(3), 105.5, OrderSide::Buy),
        ];
        let markers = build_trade_markers(&orders);

        assert_eq!(markers.len(), 3);
        let times: Vec<_> = markers.iter().map(|m| m.time).collect();
        assert_eq!(times, vec![t(1), t(3), t(5)]);

        assert_eq!(markers[0].text, "Buy @ 100.00");
        assert_eq!(markers[0].position, MarkerPosition::BelowBar);
        assert_eq!(markers[0].shape, MarkerShape::ArrowUp);
        assert_eq!(markers[0].color, SUCCESS_COLOR);

        assert_eq!(markers[2].text, "Sell @ 110.00");
        assert_eq!(markers[2].position, MarkerPosition::AboveBar);
        assert_eq!(markers[2].shape, MarkerShape::ArrowDown);
        assert_eq!(markers[2].side, OrderSide::Sell);
    }

    #[test]
    fn test_unknown_order_types_skipped() {
        let mut odd = Order::new(t(2), 50.0, OrderSide::Buy);
        odd.order_type = "dividend".to_string();
        let orders = vec![odd, Order::new(t(1), 49.999, OrderSide::Sell)];

        let markers = build_trade_markers(&orders);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].text, "Sell @ 50.00");
    }

    #[test]
    fn test_no_orders() {
        assert!(build_trade_markers(&[]).is_empty());
    }
}
