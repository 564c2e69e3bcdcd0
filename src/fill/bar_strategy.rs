use std::collections::HashMap;

use tracing::warn;

use crate::bar::{Bar, Resolution};
use crate::broker::Broker;
use crate::order::Order;

use super::{limit_price_trigger, stop_price_trigger, FillInfo, FillStrategy};

/// Fraction of a bar's volume that all orders combined may consume, applied
/// per-instrument. `0.0` disables the limit entirely (an order may take the
/// whole of its remaining quantity, subject only to availability).
pub const DEFAULT_VOLUME_LIMIT: f64 = 0.25;

/// The bar-resolution fill strategy used by default: market orders fill at
/// open/close, limit/stop orders fill against the bar's open/high/low/close
/// range, subject to a configurable per-bar volume cap.
pub struct BarFillStrategy {
    volume_limit: f64,
    volume_left: HashMap<String, i64>,
}

impl BarFillStrategy {
    pub fn new(volume_limit: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&volume_limit),
            "volume_limit must be in [0, 1], got {volume_limit}"
        );
        Self {
            volume_limit,
            volume_left: HashMap::new(),
        }
    }

    fn calculate_fill_size(&self, order: &Order, broker: &Broker, _bar: &Bar) -> f64 {
        let mut volume_left = if self.volume_limit > 0.0 {
            match self.volume_left.get(&order.instrument) {
                Some(v) => *v as f64,
                None => return 0.0,
            }
        } else {
            order.remaining()
        };

        if !broker.allow_fractions() {
            volume_left = volume_left.trunc();
        }

        if !order.all_or_none {
            volume_left.min(order.remaining())
        } else if order.remaining() <= volume_left {
            order.remaining()
        } else {
            0.0
        }
    }
}

impl FillStrategy for BarFillStrategy {
    fn on_bar(&mut self, bar: &Bar) {
        if self.volume_limit == 0.0 {
            return;
        }
        let left = if bar.resolution == Resolution::Tick {
            bar.volume as i64
        } else {
            (bar.volume as f64 * self.volume_limit) as i64
        };
        self.volume_left.insert(bar.instrument.clone(), left);
    }

    fn on_order_filled(&mut self, order: &Order, filled_quantity: f64) {
        if self.volume_limit != 0.0 {
            if let Some(left) = self.volume_left.get_mut(&order.instrument) {
                *left -= filled_quantity as i64;
            }
        }
    }

    fn fill_market_order(&self, order: &Order, broker: &Broker, bar: &Bar) -> Option<FillInfo> {
        let fill_size = self.calculate_fill_size(order, broker, bar);
        if fill_size == 0.0 {
            return None;
        }

        let price = if order.fill_on_close {
            bar.close
        } else {
            bar.open
        };
        assert!(
            price > 0.0,
            "non-positive market price {} for {} at {:?}",
            price,
            bar.instrument,
            bar.datetime
        );

        Some(FillInfo {
            price,
            quantity: fill_size,
        })
    }

    fn fill_limit_order(&self, order: &Order, broker: &Broker, bar: &Bar) -> Option<FillInfo> {
        let fill_size = self.calculate_fill_size(order, broker, bar);
        if fill_size == 0.0 {
            return None;
        }
        let limit_price = order.limit_price.expect("limit order without limit_price");
        let price = limit_price_trigger(order.action, limit_price, bar)?;
        Some(FillInfo {
            price,
            quantity: fill_size,
        })
    }

    fn fill_stop_order(&self, order: &mut Order, broker: &Broker, bar: &Bar) -> Option<FillInfo> {
        let stop_price = order.stop_price.expect("stop order without stop_price");
        let mut trigger = None;
        if !order.stop_hit {
            trigger = Some(stop_price_trigger(order.action, stop_price, bar));
            order.stop_hit = trigger.map(|p| p != 0.0).unwrap_or(false);
        }

        if !order.stop_hit {
            return None;
        }

        let fill_size = self.calculate_fill_size(order, broker, bar);
        if fill_size == 0.0 {
            warn!(
                instrument = %order.instrument,
                order_id = %order.id,
                remaining = order.remaining(),
                "not enough volume to fill stop order"
            );
            return None;
        }

        let price = trigger.unwrap_or(bar.open);
        Some(FillInfo {
            price,
            quantity: fill_size,
        })
    }

    fn fill_stop_limit_order(
        &self,
        order: &mut Order,
        broker: &Broker,
        bar: &Bar,
    ) -> Option<FillInfo> {
        let stop_price = order.stop_price.expect("stop-limit order without stop_price");
        let mut stop_trigger = None;
        if !order.stop_hit {
            stop_trigger = Some(stop_price_trigger(order.action, stop_price, bar));
            order.stop_hit = stop_trigger.map(|p| p != 0.0).unwrap_or(false);
        }

        if !order.stop_hit {
            return None;
        }

        let fill_size = self.calculate_fill_size(order, broker, bar);
        if fill_size == 0.0 {
            warn!(
                instrument = %order.instrument,
                order_id = %order.id,
                remaining = order.remaining(),
                "not enough volume to fill stop-limit order"
            );
            return None;
        }

        let limit_price = order
            .limit_price
            .expect("stop-limit order without limit_price");
        let mut price = limit_price_trigger(order.action, limit_price, bar)?;

        if let Some(trigger) = stop_trigger.filter(|p| *p != 0.0) {
            price = if order.action.is_buy() {
                trigger.min(limit_price)
            } else {
                trigger.max(limit_price)
            };
        }

        Some(FillInfo {
            price,
            quantity: fill_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::DateTime;
    use crate::order::{Action, OrderId, OrderType};

    fn bar(open: f64, high: f64, low: f64, close: f64, volume: u64) -> Bar {
        Bar::new(
            "AAPL",
            DateTime::from_ymd_hms(2024, 1, 1, 0, 0, 0),
            open,
            high,
            low,
            close,
            volume,
            Resolution::Day,
            1,
        )
    }

    #[test]
    fn market_order_fills_at_open() {
        let mut strat = BarFillStrategy::new(0.0);
        let b = bar(10.0, 12.0, 9.0, 11.0, 1000);
        strat.on_bar(&b);
        let broker = Broker::new(10_000.0);
        let order = Order::new(OrderId(1), "AAPL", OrderType::Market, Action::Buy, 100.0);
        let fill = strat.fill_market_order(&order, &broker, &b).unwrap();
        assert_eq!(fill.price, 10.0);
        assert_eq!(fill.quantity, 100.0);
    }

    #[test]
    fn limit_buy_fills_when_price_penetrated() {
        let strat = BarFillStrategy::new(0.0);
        let b = bar(10.0, 12.0, 8.0, 11.0, 1000);
        let broker = Broker::new(10_000.0);
        let mut order = Order::new(OrderId(1), "AAPL", OrderType::Limit, Action::Buy, 100.0);
        order.limit_price = Some(9.0);
        let fill = strat.fill_limit_order(&order, &broker, &b).unwrap();
        assert_eq!(fill.price, 9.0);
    }

    #[test]
    fn limit_buy_does_not_fill_when_not_penetrated() {
        let strat = BarFillStrategy::new(0.0);
        let b = bar(10.0, 12.0, 9.5, 11.0, 1000);
        let broker = Broker::new(10_000.0);
        let mut order = Order::new(OrderId(1), "AAPL", OrderType::Limit, Action::Buy, 100.0);
        order.limit_price = Some(9.0);
        assert!(strat.fill_limit_order(&order, &broker, &b).is_none());
    }

    #[test]
    fn volume_limit_caps_fill_size() {
        let mut strat = BarFillStrategy::new(0.25);
        let b = bar(10.0, 12.0, 9.0, 11.0, 100);
        strat.on_bar(&b);
        let broker = Broker::new(10_000.0);
        let order = Order::new(OrderId(1), "AAPL", OrderType::Market, Action::Buy, 100.0);
        let fill = strat.fill_market_order(&order, &broker, &b).unwrap();
        assert_eq!(fill.quantity, 25.0);
    }

    #[test]
    fn zero_volume_limit_allows_full_remaining() {
        let strat = BarFillStrategy::new(0.0);
        let b = bar(10.0, 12.0, 9.0, 11.0, 1);
        let broker = Broker::new(10_000.0);
        let order = Order::new(OrderId(1), "AAPL", OrderType::Market, Action::Buy, 1000.0);
        let fill = strat.fill_market_order(&order, &broker, &b).unwrap();
        assert_eq!(fill.quantity, 1000.0);
    }

    #[test]
    fn all_or_none_rejects_insufficient_volume() {
        let mut strat = BarFillStrategy::new(0.25);
        let b = bar(10.0, 12.0, 9.0, 11.0, 100);
        strat.on_bar(&b);
        let broker = Broker::new(10_000.0);
        let mut order = Order::new(OrderId(1), "AAPL", OrderType::Market, Action::Buy, 100.0);
        order.all_or_none = true;
        assert!(strat.fill_market_order(&order, &broker, &b).is_none());
    }
}
