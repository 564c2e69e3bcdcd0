use crate::bar::Bar;
use crate::broker::Broker;
use crate::order::Order;

use super::{FillInfo, FillStrategy};

/// Fill strategy for tick-resolution data: market and stop orders fill
/// fully at the tick's price, and limit/stop-limit orders are not supported
/// (triggering quoted-price logic that tick data doesn't carry).
pub struct TickFillStrategy;

impl TickFillStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TickFillStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl FillStrategy for TickFillStrategy {
    fn on_bar(&mut self, _bar: &Bar) {}
    fn on_order_filled(&mut self, _order: &Order, _filled_quantity: f64) {}

    fn fill_market_order(&self, order: &Order, _broker: &Broker, bar: &Bar) -> Option<FillInfo> {
        Some(FillInfo {
            price: bar.close,
            quantity: order.remaining(),
        })
    }

    fn fill_limit_order(&self, _order: &Order, _broker: &Broker, _bar: &Bar) -> Option<FillInfo> {
        panic!("limit orders are not supported on tick data");
    }

    fn fill_stop_order(&self, order: &mut Order, _broker: &Broker, bar: &Bar) -> Option<FillInfo> {
        Some(FillInfo {
            price: bar.close,
            quantity: order.remaining(),
        })
    }

    fn fill_stop_limit_order(
        &self,
        _order: &mut Order,
        _broker: &Broker,
        _bar: &Bar,
    ) -> Option<FillInfo> {
        panic!("stop-limit orders are not supported on tick data");
    }
}
