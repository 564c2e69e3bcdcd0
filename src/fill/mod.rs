//! Order-fill strategies: decide the price and quantity a given order would
//! fill for at a given bar.

mod bar_strategy;
mod tick_strategy;

pub use bar_strategy::BarFillStrategy;
pub use tick_strategy::TickFillStrategy;

use crate::bar::Bar;
use crate::broker::Broker;
use crate::order::Order;

/// The result of attempting to fill an order against a bar: `None` means the
/// order cannot be filled at this bar (insufficient volume, price not
/// penetrated, ...).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FillInfo {
    pub price: f64,
    pub quantity: f64,
}

/// Decides whether and how an order fills against a bar.
///
/// Implementations are notified of every bar and every fill so they can
/// track per-instrument volume consumed so far, mirroring the original's
/// `onBar`/`onOrderFilled` hooks.
pub trait FillStrategy {
    fn on_bar(&mut self, bar: &Bar);
    fn on_order_filled(&mut self, order: &Order, filled_quantity: f64);

    fn fill_market_order(&self, order: &Order, broker: &Broker, bar: &Bar) -> Option<FillInfo>;
    fn fill_limit_order(&self, order: &Order, broker: &Broker, bar: &Bar) -> Option<FillInfo>;
    fn fill_stop_order(&self, order: &mut Order, broker: &Broker, bar: &Bar) -> Option<FillInfo>;
    fn fill_stop_limit_order(
        &self,
        order: &mut Order,
        broker: &Broker,
        bar: &Bar,
    ) -> Option<FillInfo>;
}

/// Boundary-penetration tolerance used when comparing a stop/limit price
/// against a bar's high/low, matching the original's `0.0000001` epsilon.
pub(crate) const PRICE_EPSILON: f64 = 1e-7;

/// Returns the trigger price for a stop order, or `None` if the stop price
/// has not been penetrated by this bar.
///
/// # Panics
/// Panics if the computed trigger price is zero, mirroring the original's
/// `ASSERT(false, "Can not trigger STOP price.")` — this indicates the
/// caller invoked it without first checking that the price range makes
/// triggering possible.
pub(crate) fn stop_price_trigger(action: crate::order::Action, stop_price: f64, bar: &Bar) -> f64 {
    use crate::order::Action::*;
    let open = bar.open;
    let high = bar.high;
    let low = bar.low;

    let ret = match action {
        Buy | BuyToCover => {
            if low > stop_price {
                open
            } else if stop_price < high || (stop_price - high).abs() < PRICE_EPSILON {
                if open > stop_price {
                    open
                } else {
                    stop_price
                }
            } else {
                stop_price
            }
        }
        Sell | SellShort => {
            if high < stop_price {
                open
            } else if stop_price > low || (stop_price - low).abs() < PRICE_EPSILON {
                if open < stop_price {
                    open
                } else {
                    stop_price
                }
            } else {
                stop_price
            }
        }
    };

    assert!(ret != 0.0, "cannot trigger stop price {}", stop_price);
    ret
}

/// Returns the trigger price for a limit order, or `None` if the limit price
/// has not been penetrated by this bar.
pub(crate) fn limit_price_trigger(
    action: crate::order::Action,
    limit_price: f64,
    bar: &Bar,
) -> Option<f64> {
    use crate::order::Action::*;
    let open = bar.open;
    let high = bar.high;
    let low = bar.low;

    match action {
        Buy | BuyToCover => {
            if high < limit_price {
                Some(open)
            } else if limit_price >= low {
                Some(if open < limit_price { open } else { limit_price })
            } else {
                None
            }
        }
        Sell | SellShort => {
            if low > limit_price {
                Some(open)
            } else if limit_price <= high {
                Some(if open > limit_price { open } else { limit_price })
            } else {
                None
            }
        }
    }
}
