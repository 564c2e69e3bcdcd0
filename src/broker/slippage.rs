use crate::order::Order;

/// Computes the slippage cost applied to a single execution, in the same
/// units as commission (an absolute amount, not a price adjustment).
///
/// Not modeled in the original source beyond a parameter threaded through
/// `OrderExecutionInfo`; the two impls below give the broker a concrete,
/// auditable default rather than leaving fills perfectly frictionless.
pub trait SlippageModel {
    fn slippage(&self, order: &Order, price: f64, quantity: f64, bar_volume: u64) -> f64;
}

/// No slippage: fills occur exactly at the strategy's requested price.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSlippage;

impl SlippageModel for NoSlippage {
    fn slippage(&self, _order: &Order, _price: f64, _quantity: f64, _bar_volume: u64) -> f64 {
        0.0
    }
}

/// Price impact proportional to the fraction of the bar's volume consumed,
/// capped by `max_price_impact`. Mirrors the shape of a "rate × transacted
/// amount" fee model, applied to the fill's own notional instead of a flat
/// rate.
#[derive(Clone, Copy, Debug)]
pub struct VolumeShareSlippage {
    pub price_impact: f64,
    pub max_price_impact: f64,
}

impl SlippageModel for VolumeShareSlippage {
    fn slippage(&self, _order: &Order, price: f64, quantity: f64, bar_volume: u64) -> f64 {
        if bar_volume == 0 {
            return 0.0;
        }
        let volume_share = quantity / bar_volume as f64;
        let impact = (volume_share * self.price_impact).min(self.max_price_impact);
        impact * price * quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{Action, OrderId, OrderType};

    fn dummy_order() -> Order {
        Order::new(OrderId(1), "AAPL", OrderType::Market, Action::Buy, 100.0)
    }

    #[test]
    fn no_slippage_is_zero() {
        let order = dummy_order();
        assert_eq!(NoSlippage.slippage(&order, 100.0, 10.0, 1000), 0.0);
    }

    #[test]
    fn volume_share_slippage_scales_with_participation() {
        let model = VolumeShareSlippage {
            price_impact: 0.1,
            max_price_impact: 0.05,
        };
        let order = dummy_order();
        let cost = model.slippage(&order, 100.0, 100.0, 1000);
        assert!(cost > 0.0);
    }

    #[test]
    fn volume_share_slippage_is_capped() {
        let model = VolumeShareSlippage {
            price_impact: 10.0,
            max_price_impact: 0.01,
        };
        let order = dummy_order();
        let cost = model.slippage(&order, 100.0, 900.0, 1000);
        let expected = 0.01 * 100.0 * 900.0;
        assert!((cost - expected).abs() < 1e-9);
    }

    #[test]
    fn zero_bar_volume_yields_zero_slippage() {
        let order = dummy_order();
        let model = VolumeShareSlippage {
            price_impact: 0.1,
            max_price_impact: 0.05,
        };
        assert_eq!(model.slippage(&order, 100.0, 10.0, 0), 0.0);
    }
}
