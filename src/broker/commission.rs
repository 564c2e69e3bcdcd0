use crate::order::Order;

/// Computes the commission charged for a single execution.
///
/// Mirrors the shape of the teacher's `FeeModel` trait: implementations see
/// the order being executed plus the transaction value (`price * quantity *
/// multiplier`) and return an absolute commission amount.
pub trait CommissionModel {
    fn commission(&self, order: &Order, price: f64, quantity: f64, multiplier: f64) -> f64;
}

/// No commission charged.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCommission;

impl CommissionModel for NoCommission {
    fn commission(&self, _order: &Order, _price: f64, _quantity: f64, _multiplier: f64) -> f64 {
        0.0
    }
}

/// Commission proportional to the transaction value.
#[derive(Clone, Copy, Debug)]
pub struct TradingValueCommission {
    pub rate: f64,
}

impl CommissionModel for TradingValueCommission {
    fn commission(&self, _order: &Order, price: f64, quantity: f64, multiplier: f64) -> f64 {
        self.rate * price * quantity * multiplier
    }
}

/// Commission proportional to the number of shares/contracts traded.
#[derive(Clone, Copy, Debug)]
pub struct TradingQtyCommission {
    pub per_share: f64,
}

impl CommissionModel for TradingQtyCommission {
    fn commission(&self, _order: &Order, _price: f64, quantity: f64, _multiplier: f64) -> f64 {
        self.per_share * quantity
    }
}

/// A flat commission charged per trade regardless of size.
#[derive(Clone, Copy, Debug)]
pub struct FlatPerTradeCommission {
    pub flat_fee: f64,
}

impl CommissionModel for FlatPerTradeCommission {
    fn commission(&self, _order: &Order, _price: f64, _quantity: f64, _multiplier: f64) -> f64 {
        self.flat_fee
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
    fn trading_value_commission_scales_with_notional() {
        let model = TradingValueCommission { rate: 0.001 };
        let order = dummy_order();
        assert!((model.commission(&order, 100.0, 10.0, 1.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn flat_commission_is_constant() {
        let model = FlatPerTradeCommission { flat_fee: 5.0 };
        let order = dummy_order();
        assert_eq!(model.commission(&order, 1.0, 1.0, 1.0), 5.0);
        assert_eq!(model.commission(&order, 1000.0, 1000.0, 1.0), 5.0);
    }
}
