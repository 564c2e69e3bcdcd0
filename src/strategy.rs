use std::cell::RefCell;
use std::rc::Rc;

use crate::bar::Bar;
use crate::broker::Broker;
use crate::datetime::DateTime;
use crate::error::BacktestError;
use crate::order::{Action, Order, OrderId, OrderType};

/// A handle strategies use to place and cancel orders, without owning the
/// broker directly — it shares it with the engine and the data feed via
/// `Rc<RefCell<_>>`, a non-owning handle standing in for the original's raw
/// `BacktestingBroker*`.
#[derive(Clone)]
pub struct OrderEntry {
    broker: Rc<RefCell<Broker>>,
}

impl OrderEntry {
    pub fn new(broker: Rc<RefCell<Broker>>) -> Self {
        Self { broker }
    }

    fn market_order(&self, instrument: &str, action: Action, quantity: f64) -> Result<OrderId, BacktestError> {
        let mut broker = self.broker.borrow_mut();
        let id = broker.next_order_id();
        let order = Order::new(id, instrument, OrderType::Market, action, quantity);
        broker.place_order(order)
    }

    pub fn buy(&self, instrument: &str, quantity: f64) -> Result<OrderId, BacktestError> {
        self.market_order(instrument, Action::Buy, quantity)
    }

    pub fn sell(&self, instrument: &str, quantity: f64) -> Result<OrderId, BacktestError> {
        self.market_order(instrument, Action::Sell, quantity)
    }

    pub fn sell_short(&self, instrument: &str, quantity: f64) -> Result<OrderId, BacktestError> {
        self.market_order(instrument, Action::SellShort, quantity)
    }

    pub fn buy_to_cover(&self, instrument: &str, quantity: f64) -> Result<OrderId, BacktestError> {
        self.market_order(instrument, Action::BuyToCover, quantity)
    }

    pub fn next_order_id(&self) -> OrderId {
        self.broker.borrow_mut().next_order_id()
    }

    pub fn submit_order(&self, order: Order) -> Result<OrderId, BacktestError> {
        self.broker.borrow_mut().place_order(order)
    }

    pub fn cancel_order(&self, id: OrderId) -> Result<(), BacktestError> {
        self.broker.borrow_mut().cancel_order(id)
    }

    pub fn shares(&self, instrument: &str) -> f64 {
        self.broker.borrow().shares(instrument)
    }

    pub fn equity(&self) -> f64 {
        self.broker.borrow().equity()
    }
}

/// A trading strategy driven by the engine's bar feed and broker events.
///
/// All hooks have empty default bodies except [`Strategy::on_bar`], which is
/// where a strategy places its orders.
pub trait Strategy {
    fn on_start(&mut self, _entry: &OrderEntry) {}

    fn on_bar(&mut self, entry: &OrderEntry, bar: &Bar);

    /// Fired synchronously from inside the broker's bar processing. Do not
    /// place or cancel orders from this hook — the broker is still
    /// mutably borrowed on the call stack and `OrderEntry` would panic on
    /// the reentrant borrow. Use `on_bar` for new submissions.
    fn on_order_updated(&mut self, _entry: &OrderEntry, _order: &Order) {}

    fn on_time_elapsed(&mut self, _entry: &OrderEntry, _datetime: DateTime) {}

    fn on_stop(&mut self, _entry: &OrderEntry) {}
}
