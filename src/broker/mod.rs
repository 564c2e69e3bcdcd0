//! Broker bookkeeping: cash, positions, commissions/slippage and the order
//! matching loop that drives fills off incoming bars.

mod commission;
mod contract;
mod position;
mod slippage;

pub use commission::{
    CommissionModel, FlatPerTradeCommission, NoCommission, TradingQtyCommission,
    TradingValueCommission,
};
pub use contract::{ContractRegistry, ContractSpec, SecurityType};
pub use position::Position;
pub use slippage::{NoSlippage, SlippageModel, VolumeShareSlippage};

use std::collections::BTreeMap;
use std::collections::HashMap;

use tracing::warn;

use crate::analyzers::returns::ReturnsBase;
use crate::bar::{Bar, Resolution};
use crate::datetime::DateTime;
use crate::error::BacktestError;
use crate::event::{EventBus, NewTradingDay, OrderFilled};
use crate::fill::{BarFillStrategy, FillInfo, FillStrategy, TickFillStrategy};
use crate::order::{Action, Order, OrderId, OrderState, OrderType};

pub const DEFAULT_BROKER_CASH: f64 = 1_000_000.0;

/// Fired on every order state transition, carrying the full order snapshot
/// at the moment of the transition.
#[derive(Clone, Debug)]
pub struct OrderUpdate {
    pub order: Order,
}

pub struct Broker {
    cash: f64,
    equity: f64,
    margin: f64,
    available_cash: f64,
    pos_profit: f64,
    total_commissions: f64,
    total_slippages: f64,
    allow_fractions: bool,
    allow_negative_cash: bool,

    positions: HashMap<String, Position>,
    active_orders: BTreeMap<u64, Order>,
    order_records: HashMap<u64, Order>,
    next_order_id: u64,

    contracts: ContractRegistry,
    last_bars: HashMap<String, Bar>,

    bar_fill_strategy: BarFillStrategy,
    tick_fill_strategy: TickFillStrategy,

    last_bar_datetime: DateTime,
    notify_new_trading_day: bool,

    order_update_bus: EventBus<OrderUpdate>,
    new_trading_day_bus: EventBus<NewTradingDay>,
    order_filled_bus: EventBus<OrderFilled>,

    returns_base: Option<ReturnsBase>,
}

impl Broker {
    pub fn new(cash: f64) -> Self {
        Self {
            cash,
            equity: cash,
            margin: 0.0,
            available_cash: cash,
            pos_profit: 0.0,
            total_commissions: 0.0,
            total_slippages: 0.0,
            allow_fractions: false,
            allow_negative_cash: false,
            positions: HashMap::new(),
            active_orders: BTreeMap::new(),
            order_records: HashMap::new(),
            next_order_id: 1,
            contracts: ContractRegistry::new(),
            last_bars: HashMap::new(),
            bar_fill_strategy: BarFillStrategy::new(super::fill::DEFAULT_VOLUME_LIMIT),
            tick_fill_strategy: TickFillStrategy::new(),
            last_bar_datetime: DateTime::INVALID,
            notify_new_trading_day: true,
            order_update_bus: EventBus::new(),
            new_trading_day_bus: EventBus::new(),
            order_filled_bus: EventBus::new(),
            returns_base: None,
        }
    }

    pub fn register_contract(&mut self, instrument: impl Into<String>, spec: ContractSpec) {
        self.contracts.register(instrument, spec);
    }

    pub fn set_allow_fractions(&mut self, value: bool) {
        self.allow_fractions = value;
    }

    pub fn allow_fractions(&self) -> bool {
        self.allow_fractions
    }

    pub fn set_allow_negative_cash(&mut self, value: bool) {
        self.allow_negative_cash = value;
    }

    pub fn set_volume_limit(&mut self, volume_limit: f64) {
        self.bar_fill_strategy = BarFillStrategy::new(volume_limit);
    }

    pub fn enable_trading_day_notification(&mut self, enable: bool) {
        self.notify_new_trading_day = enable;
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    pub fn available_cash(&self) -> f64 {
        self.available_cash
    }

    pub fn pos_profit(&self) -> f64 {
        self.pos_profit
    }

    pub fn total_commissions(&self) -> f64 {
        self.total_commissions
    }

    pub fn total_slippages(&self) -> f64 {
        self.total_slippages
    }

    pub fn shares(&self, instrument: &str) -> f64 {
        self.positions.get(instrument).map_or(0.0, Position::shares)
    }

    pub fn long_shares(&self, instrument: &str) -> f64 {
        self.positions
            .get(instrument)
            .map_or(0.0, |p| p.long_shares)
    }

    pub fn short_shares(&self, instrument: &str) -> f64 {
        self.positions
            .get(instrument)
            .map_or(0.0, |p| p.short_shares)
    }

    pub fn order_update_bus_mut(&mut self) -> &mut EventBus<OrderUpdate> {
        &mut self.order_update_bus
    }

    pub fn new_trading_day_bus_mut(&mut self) -> &mut EventBus<NewTradingDay> {
        &mut self.new_trading_day_bus
    }

    pub fn order_filled_bus_mut(&mut self) -> &mut EventBus<OrderFilled> {
        &mut self.order_filled_bus
    }

    pub fn attach_returns_base(&mut self) -> &mut ReturnsBase {
        self.returns_base.get_or_insert_with(ReturnsBase::new)
    }

    pub fn returns_base(&self) -> Option<&ReturnsBase> {
        self.returns_base.as_ref()
    }

    pub fn active_order(&self, id: OrderId) -> Option<&Order> {
        self.active_orders.get(&id.0)
    }

    pub fn order_record(&self, id: OrderId) -> Option<&Order> {
        self.order_records.get(&id.0)
    }

    pub fn next_order_id(&mut self) -> OrderId {
        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        id
    }

    /// Accepts an order built by the caller (with [`Self::next_order_id`])
    /// for submission. After this call the order is `Submitted`; no event is
    /// fired for this transition, matching the original broker's contract.
    ///
    /// # Errors
    /// Returns [`BacktestError::OrderIdExists`] if this id is already known,
    /// [`BacktestError::UnknownInstrument`] if no contract was registered for
    /// `order.instrument`.
    pub fn place_order(&mut self, mut order: Order) -> Result<OrderId, BacktestError> {
        let id = order.id;
        if self.active_orders.contains_key(&id.0) || self.order_records.contains_key(&id.0) {
            return Err(BacktestError::OrderIdExists(id));
        }
        if self.contracts.get(&order.instrument).is_none() {
            return Err(BacktestError::UnknownInstrument(order.instrument));
        }
        if order.quantity <= 0.0 {
            return Err(BacktestError::InvalidQuantity {
                instrument: order.instrument,
                quantity: order.quantity,
            });
        }

        order.submitted_at = self.last_bar_datetime;
        order.switch_state(OrderState::Submitted);
        order.accepted_at = self.last_bar_datetime;
        order.switch_state(OrderState::Accepted);
        self.active_orders.insert(id.0, order);
        Ok(id)
    }

    /// Cancels an active order.
    ///
    /// # Errors
    /// Returns [`BacktestError::OrderNotFound`] if the order isn't active.
    pub fn cancel_order(&mut self, id: OrderId) -> Result<(), BacktestError> {
        let mut order = self
            .active_orders
            .remove(&id.0)
            .ok_or(BacktestError::OrderNotFound(id))?;
        order.switch_state(OrderState::Canceled);
        self.order_update_bus.emit(&OrderUpdate {
            order: order.clone(),
        });
        self.order_records.insert(id.0, order);
        Ok(())
    }

    fn fill_strategy_for(&mut self, resolution: Resolution) -> &mut dyn FillStrategy {
        if resolution == Resolution::Tick {
            &mut self.tick_fill_strategy
        } else {
            &mut self.bar_fill_strategy
        }
    }

    /// Advances the broker one bar: detects the trading-day boundary,
    /// attempts to fill every active order on this instrument, then marks
    /// positions to market and recomputes equity.
    pub fn on_bar(&mut self, bar: &Bar) {
        self.check_trading_day_boundary(bar.datetime);
        self.fill_strategy_for(bar.resolution).on_bar(bar);
        self.process_orders(bar);
        self.update_equity_with_bar(bar);
        self.last_bars.insert(bar.instrument.clone(), bar.clone());
        self.last_bar_datetime = bar.datetime;
    }

    /// Expires every active, non-`good_till_canceled` order once the
    /// calendar date changes, matching "goodTillCanceled=false at
    /// trading-day end".
    fn check_trading_day_boundary(&mut self, datetime: DateTime) {
        if !self.notify_new_trading_day {
            return;
        }
        if !self.last_bar_datetime.is_valid() {
            return;
        }
        if self.last_bar_datetime.date() == datetime.date() {
            return;
        }

        let expiring: Vec<u64> = self
            .active_orders
            .iter()
            .filter(|(_, o)| !o.good_till_canceled)
            .map(|(id, _)| *id)
            .collect();
        for id in expiring {
            let mut order = self.active_orders.remove(&id).unwrap();
            order.switch_state(OrderState::Canceled);
            self.order_update_bus.emit(&OrderUpdate {
                order: order.clone(),
            });
            self.order_records.insert(id, order);
        }

        self.new_trading_day_bus.emit(&NewTradingDay {
            datetime,
            prior_equity: self.equity,
        });
    }

    fn process_orders(&mut self, bar: &Bar) {
        let ids: Vec<u64> = self
            .active_orders
            .iter()
            .filter(|(_, o)| o.instrument == bar.instrument)
            .map(|(id, _)| *id)
            .collect();

        for id in ids {
            let mut order = match self.active_orders.remove(&id) {
                Some(o) => o,
                None => continue,
            };

            let fill = self.attempt_fill(&mut order, bar);
            if let Some(fill) = fill {
                self.commit_order_execution(&mut order, bar, fill);
            }

            if order.is_terminal() {
                self.order_records.insert(id, order);
            } else {
                self.active_orders.insert(id, order);
            }
        }
    }

    fn attempt_fill(&self, order: &mut Order, bar: &Bar) -> Option<FillInfo> {
        let tick = bar.resolution == Resolution::Tick;
        match order.order_type {
            OrderType::Market => {
                if tick {
                    self.tick_fill_strategy.fill_market_order(order, self, bar)
                } else {
                    self.bar_fill_strategy.fill_market_order(order, self, bar)
                }
            }
            OrderType::Limit => {
                if tick {
                    self.tick_fill_strategy.fill_limit_order(order, self, bar)
                } else {
                    self.bar_fill_strategy.fill_limit_order(order, self, bar)
                }
            }
            OrderType::Stop => {
                if tick {
                    self.tick_fill_strategy.fill_stop_order(order, self, bar)
                } else {
                    self.bar_fill_strategy.fill_stop_order(order, self, bar)
                }
            }
            OrderType::StopLimit => {
                if tick {
                    self.tick_fill_strategy
                        .fill_stop_limit_order(order, self, bar)
                } else {
                    self.bar_fill_strategy
                        .fill_stop_limit_order(order, self, bar)
                }
            }
        }
    }

    /// Applies a fill: computes commission/slippage, updates cash and the
    /// position, records the execution on the order, and emits the
    /// resulting `OrderUpdate`.
    ///
    /// Gated by `allow_negative_cash`: a buy/cover that would drive cash
    /// negative is rejected (logged, order stays active) unless the broker
    /// was explicitly configured to allow it.
    fn commit_order_execution(&mut self, order: &mut Order, bar: &Bar, fill: FillInfo) {
        let spec = match self.contracts.get(&order.instrument) {
            Some(spec) => spec,
            None => return,
        };
        let multiplier = spec.multiplier;
        let commission = spec.commission_model.commission(
            order,
            fill.price,
            fill.quantity,
            multiplier,
        );
        let slippage = spec
            .slippage_model
            .slippage(order, fill.price, fill.quantity, bar.volume);
        let friction = commission + slippage;
        let notional = fill.price * fill.quantity * multiplier;

        let is_buy_side = matches!(order.action, Action::Buy | Action::BuyToCover);
        let cash_delta = if is_buy_side {
            -(notional + friction)
        } else {
            notional - friction
        };

        if !self.allow_negative_cash && self.cash + cash_delta < 0.0 {
            warn!(
                order_id = %order.id,
                instrument = %order.instrument,
                "insufficient cash to fill order, skipping execution this bar"
            );
            return;
        }

        let position = self.positions.entry(order.instrument.clone()).or_default();
        match order.action {
            Action::Buy => position.apply_buy(fill.quantity, fill.price),
            Action::Sell => {
                position.apply_sell(fill.quantity, fill.price, multiplier);
            }
            Action::SellShort => position.apply_sell_short(fill.quantity, fill.price),
            Action::BuyToCover => {
                position.apply_cover(fill.quantity, fill.price, multiplier);
            }
        }

        self.cash += cash_delta;
        self.total_commissions += commission;
        self.total_slippages += slippage;

        order.add_execution_info(fill.price, fill.quantity, friction);
        self.fill_strategy_for(bar.resolution)
            .on_order_filled(order, fill.quantity);

        self.order_filled_bus.emit(&OrderFilled {
            datetime: bar.datetime,
            instrument: order.instrument.clone(),
            action: order.action,
            price: fill.price,
            quantity: fill.quantity,
            commission,
            slippage,
        });
        self.order_update_bus.emit(&OrderUpdate {
            order: order.clone(),
        });
    }

    fn update_equity_with_bar(&mut self, bar: &Bar) {
        let multiplier = self
            .contracts
            .get(&bar.instrument)
            .map_or(1.0, |c| c.multiplier);

        if let Some(position) = self.positions.get_mut(&bar.instrument) {
            position.mark(bar.close);
        }

        let mut portfolio_value = 0.0;
        let mut pos_profit = 0.0;
        let mut margin = 0.0;
        for (instrument, position) in &self.positions {
            let m = self.contracts.get(instrument).map_or(multiplier, |c| c.multiplier);
            portfolio_value += (position.long_shares - position.short_shares) * position.last_price * m;
            pos_profit += position.long_shares * (position.last_price - position.long_avg_price) * m;
            pos_profit += position.short_shares * (position.short_avg_price - position.last_price) * m;
            margin += position.short_shares * position.last_price * m;
        }

        self.equity = self.cash + portfolio_value;
        self.pos_profit = pos_profit;
        self.margin = margin;
        self.available_cash = self.equity - self.margin;
    }
}
