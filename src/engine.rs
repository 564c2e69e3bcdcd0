//! Wires a [`Dispatcher`], a [`Broker`] and the analyzer chain around a
//! strategy and one or more bar feeds, and reports the finished run.

use std::cell::RefCell;
use std::rc::Rc;

use crate::analyzers::position_tracker::ClosePosTrade;
use crate::analyzers::returns::ReturnPoint;
use crate::analyzers::{DailyMetrics, DrawdownCalculator, Returns, Sharpe, Trades};
use crate::bar::Bar;
use crate::broker::{Broker, ContractSpec};
use crate::datetime::DateTime;
use crate::dispatcher::Dispatcher;
use crate::event::{NewTradingDay, OrderFilled, OrderUpdate, TimeElapsed};
use crate::feed::VecBarFeed;
use crate::strategy::{OrderEntry, Strategy};

/// Everything a caller wants to read back once [`Engine::run`] returns.
#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub final_equity: f64,
    pub final_cash: f64,
    pub total_commissions: f64,
    pub total_slippages: f64,

    pub max_drawdown: f64,
    pub max_drawdown_percentage: f64,
    pub max_drawdown_begin: DateTime,
    pub max_drawdown_end: DateTime,
    pub longest_drawdown_duration: i64,

    pub sharpe_ratio: f64,

    pub trade_count: usize,
    pub profitable_count: usize,
    pub unprofitable_count: usize,
    pub even_count: u32,
    pub total_net_profits: f64,
    pub total_trade_cost: f64,
    pub closed_transactions: Vec<ClosePosTrade>,
    pub daily_metrics: Vec<DailyMetrics>,

    pub net_returns: Vec<ReturnPoint>,
    pub cumulative_returns: Vec<ReturnPoint>,
    pub equities: Vec<ReturnPoint>,

    /// Every individual fill, in the order they occurred.
    pub executions: Vec<OrderFilled>,
}

/// Ties the dispatcher, broker, strategy and analyzer chain together into a
/// single runnable backtest.
///
/// Analogous to the original's `Backtesting` facade: owns the broker and
/// analyzers behind `Rc<RefCell<_>>` so that feed/strategy/analyzer
/// callbacks, each boxed into an `EventBus` handler, can share them without
/// raw pointers.
pub struct Engine<S: Strategy + 'static> {
    dispatcher: Dispatcher,
    broker: Rc<RefCell<Broker>>,
    strategy: Rc<RefCell<S>>,
    order_entry: OrderEntry,

    drawdown: Rc<RefCell<DrawdownCalculator>>,
    sharpe: Rc<RefCell<Sharpe>>,
    trades: Rc<RefCell<Trades>>,
    returns: Rc<RefCell<Returns>>,
    executions: Rc<RefCell<Vec<OrderFilled>>>,

    risk_free_rate: f64,
    sharpe_annualized: bool,
}

impl<S: Strategy + 'static> Engine<S> {
    /// Builds an engine with a fresh broker seeded with `cash`.
    ///
    /// `use_daily_returns` selects the Sharpe ratio's bucketing mode: `true`
    /// chains same-day bars into one daily return (252-period annualization),
    /// `false` treats every bar as its own period (365-day-year math).
    pub fn new(strategy: S, cash: f64, use_daily_returns: bool) -> Self {
        let broker = Rc::new(RefCell::new(Broker::new(cash)));
        let strategy = Rc::new(RefCell::new(strategy));
        let order_entry = OrderEntry::new(broker.clone());

        let drawdown = Rc::new(RefCell::new(DrawdownCalculator::new()));
        let sharpe = Rc::new(RefCell::new(Sharpe::new(use_daily_returns)));
        let trades = Rc::new(RefCell::new(Trades::new()));
        let returns = Rc::new(RefCell::new(Returns::new()));
        let executions = Rc::new(RefCell::new(Vec::new()));

        {
            let mut b = broker.borrow_mut();

            let sharpe_handler = sharpe.clone();
            let returns_handler = returns.clone();
            b.attach_returns_base().bus_mut().subscribe(Box::new(move |event: &crate::event::NewReturns| {
                sharpe_handler
                    .borrow_mut()
                    .on_returns(event.datetime, event.net_return);
                returns_handler.borrow_mut().on_new_returns(event);
            }));

            let trades_for_fill = trades.clone();
            let executions_for_fill = executions.clone();
            b.order_filled_bus_mut().subscribe(Box::new(move |event: &OrderFilled| {
                trades_for_fill.borrow_mut().record_fill(
                    event.datetime,
                    &event.instrument,
                    event.action,
                    event.price,
                    event.quantity,
                    event.commission,
                    event.slippage,
                );
                executions_for_fill.borrow_mut().push(event.clone());
            }));

            let trades_for_day = trades.clone();
            b.new_trading_day_bus_mut().subscribe(Box::new(move |event: &NewTradingDay| {
                trades_for_day
                    .borrow_mut()
                    .on_new_trading_day(event.datetime, event.prior_equity);
            }));

            let strategy_for_updates = strategy.clone();
            let order_entry_for_updates = order_entry.clone();
            b.order_update_bus_mut().subscribe(Box::new(move |event: &OrderUpdate| {
                strategy_for_updates
                    .borrow_mut()
                    .on_order_updated(&order_entry_for_updates, &event.order);
            }));
        }

        let mut dispatcher = Dispatcher::new();
        let strategy_for_time = strategy.clone();
        let order_entry_for_time = order_entry.clone();
        dispatcher
            .time_elapsed_bus_mut()
            .subscribe(Box::new(move |event: &TimeElapsed| {
                strategy_for_time
                    .borrow_mut()
                    .on_time_elapsed(&order_entry_for_time, event.datetime);
            }));

        Self {
            dispatcher,
            broker,
            strategy,
            order_entry,
            drawdown,
            sharpe,
            trades,
            returns,
            executions,
            risk_free_rate: 0.0,
            sharpe_annualized: true,
        }
    }

    pub fn set_risk_free_rate(&mut self, rate: f64) {
        self.risk_free_rate = rate;
    }

    pub fn set_sharpe_annualized(&mut self, annualized: bool) {
        self.sharpe_annualized = annualized;
    }

    pub fn register_contract(&mut self, instrument: impl Into<String>, spec: ContractSpec) {
        self.broker.borrow_mut().register_contract(instrument, spec);
    }

    pub fn set_allow_fractions(&mut self, value: bool) {
        self.broker.borrow_mut().set_allow_fractions(value);
    }

    pub fn set_allow_negative_cash(&mut self, value: bool) {
        self.broker.borrow_mut().set_allow_negative_cash(value);
    }

    pub fn set_volume_limit(&mut self, volume_limit: f64) {
        self.broker.borrow_mut().set_volume_limit(volume_limit);
    }

    pub fn order_entry(&self) -> &OrderEntry {
        &self.order_entry
    }

    /// Adds a bar feed to the engine, wiring its `new_bar` event into the
    /// broker, strategy and the drawdown/equity analyzers.
    pub fn add_feed(&mut self, mut feed: VecBarFeed) {
        let broker = self.broker.clone();
        let strategy = self.strategy.clone();
        let order_entry = self.order_entry.clone();
        let drawdown = self.drawdown.clone();
        let returns = self.returns.clone();

        feed.new_bar_bus_mut().subscribe(Box::new(move |bar: &Bar| {
            broker.borrow_mut().on_bar(bar);
            strategy.borrow_mut().on_bar(&order_entry, bar);

            let equity = broker.borrow().equity();
            broker.borrow_mut().attach_returns_base().update(bar.datetime, equity);
            drawdown.borrow_mut().update(bar.datetime, equity);
            returns.borrow_mut().on_new_equity(bar.datetime, equity);
        }));

        self.dispatcher.add_subject(Box::new(feed));
    }

    /// Runs the backtest to completion and returns the aggregate report.
    pub fn run(mut self) -> BacktestReport {
        {
            let entry = self.order_entry.clone();
            self.strategy.borrow_mut().on_start(&entry);
        }

        self.dispatcher.run();

        {
            let entry = self.order_entry.clone();
            self.strategy.borrow_mut().on_stop(&entry);
        }

        self.into_report()
    }

    fn into_report(self) -> BacktestReport {
        let broker = self.broker.borrow();
        let drawdown = self.drawdown.borrow();
        let sharpe = self.sharpe.borrow();
        let trades = self.trades.borrow();
        let returns = self.returns.borrow();

        BacktestReport {
            final_equity: broker.equity(),
            final_cash: broker.cash(),
            total_commissions: broker.total_commissions(),
            total_slippages: broker.total_slippages(),

            max_drawdown: drawdown.max_drawdown(false),
            max_drawdown_percentage: drawdown.max_drawdown(true),
            max_drawdown_begin: drawdown.max_drawdown_begin(),
            max_drawdown_end: drawdown.max_drawdown_end(),
            longest_drawdown_duration: drawdown.longest_drawdown_duration(),

            sharpe_ratio: sharpe.sharpe_ratio(self.risk_free_rate, self.sharpe_annualized),

            trade_count: trades.count(),
            profitable_count: trades.profitable_count(),
            unprofitable_count: trades.unprofitable_count(),
            even_count: trades.even_count(),
            total_net_profits: trades.total_net_profits(),
            total_trade_cost: trades.total_trade_cost(),
            closed_transactions: trades.closed_transactions().to_vec(),
            daily_metrics: trades.daily_metrics().to_vec(),

            net_returns: returns.returns().to_vec(),
            cumulative_returns: returns.cumulative_returns().to_vec(),
            equities: returns.equities().to_vec(),

            executions: self.executions.borrow().clone(),
        }
    }
}
