#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! # barbacktest
//!
//! An event-driven backtesting engine for bar and tick data: a [`dispatcher::Dispatcher`]
//! replays one or more [`feed::VecBarFeed`]s in timestamp order, a [`broker::Broker`]
//! matches resting orders against each incoming [`bar::Bar`] and maintains cash/position
//! bookkeeping, and an analyzer chain (returns, drawdown, Sharpe ratio, closed trades)
//! derives performance metrics as the run progresses. [`engine::Engine`] wires all of this
//! around a user-supplied [`strategy::Strategy`].
//!
//! ## Key features
//! - Market/limit/stop/stop-limit order types with a broker-side fill matching loop.
//! - Pluggable commission and slippage models per contract.
//! - Long and short positions tracked independently per instrument.
//! - Drawdown, Sharpe ratio (daily or per-bar mode) and a closed-trade ledger.
//! - Deterministic replay: the same bar sequence and strategy always produce the same report.

/// OHLCV bar and tick data types.
pub mod bar;

/// Calendar-aware timestamp type used throughout the engine.
pub mod datetime;

/// The dispatcher that drives one or more [`dispatcher::Subject`]s in timestamp order.
pub mod dispatcher;

/// Errors surfaced by order placement and cancellation.
pub mod error;

/// A minimal pub/sub event bus used to wire the broker, analyzers and strategy together.
pub mod event;

/// Replays a `Broker` and a `Strategy` over one or more bar feeds.
pub mod engine;

/// In-memory bar feed, the `Subject` implementation the engine replays.
pub mod feed;

/// Order fill simulation: market/limit/stop/stop-limit matching against bar or tick data.
pub mod fill;

/// Order types and the order state machine.
pub mod order;

/// Cash, position, commission/slippage and order-matching bookkeeping.
pub mod broker;

/// Downstream performance analyzers: returns, drawdown, Sharpe ratio, closed trades.
pub mod analyzers;

/// The strategy trait and the order-entry handle passed to it.
pub mod strategy;

/// Common re-exports for downstream crates.
pub mod prelude {
    pub use crate::bar::{Bar, Resolution};
    pub use crate::broker::{
        Broker, CommissionModel, ContractRegistry, ContractSpec, NoCommission, NoSlippage,
        SecurityType, SlippageModel, TradingQtyCommission, TradingValueCommission,
        VolumeShareSlippage,
    };
    pub use crate::datetime::DateTime;
    pub use crate::engine::{BacktestReport, Engine};
    pub use crate::error::BacktestError;
    pub use crate::feed::VecBarFeed;
    pub use crate::order::{Action, Order, OrderId, OrderState, OrderType};
    pub use crate::strategy::{OrderEntry, Strategy};
}
