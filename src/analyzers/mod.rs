//! Downstream analyzers that consume the broker's per-bar equity and order
//! flow: a shared returns calculation, drawdown, Sharpe ratio and a
//! closed-trade ledger.

pub mod drawdown;
pub mod position_tracker;
pub mod returns;
pub mod sharpe;
pub mod trades;

pub use drawdown::DrawdownCalculator;
pub use returns::{Returns, ReturnsBase};
pub use sharpe::Sharpe;
pub use trades::{DailyMetrics, Trades};
