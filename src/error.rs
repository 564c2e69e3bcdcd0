use thiserror::Error;

use crate::order::OrderId;

/// Errors that can occur while driving a backtest.
///
/// Invariant violations (illegal state transitions, timeline regression, a
/// non-positive market price, ...) are not represented here: they indicate an
/// engine bug and are raised as panics per the error-handling policy, so that
/// no downstream metric can silently be computed from a corrupted run.
#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("order {0} already exists")]
    OrderIdExists(OrderId),

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("invalid order quantity {quantity} for order on {instrument}")]
    InvalidQuantity { instrument: String, quantity: f64 },

    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("order {0} flags can no longer be changed once submitted")]
    OrderAlreadySubmitted(OrderId),

    #[error("order {0} is already in a terminal state")]
    OrderAlreadyTerminal(OrderId),

    #[error("end of data")]
    EndOfData,
}
