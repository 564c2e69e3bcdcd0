use std::fmt;

use serde::{Deserialize, Serialize};

use crate::datetime::DateTime;
use crate::error::BacktestError;

/// Opaque order identifier, assigned by the broker in submission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    SellShort,
    BuyToCover,
}

/// When an order becomes eligible to fill relative to the bar it was
/// submitted on.
///
/// The engine's dispatch ordering (broker processes fills before the
/// strategy's `on_bar` callback runs for that same bar) already makes
/// `NextBar` the only timing the current wiring can produce: an order
/// submitted during `on_bar` always waits for the following bar's fill
/// pass. `IntraBar` is carried for data-model completeness but has no
/// distinct effect yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExecTiming {
    #[default]
    NextBar,
    IntraBar,
}

impl Action {
    pub fn is_buy(&self) -> bool {
        matches!(self, Action::Buy | Action::BuyToCover)
    }

    pub fn is_sell(&self) -> bool {
        matches!(self, Action::Sell | Action::SellShort)
    }
}

/// An order's lifecycle state.
///
/// Transitions are enforced by [`Order::switch_state`]; any transition not in
/// the table below is an engine bug and panics rather than returning an
/// error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    Initial,
    Submitted,
    Accepted,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
}

impl OrderState {
    fn can_transition_to(self, next: OrderState) -> bool {
        use OrderState::*;
        matches!(
            (self, next),
            (Initial, Submitted)
                | (Initial, Canceled)
                | (Submitted, Accepted)
                | (Submitted, Rejected)
                | (Submitted, Canceled)
                | (Accepted, PartiallyFilled)
                | (Accepted, Filled)
                | (Accepted, Canceled)
                | (Accepted, Rejected)
                | (PartiallyFilled, PartiallyFilled)
                | (PartiallyFilled, Filled)
                | (PartiallyFilled, Canceled)
                | (PartiallyFilled, Rejected)
        )
    }

    pub fn is_active(self) -> bool {
        matches!(self, OrderState::Accepted | OrderState::PartiallyFilled)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderState::Filled | OrderState::Canceled | OrderState::Rejected
        )
    }
}

/// A single execution (fill) applied to an order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderExecutionInfo {
    pub price: f64,
    pub quantity: f64,
    pub commission: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub instrument: String,
    pub order_type: OrderType,
    pub action: Action,
    pub quantity: f64,
    pub limit_price: Option<f64>,
    pub stop_price: Option<f64>,
    pub state: OrderState,
    pub good_till_canceled: bool,
    pub all_or_none: bool,
    pub fill_on_close: bool,
    pub exec_timing: ExecTiming,
    /// Set once a stop order's trigger price has been penetrated, so later
    /// bars know the underlying market order is already active.
    pub stop_hit: bool,
    pub signal_name: Option<String>,
    pub filled: f64,
    pub avg_fill_price: f64,
    pub commissions: f64,
    pub executions: Vec<OrderExecutionInfo>,
    #[serde(skip)]
    pub submitted_at: DateTime,
    #[serde(skip)]
    pub accepted_at: DateTime,
}

impl Order {
    pub fn new(
        id: OrderId,
        instrument: impl Into<String>,
        order_type: OrderType,
        action: Action,
        quantity: f64,
    ) -> Self {
        Self {
            id,
            instrument: instrument.into(),
            order_type,
            action,
            quantity,
            limit_price: None,
            stop_price: None,
            state: OrderState::Initial,
            good_till_canceled: false,
            all_or_none: false,
            fill_on_close: false,
            exec_timing: ExecTiming::NextBar,
            stop_hit: false,
            signal_name: None,
            filled: 0.0,
            avg_fill_price: 0.0,
            commissions: 0.0,
            executions: Vec::new(),
            submitted_at: DateTime::INVALID,
            accepted_at: DateTime::INVALID,
        }
    }

    pub fn remaining(&self) -> f64 {
        self.quantity - self.filled
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Only legal while the order is still [`OrderState::Initial`]; matches
    /// the original's guard that flags cannot change once an order has left
    /// the broker's hands.
    pub fn set_good_till_canceled(&mut self, value: bool) -> Result<(), BacktestError> {
        if self.state != OrderState::Initial {
            return Err(BacktestError::OrderAlreadySubmitted(self.id));
        }
        self.good_till_canceled = value;
        Ok(())
    }

    pub fn set_all_or_none(&mut self, value: bool) -> Result<(), BacktestError> {
        if self.state != OrderState::Initial {
            return Err(BacktestError::OrderAlreadySubmitted(self.id));
        }
        self.all_or_none = value;
        Ok(())
    }

    /// Enforces the order state machine table; panics on an illegal
    /// transition since that indicates a broker bug, not user error.
    pub fn switch_state(&mut self, next: OrderState) {
        assert!(
            self.state.can_transition_to(next),
            "illegal order state transition for {}: {:?} -> {:?}",
            self.id,
            self.state,
            next
        );
        self.state = next;
    }

    /// Applies a fill, recomputing the running average fill price as a
    /// share-weighted mean: `avg' = (avg*filled + price*qty) / (filled+qty)`.
    ///
    /// # Panics
    /// Panics if an `all_or_none` order would be left partially filled.
    pub fn add_execution_info(&mut self, price: f64, quantity: f64, commission: f64) {
        assert!(quantity > 0.0, "fill quantity must be positive");
        let new_filled = self.filled + quantity;
        assert!(
            new_filled <= self.quantity + 1e-7,
            "order {} overfilled: filled {} + {} > quantity {}",
            self.id,
            self.filled,
            quantity,
            self.quantity
        );
        self.avg_fill_price = (self.avg_fill_price * self.filled + price * quantity) / new_filled;
        self.filled = new_filled;
        self.commissions += commission;
        self.executions.push(OrderExecutionInfo {
            price,
            quantity,
            commission,
        });

        if self.all_or_none {
            assert!(
                (self.filled - self.quantity).abs() < 1e-7,
                "all-or-none order {} was partially filled",
                self.id
            );
        }

        if (self.quantity - self.filled).abs() < 1e-7 {
            self.switch_state(OrderState::Filled);
        } else {
            self.switch_state(OrderState::PartiallyFilled);
        }
    }
}
