use tracing::warn;

use crate::datetime::DateTime;
use crate::event::{EventBus, NewReturns};

/// The shared per-bar return calculation every downstream analyzer (equity
/// curve, drawdown, Sharpe, trades) is derived from.
///
/// Per the broker's redesign, this is an explicit `Option<ReturnsBase>` slot
/// on [`crate::broker::Broker`] rather than a name-keyed singleton looked up
/// by string.
pub struct ReturnsBase {
    net_return: f64,
    cumulative_return: f64,
    equity: f64,
    last_portfolio_value: Option<f64>,
    bus: EventBus<NewReturns>,
}

impl ReturnsBase {
    pub fn new() -> Self {
        Self {
            net_return: 0.0,
            cumulative_return: 0.0,
            equity: 0.0,
            last_portfolio_value: None,
            bus: EventBus::new(),
        }
    }

    pub fn net_return(&self) -> f64 {
        self.net_return
    }

    pub fn cumulative_return(&self) -> f64 {
        self.cumulative_return
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }

    pub fn bus_mut(&mut self) -> &mut EventBus<NewReturns> {
        &mut self.bus
    }

    /// Recomputes net and cumulative return from the current portfolio
    /// value and emits `NewReturns`.
    ///
    /// `cumRet' = (1 + cumRet) * (1 + netRet) - 1`, derived in the original
    /// from the identity `currPV = initPV * (1 + cumRet) = lastPV * (1 +
    /// netRet)`.
    pub fn update(&mut self, datetime: DateTime, current_portfolio_value: f64) {
        let last = self.last_portfolio_value.unwrap_or(current_portfolio_value);
        let net_return = if last == 0.0 {
            warn!(datetime = ?datetime, "equityPrev is zero, net return undefined, recording zero");
            0.0
        } else {
            (current_portfolio_value - last) / last
        };
        self.last_portfolio_value = Some(current_portfolio_value);
        self.equity = current_portfolio_value;
        self.net_return = net_return;
        self.cumulative_return = (1.0 + self.cumulative_return) * (1.0 + net_return) - 1.0;

        self.bus.emit(&NewReturns {
            datetime,
            net_return,
            cumulative_return: self.cumulative_return,
        });
    }
}

impl Default for ReturnsBase {
    fn default() -> Self {
        Self::new()
    }
}

/// One point of the net/cumulative return and equity series, deduplicated so
/// multiple updates at the same timestamp overwrite rather than accumulate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReturnPoint {
    pub datetime: DateTime,
    pub value: f64,
}

/// Accumulates the whole-run net return, cumulative return and equity
/// series, subscribed to a [`ReturnsBase`]'s event bus.
#[derive(Default)]
pub struct Returns {
    net_returns: Vec<ReturnPoint>,
    cumulative_returns: Vec<ReturnPoint>,
    equities: Vec<ReturnPoint>,
}

impl Returns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returns(&self) -> &[ReturnPoint] {
        &self.net_returns
    }

    pub fn cumulative_returns(&self) -> &[ReturnPoint] {
        &self.cumulative_returns
    }

    pub fn equities(&self) -> &[ReturnPoint] {
        &self.equities
    }

    fn push_or_update(series: &mut Vec<ReturnPoint>, point: ReturnPoint) {
        match series.last() {
            Some(last) if point.datetime < last.datetime => {
                panic!("datetime wrap back: {:?}", point.datetime);
            }
            Some(last) if last.datetime == point.datetime => {
                *series.last_mut().unwrap() = point;
            }
            _ => series.push(point),
        }
    }

    pub fn on_new_returns(&mut self, event: &NewReturns) {
        Self::push_or_update(
            &mut self.net_returns,
            ReturnPoint {
                datetime: event.datetime,
                value: event.net_return,
            },
        );
        Self::push_or_update(
            &mut self.cumulative_returns,
            ReturnPoint {
                datetime: event.datetime,
                value: event.cumulative_return,
            },
        );
    }

    pub fn on_new_equity(&mut self, datetime: DateTime, equity: f64) {
        Self::push_or_update(&mut self.equities, ReturnPoint { datetime, value: equity });
    }
}
