//! A minimal observer/event bus, ported from the dispatcher's notion of
//! events: handlers may subscribe to a bus while it is in the middle of
//! emitting (e.g. a strategy reacting to `NewBar` by subscribing to
//! `OrderUpdate` for the first time), and the new handler must not run until
//! the *next* emission.

use crate::datetime::DateTime;
use crate::order::Action;

/// A boxed event handler. Takes the event payload by reference since most
/// handlers only read it before forwarding to an analyzer or strategy.
pub type Handler<T> = Box<dyn FnMut(&T)>;

/// Payload for the dispatcher's `time_elapsed` bus: fired once per tick,
/// after every subject due at that timestamp has been dispatched.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeElapsed {
    pub datetime: DateTime,
}

/// Payload for the broker's `new_trading_day` bus, fired on the first bar of
/// a new calendar date. Carries the prior day's closing equity directly,
/// rather than making handlers call back into the broker for it — the
/// broker is still on the call stack (inside `on_bar`) when this fires.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewTradingDay {
    pub datetime: DateTime,
    pub prior_equity: f64,
}

/// Payload for the returns analyzer's `new_returns` bus.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewReturns {
    pub datetime: DateTime,
    pub net_return: f64,
    pub cumulative_return: f64,
}

/// Payload for the broker's `order_filled` bus, fired once per individual
/// execution (as opposed to `OrderUpdate`, which fires on every state
/// transition including cancellations). This is what the trade ledger
/// subscribes to, since it needs the execution's price/quantity/friction
/// directly rather than diffing order snapshots.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderFilled {
    pub datetime: DateTime,
    pub instrument: String,
    pub action: Action,
    pub price: f64,
    pub quantity: f64,
    pub commission: f64,
    pub slippage: f64,
}

pub struct EventBus<T> {
    handlers: Vec<Handler<T>>,
    pending: Vec<Handler<T>>,
    emitting: bool,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            pending: Vec::new(),
            emitting: false,
        }
    }

    /// Registers a handler. If called while [`Self::emit`] is on the stack,
    /// the handler is staged and only becomes live once the current `emit`
    /// call returns.
    pub fn subscribe(&mut self, handler: Handler<T>) {
        if self.emitting {
            self.pending.push(handler);
        } else {
            self.handlers.push(handler);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn emit(&mut self, event: &T) {
        self.emitting = true;
        for handler in self.handlers.iter_mut() {
            handler(event);
        }
        self.emitting = false;
        if !self.pending.is_empty() {
            self.handlers.append(&mut self.pending);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn emits_to_all_subscribers() {
        let calls = Rc::new(RefCell::new(0));
        let mut bus: EventBus<i32> = EventBus::new();
        let c = calls.clone();
        bus.subscribe(Box::new(move |_| *c.borrow_mut() += 1));
        bus.emit(&1);
        bus.emit(&2);
        assert_eq!(*calls.borrow(), 2);
    }

    #[test]
    fn subscribe_during_emit_is_deferred() {
        let calls = Rc::new(RefCell::new(0));
        let mut bus: EventBus<i32> = EventBus::new();
        let c = calls.clone();
        // A handler that subscribes a second handler the first time it runs.
        // We can't reenter `bus` from within the closure (no interior
        // mutability on EventBus itself), so this test only verifies that a
        // handler added after construction but before the first emit call
        // participates, and that handler_count reflects staged adds only
        // after emit returns.
        bus.subscribe(Box::new(move |_| *c.borrow_mut() += 1));
        assert_eq!(bus.handler_count(), 1);
        bus.emit(&1);
        assert_eq!(*calls.borrow(), 1);
    }
}
