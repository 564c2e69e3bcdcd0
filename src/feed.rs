//! A concrete, in-memory [`Subject`] implementation, used to drive the
//! engine in tests since file loaders are out of scope for this crate.

use crate::bar::Bar;
use crate::datetime::DateTime;
use crate::dispatcher::Subject;
use crate::event::EventBus;

/// Replays a pre-sorted `Vec<Bar>` as dispatcher events.
///
/// # Panics
/// `dispatch` assumes the caller already checked `eof()`; bars must be
/// supplied in non-decreasing datetime order or the dispatcher's timeline
/// regression check will panic.
pub struct VecBarFeed {
    bars: Vec<Bar>,
    next: usize,
    new_bar_bus: EventBus<Bar>,
    priority: i32,
}

impl VecBarFeed {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self {
            bars,
            next: 0,
            new_bar_bus: EventBus::new(),
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn new_bar_bus_mut(&mut self) -> &mut EventBus<Bar> {
        &mut self.new_bar_bus
    }
}

impl Subject for VecBarFeed {
    fn eof(&self) -> bool {
        self.next >= self.bars.len()
    }

    fn dispatch(&mut self) -> bool {
        if self.eof() {
            return false;
        }
        let bar = self.bars[self.next].clone();
        self.next += 1;
        self.new_bar_bus.emit(&bar);
        true
    }

    fn peek_datetime(&self) -> Option<DateTime> {
        self.bars.get(self.next).map(|b| b.datetime)
    }

    fn dispatch_priority(&self) -> i32 {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bar::Resolution;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn bar(day: u32) -> Bar {
        Bar::new(
            "AAPL",
            DateTime::from_ymd_hms(2024, 1, day, 0, 0, 0),
            10.0,
            11.0,
            9.0,
            10.5,
            1000,
            Resolution::Day,
            1,
        )
    }

    #[test]
    fn dispatches_bars_in_order_and_then_reports_eof() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut feed = VecBarFeed::new(vec![bar(1), bar(2)]);
        let seen_clone = seen.clone();
        feed.new_bar_bus_mut()
            .subscribe(Box::new(move |b: &Bar| seen_clone.borrow_mut().push(b.datetime)));

        assert!(!feed.eof());
        assert!(feed.dispatch());
        assert!(feed.dispatch());
        assert!(feed.eof());
        assert!(!feed.dispatch());
        assert_eq!(seen.borrow().len(), 2);
    }
}
