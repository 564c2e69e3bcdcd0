//! Drives one or more [`Subject`]s in timestamp order, synchronizing
//! subjects that share a timestamp into the same dispatch round.

use crate::datetime::DateTime;
use crate::event::{EventBus, TimeElapsed};

/// A source of time-ordered events: a data feed or the broker itself.
///
/// `dispatch_priority` breaks ties when multiple subjects share a
/// timestamp — smaller numbers dispatch first. The return value must never
/// change for a given subject, matching the original's contract.
pub trait Subject {
    fn start(&mut self) {}
    fn stop(&mut self) {}
    fn join(&mut self) {}

    /// True once this subject has no more events to dispatch.
    fn eof(&self) -> bool;

    /// Dispatches the next event (if any). Returns `true` if an event was
    /// actually dispatched.
    fn dispatch(&mut self) -> bool;

    /// The datetime of this subject's next event, or `None` if it has none
    /// ready right now.
    fn peek_datetime(&self) -> Option<DateTime>;

    fn dispatch_priority(&self) -> i32 {
        0
    }
}

pub struct Dispatcher {
    subjects: Vec<Box<dyn Subject>>,
    stopped: bool,
    eof: bool,
    curr_datetime: DateTime,
    prev_datetime: DateTime,

    start_bus: EventBus<()>,
    idle_bus: EventBus<()>,
    time_elapsed_bus: EventBus<TimeElapsed>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            subjects: Vec::new(),
            stopped: false,
            eof: false,
            curr_datetime: DateTime::INVALID,
            prev_datetime: DateTime::INVALID,
            start_bus: EventBus::new(),
            idle_bus: EventBus::new(),
            time_elapsed_bus: EventBus::new(),
        }
    }

    pub fn current_datetime(&self) -> DateTime {
        self.curr_datetime
    }

    pub fn previous_datetime(&self) -> DateTime {
        self.prev_datetime
    }

    pub fn start_bus_mut(&mut self) -> &mut EventBus<()> {
        &mut self.start_bus
    }

    pub fn idle_bus_mut(&mut self) -> &mut EventBus<()> {
        &mut self.idle_bus
    }

    pub fn time_elapsed_bus_mut(&mut self) -> &mut EventBus<TimeElapsed> {
        &mut self.time_elapsed_bus
    }

    /// Adds a subject, keeping the subject list sorted by dispatch
    /// priority (stable, so equal-priority subjects keep insertion order).
    /// A subject already present (by pointer identity) is ignored.
    pub fn add_subject(&mut self, subject: Box<dyn Subject>) {
        self.subjects.push(subject);
        self.subjects
            .sort_by_key(|s| s.dispatch_priority());
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Scans all subjects for the smallest pending datetime, dispatches
    /// every subject sharing it, and returns whether anything was
    /// dispatched.
    ///
    /// # Panics
    /// Panics if the timeline goes backwards relative to the previous
    /// dispatch round — an invariant violation, not a recoverable error.
    fn dispatch_round(&mut self) -> bool {
        self.eof = true;

        let mut smallest: Option<DateTime> = None;
        for subject in &self.subjects {
            if subject.eof() {
                continue;
            }
            if let Some(dt) = subject.peek_datetime() {
                smallest = Some(match smallest {
                    Some(s) if s <= dt => s,
                    _ => dt,
                });
            }
        }

        let smallest = match smallest {
            Some(dt) => dt,
            None => return false,
        };

        self.eof = false;
        self.curr_datetime = smallest;
        if self.prev_datetime.is_valid() {
            assert!(
                self.prev_datetime <= self.curr_datetime,
                "timeline wrap back: previous {:?}, current {:?}",
                self.prev_datetime,
                self.curr_datetime
            );
        }
        self.time_elapsed_bus.emit(&TimeElapsed {
            datetime: self.curr_datetime,
        });
        self.prev_datetime = self.curr_datetime;

        let mut dispatched = false;
        for subject in &mut self.subjects {
            if subject.eof() {
                continue;
            }
            if subject.peek_datetime() == Some(smallest) && subject.dispatch() {
                dispatched = true;
            }
        }
        dispatched
    }

    /// Runs every subject to completion.
    pub fn run(&mut self) {
        if self.subjects.is_empty() {
            return;
        }

        for subject in &mut self.subjects {
            subject.start();
        }
        self.start_bus.emit(&());

        while !self.stopped {
            let dispatched = self.dispatch_round();
            if self.eof {
                self.stopped = true;
            } else if !dispatched {
                self.idle_bus.emit(&());
            }
        }

        for subject in &mut self.subjects {
            subject.stop();
        }
        for subject in &mut self.subjects {
            subject.join();
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
