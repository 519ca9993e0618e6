use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;

use crate::{Error, Result};

/// Type of a simulation event.
///
/// The declaration order is the tie-break precedence for events scheduled at the same time:
/// a departure is processed before an arrival, and both before an observer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    /// A packet leaves the server.
    Departure,
    /// A packet enters the system.
    Arrival,
    /// The queue is sampled.
    Observer,
}

/// An event occurring at a specific time of the simulation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Event {
    /// What happens.
    pub kind: EventKind,
    /// When it happens, in seconds since the start of the simulation.
    pub time: f64,
}

impl Event {
    /// Constructs a new event.
    #[must_use]
    pub fn new(kind: EventKind, time: f64) -> Self {
        Self { kind, time }
    }
}

/// Entry type stored in the queue, including the event and its insertion sequence number.
#[derive(Debug)]
struct EventEntry {
    time: OrderedFloat<f64>,
    kind: EventKind,
    sequence: u64,
}

impl EventEntry {
    fn key(&self) -> (OrderedFloat<f64>, EventKind, u64) {
        (self.time, self.kind, self.sequence)
    }
}

impl PartialEq for EventEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for EventEntry {}

impl PartialOrd for EventEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Time-ordered queue of pending events.
///
/// Events are extracted in order of time. Events with equal times are extracted by kind
/// (see [`EventKind`]), and then in the order they were inserted.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: BinaryHeap<Reverse<EventEntry>>,
    next_sequence: u64,
}

impl EventQueue {
    /// Schedules `event`.
    pub fn insert(&mut self, event: Event) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.events.push(Reverse(EventEntry {
            time: OrderedFloat(event.time),
            kind: event.kind,
            sequence,
        }));
    }

    /// Removes and returns the earliest pending event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyQueue`] if no events are left.
    pub fn extract_min(&mut self) -> Result<Event> {
        self.events
            .pop()
            .map(|Reverse(entry)| Event::new(entry.kind, entry.time.into_inner()))
            .ok_or(Error::EmptyQueue)
    }

    /// Time of the earliest pending event, if any.
    #[must_use]
    pub fn peek_time(&self) -> Option<f64> {
        self.events.peek().map(|Reverse(entry)| entry.time.into_inner())
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Checks if there are no pending events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drops all pending events.
    pub fn clear(&mut self) {
        self.events.clear();
        self.next_sequence = 0;
    }
}
