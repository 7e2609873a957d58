//! # Bounded, append-only event log.
//!
//! [`EventLog`] is a FIFO ring over [`Event`]s: appends go to the back, and
//! once the configured capacity is reached the oldest event is evicted to
//! make room. It is the single source of truth for "what happened recently".
//!
//! ## Rules
//! - Insertion order is preserved; events are never reordered.
//! - Reads return owned snapshots; mutating a snapshot never affects the log.
//! - Events are only removed by eviction or an explicit [`EventLog::clear`].

use std::collections::VecDeque;

use super::event::Event;

/// Bounded FIFO log of events.
#[derive(Debug)]
pub struct EventLog {
    buf: VecDeque<Event>,
    capacity: usize,
}

impl EventLog {
    /// Creates an empty log with the given capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an event, evicting the oldest if the log is full.
    pub fn push(&mut self, ev: Event) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(ev);
    }

    /// Number of events currently retained.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when no events are retained.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the last `count` events (all retained events if `None`), in
    /// emission order, as an owned snapshot.
    pub fn tail(&self, count: Option<usize>) -> Vec<Event> {
        let n = count.unwrap_or(self.buf.len()).min(self.buf.len());
        self.buf.iter().skip(self.buf.len() - n).cloned().collect()
    }

    /// Returns at most `limit` most-recent events with the given name, in
    /// chronological order (oldest of the returned slice first).
    pub fn by_name(&self, name: &str, limit: usize) -> Vec<Event> {
        let mut out: Vec<Event> = self
            .buf
            .iter()
            .rev()
            .filter(|ev| &*ev.name == name)
            .take(limit)
            .cloned()
            .collect();
        out.reverse();
        out
    }

    /// Removes all retained events.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Event {
        Event::new(name.to_string())
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let mut log = EventLog::new(3);
        for i in 0..5 {
            log.push(named(&format!("e{i}")));
        }
        let tail = log.tail(None);
        assert_eq!(log.len(), 3);
        let names: Vec<&str> = tail.iter().map(|e| &*e.name).collect();
        assert_eq!(names, vec!["e2", "e3", "e4"]);
    }

    #[test]
    fn tail_limits_and_preserves_order() {
        let mut log = EventLog::new(10);
        for i in 0..4 {
            log.push(named(&format!("e{i}")));
        }
        let tail = log.tail(Some(2));
        let names: Vec<&str> = tail.iter().map(|e| &*e.name).collect();
        assert_eq!(names, vec!["e2", "e3"]);
    }

    #[test]
    fn by_name_returns_recent_matches_chronologically() {
        let mut log = EventLog::new(10);
        for i in 0..4 {
            log.push(named("ping").with_meta("n", i as u64));
            log.push(named("pong"));
        }
        let pings = log.by_name("ping", 2);
        assert_eq!(pings.len(), 2);
        assert_eq!(pings[0].meta_u64("n"), Some(2));
        assert_eq!(pings[1].meta_u64("n"), Some(3));
    }

    #[test]
    fn clear_empties_the_log() {
        let mut log = EventLog::new(4);
        log.push(named("a"));
        log.clear();
        assert!(log.is_empty());
        assert!(log.tail(None).is_empty());
    }
}
