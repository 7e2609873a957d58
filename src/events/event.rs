//! # Application events recorded on the bus.
//!
//! An [`Event`] is an immutable record of something that happened: a name,
//! a global sequence number, a wall-clock timestamp, and a set of optional
//! fields describing where it came from and what it carried.
//!
//! The `ids` map holds entity references (`user_id`, `cart_id`, ...) as plain
//! strings; `metadata` is an open JSON bag for everything else. Nothing beyond
//! `name` and the timestamps is ever required.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically with creation order. The log additionally preserves
//! insertion order, so `seq` only matters when events from several sources
//! are compared out of band.
//!
//! ## Example
//! ```rust
//! use kernvisor::Event;
//!
//! let ev = Event::new("add_to_cart")
//!     .with_id("user_id", "u-17")
//!     .with_id("cart_id", "c-204")
//!     .with_meta("item_count", 2u64)
//!     .with_meta("first_item", "leather halter");
//!
//! assert_eq!(&*ev.name, "add_to_cart");
//! assert_eq!(ev.id("cart_id"), Some("c-204"));
//! assert_eq!(ev.meta_u64("item_count"), Some(2));
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use serde_json::Value;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Immutable event record with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs and age checks)
/// - other optional fields are set by the emitting call site
#[derive(Clone, Debug, Serialize)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Event name (e.g. `add_to_cart`, `share_click`).
    pub name: Arc<str>,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Optional transport or interaction method.
    pub method: Option<Arc<str>>,
    /// Optional logical lane the event belongs to.
    pub lane: Option<Arc<str>>,
    /// Optional page or surface the event originated from.
    pub page: Option<Arc<str>>,
    /// Marks events produced by demo/seed flows.
    pub demo: bool,
    /// Entity references keyed by role (`user_id`, `cart_id`, ...).
    pub ids: HashMap<String, String>,
    /// Free-form payload.
    pub metadata: serde_json::Map<String, Value>,
}

impl Event {
    /// Creates a new event with the current timestamp and next sequence number.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            name: name.into(),
            at: SystemTime::now(),
            method: None,
            lane: None,
            page: None,
            demo: false,
            ids: HashMap::new(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Overrides the timestamp (tests and replay tooling).
    #[inline]
    pub fn with_at(mut self, at: SystemTime) -> Self {
        self.at = at;
        self
    }

    /// Attaches a method.
    #[inline]
    pub fn with_method(mut self, method: impl Into<Arc<str>>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Attaches a lane.
    #[inline]
    pub fn with_lane(mut self, lane: impl Into<Arc<str>>) -> Self {
        self.lane = Some(lane.into());
        self
    }

    /// Attaches an originating page.
    #[inline]
    pub fn with_page(mut self, page: impl Into<Arc<str>>) -> Self {
        self.page = Some(page.into());
        self
    }

    /// Marks the event as demo data.
    #[inline]
    pub fn with_demo(mut self, demo: bool) -> Self {
        self.demo = demo;
        self
    }

    /// Attaches an entity reference.
    #[inline]
    pub fn with_id(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ids.insert(key.into(), value.into());
        self
    }

    /// Attaches a metadata value.
    #[inline]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Looks up an entity reference.
    pub fn id(&self, key: &str) -> Option<&str> {
        self.ids.get(key).map(String::as_str)
    }

    /// Looks up a metadata value.
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Looks up a metadata string.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Looks up a metadata unsigned integer.
    pub fn meta_u64(&self, key: &str) -> Option<u64> {
        self.metadata.get(key).and_then(Value::as_u64)
    }

    /// Time elapsed since the event was recorded (zero if the clock moved
    /// backwards).
    pub fn age(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.at)
            .unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::new("a");
        let b = Event::new("b");
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builders_set_fields() {
        let ev = Event::new("share_click")
            .with_method("tap")
            .with_lane("marketplace")
            .with_page("/listing/42")
            .with_demo(true)
            .with_id("user_id", "u-1")
            .with_meta("category", "tack");

        assert_eq!(ev.method.as_deref(), Some("tap"));
        assert_eq!(ev.lane.as_deref(), Some("marketplace"));
        assert_eq!(ev.page.as_deref(), Some("/listing/42"));
        assert!(ev.demo);
        assert_eq!(ev.id("user_id"), Some("u-1"));
        assert_eq!(ev.meta_str("category"), Some("tack"));
        assert_eq!(ev.meta_u64("category"), None);
    }

    #[test]
    fn age_reflects_backdated_timestamp() {
        let ev = Event::new("add_to_cart")
            .with_at(SystemTime::now() - Duration::from_secs(90));
        assert!(ev.age() >= Duration::from_secs(89));
    }
}
