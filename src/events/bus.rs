//! # Event bus: bounded log plus synchronous pub/sub.
//!
//! [`EventBus`] owns the [`EventLog`](super::EventLog) and a listener table.
//! Publishing appends to the log, then notifies exact-name listeners in
//! registration order, then wildcard listeners in registration order.
//!
//! ## Architecture
//! ```text
//! publish(Event)
//!     │
//!     ├──► EventLog (bounded FIFO, oldest evicted at capacity)
//!     │
//!     ├──► listeners["add_to_cart"]  (registration order)
//!     │         listener panics are caught per listener
//!     └──► wildcard listeners        (registration order)
//! ```
//!
//! ## Rules
//! - **Synchronous dispatch**: `publish` returns after every listener ran.
//!   Listeners are plain `Fn(&Event)` closures; one that wants async work
//!   spawns its own task, so publication latency is never tied to listener
//!   latency.
//! - **Isolation**: a panicking listener is caught, reported via `tracing`,
//!   and never prevents later listeners from running.
//! - **Capability-based removal**: [`EventBus::on`] returns a
//!   [`Subscription`] whose `unsubscribe` removes exactly that listener and
//!   is a no-op when called again.
//! - **Re-entrancy**: listeners may publish further events; dispatch runs
//!   with no internal lock held.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::event::Event;
use super::log::EventLog;

type Listener = Arc<dyn Fn(&Event) + Send + Sync + 'static>;

struct Registered {
    id: u64,
    listener: Listener,
}

struct BusInner {
    log: EventLog,
    named: HashMap<Arc<str>, Vec<Registered>>,
    wildcard: Vec<Registered>,
    next_id: u64,
}

impl BusInner {
    fn register(&mut self, name: Option<Arc<str>>, listener: Listener) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let entry = Registered { id, listener };
        match name {
            Some(name) => self.named.entry(name).or_default().push(entry),
            None => self.wildcard.push(entry),
        }
        id
    }

    fn remove(&mut self, name: Option<&Arc<str>>, id: u64) {
        match name {
            Some(name) => {
                if let Some(entries) = self.named.get_mut(name) {
                    entries.retain(|r| r.id != id);
                    if entries.is_empty() {
                        self.named.remove(name);
                    }
                }
            }
            None => self.wildcard.retain(|r| r.id != id),
        }
    }
}

/// Bounded event log with synchronous publish/subscribe on top.
///
/// Cheap to share behind an [`Arc`]; all methods take `&self`.
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
    trace_events: bool,
}

impl EventBus {
    /// Creates a bus whose log retains at most `log_capacity` events.
    pub fn new(log_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner {
                log: EventLog::new(log_capacity),
                named: HashMap::new(),
                wildcard: Vec::new(),
                next_id: 0,
            })),
            trace_events: false,
        }
    }

    /// Enables or disables the per-publish debug trace.
    pub fn with_trace(mut self, trace_events: bool) -> Self {
        self.trace_events = trace_events;
        self
    }

    /// Publishes a prebuilt event: appends it to the log, then notifies
    /// exact-name listeners followed by wildcard listeners.
    ///
    /// Listener panics are caught individually; publication always completes.
    pub fn publish(&self, ev: Event) {
        if self.trace_events {
            tracing::debug!(name = %ev.name, seq = ev.seq, ids = ?ev.ids, "event published");
        }

        let listeners: Vec<Listener> = {
            let mut inner = self.lock();
            let mut snapshot = Vec::new();
            if let Some(entries) = inner.named.get(&*ev.name) {
                snapshot.extend(entries.iter().map(|r| Arc::clone(&r.listener)));
            }
            snapshot.extend(inner.wildcard.iter().map(|r| Arc::clone(&r.listener)));
            inner.log.push(ev.clone());
            snapshot
        };

        for listener in listeners {
            let call = AssertUnwindSafe(|| listener(&ev));
            if let Err(payload) = std::panic::catch_unwind(call) {
                let info = crate::error::panic_message(payload);
                tracing::warn!(name = %ev.name, panic = %info, "event listener panicked");
            }
        }
    }

    /// Shorthand for publishing a bare event with the given name.
    pub fn emit(&self, name: impl Into<Arc<str>>) {
        self.publish(Event::new(name));
    }

    /// Registers a listener for events with exactly the given name.
    ///
    /// The returned [`Subscription`] removes this listener (and only this
    /// listener) when unsubscribed.
    pub fn on(
        &self,
        name: impl Into<Arc<str>>,
        listener: impl Fn(&Event) + Send + Sync + 'static,
    ) -> Subscription {
        let name: Arc<str> = name.into();
        let id = self
            .lock()
            .register(Some(name.clone()), Arc::new(listener));
        Subscription {
            inner: Arc::downgrade(&self.inner),
            name: Some(name),
            id,
            active: AtomicBool::new(true),
        }
    }

    /// Registers a listener that fires for every published event.
    pub fn on_any(&self, listener: impl Fn(&Event) + Send + Sync + 'static) -> Subscription {
        let id = self.lock().register(None, Arc::new(listener));
        Subscription {
            inner: Arc::downgrade(&self.inner),
            name: None,
            id,
            active: AtomicBool::new(true),
        }
    }

    /// Returns the last `count` events (all retained events if `None`), in
    /// emission order, as an owned snapshot.
    pub fn history(&self, count: Option<usize>) -> Vec<Event> {
        self.lock().log.tail(count)
    }

    /// Returns at most `limit` most-recent events with the given name, in
    /// chronological order.
    pub fn events_by_name(&self, name: &str, limit: usize) -> Vec<Event> {
        self.lock().log.by_name(name, limit)
    }

    /// Number of events currently retained in the log.
    pub fn log_len(&self) -> usize {
        self.lock().log.len()
    }

    /// Empties the log. Subscriptions are unaffected.
    pub fn clear_log(&self) {
        self.lock().log.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BusInner> {
        // Listeners run outside the lock, so poisoning can only come from a
        // panic inside the bus itself; recover rather than propagate.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle returned by [`EventBus::on`] / [`EventBus::on_any`].
///
/// Removal is capability-based: only the holder of the handle can remove the
/// listener, and repeated calls are no-ops. Dropping the handle does **not**
/// unsubscribe; listeners live until explicitly removed or the bus is gone.
pub struct Subscription {
    inner: Weak<Mutex<BusInner>>,
    name: Option<Arc<str>>,
    id: u64,
    active: AtomicBool,
}

impl Subscription {
    /// Removes the listener this handle was created for. Idempotent.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, AtomicOrdering::SeqCst) {
            return;
        }
        if let Some(inner) = self.inner.upgrade() {
            inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(self.name.as_ref(), self.id);
        }
    }

    /// True until [`Subscription::unsubscribe`] is first called.
    pub fn is_active(&self) -> bool {
        self.active.load(AtomicOrdering::SeqCst)
    }
}
