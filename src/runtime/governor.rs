//! # Per-kernel concurrency governor.
//!
//! Tracks how many runs of each kernel are in flight and refuses new work at
//! the kernel's ceiling. There is no queue: a refused attempt is simply
//! skipped for that tick.
//!
//! ## Rules
//! - Admission is `DropIfRunning`-style: at the cap, skip and move on.
//! - The returned [`SlotGuard`] decrements on drop, so the count is
//!   released on success, failure, and panic alike.
//! - Counters live for the governor's lifetime and are created lazily per
//!   kernel name.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, PoisonError};

/// In-flight run counters keyed by kernel name.
#[derive(Default)]
pub struct ConcurrencyGovernor {
    counters: Mutex<HashMap<Arc<str>, Arc<AtomicUsize>>>,
}

impl ConcurrencyGovernor {
    /// Creates an empty governor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to claim one run slot for `name` under the given ceiling.
    ///
    /// Returns `None` when `max_concurrency` runs are already in flight.
    pub fn try_acquire(&self, name: &str, max_concurrency: usize) -> Option<SlotGuard> {
        let counter = self.counter(name);
        loop {
            let running = counter.load(AtomicOrdering::SeqCst);
            if running >= max_concurrency {
                return None;
            }
            if counter
                .compare_exchange(
                    running,
                    running + 1,
                    AtomicOrdering::SeqCst,
                    AtomicOrdering::SeqCst,
                )
                .is_ok()
            {
                return Some(SlotGuard { counter });
            }
        }
    }

    /// Number of runs currently in flight for `name`.
    pub fn running(&self, name: &str) -> usize {
        self.counter(name).load(AtomicOrdering::SeqCst)
    }

    fn counter(&self, name: &str) -> Arc<AtomicUsize> {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(counter) = counters.get(name) {
            Arc::clone(counter)
        } else {
            let counter = Arc::new(AtomicUsize::new(0));
            counters.insert(Arc::from(name), Arc::clone(&counter));
            counter
        }
    }
}

/// Claim on one run slot; releases it when dropped.
pub struct SlotGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, AtomicOrdering::SeqCst);
    }
}
