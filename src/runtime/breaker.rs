//! # Per-kernel circuit breaker.
//!
//! [`CircuitBreaker`] isolates a repeatedly failing kernel from the rest of
//! the system with a three-state machine:
//!
//! ```text
//!              failure_count >= threshold
//!   CLOSED ───────────────────────────────► OPEN
//!     ▲                                      │
//!     │ probe succeeds        reset_timeout elapsed at next call
//!     │                                      ▼
//!     └────────────────────────────────  HALF_OPEN
//!                  probe fails ──────────────► OPEN
//! ```
//!
//! ## Rules
//! - **CLOSED**: calls run normally. Success resets `failure_count`;
//!   a failure increments it and opens the breaker at the threshold.
//! - **OPEN**: calls are rejected with [`KernelError::CircuitOpen`] without
//!   running. The openness check itself transitions to HALF_OPEN once
//!   `reset_timeout` has elapsed since the last failure, letting that one
//!   call through as the probe.
//! - **HALF_OPEN**: exactly one probe is in flight; further calls are
//!   rejected until it settles. Probe success closes the breaker and resets
//!   the count; a single probe failure reopens it regardless of threshold.
//! - Circuit-open rejections are never recorded as failures; only genuine
//!   outcomes of the wrapped call are.
//! - Kernel panics are caught at this boundary and recorded as failures.
//!
//! Timing uses [`tokio::time::Instant`], so recovery is testable under a
//! paused clock.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use tokio::time::Instant;

use crate::error::{panic_message, KernelError};

/// Breaker state as exposed in stats snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls flow normally.
    Closed,
    /// Calls are rejected without executing.
    Open,
    /// One probe call is allowed through.
    HalfOpen,
}

impl CircuitState {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

struct BreakerCore {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    probe_in_flight: bool,
}

/// Failure tracker for one kernel.
pub struct CircuitBreaker {
    name: Arc<str>,
    failure_threshold: u32,
    reset_timeout: Duration,
    core: Mutex<BreakerCore>,
}

impl CircuitBreaker {
    /// Creates a closed breaker for the named kernel.
    pub fn new(name: impl Into<Arc<str>>, failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
            core: Mutex::new(BreakerCore {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
                probe_in_flight: false,
            }),
        }
    }

    /// The kernel name this breaker guards.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state. Pure read; does not perform the timed transition.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Current consecutive failure count.
    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    /// Checks openness and claims the right to execute one call.
    ///
    /// Rejects with [`KernelError::CircuitOpen`] while open (performing the
    /// timed OPEN→HALF_OPEN transition as a side effect of the check) and
    /// while a half-open probe is already in flight. The returned permit
    /// must be settled via [`BreakerPermit::settle`] or released via
    /// [`BreakerPermit::abandon`].
    pub fn try_acquire(&self) -> Result<BreakerPermit<'_>, KernelError> {
        let mut core = self.lock();
        match core.state {
            CircuitState::Closed => Ok(BreakerPermit {
                breaker: self,
                is_probe: false,
                armed: true,
            }),
            CircuitState::Open => {
                let elapsed = core.last_failure.map(|at| at.elapsed());
                if elapsed.is_some_and(|e| e >= self.reset_timeout) {
                    core.state = CircuitState::HalfOpen;
                    core.probe_in_flight = true;
                    tracing::info!(kernel = %self.name, "circuit breaker half-open, probing");
                    Ok(BreakerPermit {
                        breaker: self,
                        is_probe: true,
                        armed: true,
                    })
                } else {
                    Err(self.open_error())
                }
            }
            CircuitState::HalfOpen => {
                if core.probe_in_flight {
                    Err(self.open_error())
                } else {
                    core.probe_in_flight = true;
                    Ok(BreakerPermit {
                        breaker: self,
                        is_probe: true,
                        armed: true,
                    })
                }
            }
        }
    }

    /// Runs `f` through the breaker: rejects if open, otherwise records the
    /// outcome (including caught panics) and propagates it.
    pub async fn execute<F, Fut, T>(&self, f: F) -> Result<T, KernelError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, KernelError>>,
    {
        let permit = self.try_acquire()?;
        permit.settle(f()).await
    }

    fn open_error(&self) -> KernelError {
        KernelError::CircuitOpen {
            kernel: self.name.to_string(),
        }
    }

    fn record_success(&self) {
        let mut core = self.lock();
        core.probe_in_flight = false;
        match core.state {
            CircuitState::HalfOpen => {
                core.state = CircuitState::Closed;
                core.failure_count = 0;
                tracing::info!(kernel = %self.name, "circuit breaker closed after probe");
            }
            CircuitState::Closed => {
                core.failure_count = 0;
            }
            CircuitState::Open => {}
        }
    }

    fn record_failure(&self) {
        let mut core = self.lock();
        core.probe_in_flight = false;
        core.failure_count += 1;
        core.last_failure = Some(Instant::now());
        match core.state {
            CircuitState::HalfOpen => {
                core.state = CircuitState::Open;
                tracing::warn!(kernel = %self.name, "probe failed, circuit breaker reopened");
            }
            CircuitState::Closed => {
                if core.failure_count >= self.failure_threshold {
                    core.state = CircuitState::Open;
                    tracing::warn!(
                        kernel = %self.name,
                        failures = core.failure_count,
                        "failure threshold reached, circuit breaker opened"
                    );
                }
            }
            CircuitState::Open => {}
        }
    }

    fn release_probe(&self) {
        self.lock().probe_in_flight = false;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Claim on one breaker-guarded call, handed out by
/// [`CircuitBreaker::try_acquire`].
///
/// If the permit is dropped without settling (e.g. the surrounding future is
/// cancelled), a held probe slot is released without recording an outcome.
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    is_probe: bool,
    armed: bool,
}

impl BreakerPermit<'_> {
    /// Releases the permit without recording an outcome (the call never ran).
    pub fn abandon(mut self) {
        self.armed = false;
        if self.is_probe {
            self.breaker.release_probe();
        }
    }

    /// Awaits the wrapped call and routes its outcome through the breaker's
    /// transition rules. Panics are caught and recorded as failures.
    pub async fn settle<T>(
        mut self,
        fut: impl Future<Output = Result<T, KernelError>>,
    ) -> Result<T, KernelError> {
        let outcome = std::panic::AssertUnwindSafe(fut).catch_unwind().await;
        self.armed = false;
        match outcome {
            Ok(Ok(value)) => {
                self.breaker.record_success();
                Ok(value)
            }
            Ok(Err(err)) => {
                self.breaker.record_failure();
                Err(err)
            }
            Err(payload) => {
                self.breaker.record_failure();
                Err(KernelError::Panicked {
                    error: panic_message(payload),
                })
            }
        }
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if self.armed && self.is_probe {
            self.breaker.release_probe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    const RESET: Duration = Duration::from_secs(60);

    async fn fail(breaker: &CircuitBreaker) {
        let _ = breaker
            .execute(|| async { Err::<(), _>(KernelError::fail("boom")) })
            .await;
    }

    #[tokio::test]
    async fn opens_after_threshold_and_rejects_without_invoking() {
        let breaker = CircuitBreaker::new("k", 5, RESET);
        let invocations = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let n = Arc::clone(&invocations);
            let _ = breaker
                .execute(move || {
                    n.fetch_add(1, AtomicOrdering::SeqCst);
                    async { Err::<(), _>(KernelError::fail("boom")) }
                })
                .await;
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.failure_count(), 5);

        let n = Arc::clone(&invocations);
        let err = breaker
            .execute(move || {
                n.fetch_add(1, AtomicOrdering::SeqCst);
                async { Ok(()) }
            })
            .await
            .unwrap_err();
        assert!(err.is_circuit_open());
        assert_eq!(invocations.load(AtomicOrdering::SeqCst), 5);
        // Rejection is not a failure.
        assert_eq!(breaker.failure_count(), 5);
    }

    #[tokio::test]
    async fn four_failures_do_not_trip_it() {
        let breaker = CircuitBreaker::new("k", 5, RESET);
        for _ in 0..4 {
            fail(&breaker).await;
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn success_resets_the_failure_count() {
        let breaker = CircuitBreaker::new("k", 5, RESET);
        for _ in 0..4 {
            fail(&breaker).await;
        }
        breaker
            .execute(|| async { Ok::<(), KernelError>(()) })
            .await
            .unwrap();
        assert_eq!(breaker.failure_count(), 0);

        // The slate is clean: four more failures still do not trip it.
        for _ in 0..4 {
            fail(&breaker).await;
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_through_a_successful_probe() {
        let breaker = CircuitBreaker::new("k", 5, RESET);
        for _ in 0..5 {
            fail(&breaker).await;
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::advance(RESET).await;

        breaker
            .execute(|| async { Ok::<(), KernelError>(()) })
            .await
            .unwrap();
        assert_eq!(breaker.state(), CircuitState::Closed);

        // One failure after recovery starts from zero, not from five.
        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_probe_reopens_immediately() {
        let breaker = CircuitBreaker::new("k", 5, RESET);
        for _ in 0..5 {
            fail(&breaker).await;
        }
        tokio::time::advance(RESET).await;

        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        // Still rejecting until the reset timeout elapses again.
        let err = breaker
            .execute(|| async { Ok(()) })
            .await
            .unwrap_err();
        assert!(err.is_circuit_open());
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_allows_exactly_one_probe() {
        let breaker = CircuitBreaker::new("k", 1, RESET);
        fail(&breaker).await;
        tokio::time::advance(RESET).await;

        let probe = breaker.try_acquire().unwrap();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        let second = breaker.try_acquire();
        assert!(second.is_err());

        probe
            .settle(async { Ok::<(), KernelError>(()) })
            .await
            .unwrap();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.try_acquire().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_probe_frees_the_slot() {
        let breaker = CircuitBreaker::new("k", 1, RESET);
        fail(&breaker).await;
        tokio::time::advance(RESET).await;

        let probe = breaker.try_acquire().unwrap();
        probe.abandon();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        // Slot is free again for the next probe.
        assert!(breaker.try_acquire().is_ok());
    }

    #[tokio::test]
    async fn panics_count_as_failures() {
        async fn boom() -> Result<(), KernelError> {
            panic!("kernel exploded")
        }

        let breaker = CircuitBreaker::new("k", 2, RESET);
        for _ in 0..2 {
            let err = breaker.execute(boom).await.unwrap_err();
            assert_eq!(err.as_label(), "kernel_panicked");
        }
        assert_eq!(breaker.state(), CircuitState::Open);
    }
}
