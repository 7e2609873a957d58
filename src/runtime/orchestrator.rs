//! # Orchestrator: drives all kernels off the shared event log.
//!
//! The [`Orchestrator`] owns the event-bus handle, the command collaborator,
//! and one slot per registered kernel (circuit breaker plus concurrency
//! counter). Nothing here is a global: compose one orchestrator per process,
//! or one per test.
//!
//! ## Tick flow
//! ```text
//! run_tick()
//!   │  (kernels in priority order, fan-out)
//!   ├─► kernel A ── breaker.try_acquire ── governor.try_acquire ── run ──┐
//!   ├─► kernel B ── (open? skip+log)                                     │
//!   ├─► kernel C ── (saturated? skip+log)                                │
//!   │                                                                    ▼
//!   └──────────────── join_all (collect every outcome) ──────────► TickReport
//! ```
//!
//! ## Rules
//! - A kernel's failure, rejection, or panic never aborts sibling kernels
//!   or the tick itself.
//! - Circuit-open and saturation skips are distinct outcomes, logged with
//!   the kernel name and reason; neither counts as a breaker failure.
//! - Priority orders *initiation* only; completion order depends on each
//!   kernel's own suspension points.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::commands::CommandsRef;
use crate::config::Config;
use crate::error::KernelError;
use crate::events::EventBus;
use crate::kernels::{KernelContext, KernelRef};

use super::breaker::{CircuitBreaker, CircuitState};
use super::governor::ConcurrencyGovernor;
use super::registry::KernelRegistry;

/// One kernel plus its resilience state.
struct KernelSlot {
    kernel: KernelRef,
    name: Arc<str>,
    breaker: CircuitBreaker,
}

/// Why a kernel did or did not run this tick.
#[derive(Debug)]
pub enum TickStatus {
    /// The kernel ran to completion.
    Completed,
    /// Skipped: the kernel's circuit breaker is open.
    SkippedCircuitOpen,
    /// Skipped: the kernel is already at its concurrency ceiling.
    SkippedSaturated,
    /// The kernel ran and failed (recorded by its breaker).
    Failed(KernelError),
}

impl TickStatus {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TickStatus::Completed => "completed",
            TickStatus::SkippedCircuitOpen => "skipped_circuit_open",
            TickStatus::SkippedSaturated => "skipped_saturated",
            TickStatus::Failed(_) => "failed",
        }
    }
}

/// Per-kernel outcome of one tick.
#[derive(Debug)]
pub struct KernelOutcome {
    /// The kernel's name.
    pub kernel: Arc<str>,
    /// What happened.
    pub status: TickStatus,
}

/// Outcomes of one [`Orchestrator::run_tick`], in initiation order.
#[derive(Debug)]
pub struct TickReport {
    /// One entry per registered kernel.
    pub outcomes: Vec<KernelOutcome>,
}

impl TickReport {
    /// Number of kernels that ran to completion.
    pub fn completed(&self) -> usize {
        self.count(|s| matches!(s, TickStatus::Completed))
    }

    /// Number of kernels that ran and failed.
    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, TickStatus::Failed(_)))
    }

    /// Number of kernels skipped (circuit open or saturated).
    pub fn skipped(&self) -> usize {
        self.count(|s| {
            matches!(
                s,
                TickStatus::SkippedCircuitOpen | TickStatus::SkippedSaturated
            )
        })
    }

    /// The outcome recorded for the named kernel, if it is registered.
    pub fn status_of(&self, kernel: &str) -> Option<&TickStatus> {
        self.outcomes
            .iter()
            .find(|o| &*o.kernel == kernel)
            .map(|o| &o.status)
    }

    fn count(&self, pred: impl Fn(&TickStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Observability snapshot for one kernel.
#[derive(Clone, Debug, Serialize)]
pub struct KernelStats {
    /// Kernel name.
    pub name: String,
    /// Declared priority.
    pub priority: u8,
    /// Runs currently in flight.
    pub running: usize,
    /// Declared concurrency ceiling.
    pub max_concurrency: usize,
    /// Current circuit-breaker state.
    pub circuit_state: CircuitState,
}

/// Runs registered kernels against the shared event log with per-kernel
/// failure isolation and concurrency caps.
pub struct Orchestrator {
    cfg: Config,
    bus: Arc<EventBus>,
    slots: Vec<KernelSlot>,
    governor: ConcurrencyGovernor,
    ctx: KernelContext,
}

impl Orchestrator {
    /// Composes an orchestrator from its injected collaborators.
    pub fn new(
        cfg: Config,
        bus: Arc<EventBus>,
        commands: CommandsRef,
        registry: KernelRegistry,
    ) -> Self {
        let slots = registry
            .into_kernels()
            .into_iter()
            .map(|kernel| {
                let name: Arc<str> = Arc::from(kernel.name());
                let breaker =
                    CircuitBreaker::new(name.clone(), cfg.failure_threshold, cfg.reset_timeout);
                KernelSlot {
                    kernel,
                    name,
                    breaker,
                }
            })
            .collect();
        let ctx = KernelContext::new(bus.clone(), commands)
            .with_command_timeout(cfg.command_timeout);
        Self {
            cfg,
            bus,
            slots,
            governor: ConcurrencyGovernor::new(),
            ctx,
        }
    }

    /// The shared event bus this orchestrator reads from.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Runs every registered kernel once, concurrently, and collects every
    /// outcome. Never fails as a whole: per-kernel problems land in the
    /// report.
    pub async fn run_tick(&self) -> TickReport {
        let attempts = self.slots.iter().map(|slot| self.attempt(slot));
        let outcomes = join_all(attempts).await;
        TickReport { outcomes }
    }

    /// Drives ticks on the configured interval until the token is
    /// cancelled. Returns the number of completed ticks.
    pub async fn run_loop(&self, token: CancellationToken) -> u64 {
        let mut ticks: u64 = 0;
        loop {
            if token.is_cancelled() {
                break;
            }
            let report = self.run_tick().await;
            ticks += 1;
            tracing::debug!(
                tick = ticks,
                completed = report.completed(),
                failed = report.failed(),
                skipped = report.skipped(),
                "orchestrator tick finished"
            );

            let sleep = tokio::time::sleep(self.cfg.tick_interval);
            tokio::pin!(sleep);
            tokio::select! {
                _ = &mut sleep => {}
                _ = token.cancelled() => break,
            }
        }
        ticks
    }

    /// Snapshot of per-kernel observability state, in priority order.
    pub fn kernel_stats(&self) -> Vec<KernelStats> {
        self.slots
            .iter()
            .map(|slot| KernelStats {
                name: slot.name.to_string(),
                priority: slot.kernel.priority(),
                running: self.governor.running(&slot.name),
                max_concurrency: slot.kernel.max_concurrency(),
                circuit_state: slot.breaker.state(),
            })
            .collect()
    }

    async fn attempt(&self, slot: &KernelSlot) -> KernelOutcome {
        let permit = match slot.breaker.try_acquire() {
            Ok(permit) => permit,
            Err(_open) => {
                tracing::warn!(kernel = %slot.name, "kernel skipped: circuit open");
                return KernelOutcome {
                    kernel: slot.name.clone(),
                    status: TickStatus::SkippedCircuitOpen,
                };
            }
        };

        let _slot_guard = match self
            .governor
            .try_acquire(&slot.name, slot.kernel.max_concurrency())
        {
            Some(guard) => guard,
            None => {
                permit.abandon();
                tracing::debug!(
                    kernel = %slot.name,
                    max_concurrency = slot.kernel.max_concurrency(),
                    "kernel skipped: concurrency ceiling reached"
                );
                return KernelOutcome {
                    kernel: slot.name.clone(),
                    status: TickStatus::SkippedSaturated,
                };
            }
        };

        match permit.settle(slot.kernel.run(&self.ctx)).await {
            Ok(()) => KernelOutcome {
                kernel: slot.name.clone(),
                status: TickStatus::Completed,
            },
            Err(err) => {
                tracing::warn!(
                    kernel = %slot.name,
                    reason = %err,
                    label = err.as_label(),
                    "kernel failed"
                );
                KernelOutcome {
                    kernel: slot.name.clone(),
                    status: TickStatus::Failed(err),
                }
            }
        }
    }
}
