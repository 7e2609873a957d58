//! # kernvisor
//!
//! **Kernvisor** is a reactive task-orchestration library for Rust.
//!
//! Named background "kernels" consume recent events from a shared,
//! bounded, in-process event log and request side effects through an
//! injected command collaborator. The orchestrator runs every kernel each
//! tick, fan-out parallel, with per-kernel circuit breakers and
//! concurrency caps so one misbehaving kernel never takes the rest down.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  application code ── emit/publish ──► EventBus ──► EventLog (bounded FIFO)
//!                                          │
//!                              on()/on_any() listeners
//!                          (sync, per-listener isolation)
//!
//!  Orchestrator::run_tick()
//!     │ (kernels in priority order, fan-out, join-all)
//!     ├─► CircuitBreaker ─► ConcurrencyGovernor ─► Kernel::run(ctx)
//!     │      (open? skip)      (saturated? skip)       │
//!     │                                                ├── ctx.recent(type, n)
//!     │                                                │     └─► EventLog
//!     │                                                └── ctx.invoke(domain, action, params)
//!     │                                                      └─► Commands (collaborator)
//!     └────────────────────────────────────────────► TickReport + kernel_stats()
//! ```
//!
//! ### Resilience
//! ```text
//! per kernel:
//!   CircuitBreaker: CLOSED ─(threshold failures)─► OPEN ─(reset timeout,
//!       next call probes)─► HALF_OPEN ─ success ─► CLOSED
//!                                      └ failure ─► OPEN
//!   ConcurrencyGovernor: running == max_concurrency → skip this tick
//!       (no queueing; the guard releases the slot on success, failure,
//!        and panic alike)
//! ```
//!
//! ## Features
//! | Area              | Description                                                       | Key types / traits                        |
//! |-------------------|-------------------------------------------------------------------|-------------------------------------------|
//! | **Events**        | Bounded log plus synchronous pub/sub with wildcard listeners.     | [`Event`], [`EventBus`], [`Subscription`]  |
//! | **Kernels**       | Reactive, prioritized, concurrency-capped background tasks.       | [`Kernel`], [`KernelFn`], [`KernelContext`]|
//! | **Commands**      | Abstract effect boundary kernels call out to.                     | [`Commands`], [`NullCommands`]             |
//! | **Resilience**    | Per-kernel breaker and in-flight caps.                            | [`CircuitBreaker`], [`ConcurrencyGovernor`]|
//! | **Orchestration** | Fan-out tick driver with outcome reporting and stats.             | [`Orchestrator`], [`TickReport`]           |
//! | **Errors**        | Typed errors for composition and kernel execution.                | [`OrchestratorError`], [`KernelError`]     |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use kernvisor::{
//!     Config, EventBus, KernelContext, KernelFn, KernelRef, KernelRegistry, NullCommands,
//!     Orchestrator,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default();
//!     let bus = Arc::new(EventBus::new(cfg.log_capacity));
//!
//!     let echo: KernelRef = KernelFn::arc("echo", 5, 1, |ctx: KernelContext| async move {
//!         for ev in ctx.recent("ping", 10) {
//!             ctx.invoke("demo", "echo", serde_json::json!({ "seq": ev.seq })).await?;
//!         }
//!         Ok(())
//!     });
//!
//!     let registry = KernelRegistry::new(vec![echo])?;
//!     let orchestrator = Orchestrator::new(cfg, bus.clone(), Arc::new(NullCommands), registry);
//!
//!     bus.emit("ping");
//!     let report = orchestrator.run_tick().await;
//!     assert_eq!(report.completed(), 1);
//!     Ok(())
//! }
//! ```

mod commands;
mod config;
mod error;
mod events;
mod kernels;
mod runtime;

// ---- Public re-exports ----

pub use commands::{CommandError, Commands, CommandsRef, NullCommands};
pub use config::Config;
pub use error::{KernelError, OrchestratorError};
pub use events::{Event, EventBus, EventLog, Subscription};
pub use kernels::{
    AdPredictor, AffiliateRouter, CartNudge, ClaimHunter, ConflictDetector, Kernel, KernelContext,
    KernelFn, KernelRef,
};
pub use runtime::{
    BreakerPermit, CircuitBreaker, CircuitState, ConcurrencyGovernor, KernelOutcome,
    KernelRegistry, KernelStats, Orchestrator, SlotGuard, TickReport, TickStatus,
};
