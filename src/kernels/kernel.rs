//! # Kernel abstraction.
//!
//! A [`Kernel`] is an async, reactive unit of background work: each tick it
//! reads recent events through its [`KernelContext`](super::KernelContext)
//! and may ask the command collaborator for side effects. The common handle
//! type is [`KernelRef`], an `Arc<dyn Kernel>` suitable for sharing across
//! the runtime.
//!
//! ## Contract
//! - `name` is stable and unique across the registry.
//! - `priority` (1..=10, higher first) governs initiation order within a
//!   tick and registry ordering; execution is still fan-out parallel.
//! - `max_concurrency` caps simultaneous in-flight runs of this kernel;
//!   attempts beyond the cap are skipped for that tick, never queued.
//! - `run` must return early, without invoking any command, when its
//!   triggering event types are absent. Expected "no data" conditions are
//!   not errors; unexpected failures propagate so the circuit breaker can
//!   observe them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::KernelError;

use super::context::KernelContext;

/// # Asynchronous, reactive background task.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use kernvisor::{Kernel, KernelContext, KernelError};
///
/// struct Echo;
///
/// #[async_trait]
/// impl Kernel for Echo {
///     fn name(&self) -> &str { "echo" }
///
///     async fn run(&self, ctx: &KernelContext) -> Result<(), KernelError> {
///         for ev in ctx.recent("ping", 10) {
///             ctx.invoke("demo", "echo", serde_json::json!({ "seq": ev.seq })).await?;
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Kernel: Send + Sync + 'static {
    /// Returns the stable, unique kernel name.
    fn name(&self) -> &str;

    /// Scheduling priority, `1..=10`, higher runs first within a tick.
    fn priority(&self) -> u8 {
        5
    }

    /// Maximum simultaneous in-flight runs of this kernel.
    fn max_concurrency(&self) -> usize {
        1
    }

    /// Executes one reactive pass over recent events.
    async fn run(&self, ctx: &KernelContext) -> Result<(), KernelError>;
}

/// Shared handle to a kernel.
pub type KernelRef = Arc<dyn Kernel>;
