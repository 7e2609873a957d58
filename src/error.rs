//! Error types used by the kernvisor runtime and kernels.
//!
//! This module defines two main error enums:
//!
//! - [`OrchestratorError`]: errors raised when assembling the kernel registry.
//! - [`KernelError`]: errors raised by (or on behalf of) individual kernel
//!   executions, including circuit-breaker rejections and command failures.
//!
//! Both types provide an `as_label` helper producing short stable snake_case
//! labels for logging and metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced while assembling the orchestrator.
///
/// The kernel registry is fixed at construction time; these represent
/// configuration mistakes that would otherwise surface as silent misbehavior
/// at runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Two kernels were registered under the same name.
    #[error("duplicate kernel name: {name}")]
    DuplicateKernel {
        /// The offending kernel name.
        name: String,
    },

    /// A kernel declared a priority outside the supported `1..=10` range.
    #[error("kernel {name}: priority {priority} outside 1..=10")]
    PriorityOutOfRange {
        /// The offending kernel name.
        name: String,
        /// The declared priority.
        priority: u8,
    },

    /// A kernel declared a concurrency ceiling of zero, which would make it
    /// permanently unrunnable.
    #[error("kernel {name}: max_concurrency must be at least 1")]
    ZeroConcurrency {
        /// The offending kernel name.
        name: String,
    },
}

impl OrchestratorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            OrchestratorError::DuplicateKernel { .. } => "duplicate_kernel",
            OrchestratorError::PriorityOutOfRange { .. } => "priority_out_of_range",
            OrchestratorError::ZeroConcurrency { .. } => "zero_concurrency",
        }
    }
}

/// # Errors produced by kernel execution.
///
/// These flow out of a kernel's `run`, through the circuit breaker (which
/// records genuine failures), and into the per-tick outcome report.
///
/// [`KernelError::CircuitOpen`] is special: it is an expected rejection raised
/// *instead of* running the kernel, and it is never recorded as a breaker
/// failure.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum KernelError {
    /// The kernel's circuit breaker is open; the call was rejected without
    /// executing.
    #[error("circuit breaker open for kernel {kernel}")]
    CircuitOpen {
        /// Name of the kernel whose breaker rejected the call.
        kernel: String,
    },

    /// A command invocation was rejected by the collaborator.
    #[error("command {domain}.{action} failed: {error}")]
    Command {
        /// Command domain (e.g. `messages`).
        domain: String,
        /// Command action (e.g. `send_message`).
        action: String,
        /// The collaborator's failure message.
        error: String,
    },

    /// A command invocation exceeded the configured deadline.
    #[error("command {domain}.{action} timed out after {timeout:?}")]
    CommandTimeout {
        /// Command domain.
        domain: String,
        /// Command action.
        action: String,
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// The kernel failed for a reason of its own.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The kernel panicked; the panic was caught at the execution boundary.
    #[error("kernel panicked: {error}")]
    Panicked {
        /// The captured panic message.
        error: String,
    },
}

impl KernelError {
    /// Convenience constructor for [`KernelError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        KernelError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use kernvisor::KernelError;
    ///
    /// let err = KernelError::fail("boom");
    /// assert_eq!(err.as_label(), "kernel_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            KernelError::CircuitOpen { .. } => "circuit_open",
            KernelError::Command { .. } => "command_failed",
            KernelError::CommandTimeout { .. } => "command_timeout",
            KernelError::Fail { .. } => "kernel_failed",
            KernelError::Panicked { .. } => "kernel_panicked",
        }
    }

    /// True for the expected circuit-open rejection, which the orchestrator
    /// reports as a skip rather than a failure.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, KernelError::CircuitOpen { .. })
    }
}

/// Extracts a printable message from a caught panic payload.
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
