//! # Kernel registry.
//!
//! The registry is a fixed, validated, priority-ordered list of kernels,
//! built once at startup. There is no dynamic registration: the set of
//! kernels a deployment runs is known when the orchestrator is composed.
//!
//! ## Rules
//! - Names are unique; duplicates are a construction error.
//! - Priorities stay within `1..=10` and concurrency ceilings are nonzero.
//! - The list is sorted once, stable, descending by priority; ties keep
//!   declaration order.

use std::collections::HashSet;

use crate::error::OrchestratorError;
use crate::kernels::KernelRef;

/// Immutable, priority-ordered list of kernels.
pub struct KernelRegistry {
    kernels: Vec<KernelRef>,
}

impl std::fmt::Debug for KernelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelRegistry")
            .field(
                "kernels",
                &self.kernels.iter().map(|k| k.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl KernelRegistry {
    /// Validates and orders the given kernels.
    pub fn new(mut kernels: Vec<KernelRef>) -> Result<Self, OrchestratorError> {
        let mut seen: HashSet<String> = HashSet::new();
        for kernel in &kernels {
            let name = kernel.name().to_string();
            if !seen.insert(name.clone()) {
                return Err(OrchestratorError::DuplicateKernel { name });
            }
            let priority = kernel.priority();
            if !(1..=10).contains(&priority) {
                return Err(OrchestratorError::PriorityOutOfRange { name, priority });
            }
            if kernel.max_concurrency() == 0 {
                return Err(OrchestratorError::ZeroConcurrency { name });
            }
        }
        // Stable: equal priorities keep declaration order.
        kernels.sort_by(|a, b| b.priority().cmp(&a.priority()));
        Ok(Self { kernels })
    }

    /// Kernels in execution (priority) order.
    pub fn iter(&self) -> impl Iterator<Item = &KernelRef> {
        self.kernels.iter()
    }

    /// Number of registered kernels.
    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    /// True when no kernels are registered.
    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    pub(crate) fn into_kernels(self) -> Vec<KernelRef> {
        self.kernels
    }
}
