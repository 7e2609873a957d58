//! # Function-backed kernel (`KernelFn`)
//!
//! [`KernelFn`] wraps a closure `F: Fn(KernelContext) -> Fut`, producing a
//! fresh future per run. This avoids shared mutable state; if a closure
//! needs state across runs it captures an `Arc<...>` explicitly.
//!
//! ## Example
//! ```rust
//! use kernvisor::{Kernel, KernelContext, KernelError, KernelFn, KernelRef};
//!
//! let k: KernelRef = KernelFn::arc("noop", 5, 1, |_ctx: KernelContext| async move {
//!     Ok::<(), KernelError>(())
//! });
//!
//! assert_eq!(k.name(), "noop");
//! assert_eq!(k.priority(), 5);
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::KernelError;

use super::context::KernelContext;
use super::kernel::Kernel;

/// Function-backed kernel implementation.
///
/// Wraps a closure that *creates* a new future per run.
pub struct KernelFn<F> {
    name: Cow<'static, str>,
    priority: u8,
    max_concurrency: usize,
    f: F,
}

impl<F> KernelFn<F> {
    /// Creates a new function-backed kernel.
    ///
    /// Prefer [`KernelFn::arc`] when you immediately need a
    /// [`KernelRef`](super::KernelRef).
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        priority: u8,
        max_concurrency: usize,
        f: F,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            max_concurrency,
            f,
        }
    }

    /// Creates the kernel and returns it as a shared handle.
    pub fn arc(
        name: impl Into<Cow<'static, str>>,
        priority: u8,
        max_concurrency: usize,
        f: F,
    ) -> Arc<Self> {
        Arc::new(Self::new(name, priority, max_concurrency, f))
    }
}

#[async_trait]
impl<F, Fut> Kernel for KernelFn<F>
where
    F: Fn(KernelContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), KernelError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    async fn run(&self, ctx: &KernelContext) -> Result<(), KernelError> {
        (self.f)(ctx.clone()).await
    }
}
