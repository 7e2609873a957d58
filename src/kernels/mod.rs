//! Kernel contract, execution context, and the reference kernels.
//!
//! A kernel is a named, prioritized, concurrency-capped unit of reactive
//! background work. Kernels read recent events through [`KernelContext`]
//! and request side effects through the command collaborator; they own no
//! state of their own beyond configuration.
//!
//! ## Contents
//! - [`Kernel`], [`KernelRef`] the contract and shared handle
//! - [`KernelFn`] function-backed kernel for tests and composition
//! - [`KernelContext`] the two capabilities a kernel gets
//! - Reference kernels: [`AdPredictor`], [`AffiliateRouter`], [`CartNudge`],
//!   [`ConflictDetector`], [`ClaimHunter`]

mod ad_predictor;
mod affiliate;
mod cart_nudge;
mod claims;
mod conflicts;
mod context;
mod kernel;
mod kernel_fn;

pub use ad_predictor::AdPredictor;
pub use affiliate::AffiliateRouter;
pub use cart_nudge::CartNudge;
pub use claims::ClaimHunter;
pub use conflicts::ConflictDetector;
pub use context::KernelContext;
pub use kernel::{Kernel, KernelRef};
pub use kernel_fn::KernelFn;
