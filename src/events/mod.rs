//! Event data model, bounded log, and pub/sub bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! record and react to application events consumed by kernels.
//!
//! ## Contents
//! - [`Event`] immutable event record with optional metadata
//! - [`EventLog`] bounded FIFO ring, snapshot reads
//! - [`EventBus`], [`Subscription`] synchronous pub/sub over the log
//!
//! ## Quick reference
//! - **Publishers**: application code (UI handlers, background jobs, demo
//!   seeders) via [`EventBus::publish`] / [`EventBus::emit`].
//! - **Consumers**: kernels (through
//!   [`KernelContext::recent`](crate::KernelContext::recent)) and ad-hoc
//!   listeners registered with [`EventBus::on`] / [`EventBus::on_any`].

mod bus;
mod event;
mod log;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use log::EventLog;
