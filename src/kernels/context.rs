//! # Execution context handed to kernels.
//!
//! [`KernelContext`] exposes exactly two capabilities:
//!
//! - [`recent`](KernelContext::recent): read the most recent events of one
//!   type from the shared log;
//! - [`invoke`](KernelContext::invoke): ask the command collaborator for a
//!   side effect, with the configured deadline applied.
//!
//! Kernels hold nothing else: no direct log access, no listener
//! registration, no knowledge of sibling kernels.
//!
//! ## Rules
//! - `recent` returns an owned snapshot in chronological order (oldest of
//!   the returned slice first).
//! - A deadline expiry surfaces as [`KernelError::CommandTimeout`], which is
//!   a genuine failure the circuit breaker records.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::commands::CommandsRef;
use crate::error::KernelError;
use crate::events::{Event, EventBus};

/// Capabilities available to a kernel during one run.
///
/// Cheap to clone; all handles are shared.
#[derive(Clone)]
pub struct KernelContext {
    bus: Arc<EventBus>,
    commands: CommandsRef,
    command_timeout: Option<Duration>,
}

impl KernelContext {
    /// Creates a context over the given bus and collaborator, with no
    /// command deadline.
    pub fn new(bus: Arc<EventBus>, commands: CommandsRef) -> Self {
        Self {
            bus,
            commands,
            command_timeout: None,
        }
    }

    /// Sets the deadline applied to every [`invoke`](KernelContext::invoke)
    /// (`None` disables it).
    pub fn with_command_timeout(mut self, command_timeout: Option<Duration>) -> Self {
        self.command_timeout = command_timeout;
        self
    }

    /// Fetches the most recent `limit` events named `name`, oldest first.
    pub fn recent(&self, name: &str, limit: usize) -> Vec<Event> {
        self.bus.events_by_name(name, limit)
    }

    /// Invokes `domain.action` on the command collaborator.
    ///
    /// Applies the configured deadline, maps collaborator rejections to
    /// [`KernelError::Command`], and deadline expiry to
    /// [`KernelError::CommandTimeout`].
    pub async fn invoke(
        &self,
        domain: &str,
        action: &str,
        params: Value,
    ) -> Result<Value, KernelError> {
        let call = self.commands.invoke(domain, action, params);
        let outcome = match self.command_timeout {
            Some(deadline) if deadline > Duration::ZERO => {
                match tokio::time::timeout(deadline, call).await {
                    Ok(outcome) => outcome,
                    Err(_elapsed) => {
                        return Err(KernelError::CommandTimeout {
                            domain: domain.to_string(),
                            action: action.to_string(),
                            timeout: deadline,
                        });
                    }
                }
            }
            _ => call.await,
        };

        outcome.map_err(|rejection| KernelError::Command {
            domain: domain.to_string(),
            action: action.to_string(),
            error: rejection.message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CommandError, Commands};
    use async_trait::async_trait;

    struct PendingCommands;

    #[async_trait]
    impl Commands for PendingCommands {
        async fn invoke(
            &self,
            _domain: &str,
            _action: &str,
            _params: Value,
        ) -> Result<Value, CommandError> {
            std::future::pending().await
        }
    }

    struct RejectingCommands;

    #[async_trait]
    impl Commands for RejectingCommands {
        async fn invoke(
            &self,
            _domain: &str,
            _action: &str,
            _params: Value,
        ) -> Result<Value, CommandError> {
            Err(CommandError::new("ledger unavailable"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expiry_surfaces_as_command_timeout() {
        let bus = Arc::new(EventBus::new(16));
        let ctx = KernelContext::new(bus, Arc::new(PendingCommands))
            .with_command_timeout(Some(Duration::from_secs(5)));

        let err = ctx
            .invoke("affiliates", "track_referral", Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, KernelError::CommandTimeout { .. }));
        assert_eq!(err.as_label(), "command_timeout");
    }

    #[tokio::test]
    async fn rejection_maps_to_command_error_with_route() {
        let bus = Arc::new(EventBus::new(16));
        let ctx = KernelContext::new(bus, Arc::new(RejectingCommands));

        let err = ctx
            .invoke("affiliates", "allocate_tier_commission", Value::Null)
            .await
            .unwrap_err();
        match err {
            KernelError::Command {
                domain,
                action,
                error,
            } => {
                assert_eq!(domain, "affiliates");
                assert_eq!(action, "allocate_tier_commission");
                assert_eq!(error, "ledger unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn recent_reads_through_to_the_bus() {
        let bus = Arc::new(EventBus::new(16));
        bus.publish(Event::new("reel_view").with_meta("category", "tack"));
        bus.emit("unrelated");

        let ctx = KernelContext::new(bus, Arc::new(crate::commands::NullCommands));
        let events = ctx.recent("reel_view", 10);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].meta_str("category"), Some("tack"));
    }
}
