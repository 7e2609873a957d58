//! # Command collaborator boundary.
//!
//! Kernels never perform side effects themselves; they ask an injected
//! [`Commands`] collaborator to do it. The contract is deliberately thin:
//! a `(domain, action, params)` triple in, a JSON value or a rejection out.
//! Rejection is the only failure signal the circuit breaker observes.
//!
//! In a full deployment the implementation is remote procedure calls into
//! backend services (message delivery, commission ledger, calendar store,
//! entity directory); the core is agnostic to the transport.
//!
//! ## Contract
//! - Implementations may be slow (network, batching); the orchestrator's
//!   optional command deadline bounds how long a kernel waits.
//! - `invoke` must either resolve with a value (possibly `Null`) or reject
//!   with a [`CommandError`]; it must not panic for expected conditions.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failure reported by a command collaborator.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct CommandError {
    /// Human-readable rejection reason.
    pub message: String,
}

impl CommandError {
    /// Creates a new rejection with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Effect-execution boundary consumed by kernels.
#[async_trait]
pub trait Commands: Send + Sync + 'static {
    /// Asks the collaborator to perform `domain.action` with `params`.
    async fn invoke(&self, domain: &str, action: &str, params: Value)
        -> Result<Value, CommandError>;
}

/// Shared handle to a command collaborator.
pub type CommandsRef = Arc<dyn Commands>;

/// Collaborator that accepts every command and resolves `Null`.
///
/// Useful for demos and as the reference default: lookups answered with
/// `Null` make kernels fall back to their conservative paths (e.g. the
/// affiliate tier lookup resolves to zero referrals).
pub struct NullCommands;

#[async_trait]
impl Commands for NullCommands {
    async fn invoke(
        &self,
        _domain: &str,
        _action: &str,
        _params: Value,
    ) -> Result<Value, CommandError> {
        Ok(Value::Null)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording command double shared by kernel and orchestrator tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// One recorded `invoke` call.
    #[derive(Clone, Debug)]
    pub(crate) struct Invocation {
        pub domain: String,
        pub action: String,
        pub params: Value,
    }

    type Responder = Box<dyn Fn(&str, &str, &Value) -> Result<Value, CommandError> + Send + Sync>;

    /// Records every invocation; answers via an optional responder closure,
    /// `Null` otherwise.
    pub(crate) struct RecordingCommands {
        calls: Mutex<VecDeque<Invocation>>,
        responder: Option<Responder>,
    }

    impl RecordingCommands {
        pub fn arc() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(VecDeque::new()),
                responder: None,
            })
        }

        pub fn with_responder(
            responder: impl Fn(&str, &str, &Value) -> Result<Value, CommandError>
                + Send
                + Sync
                + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(VecDeque::new()),
                responder: Some(Box::new(responder)),
            })
        }

        pub fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().iter().cloned().collect()
        }

        pub fn calls_for(&self, action: &str) -> Vec<Invocation> {
            self.calls()
                .into_iter()
                .filter(|c| c.action == action)
                .collect()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Commands for RecordingCommands {
        async fn invoke(
            &self,
            domain: &str,
            action: &str,
            params: Value,
        ) -> Result<Value, CommandError> {
            self.calls.lock().unwrap().push_back(Invocation {
                domain: domain.to_string(),
                action: action.to_string(),
                params: params.clone(),
            });
            match &self.responder {
                Some(responder) => responder(domain, action, &params),
                None => Ok(Value::Null),
            }
        }
    }
}
