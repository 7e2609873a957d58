//! # Global runtime configuration.
//!
//! [`Config`] defines the orchestrator's behavior: event-log capacity,
//! circuit-breaker thresholds, the optional command deadline, the emit
//! trace toggle, and the interval of the periodic drive loop.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use kernvisor::Config;
//!
//! let mut cfg = Config::default();
//! cfg.failure_threshold = 3;
//! cfg.command_timeout = Some(Duration::from_secs(10));
//!
//! assert_eq!(cfg.failure_threshold, 3);
//! ```

use std::time::Duration;

/// Global configuration for the event bus and orchestrator.
///
/// Controls log capacity, breaker trip/recovery behavior, command deadlines,
/// diagnostic tracing, and the periodic tick interval.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of events retained in the bounded log.
    pub log_capacity: usize,
    /// Consecutive failures before a kernel's circuit breaker opens.
    pub failure_threshold: u32,
    /// How long an open breaker waits before letting a probe call through.
    pub reset_timeout: Duration,
    /// Optional deadline applied to every command invocation
    /// (`None` = no deadline; a hung collaborator call then occupies the
    /// kernel's concurrency slot until it settles).
    pub command_timeout: Option<Duration>,
    /// Emit a `tracing` debug record for every published event.
    pub trace_events: bool,
    /// Interval between ticks when driving via [`Orchestrator::run_loop`](crate::Orchestrator::run_loop).
    pub tick_interval: Duration,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `log_capacity = 1000`
    /// - `failure_threshold = 5`
    /// - `reset_timeout = 60s`
    /// - `command_timeout = None` (no deadline)
    /// - `trace_events = false`
    /// - `tick_interval = 30s`
    fn default() -> Self {
        Self {
            log_capacity: 1000,
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
            command_timeout: None,
            trace_events: false,
            tick_interval: Duration::from_secs(30),
        }
    }
}
