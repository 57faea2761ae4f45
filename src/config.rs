//! Runtime configuration for the orchestrator and its collaborators.
//!
//! Defaults mirror the production deployment: a 5-worker completion pool with
//! a 25-slot queue, and a mock provider that succeeds 90% of the time after
//! 0.5-3s of simulated latency.

use std::time::Duration;

/// What `initiate` does when every completion slot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum QueuePolicy {
    /// Fail the payment and answer `ServiceUnavailable`.
    #[default]
    Reject,
    /// Hold the caller until a slot frees up.
    Wait,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Number of workers awaiting gateway handles.
    pub completion_workers: usize,
    /// Completions that may wait for a free worker before `initiate` rejects.
    pub completion_queue_capacity: usize,
    /// Upper bound on how long `shutdown` waits for outstanding completions.
    pub drain_timeout: Duration,
    pub queue_policy: QueuePolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            completion_workers: 5,
            completion_queue_capacity: 25,
            drain_timeout: Duration::from_secs(30),
            queue_policy: QueuePolicy::Reject,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockGatewayConfig {
    /// Probability in `[0, 1]` that a submission ends `Succeeded`.
    pub success_rate: f64,
    pub min_latency: Duration,
    pub max_latency: Duration,
}

impl Default for MockGatewayConfig {
    fn default() -> Self {
        Self {
            success_rate: 0.9,
            min_latency: Duration::from_millis(500),
            max_latency: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
