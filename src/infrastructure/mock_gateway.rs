use crate::config::MockGatewayConfig;
use crate::domain::payment::Payment;
use crate::domain::ports::{DisbursementGateway, GatewayHandle, GatewayOutcome};
use crate::error::GatewayError;
use rand::Rng;
use rand::seq::SliceRandom;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const FAILURE_REASONS: [&str; 6] = [
    "Insufficient funds",
    "Recipient account invalid",
    "Transaction limit exceeded",
    "Temporary network error",
    "System unavailable",
    "Duplicate transaction",
];

/// Simulated mobile-money provider.
///
/// Each submission is answered from a spawned task after a random delay, with
/// a success probability of `success_rate`.
#[derive(Debug, Clone)]
pub struct MockDisbursementGateway {
    config: MockGatewayConfig,
}

impl MockDisbursementGateway {
    /// Out-of-range success rates are clamped to `[0, 1]`; non-finite ones
    /// become `0.0`.
    pub fn new(mut config: MockGatewayConfig) -> Self {
        if !config.success_rate.is_finite() {
            warn!(
                success_rate = config.success_rate,
                "Non-finite success rate; every submission will fail"
            );
            config.success_rate = 0.0;
        }
        config.success_rate = config.success_rate.clamp(0.0, 1.0);
        Self { config }
    }

    fn draw(&self) -> (Duration, GatewayOutcome) {
        let mut rng = rand::thread_rng();

        let min = self.config.min_latency;
        let max = self.config.max_latency.max(min);
        let delay = if max > min {
            rng.gen_range(min..max)
        } else {
            min
        };

        let success = rng.gen_bool(self.config.success_rate);
        let outcome = if success {
            let reference: String = Uuid::new_v4().simple().to_string().chars().take(12).collect();
            GatewayOutcome::Succeeded {
                provider_reference: format!("MOCK_MNO_{}", reference),
            }
        } else {
            let reason = FAILURE_REASONS
                .choose(&mut rng)
                .copied()
                .unwrap_or("System unavailable");
            GatewayOutcome::Failed {
                reason: reason.to_string(),
            }
        };

        (delay, outcome)
    }
}

impl Default for MockDisbursementGateway {
    fn default() -> Self {
        Self::new(MockGatewayConfig::default())
    }
}

impl DisbursementGateway for MockDisbursementGateway {
    fn submit(&self, payment: &Payment) -> Result<GatewayHandle, GatewayError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            GatewayError::Submission(format!("provider client has no runtime: {}", e))
        })?;

        let transaction_key = payment.transaction_key().to_string();
        info!(transaction_key = %transaction_key, "MOCK MNO: Received payment request");

        let (delay, outcome) = self.draw();
        let (tx, rx) = oneshot::channel();
        runtime.spawn(async move {
            debug!(
                transaction_key = %transaction_key,
                delay_ms = delay.as_millis() as u64,
                "MOCK MNO: Simulating processing delay"
            );
            tokio::time::sleep(delay).await;
            match &outcome {
                GatewayOutcome::Succeeded { .. } => {
                    info!(transaction_key = %transaction_key, "MOCK MNO: Simulating SUCCESS")
                }
                GatewayOutcome::Failed { reason } => {
                    warn!(transaction_key = %transaction_key, reason = %reason, "MOCK MNO: Simulating FAILURE")
                }
            }
            let _ = tx.send(outcome);
        });

        Ok(Box::pin(async move {
            rx.await.map_err(|_| {
                GatewayError::Completion("provider dropped the request without answering".to_string())
            })
        }))
    }
}
