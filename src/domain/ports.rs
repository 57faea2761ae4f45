use super::payment::{Payment, PaymentId, PaymentStatus};
use super::request::PaymentRequest;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Persists a new `Pending` payment, assigning its id and timestamps.
    ///
    /// Fails with `DuplicateTransaction` if the transaction key is taken.
    async fn create(&self, request: &PaymentRequest) -> Result<Payment>;
    /// Overwrites the stored record with the same id.
    async fn update(&self, payment: &Payment) -> Result<()>;
    /// Overwrites the stored record only while its status is still `expected`.
    ///
    /// Returns `false` without writing when the status has moved on.
    async fn update_if_status(&self, payment: &Payment, expected: PaymentStatus) -> Result<bool>;
    async fn get(&self, id: PaymentId) -> Result<Option<Payment>>;
    async fn get_by_transaction_key(&self, key: &str) -> Result<Option<Payment>>;
}

pub type PaymentStoreRef = Arc<dyn PaymentStore>;

/// What the provider eventually reports for a submitted payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    Succeeded { provider_reference: String },
    Failed { reason: String },
}

/// Resolves or rejects exactly once with the provider's answer.
pub type GatewayHandle = BoxFuture<'static, std::result::Result<GatewayOutcome, GatewayError>>;

pub trait DisbursementGateway: Send + Sync {
    /// Hands a payment to the provider without waiting for the outcome.
    ///
    /// The snapshot is borrowed read-only; an `Err` here means the provider
    /// was never engaged.
    fn submit(&self, payment: &Payment) -> std::result::Result<GatewayHandle, GatewayError>;
}

pub type DisbursementGatewayRef = Arc<dyn DisbursementGateway>;

/// Fire-and-forget delivery of terminal-outcome messages.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_success(&self, payment: &Payment);
    async fn send_failure(&self, payment: &Payment);
}

pub type NotificationSinkRef = Arc<dyn NotificationSink>;
