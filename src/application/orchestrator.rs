use super::completion::{
    CompletionEvent, CompletionHandler, CompletionJob, CompletionPool, Reconciliation,
};
use crate::config::{OrchestratorConfig, QueuePolicy};
use crate::domain::payment::{Payment, PaymentId};
use crate::domain::ports::{DisbursementGatewayRef, NotificationSinkRef, PaymentStoreRef};
use crate::domain::request::PaymentRequest;
use crate::error::{GatewayError, PaymentError, PaymentLookup, Result};
use chrono::Utc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

/// The entry point for initiating and tracking disbursements.
///
/// `initiate` persists the request, moves it to `Processing` and hands it to
/// the gateway without waiting for the provider. Outcomes are reconciled later
/// by the completion pool owned by this orchestrator.
pub struct PaymentOrchestrator {
    store: PaymentStoreRef,
    gateway: DisbursementGatewayRef,
    completions: CompletionHandler,
    pool: CompletionPool,
    drain_timeout: Duration,
    queue_policy: QueuePolicy,
}

impl PaymentOrchestrator {
    /// Creates the orchestrator and starts its completion workers.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        store: PaymentStoreRef,
        gateway: DisbursementGatewayRef,
        notifier: NotificationSinkRef,
        config: OrchestratorConfig,
    ) -> Self {
        let completions = CompletionHandler::new(store.clone(), notifier);
        let pool = CompletionPool::start(&config, completions.clone());
        Self {
            store,
            gateway,
            completions,
            pool,
            drain_timeout: config.drain_timeout,
            queue_policy: config.queue_policy,
        }
    }

    /// Starts a disbursement, or replays the outcome of a finished one.
    ///
    /// Returns the `Processing` snapshot for a new request, or the stored
    /// snapshot unchanged when the transaction key already reached a terminal
    /// status.
    ///
    /// # Errors
    ///
    /// * `DuplicateTransaction` if the key belongs to a payment still in flight.
    /// * `ServiceUnavailable` if the gateway refused the submission; the
    ///   record is left `Failed` and no notification is sent.
    pub async fn initiate(&self, request: PaymentRequest) -> Result<Payment> {
        let key = request.transaction_key();
        info!(transaction_key = %key, "Initiating payment");

        if let Some(existing) = self.store.get_by_transaction_key(key).await? {
            if existing.status().is_terminal() {
                info!(
                    transaction_key = %key,
                    payment_id = %existing.id(),
                    status = %existing.status(),
                    "Returning stored outcome for completed transaction"
                );
                return Ok(existing);
            }
            warn!(
                transaction_key = %key,
                status = %existing.status(),
                "Duplicate transaction attempt for payment still in flight"
            );
            return Err(PaymentError::DuplicateTransaction(key.to_string()));
        }

        let mut payment = self.store.create(&request).await?;
        debug!(payment_id = %payment.id(), status = %payment.status(), "Saved initial payment record");

        payment.start_processing(Utc::now())?;
        self.store.update(&payment).await?;
        info!(payment_id = %payment.id(), "Payment status updated to PROCESSING");

        if let Err(e) = self.dispatch(&payment).await {
            error!(
                payment_id = %payment.id(),
                error = %e,
                "Failed to submit payment to provider; marking FAILED"
            );
            payment.fail(
                format!("Failed to submit disbursement to provider: {}", e),
                Utc::now(),
            )?;
            self.store.update(&payment).await?;
            return Err(PaymentError::ServiceUnavailable(format!(
                "Failed to submit payment processing task: {}",
                e
            )));
        }

        info!(
            transaction_key = %payment.transaction_key(),
            payment_id = %payment.id(),
            status = %payment.status(),
            "Payment handed to provider"
        );
        Ok(payment)
    }

    pub async fn get_by_id(&self, id: PaymentId) -> Result<Payment> {
        debug!(payment_id = %id, "Fetching payment by id");
        self.store
            .get(id)
            .await?
            .ok_or(PaymentError::NotFound(PaymentLookup::Id(id)))
    }

    pub async fn get_by_transaction_key(&self, key: &str) -> Result<Payment> {
        debug!(transaction_key = %key, "Fetching payment by transaction key");
        self.store
            .get_by_transaction_key(key)
            .await?
            .ok_or_else(|| PaymentError::NotFound(PaymentLookup::TransactionKey(key.to_string())))
    }

    /// Reconciles a provider outcome delivered outside the completion pool.
    ///
    /// Duplicate or late deliveries are absorbed: see [`Reconciliation`].
    pub async fn handle_completion(&self, event: CompletionEvent) -> Result<Reconciliation> {
        self.completions.reconcile(event).await
    }

    /// Stops accepting work and waits for outstanding completions.
    pub async fn shutdown(self) {
        info!("Shutting down payment orchestrator");
        self.pool.drain(self.drain_timeout).await;
    }

    // Reserves a completion slot first so the provider is never engaged for a
    // payment nobody will reconcile.
    async fn dispatch(&self, payment: &Payment) -> std::result::Result<(), GatewayError> {
        let permit = match self.queue_policy {
            QueuePolicy::Reject => self.pool.try_reserve().map_err(|e| match e {
                TrySendError::Full(()) => {
                    GatewayError::Submission("completion queue is full".to_string())
                }
                TrySendError::Closed(()) => {
                    GatewayError::Submission("completion pool is shut down".to_string())
                }
            })?,
            QueuePolicy::Wait => self.pool.reserve().await.map_err(|_| {
                GatewayError::Submission("completion pool is shut down".to_string())
            })?,
        };
        let handle = self.gateway.submit(payment)?;
        permit.send(CompletionJob {
            payment_id: payment.id(),
            handle,
        });
        Ok(())
    }
}
