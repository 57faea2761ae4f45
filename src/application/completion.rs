use crate::config::OrchestratorConfig;
use crate::domain::payment::{Payment, PaymentId, PaymentStatus};
use crate::domain::ports::{GatewayHandle, GatewayOutcome, NotificationSinkRef, PaymentStoreRef};
use crate::error::{GatewayError, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// A resolved gateway handle, addressed to the payment it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionEvent {
    pub payment_id: PaymentId,
    pub result: std::result::Result<GatewayOutcome, GatewayError>,
}

/// What reconciling a `CompletionEvent` did to the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The record moved to the given terminal status and a notification was sent.
    Applied(PaymentStatus),
    /// The record was no longer `Processing`; nothing was written.
    Skipped(PaymentStatus),
    /// Another completion finalized the record between the guard read and the write.
    Superseded,
    /// No record exists for the event's id.
    Missing,
}

/// Reconciles provider outcomes against persisted state.
///
/// Safe to invoke any number of times per payment: only the first event that
/// finds the record `Processing` and wins the conditional write has an effect.
#[derive(Clone)]
pub struct CompletionHandler {
    store: PaymentStoreRef,
    notifier: NotificationSinkRef,
}

impl CompletionHandler {
    pub fn new(store: PaymentStoreRef, notifier: NotificationSinkRef) -> Self {
        Self { store, notifier }
    }

    pub async fn reconcile(&self, event: CompletionEvent) -> Result<Reconciliation> {
        let CompletionEvent { payment_id, result } = event;

        let Some(mut payment) = self.store.get(payment_id).await? else {
            error!(payment_id = %payment_id, "Payment record not found during completion handling");
            return Ok(Reconciliation::Missing);
        };

        if payment.status() != PaymentStatus::Processing {
            warn!(
                payment_id = %payment_id,
                status = %payment.status(),
                "Ignoring provider completion for payment that is no longer PROCESSING"
            );
            return Ok(Reconciliation::Skipped(payment.status()));
        }

        let now = Utc::now();
        match result {
            Ok(outcome) => payment.complete(outcome, now)?,
            Err(e) => {
                error!(payment_id = %payment_id, error = %e, "Provider handle rejected");
                payment.fail(format!("Provider communication error: {}", e), now)?;
            }
        }

        if !self
            .store
            .update_if_status(&payment, PaymentStatus::Processing)
            .await?
        {
            warn!(
                payment_id = %payment_id,
                "Concurrent completion already finalized payment; dropping duplicate"
            );
            return Ok(Reconciliation::Superseded);
        }

        let status = payment.status();
        info!(payment_id = %payment_id, status = %status, "Final payment status recorded");
        self.notify(payment).await;
        Ok(Reconciliation::Applied(status))
    }

    // Runs on its own task so a panicking sink cannot unwind into reconciliation.
    async fn notify(&self, payment: Payment) {
        let notifier = self.notifier.clone();
        let payment_id = payment.id();
        let delivery = tokio::spawn(async move {
            if payment.status() == PaymentStatus::Successful {
                notifier.send_success(&payment).await;
            } else {
                notifier.send_failure(&payment).await;
            }
        });
        if let Err(e) = delivery.await {
            error!(payment_id = %payment_id, error = %e, "Notification delivery aborted");
        }
    }
}

pub(crate) struct CompletionJob {
    pub(crate) payment_id: PaymentId,
    pub(crate) handle: GatewayHandle,
}

/// Fixed-size set of workers that await gateway handles and reconcile them.
///
/// Jobs wait in a bounded queue until a worker is free. Dropping the sender
/// (see [`CompletionPool::drain`]) lets workers exit once the queue is empty.
pub(crate) struct CompletionPool {
    sender: mpsc::Sender<CompletionJob>,
    workers: JoinSet<()>,
}

impl CompletionPool {
    /// Must be called from within a Tokio runtime.
    pub(crate) fn start(config: &OrchestratorConfig, handler: CompletionHandler) -> Self {
        let capacity = config.completion_queue_capacity.max(1);
        let size = config.completion_workers.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = JoinSet::new();
        for worker in 0..size {
            workers.spawn(run_worker(worker, receiver.clone(), handler.clone()));
        }
        info!(workers = size, queue_capacity = capacity, "Completion pool started");

        Self { sender, workers }
    }

    pub(crate) fn try_reserve(
        &self,
    ) -> std::result::Result<mpsc::Permit<'_, CompletionJob>, mpsc::error::TrySendError<()>> {
        self.sender.try_reserve()
    }

    pub(crate) async fn reserve(
        &self,
    ) -> std::result::Result<mpsc::Permit<'_, CompletionJob>, mpsc::error::SendError<()>> {
        self.sender.reserve().await
    }

    /// Closes the queue and waits for queued and in-flight completions.
    ///
    /// Workers still busy after `timeout` are aborted; their payments stay
    /// `Processing`.
    pub(crate) async fn drain(self, timeout: Duration) {
        let Self {
            sender,
            mut workers,
        } = self;
        drop(sender);

        let joined = tokio::time::timeout(timeout, async {
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    error!(error = %e, "Completion worker terminated abnormally");
                }
            }
        })
        .await;

        if joined.is_err() {
            warn!(
                outstanding = workers.len(),
                "Drain timeout elapsed; aborting outstanding completion workers"
            );
            workers.shutdown().await;
        } else {
            info!("Completion pool drained");
        }
    }
}

async fn run_worker(
    worker: usize,
    receiver: Arc<Mutex<mpsc::Receiver<CompletionJob>>>,
    handler: CompletionHandler,
) {
    loop {
        let job = receiver.lock().await.recv().await;
        let Some(CompletionJob { payment_id, handle }) = job else {
            break;
        };

        debug!(worker, payment_id = %payment_id, "Awaiting provider outcome");
        let result = handle.await;
        if let Err(e) = handler.reconcile(CompletionEvent { payment_id, result }).await {
            error!(
                worker,
                payment_id = %payment_id,
                error = %e,
                "Completion reconciliation failed"
            );
        }
    }
    debug!(worker, "Completion worker stopped");
}
