#![allow(dead_code)]

use async_trait::async_trait;
use disburse::application::orchestrator::PaymentOrchestrator;
use disburse::config::OrchestratorConfig;
use disburse::domain::payment::{Payment, PaymentId, PaymentStatus};
use disburse::domain::ports::{DisbursementGateway, GatewayHandle, GatewayOutcome, NotificationSink, PaymentStore};
use disburse::domain::request::PaymentRequest;
use disburse::error::{GatewayError, Result};
use disburse::infrastructure::in_memory::InMemoryPaymentStore;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

type Reply = std::result::Result<GatewayOutcome, GatewayError>;

/// How a `ScriptedGateway` answers every submission.
#[derive(Debug, Clone)]
pub enum Script {
    /// `submit` itself fails.
    Refuse(String),
    /// The handle resolves immediately with the outcome.
    Resolve(GatewayOutcome),
    /// The handle rejects immediately.
    Reject(String),
    /// The handle stays pending until `release` is called.
    Manual,
}

pub struct ScriptedGateway {
    script: Script,
    submissions: AtomicUsize,
    pending: Mutex<Vec<(PaymentId, oneshot::Sender<Reply>)>>,
}

impl ScriptedGateway {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            submissions: AtomicUsize::new(0),
            pending: Mutex::new(Vec::new()),
        })
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Resolves the parked handle of `id`. Returns false if none is parked.
    pub fn release(&self, id: PaymentId, reply: Reply) -> bool {
        let mut pending = self.pending.lock().unwrap();
        match pending.iter().position(|(parked, _)| *parked == id) {
            Some(index) => {
                let (_, tx) = pending.remove(index);
                tx.send(reply).is_ok()
            }
            None => false,
        }
    }
}

impl DisbursementGateway for ScriptedGateway {
    fn submit(&self, payment: &Payment) -> std::result::Result<GatewayHandle, GatewayError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Refuse(reason) => Err(GatewayError::Submission(reason.clone())),
            Script::Resolve(outcome) => {
                let outcome = outcome.clone();
                Ok(Box::pin(async move { Ok(outcome) }))
            }
            Script::Reject(reason) => {
                let reason = reason.clone();
                Ok(Box::pin(async move { Err(GatewayError::Completion(reason)) }))
            }
            Script::Manual => {
                let (tx, rx) = oneshot::channel();
                self.pending.lock().unwrap().push((payment.id(), tx));
                Ok(Box::pin(async move {
                    rx.await
                        .unwrap_or_else(|_| Err(GatewayError::Completion("dropped".to_string())))
                }))
            }
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    successes: Mutex<Vec<Payment>>,
    failures: Mutex<Vec<Payment>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn successes(&self) -> Vec<Payment> {
        self.successes.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<Payment> {
        self.failures.lock().unwrap().clone()
    }

    pub fn total(&self) -> usize {
        self.successes.lock().unwrap().len() + self.failures.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn send_success(&self, payment: &Payment) {
        self.successes.lock().unwrap().push(payment.clone());
    }

    async fn send_failure(&self, payment: &Payment) {
        self.failures.lock().unwrap().push(payment.clone());
    }
}

/// In-memory store that counts writes and remembers every status it persisted.
#[derive(Default)]
pub struct CountingStore {
    inner: InMemoryPaymentStore,
    writes: AtomicUsize,
    history: Mutex<Vec<PaymentStatus>>,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn history(&self) -> Vec<PaymentStatus> {
        self.history.lock().unwrap().clone()
    }

    fn record(&self, status: PaymentStatus) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.history.lock().unwrap().push(status);
    }
}

#[async_trait]
impl PaymentStore for CountingStore {
    async fn create(&self, request: &PaymentRequest) -> Result<Payment> {
        let payment = self.inner.create(request).await?;
        self.record(payment.status());
        Ok(payment)
    }

    async fn update(&self, payment: &Payment) -> Result<()> {
        self.inner.update(payment).await?;
        self.record(payment.status());
        Ok(())
    }

    async fn update_if_status(&self, payment: &Payment, expected: PaymentStatus) -> Result<bool> {
        let applied = self.inner.update_if_status(payment, expected).await?;
        if applied {
            self.record(payment.status());
        }
        Ok(applied)
    }

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        self.inner.get(id).await
    }

    async fn get_by_transaction_key(&self, key: &str) -> Result<Option<Payment>> {
        self.inner.get_by_transaction_key(key).await
    }
}

pub fn test_config() -> OrchestratorConfig {
    OrchestratorConfig {
        drain_timeout: Duration::from_secs(5),
        ..OrchestratorConfig::default()
    }
}

pub fn request(key: &str, amount: Decimal) -> PaymentRequest {
    PaymentRequest::new(key, "+254700000000", amount, "KES").unwrap()
}

pub async fn wait_for_terminal(orchestrator: &PaymentOrchestrator, id: PaymentId) -> Payment {
    for _ in 0..500 {
        let payment = orchestrator.get_by_id(id).await.unwrap();
        if payment.status().is_terminal() {
            return payment;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("payment {} never reached a terminal status", id);
}

pub fn generate_csv(path: &Path, rows: usize) -> std::result::Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["transaction_key", "recipient", "amount", "currency"])?;

    for i in 1..=rows {
        wtr.write_record([
            format!("TXN-{}", i).as_str(),
            "+254700000000",
            "10.00",
            "KES",
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
