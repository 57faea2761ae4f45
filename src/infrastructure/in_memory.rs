use crate::domain::payment::{Payment, PaymentId, PaymentStatus};
use crate::domain::ports::PaymentStore;
use crate::domain::request::PaymentRequest;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    payments: HashMap<PaymentId, Payment>,
    by_transaction_key: HashMap<String, PaymentId>,
}

/// A thread-safe in-memory payment store.
///
/// Uses `Arc<RwLock<..>>` so clones share the same tables. The transaction-key
/// index is kept under the same lock as the records, which makes `create`
/// and `update_if_status` atomic.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryPaymentStore {
    /// Creates a new, empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn create(&self, request: &PaymentRequest) -> Result<Payment> {
        let mut tables = self.tables.write().await;
        if tables
            .by_transaction_key
            .contains_key(request.transaction_key())
        {
            return Err(PaymentError::DuplicateTransaction(
                request.transaction_key().to_string(),
            ));
        }

        let payment = Payment::pending(PaymentId::new(), request, Utc::now());
        tables
            .by_transaction_key
            .insert(payment.transaction_key().to_string(), payment.id());
        tables.payments.insert(payment.id(), payment.clone());
        Ok(payment)
    }

    async fn update(&self, payment: &Payment) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.payments.get_mut(&payment.id()) {
            Some(stored) => {
                *stored = payment.clone();
                Ok(())
            }
            None => Err(PaymentError::InternalError(
                format!("cannot update unknown payment {}", payment.id()).into(),
            )),
        }
    }

    async fn update_if_status(&self, payment: &Payment, expected: PaymentStatus) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.payments.get_mut(&payment.id()) {
            Some(stored) if stored.status() == expected => {
                *stored = payment.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(PaymentError::InternalError(
                format!("cannot update unknown payment {}", payment.id()).into(),
            )),
        }
    }

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables.payments.get(&id).cloned())
    }

    async fn get_by_transaction_key(&self, key: &str) -> Result<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_transaction_key
            .get(key)
            .and_then(|id| tables.payments.get(id))
            .cloned())
    }
}
