use crate::domain::payment::{Payment, PaymentId, PaymentStatus};
use crate::domain::ports::PaymentStore;
use crate::domain::request::PaymentRequest;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for payment records, keyed by payment id.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family mapping transaction keys to payment ids.
pub const CF_TRANSACTION_KEYS: &str = "transaction_keys";

/// A persistent store implementation using RocksDB.
///
/// Records are stored as JSON in `payments`; the `transaction_keys` family is
/// the uniqueness index. Writes are serialized through a single lock so that
/// `create` and `update_if_status` are atomic read-check-write operations.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_payments = ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default());
        let cf_keys = ColumnFamilyDescriptor::new(CF_TRANSACTION_KEYS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_payments, cf_keys])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            PaymentError::InternalError(Box::new(std::io::Error::other(format!(
                "{} column family not found",
                name
            ))))
        })
    }

    fn read_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        let cf = self.cf(CF_PAYMENTS)?;
        match self.db.get_cf(cf, id.as_uuid().as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write_payment(&self, payment: &Payment) -> Result<()> {
        let cf = self.cf(CF_PAYMENTS)?;
        self.db
            .put_cf(cf, payment.id().as_uuid().as_bytes(), encode(payment)?)?;
        Ok(())
    }
}

fn encode(payment: &Payment) -> Result<Vec<u8>> {
    serde_json::to_vec(payment).map_err(|e| {
        PaymentError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Serialization error: {}", e),
        )))
    })
}

fn decode(bytes: &[u8]) -> Result<Payment> {
    serde_json::from_slice(bytes).map_err(|e| {
        PaymentError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Deserialization error: {}", e),
        )))
    })
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn create(&self, request: &PaymentRequest) -> Result<Payment> {
        let _guard = self.write_lock.lock().await;
        let cf_keys = self.cf(CF_TRANSACTION_KEYS)?;
        let key = request.transaction_key().as_bytes();

        if self.db.get_pinned_cf(cf_keys, key)?.is_some() {
            return Err(PaymentError::DuplicateTransaction(
                request.transaction_key().to_string(),
            ));
        }

        let payment = Payment::pending(PaymentId::new(), request, Utc::now());
        let id = payment.id();
        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_PAYMENTS)?, id.as_uuid().as_bytes(), encode(&payment)?);
        batch.put_cf(cf_keys, key, id.as_uuid().as_bytes());
        self.db.write(batch)?;

        Ok(payment)
    }

    async fn update(&self, payment: &Payment) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.read_payment(payment.id())?.is_none() {
            return Err(PaymentError::InternalError(
                format!("cannot update unknown payment {}", payment.id()).into(),
            ));
        }
        self.write_payment(payment)
    }

    async fn update_if_status(&self, payment: &Payment, expected: PaymentStatus) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        match self.read_payment(payment.id())? {
            Some(stored) if stored.status() == expected => {
                self.write_payment(payment)?;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(PaymentError::InternalError(
                format!("cannot update unknown payment {}", payment.id()).into(),
            )),
        }
    }

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        self.read_payment(id)
    }

    async fn get_by_transaction_key(&self, key: &str) -> Result<Option<Payment>> {
        let cf_keys = self.cf(CF_TRANSACTION_KEYS)?;
        let Some(id_bytes) = self.db.get_cf(cf_keys, key.as_bytes())? else {
            return Ok(None);
        };
        let id = uuid::Uuid::from_slice(&id_bytes)
            .map_err(|e| PaymentError::InternalError(Box::new(e)))?;
        self.read_payment(id.into())
    }
}
