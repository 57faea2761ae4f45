use crate::domain::payment::{PaymentId, PaymentStatus};
use thiserror::Error;

/// Failures raised by a `DisbursementGateway`.
///
/// `Submission` is returned synchronously by `submit` before a handle exists;
/// `Completion` is how an already-issued handle rejects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("{0}")]
    Submission(String),
    #[error("{0}")]
    Completion(String),
}

/// Identifies the lookup that produced a `NotFound`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentLookup {
    Id(PaymentId),
    TransactionKey(String),
}

impl std::fmt::Display for PaymentLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentLookup::Id(id) => write!(f, "ID: {}", id),
            PaymentLookup::TransactionKey(key) => write!(f, "Transaction Key: {}", key),
        }
    }
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error(
        "Duplicate transaction key: {0}. Payment already exists or is being processed."
    )]
    DuplicateTransaction(String),
    #[error("Payment not found with {0}")]
    NotFound(PaymentLookup),
    #[error("Disbursement provider unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, PaymentError>;
