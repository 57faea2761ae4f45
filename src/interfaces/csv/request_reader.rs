use crate::error::{PaymentError, Result};
use crate::interfaces::api::CreatePaymentBody;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One row of a batch input file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RequestRecord {
    pub transaction_key: String,
    pub recipient: String,
    // Read as text so the scale survives ("100.00" stays two places).
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub currency: String,
}

impl From<RequestRecord> for CreatePaymentBody {
    fn from(record: RequestRecord) -> Self {
        Self {
            transaction_key: Some(record.transaction_key),
            recipient_identifier: Some(record.recipient),
            amount: Some(record.amount),
            currency_code: Some(record.currency),
        }
    }
}

/// Reads disbursement requests from a CSV source.
///
/// Columns are `transaction_key, recipient, amount, currency`. Whitespace is
/// trimmed and short rows surface as per-row errors instead of aborting.
pub struct RequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RequestReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes rows. Field validation is left to the API layer.
    pub fn requests(self) -> impl Iterator<Item = Result<RequestRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}
