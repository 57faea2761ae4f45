use crate::domain::payment::{Amount, CurrencyCode};
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;

/// A disbursement request whose fields have passed core validation.
///
/// Construction is the only place range checks happen; once built, the
/// orchestrator can persist it without re-checking.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    transaction_key: String,
    recipient_identifier: String,
    amount: Amount,
    currency: CurrencyCode,
}

impl PaymentRequest {
    pub const MAX_TRANSACTION_KEY_LEN: usize = 50;

    pub fn new(
        transaction_key: impl Into<String>,
        recipient_identifier: impl Into<String>,
        amount: Decimal,
        currency: &str,
    ) -> Result<Self> {
        let transaction_key = transaction_key.into().trim().to_string();
        if transaction_key.is_empty() {
            return Err(PaymentError::ValidationError(
                "Transaction key cannot be blank".to_string(),
            ));
        }
        if transaction_key.chars().count() > Self::MAX_TRANSACTION_KEY_LEN {
            return Err(PaymentError::ValidationError(format!(
                "Transaction key length must be between 1 and {}",
                Self::MAX_TRANSACTION_KEY_LEN
            )));
        }

        let recipient_identifier = recipient_identifier.into().trim().to_string();
        if recipient_identifier.is_empty() {
            return Err(PaymentError::ValidationError(
                "Recipient identifier cannot be blank".to_string(),
            ));
        }

        Ok(Self {
            transaction_key,
            recipient_identifier,
            amount: Amount::new(amount)?,
            currency: CurrencyCode::new(currency)?,
        })
    }

    pub fn transaction_key(&self) -> &str {
        &self.transaction_key
    }

    pub fn recipient_identifier(&self) -> &str {
        &self.recipient_identifier
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }
}
