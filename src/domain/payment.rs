use crate::domain::ports::GatewayOutcome;
use crate::domain::request::PaymentRequest;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Store-assigned identifier of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(Uuid);

impl PaymentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PaymentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl From<Uuid> for PaymentId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// A strictly positive disbursement amount.
///
/// Bounded to 10 integer digits and 2 fraction digits, so the smallest
/// representable amount is `0.01`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub const MAX_INTEGER_DIGITS: u32 = 10;
    pub const MAX_FRACTION_DIGITS: u32 = 2;

    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(PaymentError::ValidationError(
                "Amount must be positive".to_string(),
            ));
        }
        if value.normalize().scale() > Self::MAX_FRACTION_DIGITS {
            return Err(PaymentError::ValidationError(format!(
                "Amount allows at most {} fraction digits",
                Self::MAX_FRACTION_DIGITS
            )));
        }
        if value.trunc() >= Decimal::from(10_i64.pow(Self::MAX_INTEGER_DIGITS)) {
            return Err(PaymentError::ValidationError(format!(
                "Amount allows at most {} integer digits",
                Self::MAX_INTEGER_DIGITS
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO-style 3-letter currency code, stored upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: &str) -> Result<Self> {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PaymentError::ValidationError(
                "Currency must be a 3-letter code (e.g., KES)".to_string(),
            ));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = PaymentError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Successful,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Processing => "PROCESSING",
            PaymentStatus::Successful => "SUCCESSFUL",
            PaymentStatus::Failed => "FAILED",
        }
    }

    /// `Successful` and `Failed` admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Successful | PaymentStatus::Failed)
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Processing)
                | (PaymentStatus::Processing, PaymentStatus::Successful)
                | (PaymentStatus::Processing, PaymentStatus::Failed)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single disbursement and its position in the status state machine.
///
/// Fields are only mutated through the transition methods, which keep
/// `provider_reference` set exactly when `Successful`, `failure_reason` set
/// exactly when `Failed`, and `updated_at` monotonically non-decreasing.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    id: PaymentId,
    transaction_key: String,
    recipient_identifier: String,
    amount: Amount,
    currency: CurrencyCode,
    status: PaymentStatus,
    provider_reference: Option<String>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Payment {
    /// Builds the `Pending` record for a request. Called by stores on create.
    pub fn pending(id: PaymentId, request: &PaymentRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            transaction_key: request.transaction_key().to_string(),
            recipient_identifier: request.recipient_identifier().to_string(),
            amount: request.amount(),
            currency: request.currency().clone(),
            status: PaymentStatus::Pending,
            provider_reference: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> PaymentId {
        self.id
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

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn provider_reference(&self) -> Option<&str> {
        self.provider_reference.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// `Pending -> Processing`.
    pub fn start_processing(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(PaymentStatus::Processing, now)
    }

    /// Applies a provider outcome to a `Processing` payment.
    pub fn complete(&mut self, outcome: GatewayOutcome, now: DateTime<Utc>) -> Result<()> {
        match outcome {
            GatewayOutcome::Succeeded { provider_reference } => {
                self.transition(PaymentStatus::Successful, now)?;
                self.provider_reference = Some(provider_reference);
                self.failure_reason = None;
            }
            GatewayOutcome::Failed { reason } => self.fail(reason, now)?,
        }
        Ok(())
    }

    /// `Processing -> Failed` with the given reason.
    pub fn fail(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<()> {
        self.transition(PaymentStatus::Failed, now)?;
        self.failure_reason = Some(reason.into());
        self.provider_reference = None;
        Ok(())
    }

    fn transition(&mut self, next: PaymentStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(PaymentError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if now > self.updated_at {
            self.updated_at = now;
        }
        Ok(())
    }
}
