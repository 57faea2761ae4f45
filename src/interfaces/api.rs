//! Transport-agnostic request/response surface.
//!
//! Maps request bodies onto `PaymentOrchestrator` calls and renders results
//! and errors as status-coded JSON bodies. Binding these to a real transport
//! is left to the embedding service.

use crate::application::orchestrator::PaymentOrchestrator;
use crate::domain::payment::{Payment, PaymentId, PaymentStatus};
use crate::domain::request::PaymentRequest;
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{error, info, warn};

pub const BASE_PATH: &str = "/api/v1/payments";

static RECIPIENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9. ()-]{7,25}$").expect("recipient pattern is a valid regex")
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentBody {
    pub transaction_key: Option<String>,
    pub recipient_identifier: Option<String>,
    pub amount: Option<Decimal>,
    pub currency_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub payment_id: PaymentId,
    pub transaction_key: String,
    pub recipient_identifier: String,
    pub amount: Decimal,
    pub currency_code: String,
    pub status: PaymentStatus,
    pub provider_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            payment_id: payment.id(),
            transaction_key: payment.transaction_key().to_string(),
            recipient_identifier: payment.recipient_identifier().to_string(),
            amount: payment.amount().value(),
            currency_code: payment.currency().to_string(),
            status: payment.status(),
            provider_reference: payment.provider_reference().map(str::to_string),
            failure_reason: payment.failure_reason().map(str::to_string),
            created_at: payment.created_at(),
            updated_at: payment.updated_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ApiBody {
    Payment(PaymentResponse),
    Error(ErrorResponse),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: ApiBody,
}

impl ApiResponse {
    pub fn payment(&self) -> Option<&PaymentResponse> {
        match &self.body {
            ApiBody::Payment(payment) => Some(payment),
            ApiBody::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorResponse> {
        match &self.body {
            ApiBody::Error(error) => Some(error),
            ApiBody::Payment(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.body)
    }
}

/// Response class for each result of the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    Ok,
    BadRequest,
    NotFound,
    Conflict,
    ServiceUnavailable,
    InternalError,
}

impl Outcome {
    pub fn status_code(&self) -> u16 {
        match self {
            Outcome::Accepted => 202,
            Outcome::Ok => 200,
            Outcome::BadRequest => 400,
            Outcome::NotFound => 404,
            Outcome::Conflict => 409,
            Outcome::ServiceUnavailable => 503,
            Outcome::InternalError => 500,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Outcome::Accepted => "Accepted",
            Outcome::Ok => "OK",
            Outcome::BadRequest => "Bad Request",
            Outcome::NotFound => "Not Found",
            Outcome::Conflict => "Conflict",
            Outcome::ServiceUnavailable => "Service Unavailable",
            Outcome::InternalError => "Internal Server Error",
        }
    }
}

impl From<&PaymentError> for Outcome {
    fn from(error: &PaymentError) -> Self {
        match error {
            PaymentError::ValidationError(_) => Outcome::BadRequest,
            PaymentError::DuplicateTransaction(_) => Outcome::Conflict,
            PaymentError::NotFound(_) => Outcome::NotFound,
            PaymentError::ServiceUnavailable(_) => Outcome::ServiceUnavailable,
            _ => Outcome::InternalError,
        }
    }
}

/// Phone-style recipient: optional `+`, then 7 to 25 digits, spaces, dots,
/// dashes or parentheses.
pub fn is_valid_recipient(recipient: &str) -> bool {
    RECIPIENT_PATTERN.is_match(recipient)
}

/// Validates every field and reports all violations at once.
pub fn validate(body: &CreatePaymentBody) -> Result<PaymentRequest, Vec<String>> {
    let mut details = Vec::new();

    let key = body.transaction_key.as_deref().map(str::trim).unwrap_or("");
    if key.is_empty() {
        details.push("'transactionKey': Transaction key cannot be blank".to_string());
    } else if key.chars().count() > PaymentRequest::MAX_TRANSACTION_KEY_LEN {
        details.push(format!(
            "'transactionKey': Transaction key length must be between 1 and {}",
            PaymentRequest::MAX_TRANSACTION_KEY_LEN
        ));
    }

    let recipient = body
        .recipient_identifier
        .as_deref()
        .map(str::trim)
        .unwrap_or("");
    if recipient.is_empty() {
        details.push("'recipientIdentifier': Recipient identifier cannot be blank".to_string());
    } else if !is_valid_recipient(recipient) {
        details.push("'recipientIdentifier': Invalid phone number format".to_string());
    }

    match body.amount {
        None => details.push("'amount': Amount cannot be null".to_string()),
        Some(amount) => {
            if let Err(PaymentError::ValidationError(message)) =
                crate::domain::payment::Amount::new(amount)
            {
                details.push(format!("'amount': {}", message));
            }
        }
    }

    match body.currency_code.as_deref() {
        None => details.push("'currencyCode': Currency cannot be blank".to_string()),
        Some(code) => {
            if let Err(PaymentError::ValidationError(message)) =
                crate::domain::payment::CurrencyCode::new(code)
            {
                details.push(format!("'currencyCode': {}", message));
            }
        }
    }

    if !details.is_empty() {
        return Err(details);
    }

    PaymentRequest::new(
        key,
        recipient,
        body.amount.unwrap_or_default(),
        body.currency_code.as_deref().unwrap_or_default(),
    )
    .map_err(|e| vec![e.to_string()])
}

/// Request handlers over a `PaymentOrchestrator`.
pub struct PaymentApi {
    orchestrator: PaymentOrchestrator,
}

impl PaymentApi {
    pub fn new(orchestrator: PaymentOrchestrator) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &PaymentOrchestrator {
        &self.orchestrator
    }

    /// `POST` create from a raw JSON body.
    pub async fn create_json(&self, body: &str) -> ApiResponse {
        match serde_json::from_str::<CreatePaymentBody>(body) {
            Ok(body) => self.create(body).await,
            Err(e) => {
                warn!(error = %e, "Could not read request body");
                error_body(
                    Outcome::BadRequest,
                    "Malformed request body. Please check the JSON structure and data types.",
                    BASE_PATH,
                    Vec::new(),
                )
            }
        }
    }

    /// `POST` create. Answers `202 Accepted` with a `Location` for polling.
    pub async fn create(&self, body: CreatePaymentBody) -> ApiResponse {
        info!(transaction_key = ?body.transaction_key, "Received payment initiation request");

        let request = match validate(&body) {
            Ok(request) => request,
            Err(details) => {
                warn!(?details, "Validation failed for payment request");
                return error_body(
                    Outcome::BadRequest,
                    "Request contains invalid data. See details.",
                    BASE_PATH,
                    details,
                );
            }
        };

        match self.orchestrator.initiate(request).await {
            Ok(payment) => ApiResponse {
                status: Outcome::Accepted.status_code(),
                location: Some(format!("{}/{}", BASE_PATH, payment.id())),
                body: ApiBody::Payment(PaymentResponse::from(&payment)),
            },
            Err(e) => error_response(&e, BASE_PATH),
        }
    }

    /// `GET` by id.
    pub async fn get_by_id(&self, id: &str) -> ApiResponse {
        let path = format!("{}/{}", BASE_PATH, id);
        let id = match id.parse::<PaymentId>() {
            Ok(id) => id,
            Err(_) => {
                warn!(value = %id, "Invalid payment id");
                return error_body(
                    Outcome::BadRequest,
                    &format!("Invalid value '{}' for parameter 'id'. Expected type 'UUID'.", id),
                    &path,
                    Vec::new(),
                );
            }
        };

        match self.orchestrator.get_by_id(id).await {
            Ok(payment) => ok(&payment),
            Err(e) => error_response(&e, &path),
        }
    }

    /// `GET` by the `transactionKey` query parameter.
    pub async fn get_by_transaction_key(&self, key: &str) -> ApiResponse {
        let path = format!("{}?transactionKey={}", BASE_PATH, key);
        match self.orchestrator.get_by_transaction_key(key).await {
            Ok(payment) => ok(&payment),
            Err(e) => error_response(&e, &path),
        }
    }

    pub async fn shutdown(self) {
        self.orchestrator.shutdown().await;
    }
}

fn ok(payment: &Payment) -> ApiResponse {
    ApiResponse {
        status: Outcome::Ok.status_code(),
        location: None,
        body: ApiBody::Payment(PaymentResponse::from(payment)),
    }
}

fn error_response(error: &PaymentError, path: &str) -> ApiResponse {
    let outcome = Outcome::from(error);
    match outcome {
        Outcome::BadRequest => {
            warn!(error = %error, path, "Rejected invalid payment request");
            let details = match error {
                PaymentError::ValidationError(message) => vec![message.clone()],
                _ => Vec::new(),
            };
            error_body(outcome, "Request contains invalid data. See details.", path, details)
        }
        Outcome::InternalError => {
            error!(error = %error, path, "An unexpected error occurred processing request");
            error_body(
                outcome,
                "An unexpected error occurred. Please try again later or contact support.",
                path,
                Vec::new(),
            )
        }
        Outcome::ServiceUnavailable => {
            error!(error = %error, path, "Provider interaction failed");
            error_body(outcome, &error.to_string(), path, Vec::new())
        }
        _ => {
            warn!(error = %error, path, "Request failed");
            error_body(outcome, &error.to_string(), path, Vec::new())
        }
    }
}

fn error_body(outcome: Outcome, message: &str, path: &str, details: Vec<String>) -> ApiResponse {
    let error = if outcome == Outcome::BadRequest && !details.is_empty() {
        "Validation Failed"
    } else {
        outcome.reason()
    };
    ApiResponse {
        status: outcome.status_code(),
        location: None,
        body: ApiBody::Error(ErrorResponse {
            timestamp: Utc::now(),
            status: outcome.status_code(),
            error: error.to_string(),
            message: message.to_string(),
            path: path.to_string(),
            details,
        }),
    }
}
