use crate::domain::payment::Payment;
use crate::domain::ports::NotificationSink;
use async_trait::async_trait;
use tracing::info;

/// SMS notification sink that renders the customer message and logs it.
#[derive(Debug, Default, Clone)]
pub struct LoggingSmsNotifier;

impl LoggingSmsNotifier {
    pub fn new() -> Self {
        Self
    }

    pub fn success_message(payment: &Payment) -> String {
        format!(
            "Dear Customer, you have received {} {}. Transaction Ref: {}.",
            payment.currency(),
            payment.amount(),
            payment
                .provider_reference()
                .unwrap_or(payment.transaction_key())
        )
    }

    pub fn failure_message(payment: &Payment) -> String {
        format!(
            "Dear Customer, the payment of {} {} failed due to: {}. Transaction ID: {}.",
            payment.currency(),
            payment.amount(),
            payment.failure_reason().unwrap_or("an unknown issue"),
            payment.transaction_key()
        )
    }

    fn send(&self, payment: &Payment, message: &str) {
        info!(
            payment_id = %payment.id(),
            recipient = %payment.recipient_identifier(),
            message = %message,
            "MOCK SMS: Sending notification"
        );
    }
}

#[async_trait]
impl NotificationSink for LoggingSmsNotifier {
    async fn send_success(&self, payment: &Payment) {
        self.send(payment, &Self::success_message(payment));
    }

    async fn send_failure(&self, payment: &Payment) {
        self.send(payment, &Self::failure_message(payment));
    }
}
