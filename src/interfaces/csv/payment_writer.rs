use crate::domain::payment::Payment;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct PaymentRow<'a> {
    payment_id: String,
    transaction_key: &'a str,
    recipient: &'a str,
    amount: String,
    currency: &'a str,
    status: &'static str,
    provider_reference: Option<&'a str>,
    failure_reason: Option<&'a str>,
    created_at: String,
    updated_at: String,
}

impl<'a> From<&'a Payment> for PaymentRow<'a> {
    fn from(payment: &'a Payment) -> Self {
        Self {
            payment_id: payment.id().to_string(),
            transaction_key: payment.transaction_key(),
            recipient: payment.recipient_identifier(),
            amount: payment.amount().to_string(),
            currency: payment.currency().as_str(),
            status: payment.status().as_str(),
            provider_reference: payment.provider_reference(),
            failure_reason: payment.failure_reason(),
            created_at: payment.created_at().to_rfc3339(),
            updated_at: payment.updated_at().to_rfc3339(),
        }
    }
}

/// Writes payment snapshots as CSV, one row per payment.
pub struct PaymentWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PaymentWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_payments<'a, I>(&mut self, payments: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Payment>,
    {
        for payment in payments {
            self.writer.serialize(PaymentRow::from(payment))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
