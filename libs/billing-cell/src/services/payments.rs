use serde_json::json;
use tracing::{info, warn};

use shared_config::AppConfig;
use shared_database::{ejson::round2, Repository, StoreClient};

use crate::models::{BillingError, CreatePaymentRequest, Invoice, InvoiceStatus, Payment};

/// Status an invoice should carry given the payments made against it.
/// Voided invoices keep their status.
pub fn settle(invoice: &Invoice, payments: &[Payment]) -> InvoiceStatus {
    if invoice.status == InvoiceStatus::Void {
        return InvoiceStatus::Void;
    }
    let paid: f64 = payments.iter().map(|p| p.amount).sum();
    if round2(invoice.patient_portion - paid) <= 0.0 {
        InvoiceStatus::Paid
    } else if payments.is_empty() {
        InvoiceStatus::Pending
    } else {
        InvoiceStatus::Partial
    }
}

pub struct PaymentService {
    payments: Repository<Payment>,
    invoices: Repository<Invoice>,
}

impl PaymentService {
    pub fn new(config: &AppConfig) -> Self {
        let client = StoreClient::new(config);
        Self {
            payments: Repository::with_client(client.clone()),
            invoices: Repository::with_client(client),
        }
    }

    pub async fn record(&self, request: CreatePaymentRequest) -> Result<Payment, BillingError> {
        let invoice = self
            .invoices
            .get(request.invoice_id)
            .await?
            .ok_or(BillingError::InvoiceNotFound)?;
        if invoice.patient_id != request.patient_id {
            return Err(BillingError::PatientMismatch {
                payment: request.patient_id,
                invoice: invoice.patient_id,
            });
        }

        let payment = self.payments.create(request).await?;
        info!(
            "Recorded payment {} of {:.2} against invoice {}",
            payment.payment_id, payment.amount, payment.invoice_id
        );
        self.refresh_status(&invoice).await?;
        Ok(payment)
    }

    pub async fn remove(&self, payment_id: i64) -> Result<(), BillingError> {
        let payment = self
            .payments
            .get(payment_id)
            .await?
            .ok_or(BillingError::PaymentNotFound)?;
        if !self.payments.delete(payment_id).await? {
            return Err(BillingError::PaymentNotFound);
        }

        match self.invoices.get(payment.invoice_id).await? {
            Some(invoice) => self.refresh_status(&invoice).await?,
            None => warn!(
                "Payment {} referenced missing invoice {}",
                payment_id, payment.invoice_id
            ),
        }
        Ok(())
    }

    pub async fn for_patient(&self, patient_id: i64) -> Result<Vec<Payment>, BillingError> {
        Ok(self
            .payments
            .find_sorted(json!({ "patient_id": patient_id }), json!({ "payment_date": -1 }), None)
            .await?)
    }

    pub async fn for_invoice(&self, invoice_id: i64) -> Result<Vec<Payment>, BillingError> {
        Ok(self
            .payments
            .find_sorted(json!({ "invoice_id": invoice_id }), json!({ "payment_date": 1 }), None)
            .await?)
    }

    async fn refresh_status(&self, invoice: &Invoice) -> Result<(), BillingError> {
        let payments = self.for_invoice(invoice.invoice_id).await?;
        let status = settle(invoice, &payments);
        if status != invoice.status {
            let mut fields = serde_json::Map::new();
            fields.insert("status".into(), json!(status.as_str()));
            self.invoices.update_fields(invoice.invoice_id, fields).await?;
            info!("Invoice {} is now {}", invoice.invoice_id, status.as_str());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    use super::*;

    fn invoice(patient_portion: f64, status: InvoiceStatus) -> Invoice {
        Invoice {
            invoice_id: 1,
            patient_id: 4,
            visit_id: None,
            insurer_id: None,
            invoice_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            status,
            total_amount: patient_portion,
            insurer_portion: 0.0,
            patient_portion,
        }
    }

    fn payment(amount: f64) -> Payment {
        Payment {
            payment_id: 1,
            invoice_id: 1,
            patient_id: 4,
            amount,
            payment_date: NaiveDate::from_ymd_opt(2024, 5, 3)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            method: Some("card".to_string()),
        }
    }

    #[test]
    fn unpaid_invoice_is_pending() {
        assert_eq!(settle(&invoice(100.0, InvoiceStatus::Pending), &[]), InvoiceStatus::Pending);
    }

    #[test]
    fn partial_payment_is_partial() {
        assert_matches!(
            settle(&invoice(100.0, InvoiceStatus::Pending), &[payment(40.0)]),
            InvoiceStatus::Partial
        );
    }

    #[test]
    fn rounding_noise_still_counts_as_paid() {
        let payments = [payment(33.33), payment(33.33), payment(33.34)];
        assert_eq!(settle(&invoice(100.0, InvoiceStatus::Partial), &payments), InvoiceStatus::Paid);
    }

    #[test]
    fn void_is_left_alone() {
        assert_matches!(
            settle(&invoice(100.0, InvoiceStatus::Void), &[payment(100.0)]),
            InvoiceStatus::Void
        );
    }
}
