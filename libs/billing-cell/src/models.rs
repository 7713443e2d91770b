use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use shared_database::{ejson::round2, Record};
use shared_models::dates;

// ==============================================================================
// INVOICES
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Pending,
    Partial,
    Paid,
    Void,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Partial => "partial",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Void => "void",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: i64,
    pub patient_id: i64,
    #[serde(default)]
    pub visit_id: Option<i64>,
    #[serde(default)]
    pub insurer_id: Option<i64>,
    #[serde(deserialize_with = "dates::date")]
    pub invoice_date: NaiveDate,
    #[serde(default)]
    pub status: InvoiceStatus,
    pub total_amount: f64,
    #[serde(default)]
    pub insurer_portion: f64,
    #[serde(default)]
    pub patient_portion: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvoiceRequest {
    pub patient_id: i64,
    pub visit_id: Option<i64>,
    pub insurer_id: Option<i64>,
    #[serde(default, deserialize_with = "dates::option_date")]
    pub invoice_date: Option<NaiveDate>,
    pub status: Option<InvoiceStatus>,
    pub total_amount: f64,
    pub insurer_portion: Option<f64>,
    pub patient_portion: Option<f64>,
}

impl Record for Invoice {
    const COLLECTION: &'static str = "Invoice";
    const ID_FIELD: &'static str = "invoice_id";
    const LABEL: &'static str = "Invoice";
    type Create = CreateInvoiceRequest;

    /// The patient owes whatever the insurer does not cover unless told otherwise.
    fn from_create(id: i64, request: CreateInvoiceRequest) -> Self {
        let insurer_portion = request.insurer_portion.unwrap_or(0.0);
        let patient_portion = request
            .patient_portion
            .unwrap_or_else(|| round2(request.total_amount - insurer_portion));
        Self {
            invoice_id: id,
            patient_id: request.patient_id,
            visit_id: request.visit_id,
            insurer_id: request.insurer_id,
            invoice_date: request
                .invoice_date
                .unwrap_or_else(|| Local::now().date_naive()),
            status: request.status.unwrap_or_default(),
            total_amount: request.total_amount,
            insurer_portion,
            patient_portion,
        }
    }

    fn id(&self) -> i64 {
        self.invoice_id
    }

    fn validate(request: &CreateInvoiceRequest) -> Result<(), String> {
        let insurer_portion = request.insurer_portion.unwrap_or(0.0);
        if request.total_amount < 0.0 || insurer_portion < 0.0 {
            return Err("amounts must not be negative".to_string());
        }
        if matches!(request.patient_portion, Some(portion) if portion < 0.0) {
            return Err("amounts must not be negative".to_string());
        }
        if insurer_portion > request.total_amount {
            return Err("insurer_portion must not exceed total_amount".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceListQuery {
    pub skip: Option<u64>,
    pub limit: Option<i64>,
    pub status: Option<InvoiceStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: InvoiceStatus,
}

// ==============================================================================
// INVOICE LINES
// ==============================================================================

pub const INVOICE_LINE_COLLECTION: &str = "InvoiceLine";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub invoice_id: i64,
    pub line_no: i64,
    pub description: String,
    pub qty: f64,
    pub unit_price: f64,
    #[serde(default)]
    pub line_total: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddInvoiceLineRequest {
    pub line_no: Option<i64>,
    pub description: String,
    #[serde(default = "default_qty")]
    pub qty: f64,
    pub unit_price: f64,
}

fn default_qty() -> f64 {
    1.0
}

impl AddInvoiceLineRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.description.trim().is_empty() {
            return Err("description must not be empty".to_string());
        }
        if self.qty <= 0.0 {
            return Err("qty must be greater than 0".to_string());
        }
        if self.unit_price < 0.0 {
            return Err("unit_price must not be negative".to_string());
        }
        Ok(())
    }

    pub fn into_line(self, invoice_id: i64, line_no: i64) -> InvoiceLine {
        InvoiceLine {
            invoice_id,
            line_no,
            line_total: round2(self.qty * self.unit_price),
            description: self.description,
            qty: self.qty,
            unit_price: self.unit_price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryItem {
    pub description: String,
    pub qty: f64,
    pub unit_price: f64,
    pub line_total: f64,
}

/// Invoice with its line items folded in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceSummary {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub line_count: i64,
    #[serde(default)]
    pub items: Vec<SummaryItem>,
}

// ==============================================================================
// PAYMENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: i64,
    pub invoice_id: i64,
    pub patient_id: i64,
    pub amount: f64,
    #[serde(deserialize_with = "dates::datetime")]
    pub payment_date: NaiveDateTime,
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentRequest {
    pub invoice_id: i64,
    pub patient_id: i64,
    pub amount: f64,
    #[serde(default, deserialize_with = "dates::option_datetime")]
    pub payment_date: Option<NaiveDateTime>,
    pub method: Option<String>,
}

impl Record for Payment {
    const COLLECTION: &'static str = "Payment";
    const ID_FIELD: &'static str = "payment_id";
    const LABEL: &'static str = "Payment";
    type Create = CreatePaymentRequest;

    fn from_create(id: i64, request: CreatePaymentRequest) -> Self {
        Self {
            payment_id: id,
            invoice_id: request.invoice_id,
            patient_id: request.patient_id,
            amount: request.amount,
            payment_date: request
                .payment_date
                .unwrap_or_else(|| Local::now().naive_local()),
            method: request.method,
        }
    }

    fn id(&self) -> i64 {
        self.payment_id
    }

    fn validate(request: &CreatePaymentRequest) -> Result<(), String> {
        if request.amount <= 0.0 {
            return Err("amount must be greater than 0".to_string());
        }
        Ok(())
    }
}

// ==============================================================================
// INSURERS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insurer {
    pub insurer_id: i64,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInsurerRequest {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Record for Insurer {
    const COLLECTION: &'static str = "Insurer";
    const ID_FIELD: &'static str = "insurer_id";
    const LABEL: &'static str = "Insurer";
    type Create = CreateInsurerRequest;

    fn from_create(id: i64, request: CreateInsurerRequest) -> Self {
        Self {
            insurer_id: id,
            name: request.name,
            phone: request.phone,
            email: request.email,
        }
    }

    fn id(&self) -> i64 {
        self.insurer_id
    }

    fn validate(request: &CreateInsurerRequest) -> Result<(), String> {
        if request.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        Ok(())
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Invoice not found")]
    InvoiceNotFound,

    #[error("Invoice line not found")]
    LineNotFound,

    #[error("Payment not found")]
    PaymentNotFound,

    #[error("Line {0} already exists on this invoice")]
    DuplicateLine(i64),

    #[error("Payment patient {payment} does not match invoice patient {invoice}")]
    PatientMismatch { payment: i64, invoice: i64 },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for BillingError {
    fn from(err: anyhow::Error) -> Self {
        BillingError::DatabaseError(err.to_string())
    }
}

impl From<BillingError> for shared_models::error::AppError {
    fn from(err: BillingError) -> Self {
        use shared_models::error::AppError;
        match err {
            BillingError::InvoiceNotFound
            | BillingError::LineNotFound
            | BillingError::PaymentNotFound => AppError::NotFound(err.to_string()),
            BillingError::DuplicateLine(_) => AppError::Conflict(err.to_string()),
            BillingError::PatientMismatch { .. } => AppError::BadRequest(err.to_string()),
            BillingError::DatabaseError(message) => AppError::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(total: f64, insurer: Option<f64>, patient: Option<f64>) -> CreateInvoiceRequest {
        CreateInvoiceRequest {
            patient_id: 1,
            visit_id: None,
            insurer_id: None,
            invoice_date: NaiveDate::from_ymd_opt(2024, 5, 2),
            status: None,
            total_amount: total,
            insurer_portion: insurer,
            patient_portion: patient,
        }
    }

    #[test]
    fn patient_portion_defaults_to_uncovered_amount() {
        let invoice = Invoice::from_create(1, request(250.0, Some(175.5), None));
        assert_eq!(invoice.patient_portion, 74.5);
        assert_eq!(invoice.status, InvoiceStatus::Pending);
    }

    #[test]
    fn explicit_patient_portion_wins() {
        let invoice = Invoice::from_create(1, request(250.0, Some(100.0), Some(20.0)));
        assert_eq!(invoice.patient_portion, 20.0);
    }

    #[test]
    fn insurer_cannot_cover_more_than_total() {
        assert!(Invoice::validate(&request(100.0, Some(120.0), None)).is_err());
        assert!(Invoice::validate(&request(-1.0, None, None)).is_err());
        assert!(Invoice::validate(&request(100.0, Some(100.0), None)).is_ok());
    }

    #[test]
    fn line_total_is_qty_times_price() {
        let line = AddInvoiceLineRequest {
            line_no: None,
            description: "Bandage".to_string(),
            qty: 3.0,
            unit_price: 4.15,
        }
        .into_line(9, 2);
        assert_eq!(line.line_total, 12.45);
        assert_eq!(line.line_no, 2);
    }
}
