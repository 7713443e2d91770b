use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use shared_models::dates;

/// `?month=&year=` for the monthly reports. Kept as raw strings so a
/// malformed value gets the same 400 as a missing one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeriodQuery {
    pub month: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DayQuery {
    pub date: Option<String>,
}

/// A calendar month as the half-open range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub month: u32,
    pub year: i32,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl MonthWindow {
    pub fn new(month: u32, year: i32) -> Option<Self> {
        if year <= 0 {
            return None;
        }
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self {
            month,
            year,
            start: first.and_hms_opt(0, 0, 0)?,
            end: next.and_hms_opt(0, 0, 0)?,
        })
    }

    pub fn from_query(query: &PeriodQuery) -> Option<Self> {
        let month = query.month.as_deref()?.trim().parse::<u32>().ok()?;
        let year = query.year.as_deref()?.trim().parse::<i32>().ok()?;
        Self::new(month, year)
    }

    /// "M/YYYY", no zero padding.
    pub fn label(&self) -> String {
        format!("{}/{}", self.month, self.year)
    }
}

// ==============================================================================
// MONTHLY STATEMENT
// ==============================================================================

/// One invoice as produced by the statement aggregation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementRow {
    pub invoice_id: i64,
    #[serde(default)]
    pub invoice_date: Value,
    #[serde(default)]
    pub patient_id: Option<i64>,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub patient_portion: Option<f64>,
    #[serde(default)]
    pub total_paid: Option<f64>,
    #[serde(default)]
    pub balance_due: Option<f64>,
    #[serde(default)]
    pub lines: Option<Vec<Value>>,
    #[serde(default)]
    pub payments: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementInvoice {
    pub invoice_id: i64,
    pub invoice_date: Value,
    pub total_amount: Option<f64>,
    pub patient_portion: Option<f64>,
    pub total_paid: f64,
    pub balance_due: f64,
    pub lines: Vec<Value>,
    pub payments: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientStatement {
    pub patient_id: Option<i64>,
    pub patient_name: Option<String>,
    pub invoices: Vec<StatementInvoice>,
    pub total_invoiced: f64,
    pub payments_received: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementTotals {
    pub total_invoiced: f64,
    pub payments_received: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatementBucket {
    pub patients: Vec<PatientStatement>,
    pub totals: StatementTotals,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatementSummary {
    pub paid: StatementBucket,
    pub unpaid: StatementBucket,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyStatement {
    pub month: String,
    pub summary: StatementSummary,
}

// ==============================================================================
// OTHER REPORTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutstandingBalance {
    #[serde(default)]
    pub patient_name: Option<String>,
    pub patient_id: i64,
    pub invoice_id: i64,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub patient_portion: Option<f64>,
    #[serde(default)]
    pub total_paid: f64,
    pub balance_due: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityMetrics {
    pub total_patient_visits: u64,
    pub average_visit_duration_mins: f64,
    pub total_deliveries: u64,
    pub total_lab_tests: u64,
    pub total_prescriptions: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyActivity {
    pub report_month: String,
    pub metrics: ActivityMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryLogEntry {
    #[serde(default, deserialize_with = "dates::option_datetime")]
    pub time: Option<NaiveDateTime>,
    #[serde(default)]
    pub patient: Option<String>,
    #[serde(default)]
    pub performed_by: Option<String>,
    #[serde(default)]
    pub visit_type: Option<String>,
}
