//! Monthly statements.
//!
//! Every invoice issued inside the month is joined with its patient, its
//! lines and the payments received up to the first instant of the next
//! month. Invoices are then grouped per patient and each patient lands in
//! the `paid` or `unpaid` bucket depending on the balance left at month end.

use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use shared_config::AppConfig;
use shared_database::{ejson, repository::decode_all, StoreClient};

use crate::models::{
    MonthWindow, MonthlyStatement, PatientStatement, StatementInvoice,
    StatementRow, StatementSummary, StatementTotals,
};

const INVOICE: &str = "Invoice";
const PATIENT: &str = "Patient";
const PAYMENT: &str = "Payment";
const INVOICE_LINE: &str = "InvoiceLine";

/// Aggregation over `Invoice` producing one [`StatementRow`] per invoice in
/// the window, ordered by invoice date then id.
pub fn statement_pipeline(window: &MonthWindow) -> Vec<Value> {
    let cutoff = ejson::date(window.end);
    vec![
        json!({ "$addFields": { "invoice_date_dt": ejson::to_date("invoice_date") } }),
        json!({
            "$match": {
                "invoice_date_dt": { "$gte": ejson::date(window.start), "$lt": cutoff.clone() }
            }
        }),
        json!({
            "$lookup": {
                "from": PATIENT,
                "localField": "patient_id",
                "foreignField": "patient_id",
                "as": "patient"
            }
        }),
        json!({ "$unwind": "$patient" }),
        json!({
            "$lookup": {
                "from": PAYMENT,
                "let": { "inv": "$invoice_id" },
                "pipeline": [
                    {
                        "$match": {
                            "$expr": {
                                "$and": [
                                    { "$eq": ["$invoice_id", "$$inv"] },
                                    { "$lte": [ejson::to_date("payment_date"), cutoff] },
                                    { "$ne": [ejson::to_date("payment_date"), null] }
                                ]
                            }
                        }
                    }
                ],
                "as": "payments"
            }
        }),
        json!({
            "$lookup": {
                "from": INVOICE_LINE,
                "localField": "invoice_id",
                "foreignField": "invoice_id",
                "as": "lines"
            }
        }),
        json!({
            "$addFields": {
                "total_paid": { "$sum": "$payments.amount" },
                "balance_due": {
                    "$subtract": ["$patient_portion", { "$sum": "$payments.amount" }]
                },
                "patient_name": {
                    "$concat": [
                        { "$ifNull": ["$patient.first_name", ""] },
                        " ",
                        { "$ifNull": ["$patient.last_name", ""] }
                    ]
                }
            }
        }),
        json!({ "$sort": { "invoice_date_dt": 1, "invoice_id": 1 } }),
        json!({
            "$project": {
                "_id": 0,
                "invoice_id": 1,
                "invoice_date": 1,
                "patient_id": 1,
                "patient_name": 1,
                "total_amount": 1,
                "patient_portion": 1,
                "total_paid": 1,
                "balance_due": 1,
                "lines": 1,
                "payments": 1
            }
        }),
    ]
}

impl StatementTotals {
    fn add(&mut self, patient: &PatientStatement) {
        self.total_invoiced += patient.total_invoiced;
        self.payments_received += patient.payments_received;
        self.balance += patient.balance;
    }

    fn rounded(self) -> Self {
        Self {
            total_invoiced: ejson::round2(self.total_invoiced),
            payments_received: ejson::round2(self.payments_received),
            balance: ejson::round2(self.balance),
        }
    }
}

/// Group rows per patient in first-seen order and split them into the
/// paid and unpaid buckets. A patient is paid when the rounded balance is
/// not positive.
pub fn build_monthly_statement(label: String, rows: Vec<StatementRow>) -> MonthlyStatement {
    let mut patients: Vec<PatientStatement> = Vec::new();

    for row in rows {
        let position = match patients.iter().position(|p| p.patient_id == row.patient_id) {
            Some(position) => position,
            None => {
                patients.push(PatientStatement {
                    patient_id: row.patient_id,
                    patient_name: row.patient_name.clone(),
                    invoices: Vec::new(),
                    total_invoiced: 0.0,
                    payments_received: 0.0,
                    balance: 0.0,
                });
                patients.len() - 1
            }
        };
        let patient = &mut patients[position];

        let total_paid = row.total_paid.unwrap_or(0.0);
        let balance_due = row.balance_due.unwrap_or(0.0);
        patient.total_invoiced += row.patient_portion.unwrap_or(0.0);
        patient.payments_received += total_paid;
        patient.balance += balance_due;
        patient.invoices.push(StatementInvoice {
            invoice_id: row.invoice_id,
            invoice_date: row.invoice_date,
            total_amount: row.total_amount,
            patient_portion: row.patient_portion,
            total_paid,
            balance_due,
            lines: row.lines.unwrap_or_default(),
            payments: row.payments.unwrap_or_default(),
        });
    }

    let mut summary = StatementSummary::default();
    for mut patient in patients {
        let settled = ejson::round2(patient.balance) <= 0.0;
        let bucket = if settled {
            &mut summary.paid
        } else {
            &mut summary.unpaid
        };
        bucket.totals.add(&patient);

        patient.total_invoiced = ejson::round2(patient.total_invoiced);
        patient.payments_received = ejson::round2(patient.payments_received);
        patient.balance = ejson::round2(patient.balance);
        bucket.patients.push(patient);
    }
    for bucket in [&mut summary.paid, &mut summary.unpaid] {
        bucket.totals = bucket.totals.rounded();
    }

    MonthlyStatement {
        month: label,
        summary,
    }
}

pub struct StatementService {
    client: StoreClient,
}

impl StatementService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: StoreClient::new(config),
        }
    }

    #[instrument(skip(self), fields(month = window.month, year = window.year))]
    pub async fn monthly(&self, window: &MonthWindow) -> anyhow::Result<MonthlyStatement> {
        let rows = self
            .client
            .aggregate(INVOICE, statement_pipeline(window))
            .await?;
        debug!("Statement aggregation returned {} invoices", rows.len());

        let statement = build_monthly_statement(window.label(), decode_all(rows)?);
        info!(
            "Monthly statement {}: {} paid, {} unpaid patients",
            statement.month,
            statement.summary.paid.patients.len(),
            statement.summary.unpaid.patients.len()
        );
        Ok(statement)
    }
}
