use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::{
    repository::{decode_all, next_sequence, to_document},
    StoreClient, FindOptions, Record, Repository,
};

use crate::models::{
    AddInvoiceLineRequest, BillingError, Invoice, InvoiceLine, InvoiceListQuery, InvoiceStatus,
    InvoiceSummary, INVOICE_LINE_COLLECTION,
};

const DEFAULT_LIMIT: i64 = 100;

pub struct InvoiceService {
    client: StoreClient,
    invoices: Repository<Invoice>,
}

impl InvoiceService {
    pub fn new(config: &AppConfig) -> Self {
        let client = StoreClient::new(config);
        Self {
            invoices: Repository::with_client(client.clone()),
            client,
        }
    }

    /// A status filter returns every matching invoice; otherwise the listing is paged.
    pub async fn list(&self, query: &InvoiceListQuery) -> Result<Vec<Invoice>, BillingError> {
        let invoices = match query.status {
            Some(status) => {
                self.invoices
                    .find_by(json!({ "status": status.as_str() }))
                    .await?
            }
            None => {
                let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 1000);
                self.invoices
                    .list(json!({}), query.skip.unwrap_or(0), limit)
                    .await?
            }
        };
        Ok(invoices)
    }

    pub async fn for_patient(&self, patient_id: i64) -> Result<Vec<Invoice>, BillingError> {
        let invoices = self
            .invoices
            .find_sorted(
                json!({ "patient_id": patient_id }),
                json!({ "invoice_date": -1, "invoice_id": -1 }),
                None,
            )
            .await?;
        Ok(invoices)
    }

    pub async fn set_status(
        &self,
        invoice_id: i64,
        status: InvoiceStatus,
    ) -> Result<Invoice, BillingError> {
        let mut fields = serde_json::Map::new();
        fields.insert("status".into(), json!(status.as_str()));
        let invoice = self
            .invoices
            .update_fields(invoice_id, fields)
            .await?
            .ok_or(BillingError::InvoiceNotFound)?;
        info!("Invoice {} marked {}", invoice_id, status.as_str());
        Ok(invoice)
    }

    async fn require_invoice(&self, invoice_id: i64) -> Result<Invoice, BillingError> {
        self.invoices
            .get(invoice_id)
            .await?
            .ok_or(BillingError::InvoiceNotFound)
    }

    pub async fn add_line(
        &self,
        invoice_id: i64,
        request: AddInvoiceLineRequest,
    ) -> Result<InvoiceLine, BillingError> {
        self.require_invoice(invoice_id).await?;

        let line_no = match request.line_no {
            Some(line_no) => {
                let existing = self
                    .client
                    .find_one(
                        INVOICE_LINE_COLLECTION,
                        json!({ "invoice_id": invoice_id, "line_no": line_no }),
                    )
                    .await?;
                if existing.is_some() {
                    return Err(BillingError::DuplicateLine(line_no));
                }
                line_no
            }
            None => {
                next_sequence(
                    &self.client,
                    INVOICE_LINE_COLLECTION,
                    "line_no",
                    json!({ "invoice_id": invoice_id }),
                )
                .await?
            }
        };

        let line = request.into_line(invoice_id, line_no);
        self.client
            .insert_one(INVOICE_LINE_COLLECTION, Value::Object(to_document(&line)?))
            .await?;
        debug!("Added line {} to invoice {}", line_no, invoice_id);
        Ok(line)
    }

    pub async fn lines(&self, invoice_id: i64) -> Result<Vec<InvoiceLine>, BillingError> {
        let rows = self
            .client
            .find(
                INVOICE_LINE_COLLECTION,
                json!({ "invoice_id": invoice_id }),
                FindOptions::sorted(json!({ "line_no": 1 })),
            )
            .await?;
        Ok(decode_all(rows)?)
    }

    pub async fn delete_line(&self, invoice_id: i64, line_no: i64) -> Result<(), BillingError> {
        let deleted = self
            .client
            .delete_one(
                INVOICE_LINE_COLLECTION,
                json!({ "invoice_id": invoice_id, "line_no": line_no }),
            )
            .await?;
        if deleted == 0 {
            return Err(BillingError::LineNotFound);
        }
        Ok(())
    }

    /// Invoice plus its line items, computed in a single aggregation.
    pub async fn summary(&self, invoice_id: i64) -> Result<InvoiceSummary, BillingError> {
        let pipeline = vec![
            json!({ "$match": { "invoice_id": invoice_id } }),
            json!({
                "$lookup": {
                    "from": INVOICE_LINE_COLLECTION,
                    "localField": "invoice_id",
                    "foreignField": "invoice_id",
                    "as": "lines"
                }
            }),
            json!({
                "$addFields": {
                    "line_count": { "$size": "$lines" },
                    "items": {
                        "$map": {
                            "input": "$lines",
                            "as": "line",
                            "in": {
                                "description": "$$line.description",
                                "qty": "$$line.qty",
                                "unit_price": "$$line.unit_price",
                                "line_total": "$$line.line_total"
                            }
                        }
                    }
                }
            }),
            json!({ "$project": { "lines": 0 } }),
        ];

        let rows = self.client.aggregate(Invoice::COLLECTION, pipeline).await?;
        let summary = decode_all::<InvoiceSummary>(rows)?
            .into_iter()
            .next()
            .ok_or(BillingError::InvoiceNotFound)?;
        Ok(summary)
    }
}
