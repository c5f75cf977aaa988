//! # Export Rows
//!
//! Flat, spreadsheet-ready renderings of invoices and stock. Every money
//! field is already computed by the ledger; nothing is recalculated here.
//!
//! ```text
//! Invoice ──► InvoiceLineExportRow  one per line (tax breakdown, cost basis)
//!        └──► BatchTakeExportRow    one per batch drawn (cost trace)
//! stock_valuation() ──► StockValuationRow
//!
//! rows ──► to_csv()  (header + RFC 4180 quoting)
//!      └─► to_json() (array of objects)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{LedgerError, LedgerResult};
use crate::valuation_engine::StockValuationRow;
use kirana_core::Invoice;

/// A row that can be written as one CSV record.
pub trait ExportRow: Serialize {
    /// Column headers, in the order `fields` returns values.
    const HEADERS: &'static [&'static str];

    fn fields(&self) -> Vec<String>;
}

/// One invoice line with its tax breakdown and FIFO cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceLineExportRow {
    pub invoice_number: i64,
    pub display_number: String,
    pub status: String,
    #[ts(as = "Option<String>")]
    pub posted_at: Option<DateTime<Utc>>,
    pub customer_id: String,
    pub jurisdiction: String,
    pub line_no: i64,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_paise: i64,
    pub subtotal_paise: i64,
    pub cgst_paise: i64,
    pub sgst_paise: i64,
    pub igst_paise: i64,
    pub cess_paise: i64,
    pub total_tax_paise: i64,
    pub line_total_paise: i64,
    pub cost_basis_paise: i64,
}

/// One batch drawn by one invoice line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BatchTakeExportRow {
    pub invoice_number: i64,
    pub display_number: String,
    pub line_no: i64,
    pub product_id: String,
    pub batch_id: String,
    pub quantity: i64,
    pub unit_cost_paise: i64,
    pub cost_paise: i64,
}

impl InvoiceLineExportRow {
    pub fn from_invoice(invoice: &Invoice) -> Vec<Self> {
        invoice
            .lines
            .iter()
            .map(|line| InvoiceLineExportRow {
                invoice_number: invoice.number,
                display_number: invoice.display_number.clone(),
                status: invoice.status.as_str().to_string(),
                posted_at: invoice.posted_at,
                customer_id: invoice.customer_id.clone(),
                jurisdiction: invoice.jurisdiction.as_str().to_string(),
                line_no: line.line_no,
                product_id: line.product_id.clone(),
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price_paise: line.unit_price_paise,
                subtotal_paise: line.subtotal_paise,
                cgst_paise: line.tax.cgst_paise,
                sgst_paise: line.tax.sgst_paise,
                igst_paise: line.tax.igst_paise,
                cess_paise: line.tax.cess_paise,
                total_tax_paise: line.tax.total_tax_paise,
                line_total_paise: line.line_total_paise,
                cost_basis_paise: line.cost_basis().paise(),
            })
            .collect()
    }
}

impl BatchTakeExportRow {
    pub fn from_invoice(invoice: &Invoice) -> Vec<Self> {
        invoice
            .lines
            .iter()
            .flat_map(|line| {
                line.takes.iter().map(move |take| BatchTakeExportRow {
                    invoice_number: invoice.number,
                    display_number: invoice.display_number.clone(),
                    line_no: line.line_no,
                    product_id: line.product_id.clone(),
                    batch_id: take.batch_id.clone(),
                    quantity: take.quantity,
                    unit_cost_paise: take.unit_cost_paise,
                    cost_paise: take.cost().paise(),
                })
            })
            .collect()
    }
}

/// Line rows of several invoices, in the order given.
pub fn invoice_line_rows(invoices: &[Invoice]) -> Vec<InvoiceLineExportRow> {
    invoices.iter().flat_map(InvoiceLineExportRow::from_invoice).collect()
}

/// Batch-take rows of several invoices, in the order given.
pub fn batch_take_rows(invoices: &[Invoice]) -> Vec<BatchTakeExportRow> {
    invoices.iter().flat_map(BatchTakeExportRow::from_invoice).collect()
}

impl ExportRow for InvoiceLineExportRow {
    const HEADERS: &'static [&'static str] = &[
        "invoice_number",
        "display_number",
        "status",
        "posted_at",
        "customer_id",
        "jurisdiction",
        "line_no",
        "product_id",
        "product_name",
        "quantity",
        "unit_price_paise",
        "subtotal_paise",
        "cgst_paise",
        "sgst_paise",
        "igst_paise",
        "cess_paise",
        "total_tax_paise",
        "line_total_paise",
        "cost_basis_paise",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.invoice_number.to_string(),
            self.display_number.clone(),
            self.status.clone(),
            self.posted_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            self.customer_id.clone(),
            self.jurisdiction.clone(),
            self.line_no.to_string(),
            self.product_id.clone(),
            self.product_name.clone(),
            self.quantity.to_string(),
            self.unit_price_paise.to_string(),
            self.subtotal_paise.to_string(),
            self.cgst_paise.to_string(),
            self.sgst_paise.to_string(),
            self.igst_paise.to_string(),
            self.cess_paise.to_string(),
            self.total_tax_paise.to_string(),
            self.line_total_paise.to_string(),
            self.cost_basis_paise.to_string(),
        ]
    }
}

impl ExportRow for BatchTakeExportRow {
    const HEADERS: &'static [&'static str] = &[
        "invoice_number",
        "display_number",
        "line_no",
        "product_id",
        "batch_id",
        "quantity",
        "unit_cost_paise",
        "cost_paise",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.invoice_number.to_string(),
            self.display_number.clone(),
            self.line_no.to_string(),
            self.product_id.clone(),
            self.batch_id.clone(),
            self.quantity.to_string(),
            self.unit_cost_paise.to_string(),
            self.cost_paise.to_string(),
        ]
    }
}

impl ExportRow for StockValuationRow {
    const HEADERS: &'static [&'static str] = &[
        "product_id",
        "product_name",
        "unit",
        "on_hand",
        "sellable",
        "expired",
        "value_paise",
        "reorder_threshold",
        "is_low",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.product_id.clone(),
            self.product_name.clone(),
            self.unit.clone(),
            self.on_hand.to_string(),
            self.sellable.to_string(),
            self.expired.to_string(),
            self.value_paise.to_string(),
            self.reorder_threshold.to_string(),
            self.is_low.to_string(),
        ]
    }
}

/// Header line plus one CRLF-terminated record per row.
pub fn to_csv<R: ExportRow>(rows: &[R]) -> String {
    let mut out = String::new();
    push_record(&mut out, R::HEADERS.iter().map(|h| h.to_string()));
    for row in rows {
        push_record(&mut out, row.fields().into_iter());
    }
    out
}

/// Pretty-printed JSON array.
pub fn to_json<R: ExportRow>(rows: &[R]) -> LedgerResult<String> {
    serde_json::to_string_pretty(rows).map_err(|e| LedgerError::Export(e.to_string()))
}

fn push_record(out: &mut String, fields: impl Iterator<Item = String>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape(&field));
    }
    out.push_str("\r\n");
}

/// Quotes a field containing a comma, quote or line break.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kirana_core::{BatchTake, InvoiceLine, InvoiceStatus, InvoiceTotals, Jurisdiction, TaxBreakdown, Money};

    fn invoice() -> Invoice {
        let line = InvoiceLine {
            line_no: 1,
            product_id: "p-1".to_string(),
            product_name: "Toor Dal, 1kg \"Premium\"".to_string(),
            quantity: 15,
            unit_price_paise: 1000,
            subtotal_paise: 15_000,
            tax: TaxBreakdown::from_components(
                Money::from_paise(750),
                Money::from_paise(750),
                Money::zero(),
                Money::zero(),
            ),
            line_total_paise: 16_500,
            takes: vec![
                BatchTake {
                    batch_id: "b-1".to_string(),
                    quantity: 10,
                    unit_cost_paise: 500,
                },
                BatchTake {
                    batch_id: "b-2".to_string(),
                    quantity: 5,
                    unit_cost_paise: 600,
                },
            ],
        };
        let lines = vec![line];
        Invoice {
            id: "i-1".to_string(),
            number: 7,
            display_number: "INV/2026-27/000007".to_string(),
            customer_id: "c-1".to_string(),
            jurisdiction: Jurisdiction::IntraState,
            status: InvoiceStatus::Posted,
            totals: InvoiceTotals::from_lines(&lines).unwrap(),
            lines,
            created_at: Utc::now(),
            posted_at: Some(Utc::now()),
            voided_at: None,
        }
    }

    #[test]
    fn test_line_rows_carry_tax_and_cost() {
        let rows = InvoiceLineExportRow::from_invoice(&invoice());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_tax_paise, 1500);
        assert_eq!(rows[0].cost_basis_paise, 8000);
        assert_eq!(rows[0].fields().len(), InvoiceLineExportRow::HEADERS.len());
    }

    #[test]
    fn test_take_rows_follow_consumption_order() {
        let rows = batch_take_rows(&[invoice()]);
        let batches: Vec<&str> = rows.iter().map(|r| r.batch_id.as_str()).collect();
        assert_eq!(batches, vec!["b-1", "b-2"]);
        assert_eq!(rows[1].cost_paise, 3000);
    }

    #[test]
    fn test_csv_quotes_awkward_fields() {
        let csv = to_csv(&invoice_line_rows(&[invoice()]));
        let mut records = csv.split("\r\n");

        assert!(records.next().unwrap().starts_with("invoice_number,display_number,status"));
        let record = records.next().unwrap();
        assert!(record.contains(",\"Toor Dal, 1kg \"\"Premium\"\"\","));
        assert_eq!(records.next(), Some(""));
    }

    #[test]
    fn test_json_is_an_array_of_rows() {
        let json = to_json(&batch_take_rows(&[invoice()])).unwrap();
        let parsed: Vec<BatchTakeExportRow> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].invoice_number, 7);
    }
}
