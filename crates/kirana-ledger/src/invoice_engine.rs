//! # Invoice Engine
//!
//! Turns a sale request into a posted invoice, and voids posted invoices.
//!
//! ## Posting
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       post_invoice(customer, lines)                     │
//! │                                                                         │
//! │  1. VALIDATE (no locks, no writes)                                     │
//! │     └── customer exists, every line: active product, qty > 0, price    │
//! │                                                                         │
//! │  2. LOCK products of all lines, ascending id, one deadline             │
//! │                                                                         │
//! │  3. ONE WRITE TRANSACTION                                              │
//! │     ├── per line, input order: FIFO consume + `sale` movements         │
//! │     ├── per line: tax breakdown (customer jurisdiction)                │
//! │     ├── next invoice number from the sequence                          │
//! │     └── insert invoice (Draft → Posted), lines, batch takes            │
//! │                                                                         │
//! │  4. COMMIT, or ROLLBACK on any error                                   │
//! │     └── a short line 3 undoes lines 1-2 and returns the number         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Voiding reverses every batch take through the same transaction shape and
//! flips the status; totals stay as posted.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ts_rs::TS;

use crate::batch_ledger::{consume_in, finish, reverse_in, today};
use crate::error::{LedgerError, LedgerResult};
use crate::locks::ProductLocks;
use kirana_core::fiscal::{display_number, FiscalYear};
use kirana_core::validation::{validate_price_paise, validate_quantity};
use kirana_core::{
    compute_line, BatchTake, Customer, Invoice, InvoiceLine, InvoiceStatus, InvoiceTotals, Money,
    Product, TaxBreakdown, TaxSlab,
};
use kirana_db::{generate_invoice_id, Database, LedgerTx, ProductSales};

/// One requested sale line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineRequest {
    pub product_id: String,
    pub quantity: i64,
    /// Overrides the product's sale price for this line.
    pub unit_price_paise: Option<i64>,
}

impl LineRequest {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        LineRequest {
            product_id: product_id.into(),
            quantity,
            unit_price_paise: None,
        }
    }

    pub fn at_price(mut self, unit_price_paise: i64) -> Self {
        self.unit_price_paise = Some(unit_price_paise);
        self
    }
}

/// Invoice numbering settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceSettings {
    pub prefix: String,
    pub fiscal_year_start_month: u32,
}

impl Default for InvoiceSettings {
    fn default() -> Self {
        InvoiceSettings {
            prefix: "INV".to_string(),
            fiscal_year_start_month: kirana_core::fiscal::DEFAULT_FISCAL_START_MONTH,
        }
    }
}

/// Posted invoices in a period with their summed totals.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesReport {
    #[ts(as = "String")]
    pub from: DateTime<Utc>,
    #[ts(as = "String")]
    pub to: DateTime<Utc>,
    pub invoices: Vec<Invoice>,
    pub totals: InvoiceTotals,
    /// FIFO cost of the goods sold in the period.
    pub cost_basis_paise: i64,
}

/// A validated line, ready for consumption.
#[derive(Debug)]
struct PreparedLine {
    line_no: i64,
    product: Product,
    quantity: i64,
    unit_price_paise: i64,
    subtotal: Money,
    tax: TaxBreakdown,
    line_total: Money,
}

/// Posts and voids invoices.
#[derive(Debug, Clone)]
pub struct InvoiceEngine {
    db: Database,
    locks: Arc<ProductLocks>,
    settings: InvoiceSettings,
}

impl InvoiceEngine {
    pub fn new(db: Database, locks: Arc<ProductLocks>, settings: InvoiceSettings) -> Self {
        InvoiceEngine { db, locks, settings }
    }

    /// Posts an invoice: all lines consume stock or none do.
    ///
    /// ## Errors
    /// - `InvalidLine` for an empty request, unknown or inactive product,
    ///   out-of-range quantity or price, or totals too large to represent
    /// - `NotFound` for an unknown customer
    /// - `InsufficientStock` naming the first short product
    /// - `LedgerStoreUnavailable` for lock timeouts and store failures
    pub async fn post_invoice(&self, customer_id: &str, lines: &[LineRequest]) -> LedgerResult<Invoice> {
        let customer = self
            .db
            .customers()
            .get_by_id(customer_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Customer", customer_id))?;
        let prepared = self.prepare(&customer, lines).await?;

        let guards = self
            .locks
            .acquire(prepared.iter().map(|l| l.product.id.as_str()))
            .await?;

        let mut tx = self.db.begin_write().await?;
        let posted = self.post_in(&mut tx, &customer, &prepared).await;
        let invoice = finish(tx, posted).await?;
        drop(guards);

        info!(
            invoice_number = invoice.number,
            display_number = %invoice.display_number,
            customer_id = %invoice.customer_id,
            lines = invoice.lines.len(),
            grand_total = %invoice.totals.grand_total(),
            "Invoice posted"
        );
        Ok(invoice)
    }

    /// Voids a posted invoice, restoring every batch it consumed.
    ///
    /// ## Errors
    /// - `InvalidTransition` unless the invoice is Posted
    /// - `InconsistentReversal` if a consumed batch has disappeared
    pub async fn void_invoice(&self, invoice_id: &str) -> LedgerResult<Invoice> {
        let invoice = self.invoice(invoice_id).await?;
        check_transition(&invoice, InvoiceStatus::Voided)?;

        let guards = self
            .locks
            .acquire(invoice.lines.iter().map(|l| l.product_id.as_str()))
            .await?;

        let mut tx = self.db.begin_write().await?;
        let voided = void_in(&mut tx, invoice_id).await;
        let invoice = finish(tx, voided).await?;
        drop(guards);

        info!(
            invoice_number = invoice.number,
            display_number = %invoice.display_number,
            "Invoice voided"
        );
        Ok(invoice)
    }

    pub async fn invoice(&self, invoice_id: &str) -> LedgerResult<Invoice> {
        self.db
            .invoices()
            .get_by_id(invoice_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Invoice", invoice_id))
    }

    pub async fn invoice_by_number(&self, number: i64) -> LedgerResult<Invoice> {
        self.db
            .invoices()
            .get_by_number(number)
            .await?
            .ok_or_else(|| LedgerError::not_found("Invoice", number.to_string()))
    }

    /// Every invoice of a customer, posted and voided, by number.
    pub async fn invoice_history(&self, customer_id: &str) -> LedgerResult<Vec<Invoice>> {
        if self.db.customers().get_by_id(customer_id).await?.is_none() {
            return Err(LedgerError::not_found("Customer", customer_id));
        }
        Ok(self.db.invoices().list_for_customer(customer_id).await?)
    }

    /// Posted invoices with `from <= posted_at < to`.
    pub async fn sales_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> LedgerResult<SalesReport> {
        if to < from {
            return Err(LedgerError::Validation(kirana_core::ValidationError::InvalidFormat {
                field: "to".to_string(),
                reason: "must not be before from".to_string(),
            }));
        }

        let invoices = self.db.invoices().list_posted_between(from, to).await?;
        let lines: Vec<InvoiceLine> = invoices.iter().flat_map(|i| i.lines.iter().cloned()).collect();
        let totals = InvoiceTotals::from_lines(&lines).ok_or_else(|| {
            LedgerError::Validation(kirana_core::ValidationError::OutOfRange {
                field: "sales_total".to_string(),
                min: i64::MIN,
                max: i64::MAX,
            })
        })?;
        let cost_basis_paise = invoices.iter().map(Invoice::cost_basis).sum::<Money>().paise();

        Ok(SalesReport {
            from,
            to,
            invoices,
            totals,
            cost_basis_paise,
        })
    }

    /// Quantity sold and revenue per product over posted invoices.
    pub async fn product_sales_summary(&self) -> LedgerResult<Vec<ProductSales>> {
        Ok(self.db.invoices().product_sales().await?)
    }

    /// Checks every line before anything is locked or written.
    async fn prepare(&self, customer: &Customer, lines: &[LineRequest]) -> LedgerResult<Vec<PreparedLine>> {
        if lines.is_empty() {
            return Err(LedgerError::invalid_line(0, "invoice has no lines"));
        }

        let cross = customer.jurisdiction.is_cross();
        let mut slabs: HashMap<String, TaxSlab> = HashMap::new();
        let mut prepared = Vec::with_capacity(lines.len());
        let mut grand_total = Money::zero();

        for (index, line) in lines.iter().enumerate() {
            let line_no = index + 1;

            validate_quantity(line.quantity)
                .map_err(|e| LedgerError::invalid_line(line_no, format!("{}, got {}", e, line.quantity)))?;

            let product = self
                .db
                .products()
                .get_by_id(&line.product_id)
                .await?
                .ok_or_else(|| {
                    LedgerError::invalid_line(line_no, format!("unknown product {}", line.product_id))
                })?;
            if !product.is_active {
                return Err(LedgerError::invalid_line(
                    line_no,
                    format!("product {} is no longer sold", product.name),
                ));
            }

            let unit_price_paise = line.unit_price_paise.unwrap_or(product.sale_price_paise);
            validate_price_paise("unit_price", unit_price_paise)
                .map_err(|e| LedgerError::invalid_line(line_no, e.to_string()))?;

            let slab = match slabs.get(&product.tax_slab_id) {
                Some(slab) => slab.clone(),
                None => {
                    let slab = self
                        .db
                        .tax_slabs()
                        .get_by_id(&product.tax_slab_id)
                        .await?
                        .ok_or_else(|| LedgerError::not_found("Tax slab", &product.tax_slab_id))?;
                    slabs.insert(slab.id.clone(), slab.clone());
                    slab
                }
            };

            let out_of_range = || LedgerError::invalid_line(line_no, "line amount is out of range");
            let subtotal = Money::from_paise(unit_price_paise)
                .checked_multiply_quantity(line.quantity)
                .ok_or_else(out_of_range)?;
            let tax = compute_line(subtotal, &slab, cross);
            let line_total = subtotal.checked_add(tax.total_tax()).ok_or_else(out_of_range)?;
            grand_total = grand_total
                .checked_add(line_total)
                .ok_or_else(|| LedgerError::invalid_line(line_no, "invoice total is out of range"))?;

            prepared.push(PreparedLine {
                line_no: line_no as i64,
                product,
                quantity: line.quantity,
                unit_price_paise,
                subtotal,
                tax,
                line_total,
            });
        }

        Ok(prepared)
    }

    async fn post_in(
        &self,
        tx: &mut LedgerTx,
        customer: &Customer,
        prepared: &[PreparedLine],
    ) -> LedgerResult<Invoice> {
        let invoice_id = generate_invoice_id();
        let now = Utc::now();
        let today = today();

        let mut lines = Vec::with_capacity(prepared.len());
        for line in prepared {
            let takes: Vec<BatchTake> =
                consume_in(tx, &line.product.id, line.quantity, Some(invoice_id.as_str()), today, now).await?;

            lines.push(InvoiceLine {
                line_no: line.line_no,
                product_id: line.product.id.clone(),
                product_name: line.product.name.clone(),
                quantity: line.quantity,
                unit_price_paise: line.unit_price_paise,
                subtotal_paise: line.subtotal.paise(),
                tax: line.tax,
                line_total_paise: line.line_total.paise(),
                takes,
            });
        }

        let totals = InvoiceTotals::from_lines(&lines)
            .ok_or_else(|| LedgerError::invalid_line(0, "invoice total is out of range"))?;
        let mut invoice = Invoice {
            id: invoice_id,
            number: 0,
            display_number: String::new(),
            customer_id: customer.id.clone(),
            jurisdiction: customer.jurisdiction,
            status: InvoiceStatus::Draft,
            totals,
            lines,
            created_at: now,
            posted_at: None,
            voided_at: None,
        };

        check_transition(&invoice, InvoiceStatus::Posted)?;
        invoice.number = tx.next_invoice_number().await?;
        invoice.display_number = display_number(
            &self.settings.prefix,
            &FiscalYear::containing(today, self.settings.fiscal_year_start_month),
            invoice.number,
        );
        invoice.status = InvoiceStatus::Posted;
        invoice.posted_at = Some(now);

        tx.insert_invoice(&invoice).await?;
        Ok(invoice)
    }
}

/// Re-reads the invoice under the write lock, so two concurrent voids of
/// the same invoice cannot both reverse its stock.
async fn void_in(tx: &mut LedgerTx, invoice_id: &str) -> LedgerResult<Invoice> {
    let mut invoice = tx
        .invoice(invoice_id)
        .await?
        .ok_or_else(|| LedgerError::not_found("Invoice", invoice_id))?;
    check_transition(&invoice, InvoiceStatus::Voided)?;

    let takes: Vec<BatchTake> = invoice.lines.iter().flat_map(|l| l.takes.iter().cloned()).collect();
    let now = Utc::now();
    reverse_in(tx, &takes, Some(invoice_id), now).await?;
    tx.mark_invoice_voided(invoice_id, now).await?;

    invoice.status = InvoiceStatus::Voided;
    invoice.voided_at = Some(now);
    Ok(invoice)
}

fn check_transition(invoice: &Invoice, next: InvoiceStatus) -> LedgerResult<()> {
    if invoice.status.can_transition_to(next) {
        return Ok(());
    }
    warn!(
        invoice_id = %invoice.id,
        current = invoice.status.as_str(),
        requested = next.as_str(),
        "Rejected invoice transition"
    );
    Err(LedgerError::InvalidTransition {
        invoice_id: invoice.id.clone(),
        current: invoice.status.as_str().to_string(),
        requested: next.as_str().to_string(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch_ledger::{BatchLedger, ReceiveBatch};
    use crate::test_support::{file_fixture, ledger_fixture, seed_customer, seed_product, Fixture};
    use chrono::Duration;
    use kirana_core::{Jurisdiction, MovementReason, MAX_UNIT_PRICE_PAISE};
    use std::time::Duration as StdDuration;

    fn engine(fx: &Fixture) -> InvoiceEngine {
        InvoiceEngine::new(fx.db.clone(), fx.locks.clone(), InvoiceSettings::default())
    }

    async fn stocked(fx: &Fixture, name: &str, qty: i64) -> Product {
        let p = seed_product(&fx.db, name, 900, 900, 100).await;
        fx.ledger.receive_batch(ReceiveBatch::new(&p.id, qty, 400)).await.unwrap();
        p
    }

    #[tokio::test]
    async fn test_intra_state_tax_scenario() {
        let fx = ledger_fixture().await;
        let c = seed_customer(&fx.db, "Sharma Stores", Jurisdiction::IntraState).await;
        let p = stocked(&fx, "Ghee 1L", 10).await;

        let invoice = engine(&fx)
            .post_invoice(&c.id, &[LineRequest::new(&p.id, 2).at_price(500)])
            .await
            .unwrap();

        let line = &invoice.lines[0];
        assert_eq!(line.subtotal_paise, 1000);
        assert_eq!(line.tax.cgst_paise, 90);
        assert_eq!(line.tax.sgst_paise, 90);
        assert_eq!(line.tax.igst_paise, 0);
        assert_eq!(line.tax.cess_paise, 10);
        assert_eq!(line.tax.total_tax_paise, 190);
        assert_eq!(invoice.totals.grand_total_paise, 1190);
        assert_eq!(invoice.status, InvoiceStatus::Posted);
        assert_eq!(invoice.number, 1);
        assert!(invoice.display_number.starts_with("INV/"));
        assert!(invoice.display_number.ends_with("/000001"));
    }

    #[tokio::test]
    async fn test_inter_state_uses_igst() {
        let fx = ledger_fixture().await;
        let c = seed_customer(&fx.db, "Bengaluru Traders", Jurisdiction::InterState).await;
        let p = stocked(&fx, "Ghee 1L", 10).await;

        let invoice = engine(&fx)
            .post_invoice(&c.id, &[LineRequest::new(&p.id, 1).at_price(1000)])
            .await
            .unwrap();

        let tax = invoice.lines[0].tax;
        assert_eq!((tax.cgst_paise, tax.sgst_paise, tax.igst_paise, tax.cess_paise), (0, 0, 180, 10));
        assert_eq!(invoice.jurisdiction, Jurisdiction::InterState);
    }

    #[tokio::test]
    async fn test_invoice_totals_are_sum_of_lines() {
        let fx = ledger_fixture().await;
        let c = seed_customer(&fx.db, "Walk-in", Jurisdiction::IntraState).await;
        let a = stocked(&fx, "Biscuits", 50).await;
        let b = stocked(&fx, "Namkeen", 50).await;

        let invoice = engine(&fx)
            .post_invoice(
                &c.id,
                &[
                    LineRequest::new(&a.id, 3).at_price(1111),
                    LineRequest::new(&b.id, 7).at_price(2349),
                    LineRequest::new(&a.id, 1).at_price(1),
                ],
            )
            .await
            .unwrap();

        let tax_sum: i64 = invoice.lines.iter().map(|l| l.tax.total_tax_paise).sum();
        let total_sum: i64 = invoice.lines.iter().map(|l| l.line_total_paise).sum();
        assert_eq!(invoice.totals.total_tax_paise, tax_sum);
        assert_eq!(invoice.totals.grand_total_paise, total_sum);
        assert!(invoice.lines.iter().all(|l| l.tax.is_additive()));

        // Two lines of the same product draw 4 units in total
        assert_eq!(fx.ledger.available(&a.id).await.unwrap(), 46);
    }

    #[tokio::test]
    async fn test_short_line_rolls_back_earlier_lines() {
        let fx = ledger_fixture().await;
        let c = seed_customer(&fx.db, "Walk-in", Jurisdiction::IntraState).await;
        let rice = stocked(&fx, "Rice", 10).await;
        let dal = stocked(&fx, "Dal", 2).await;

        let err = engine(&fx)
            .post_invoice(&c.id, &[LineRequest::new(&rice.id, 5), LineRequest::new(&dal.id, 3)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientStock { ref product_id, available: 2, requested: 3 } if *product_id == dal.id
        ));

        assert_eq!(fx.ledger.available(&rice.id).await.unwrap(), 10);
        let sales = fx
            .ledger
            .movements(&rice.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.reason == MovementReason::Sale)
            .count();
        assert_eq!(sales, 0);

        // The failed attempt did not use up a number
        let invoice = engine(&fx).post_invoice(&c.id, &[LineRequest::new(&dal.id, 2)]).await.unwrap();
        assert_eq!(invoice.number, 1);
    }

    #[tokio::test]
    async fn test_invalid_lines_are_rejected_up_front() {
        let fx = ledger_fixture().await;
        let c = seed_customer(&fx.db, "Walk-in", Jurisdiction::IntraState).await;
        let p = stocked(&fx, "Soap", 10).await;
        let e = engine(&fx);

        let err = e.post_invoice(&c.id, &[]).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidLine { line_no: 0, .. }));

        let err = e
            .post_invoice(&c.id, &[LineRequest::new(&p.id, 1), LineRequest::new(&p.id, 0)])
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidLine { line_no: 2, .. }));

        let err = e.post_invoice(&c.id, &[LineRequest::new("ghost", 1)]).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidLine { line_no: 1, .. }));

        let err = e
            .post_invoice(&c.id, &[LineRequest::new(&p.id, 1).at_price(-5)])
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidLine { .. }));

        let err = e.post_invoice("nobody", &[LineRequest::new(&p.id, 1)]).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));

        fx.db.products().soft_delete(&p.id).await.unwrap();
        let err = e.post_invoice(&c.id, &[LineRequest::new(&p.id, 1)]).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidLine { .. }));

        assert_eq!(fx.ledger.available(&p.id).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_extreme_prices_are_rejected_before_consuming() {
        let fx = ledger_fixture().await;
        let c = seed_customer(&fx.db, "Walk-in", Jurisdiction::IntraState).await;
        let p = stocked(&fx, "Saffron 1g", 10).await;
        let e = engine(&fx);

        let err = e
            .post_invoice(&c.id, &[LineRequest::new(&p.id, 3).at_price(i64::MAX / 2)])
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidLine { line_no: 1, .. }));

        let err = e
            .post_invoice(
                &c.id,
                &[LineRequest::new(&p.id, 1), LineRequest::new(&p.id, 2).at_price(MAX_UNIT_PRICE_PAISE + 1)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidLine { line_no: 2, .. }));

        assert_eq!(fx.ledger.available(&p.id).await.unwrap(), 10);
        assert_eq!(fx.ledger.movements(&p.id).await.unwrap().len(), 1);

        let invoice = e
            .post_invoice(&c.id, &[LineRequest::new(&p.id, 3).at_price(MAX_UNIT_PRICE_PAISE)])
            .await
            .unwrap();
        assert_eq!(invoice.number, 1);
        assert_eq!(invoice.totals.subtotal_paise, 3 * MAX_UNIT_PRICE_PAISE);
        assert!(invoice.totals.grand_total_paise > invoice.totals.subtotal_paise);
    }

    #[tokio::test]
    async fn test_void_restores_batches_and_keeps_totals() {
        let fx = ledger_fixture().await;
        let c = seed_customer(&fx.db, "Walk-in", Jurisdiction::IntraState).await;
        let p = seed_product(&fx.db, "Paneer", 900, 900, 0).await;
        let t0 = Utc::now() - Duration::hours(1);
        let b1 = fx
            .ledger
            .receive_batch(ReceiveBatch::new(&p.id, 10, 500).received_at(t0))
            .await
            .unwrap();
        let b2 = fx.ledger.receive_batch(ReceiveBatch::new(&p.id, 10, 600)).await.unwrap();
        let e = engine(&fx);

        let posted = e.post_invoice(&c.id, &[LineRequest::new(&p.id, 15)]).await.unwrap();
        assert_eq!(posted.cost_basis().paise(), 8000);

        let voided = e.void_invoice(&posted.id).await.unwrap();
        assert_eq!(voided.status, InvoiceStatus::Voided);
        assert_eq!(voided.totals, posted.totals);

        for (id, qty) in [(&b1.id, 10), (&b2.id, 10)] {
            let batch = fx.db.batches().get_by_id(id).await.unwrap().unwrap();
            assert_eq!(batch.quantity_remaining, qty);
        }

        let stored = e.invoice(&posted.id).await.unwrap();
        assert_eq!(stored.status, InvoiceStatus::Voided);
        assert_eq!(stored.totals, posted.totals);

        let err = e.void_invoice(&posted.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));

        // Numbers are never reused after a void
        let next = e.post_invoice(&c.id, &[LineRequest::new(&p.id, 1)]).await.unwrap();
        assert_eq!(next.number, 2);
        assert_eq!(e.invoice_by_number(2).await.unwrap().id, next.id);
        assert_eq!(e.invoice_history(&c.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sales_reports_exclude_voided() {
        let fx = ledger_fixture().await;
        let c = seed_customer(&fx.db, "Walk-in", Jurisdiction::IntraState).await;
        let p = stocked(&fx, "Jaggery", 20).await;
        let e = engine(&fx);

        let kept = e.post_invoice(&c.id, &[LineRequest::new(&p.id, 3).at_price(1000)]).await.unwrap();
        let dropped = e.post_invoice(&c.id, &[LineRequest::new(&p.id, 2).at_price(1000)]).await.unwrap();
        e.void_invoice(&dropped.id).await.unwrap();

        let report = e
            .sales_between(Utc::now() - Duration::days(1), Utc::now() + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(report.invoices.len(), 1);
        assert_eq!(report.totals, kept.totals);
        assert_eq!(report.cost_basis_paise, 1200);

        let summary = e.product_sales_summary().await.unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].quantity_sold, 3);
        assert_eq!(summary[0].revenue_paise, 3000);
    }

    #[tokio::test]
    async fn test_lock_timeout_is_store_unavailable() {
        let fx = ledger_fixture().await;
        let c = seed_customer(&fx.db, "Walk-in", Jurisdiction::IntraState).await;
        let p = stocked(&fx, "Honey", 5).await;

        let locks = Arc::new(ProductLocks::new(StdDuration::from_millis(50)));
        let e = InvoiceEngine::new(fx.db.clone(), locks.clone(), InvoiceSettings::default());
        let held = locks.acquire([p.id.as_str()]).await.unwrap();

        let err = e.post_invoice(&c.id, &[LineRequest::new(&p.id, 1)]).await.unwrap_err();
        assert!(matches!(err, LedgerError::LedgerStoreUnavailable(_)));
        drop(held);

        assert!(e.post_invoice(&c.id, &[LineRequest::new(&p.id, 1)]).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_never_oversell() {
        let fx = file_fixture().await;
        let c = seed_customer(&fx.db, "Walk-in", Jurisdiction::IntraState).await;
        let p = stocked(&fx, "Atta 10kg", 10).await;

        let first = engine(&fx);
        let second = engine(&fx);
        let (c1, c2, p1, p2) = (c.id.clone(), c.id.clone(), p.id.clone(), p.id.clone());

        let (a, b) = tokio::join!(
            tokio::spawn(async move { first.post_invoice(&c1, &[LineRequest::new(&p1, 7)]).await }),
            tokio::spawn(async move { second.post_invoice(&c2, &[LineRequest::new(&p2, 6)]).await }),
        );
        let results = [a.unwrap(), b.unwrap()];

        let successes = results.iter().filter(|r| r.is_ok()).count();
        let short = results
            .iter()
            .filter(|r| matches!(r, Err(LedgerError::InsufficientStock { .. })))
            .count();
        assert_eq!((successes, short), (1, 1));

        let left = BatchLedger::new(fx.db.clone(), fx.locks.clone()).available(&p.id).await.unwrap();
        assert!(left == 3 || left == 4);

        fx.cleanup().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_crossed_multi_line_invoices_do_not_deadlock() {
        let fx = file_fixture().await;
        let c = seed_customer(&fx.db, "Walk-in", Jurisdiction::IntraState).await;
        let rice = stocked(&fx, "Rice", 100).await;
        let atta = stocked(&fx, "Atta", 100).await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let e = engine(&fx);
            let customer = c.id.clone();
            let lines = if i % 2 == 0 {
                vec![LineRequest::new(&rice.id, 1), LineRequest::new(&atta.id, 1)]
            } else {
                vec![LineRequest::new(&atta.id, 1), LineRequest::new(&rice.id, 1)]
            };
            handles.push(tokio::spawn(async move { e.post_invoice(&customer, &lines).await }));
        }

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().unwrap().number);
        }
        numbers.sort_unstable();
        assert_eq!(numbers, (1..=8).collect::<Vec<i64>>());
        assert_eq!(fx.ledger.available(&rice.id).await.unwrap(), 92);

        fx.cleanup().await;
    }
}
