//! # Ledger Service
//!
//! The single entry point the storefront holds. It owns the store handle
//! and the shared product-lock table, and wires them into each engine.
//!
//! ```text
//! LedgerService
//!   ├── BatchLedger      receive_purchase, adjust, write-offs
//!   ├── InvoiceEngine    post_invoice, void_invoice, history, sales
//!   ├── ValuationEngine  stock value, low stock, expiry, valuation
//!   └── MasterData       slabs, products, customers, suppliers
//!         │
//!         └── all share one Database and one ProductLocks
//! ```
//!
//! Callers are expected to have authorised the request already.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::batch_ledger::{BatchLedger, ReceiveBatch};
use crate::config::LedgerConfig;
use crate::error::LedgerResult;
use crate::export::{batch_take_rows, invoice_line_rows, to_csv, BatchTakeExportRow, InvoiceLineExportRow};
use crate::invoice_engine::{InvoiceEngine, InvoiceSettings, LineRequest, SalesReport};
use crate::locks::ProductLocks;
use crate::master_data::{MasterData, NewCustomer, NewProduct, NewSupplier, NewTaxSlab};
use crate::valuation_engine::{LowStockSignal, PurchaseHistoryRow, StockValuationRow, ValuationEngine};
use kirana_core::{Batch, BatchTake, Customer, ExpiryWindow, Invoice, Money, Product, StockMovement, Supplier, TaxSlab};
use kirana_db::{Database, ProductSales};

/// Every exposed ledger operation.
#[derive(Debug, Clone)]
pub struct LedgerService {
    db: Database,
    batches: BatchLedger,
    invoices: InvoiceEngine,
    valuation: ValuationEngine,
    master: MasterData,
    expiry_warning_days: u32,
}

impl LedgerService {
    /// Opens (and migrates) the configured store and builds the service.
    pub async fn open(config: &LedgerConfig) -> LedgerResult<Self> {
        config.validate()?;
        let db = Database::new(config.db_config()?).await?;
        info!(path = %config.database_path().display(), "Ledger store opened");
        Ok(Self::new(db, config))
    }

    /// Builds the service over an already-open store.
    pub fn new(db: Database, config: &LedgerConfig) -> Self {
        let locks = Arc::new(ProductLocks::new(config.lock_timeout()));
        let settings = InvoiceSettings {
            prefix: config.invoicing.prefix.clone(),
            fiscal_year_start_month: config.invoicing.fiscal_year_start_month,
        };

        LedgerService {
            batches: BatchLedger::new(db.clone(), locks.clone()),
            invoices: InvoiceEngine::new(db.clone(), locks, settings),
            valuation: ValuationEngine::new(db.clone()),
            master: MasterData::new(
                db.clone(),
                config.invoicing.seller_state_code.clone(),
                config.stock.default_reorder_threshold,
            ),
            expiry_warning_days: config.stock.expiry_warning_days,
            db,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn close(&self) {
        self.db.close().await;
    }

    // -------------------------------------------------------------------------
    // Stock
    // -------------------------------------------------------------------------

    /// Records a purchase (or opening stock) as a new batch.
    pub async fn receive_purchase(&self, request: ReceiveBatch) -> LedgerResult<Batch> {
        self.batches.receive_batch(request).await
    }

    pub async fn adjust_batch(&self, batch_id: &str, delta: i64, note: &str) -> LedgerResult<Batch> {
        self.batches.adjust(batch_id, delta, note).await
    }

    pub async fn write_off_expired(&self, product_id: &str) -> LedgerResult<Vec<BatchTake>> {
        self.batches.write_off_expired(product_id).await
    }

    pub async fn available(&self, product_id: &str) -> LedgerResult<i64> {
        self.batches.available(product_id).await
    }

    pub async fn stock_movements(&self, product_id: &str) -> LedgerResult<Vec<StockMovement>> {
        self.batches.movements(product_id).await
    }

    // -------------------------------------------------------------------------
    // Invoices
    // -------------------------------------------------------------------------

    pub async fn post_invoice(&self, customer_id: &str, lines: &[LineRequest]) -> LedgerResult<Invoice> {
        self.invoices.post_invoice(customer_id, lines).await
    }

    pub async fn void_invoice(&self, invoice_id: &str) -> LedgerResult<Invoice> {
        self.invoices.void_invoice(invoice_id).await
    }

    pub async fn invoice(&self, invoice_id: &str) -> LedgerResult<Invoice> {
        self.invoices.invoice(invoice_id).await
    }

    pub async fn invoice_by_number(&self, number: i64) -> LedgerResult<Invoice> {
        self.invoices.invoice_by_number(number).await
    }

    pub async fn invoice_history(&self, customer_id: &str) -> LedgerResult<Vec<Invoice>> {
        self.invoices.invoice_history(customer_id).await
    }

    pub async fn sales_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> LedgerResult<SalesReport> {
        self.invoices.sales_between(from, to).await
    }

    pub async fn product_sales_summary(&self) -> LedgerResult<Vec<ProductSales>> {
        self.invoices.product_sales_summary().await
    }

    // -------------------------------------------------------------------------
    // Valuation
    // -------------------------------------------------------------------------

    pub async fn current_stock_value(&self, product_id: &str) -> LedgerResult<Money> {
        self.valuation.current_stock_value(product_id).await
    }

    pub async fn low_stock_signal(&self, product_id: &str) -> LedgerResult<LowStockSignal> {
        self.valuation.low_stock_signal(product_id).await
    }

    pub async fn expiring_soon(&self, within_days: u32) -> LedgerResult<ExpiryWindow> {
        self.valuation.expiring_soon(within_days).await
    }

    /// Expiry window using the configured warning period.
    pub async fn expiry_warnings(&self) -> LedgerResult<ExpiryWindow> {
        self.valuation.expiring_soon(self.expiry_warning_days).await
    }

    pub async fn low_stock_report(&self) -> LedgerResult<Vec<LowStockSignal>> {
        self.valuation.low_stock_report().await
    }

    pub async fn stock_valuation(&self) -> LedgerResult<Vec<StockValuationRow>> {
        self.valuation.stock_valuation().await
    }

    pub async fn purchase_history(&self, product_id: &str) -> LedgerResult<Vec<PurchaseHistoryRow>> {
        self.valuation.purchase_history(product_id).await
    }

    // -------------------------------------------------------------------------
    // Master data
    // -------------------------------------------------------------------------

    pub async fn add_tax_slab(&self, request: NewTaxSlab) -> LedgerResult<TaxSlab> {
        self.master.add_tax_slab(request).await
    }

    pub async fn tax_slabs(&self) -> LedgerResult<Vec<TaxSlab>> {
        self.master.tax_slabs().await
    }

    pub async fn add_product(&self, request: NewProduct) -> LedgerResult<Product> {
        self.master.add_product(request).await
    }

    pub async fn set_reorder_threshold(&self, product_id: &str, threshold: i64) -> LedgerResult<()> {
        self.master.set_reorder_threshold(product_id, threshold).await
    }

    pub async fn deactivate_product(&self, product_id: &str) -> LedgerResult<()> {
        self.master.deactivate_product(product_id).await
    }

    pub async fn products(&self) -> LedgerResult<Vec<Product>> {
        self.master.products().await
    }

    pub async fn add_customer(&self, request: NewCustomer) -> LedgerResult<Customer> {
        self.master.add_customer(request).await
    }

    pub async fn customers(&self) -> LedgerResult<Vec<Customer>> {
        self.master.customers().await
    }

    pub async fn add_supplier(&self, request: NewSupplier) -> LedgerResult<Supplier> {
        self.master.add_supplier(request).await
    }

    pub async fn suppliers(&self) -> LedgerResult<Vec<Supplier>> {
        self.master.suppliers().await
    }

    // -------------------------------------------------------------------------
    // Export
    // -------------------------------------------------------------------------

    /// Line and batch-take rows for posted invoices in `[from, to)`.
    pub async fn export_sales(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> LedgerResult<(Vec<InvoiceLineExportRow>, Vec<BatchTakeExportRow>)> {
        let report = self.invoices.sales_between(from, to).await?;
        Ok((invoice_line_rows(&report.invoices), batch_take_rows(&report.invoices)))
    }

    /// Stock valuation as CSV text.
    pub async fn stock_valuation_csv(&self) -> LedgerResult<String> {
        Ok(to_csv(&self.stock_valuation().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use kirana_core::{InvoiceStatus, Jurisdiction};
    use kirana_db::DbConfig;

    async fn service() -> LedgerService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        LedgerService::new(db, &LedgerConfig::default())
    }

    #[tokio::test]
    async fn test_purchase_sale_void_round_trip() {
        let svc = service().await;
        let slab = svc
            .add_tax_slab(NewTaxSlab {
                name: "GST 18% + Cess 1%".to_string(),
                cgst_bps: 900,
                sgst_bps: 900,
                cess_bps: 100,
            })
            .await
            .unwrap();
        let product = svc
            .add_product(NewProduct {
                name: "Fortune Oil 1L".to_string(),
                brand: Some("Fortune".to_string()),
                unit: None,
                sale_price_paise: 500,
                reorder_threshold: None,
                tax_slab_id: slab.id.clone(),
            })
            .await
            .unwrap();
        let supplier = svc
            .add_supplier(NewSupplier {
                name: "Adani Wilmar".to_string(),
                gstin: None,
                contact: None,
            })
            .await
            .unwrap();
        let customer = svc
            .add_customer(NewCustomer {
                name: "Sharma Stores".to_string(),
                gstin: Some("27AAPFU0939F1ZV".to_string()),
                jurisdiction: None,
                address: None,
                contact: None,
            })
            .await
            .unwrap();
        assert_eq!(customer.jurisdiction, Jurisdiction::IntraState);

        svc.receive_purchase(
            ReceiveBatch::new(&product.id, 12, 400).from_supplier(&supplier.id, Some("AW-881".to_string())),
        )
        .await
        .unwrap();
        let before = svc.current_stock_value(&product.id).await.unwrap();

        let invoice = svc
            .post_invoice(&customer.id, &[LineRequest::new(&product.id, 2)])
            .await
            .unwrap();
        assert_eq!(invoice.totals.total_tax_paise, 190);
        assert_eq!(svc.available(&product.id).await.unwrap(), 10);

        let (lines, takes) = svc
            .export_sales(Utc::now() - Duration::hours(1), Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(takes.len(), 1);
        assert_eq!(lines[0].cgst_paise, 90);

        let voided = svc.void_invoice(&invoice.id).await.unwrap();
        assert_eq!(voided.status, InvoiceStatus::Voided);
        assert_eq!(svc.current_stock_value(&product.id).await.unwrap(), before);
        assert_eq!(svc.invoice_history(&customer.id).await.unwrap().len(), 1);

        let csv = svc.stock_valuation_csv().await.unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(svc.expiry_warnings().await.unwrap().iter().next().is_none());
    }
}
