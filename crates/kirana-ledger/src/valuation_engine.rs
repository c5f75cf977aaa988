//! # Valuation Engine
//!
//! Read-only views over ledger state: stock value, low-stock signals,
//! expiry windows and per-batch purchase history.
//!
//! Nothing here is cached. Each call reads the batches it needs and hands
//! them to the pure functions in `kirana_core::valuation`, so two calls
//! with no mutation in between return identical results.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::batch_ledger::today;
use crate::error::{LedgerError, LedgerResult};
use kirana_core::valuation::{is_low_stock, on_hand, stock_value};
use kirana_core::{Batch, ExpiryWindow, Money, Product, StockPosition};
use kirana_db::Database;

/// On-hand quantity of one product against its reorder threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LowStockSignal {
    pub product_id: String,
    pub product_name: String,
    /// All remaining units, expired included.
    pub on_hand: i64,
    pub reorder_threshold: i64,
    pub is_low: bool,
}

/// One row of the stock valuation report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockValuationRow {
    pub product_id: String,
    pub product_name: String,
    pub unit: String,
    pub on_hand: i64,
    pub sellable: i64,
    pub expired: i64,
    /// FIFO cost of sellable stock.
    pub value_paise: i64,
    pub reorder_threshold: i64,
    pub is_low: bool,
}

/// One purchase batch with what has happened to it since.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseHistoryRow {
    pub batch_id: String,
    pub supplier_id: Option<String>,
    pub supplier_invoice: Option<String>,
    #[ts(as = "String")]
    pub received_at: chrono::DateTime<chrono::Utc>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    pub unit_cost_paise: i64,
    pub original_quantity: i64,
    pub quantity_remaining: i64,
    pub quantity_sold: i64,
}

impl From<&Batch> for PurchaseHistoryRow {
    fn from(batch: &Batch) -> Self {
        PurchaseHistoryRow {
            batch_id: batch.id.clone(),
            supplier_id: batch.supplier_id.clone(),
            supplier_invoice: batch.supplier_invoice.clone(),
            received_at: batch.received_at,
            expiry_date: batch.expiry_date,
            unit_cost_paise: batch.unit_cost_paise,
            original_quantity: batch.original_quantity,
            quantity_remaining: batch.quantity_remaining,
            quantity_sold: batch.quantity_consumed(),
        }
    }
}

/// Stock value and shelf reports computed on demand.
#[derive(Debug, Clone)]
pub struct ValuationEngine {
    db: Database,
}

impl ValuationEngine {
    pub fn new(db: Database) -> Self {
        ValuationEngine { db }
    }

    /// FIFO-cost value of a product's non-expired stock.
    pub async fn current_stock_value(&self, product_id: &str) -> LedgerResult<Money> {
        self.product(product_id).await?;
        let batches = self.db.batches().list_for_product(product_id).await?;
        Ok(stock_value(&batches, today()))
    }

    /// Fires when on-hand stock, expired included, is below the threshold.
    pub async fn low_stock_signal(&self, product_id: &str) -> LedgerResult<LowStockSignal> {
        let product = self.product(product_id).await?;
        let batches = self.db.batches().list_for_product(product_id).await?;
        let on_hand = on_hand(&batches);

        Ok(LowStockSignal {
            is_low: is_low_stock(on_hand, product.reorder_threshold),
            product_id: product.id,
            product_name: product.name,
            on_hand,
            reorder_threshold: product.reorder_threshold,
        })
    }

    /// Batches with stock left whose expiry falls in `[today, today + within_days]`.
    pub async fn expiring_soon(&self, within_days: u32) -> LedgerResult<ExpiryWindow> {
        self.expiring_between(today(), within_days).await
    }

    async fn expiring_between(&self, from: NaiveDate, within_days: u32) -> LedgerResult<ExpiryWindow> {
        let until = from
            .checked_add_days(Days::new(u64::from(within_days)))
            .unwrap_or(NaiveDate::MAX);
        let batches = self.db.batches().list_expiring(from, until).await?;
        debug!(%from, %until, batches = batches.len(), "Expiry window read");
        Ok(ExpiryWindow::new(batches, from, until))
    }

    /// Low-stock signals for every active product that is below threshold.
    pub async fn low_stock_report(&self) -> LedgerResult<Vec<LowStockSignal>> {
        let snapshot = self.db.stock_snapshot().await?;

        Ok(snapshot
            .products
            .iter()
            .filter_map(|product| {
                let on_hand: i64 = snapshot.batches_of(&product.id).map(|b| b.quantity_remaining).sum();
                is_low_stock(on_hand, product.reorder_threshold).then(|| LowStockSignal {
                    product_id: product.id.clone(),
                    product_name: product.name.clone(),
                    on_hand,
                    reorder_threshold: product.reorder_threshold,
                    is_low: true,
                })
            })
            .collect())
    }

    /// One row per active product, all read from the same snapshot.
    pub async fn stock_valuation(&self) -> LedgerResult<Vec<StockValuationRow>> {
        let snapshot = self.db.stock_snapshot().await?;
        let today = today();

        Ok(snapshot
            .products
            .iter()
            .map(|product| {
                let batches: Vec<Batch> = snapshot.batches_of(&product.id).cloned().collect();
                let position = StockPosition::from_batches(&product.id, &batches, today);
                StockValuationRow {
                    product_id: product.id.clone(),
                    product_name: product.name.clone(),
                    unit: product.unit.clone(),
                    on_hand: position.on_hand,
                    sellable: position.sellable,
                    expired: position.expired,
                    value_paise: position.value_paise,
                    reorder_threshold: product.reorder_threshold,
                    is_low: is_low_stock(position.on_hand, product.reorder_threshold),
                }
            })
            .collect())
    }

    /// Every batch ever received for a product, oldest first.
    pub async fn purchase_history(&self, product_id: &str) -> LedgerResult<Vec<PurchaseHistoryRow>> {
        self.product(product_id).await?;
        let batches = self.db.batches().list_for_product(product_id).await?;
        Ok(batches.iter().map(PurchaseHistoryRow::from).collect())
    }

    async fn product(&self, product_id: &str) -> LedgerResult<Product> {
        self.db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Product", product_id))
    }
}
