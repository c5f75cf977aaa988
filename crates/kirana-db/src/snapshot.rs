//! # Stock Snapshot
//!
//! Reports read products and batches in one read transaction, so a report
//! never mixes stock from before and after a posting.

use kirana_core::{Batch, Product};

use crate::error::DbResult;
use crate::pool::Database;
use crate::repository::{batch, product};

/// Active products and every batch that still holds stock, read together.
#[derive(Debug, Clone, Default)]
pub struct StockSnapshot {
    pub products: Vec<Product>,
    /// Grouped by product, FIFO order within a product.
    pub batches: Vec<Batch>,
}

impl StockSnapshot {
    /// Batches of one product, in FIFO order.
    pub fn batches_of<'a>(&'a self, product_id: &'a str) -> impl Iterator<Item = &'a Batch> + 'a {
        self.batches.iter().filter(move |b| b.product_id == product_id)
    }
}

impl Database {
    /// Reads a consistent stock snapshot.
    pub async fn stock_snapshot(&self) -> DbResult<StockSnapshot> {
        let mut tx = self.begin_read().await?;
        let products = product::fetch_active(&mut *tx).await?;
        let batches = batch::fetch_in_stock(&mut *tx).await?;
        tx.commit().await?;

        Ok(StockSnapshot { products, batches })
    }
}
