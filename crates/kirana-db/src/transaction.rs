//! # Ledger Write Transaction
//!
//! Every stock or invoice mutation runs inside one [`LedgerTx`]. It either
//! commits as a whole or leaves no trace: batch quantities, movement rows,
//! invoice rows and the invoice number sequence move together.
//!
//! ```text
//! begin_write()
//!   │  UPDATE ledger_state SET write_epoch = write_epoch + 1   ← write lock
//!   ▼
//! read batches ─► plan ─► change_remaining / record_movement / insert_invoice
//!   │
//!   ├── commit()     all rows visible at once
//!   └── drop / rollback()   nothing happened, sequence value returned
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::trace;

use crate::error::{DbError, DbResult};
use crate::repository::{batch, invoice, movement};
use kirana_core::{Batch, Invoice, StockMovement};

/// An open write transaction on the ledger store.
///
/// Dropping it without [`commit`](LedgerTx::commit) rolls everything back.
#[derive(Debug)]
pub struct LedgerTx {
    tx: Transaction<'static, Sqlite>,
}

impl LedgerTx {
    pub(crate) async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        sqlx::query("UPDATE ledger_state SET write_epoch = write_epoch + 1 WHERE id = 1")
            .execute(&mut *tx)
            .await?;

        trace!("Write transaction opened");
        Ok(LedgerTx { tx })
    }

    /// Batches of a product in FIFO order, as seen by this transaction.
    pub async fn batches_for_product(&mut self, product_id: &str) -> DbResult<Vec<Batch>> {
        batch::fetch_for_product(&mut *self.tx, product_id).await
    }

    pub async fn batch(&mut self, id: &str) -> DbResult<Option<Batch>> {
        batch::fetch_by_id(&mut *self.tx, id).await
    }

    pub async fn insert_batch(&mut self, new_batch: &Batch) -> DbResult<()> {
        batch::insert(&mut *self.tx, new_batch).await
    }

    /// Adds `delta` to a batch's remaining quantity.
    pub async fn change_remaining(&mut self, batch_id: &str, delta: i64) -> DbResult<()> {
        batch::change_remaining(&mut *self.tx, batch_id, delta).await
    }

    /// Adds `delta` to a batch's received and remaining quantity.
    pub async fn change_received(&mut self, batch_id: &str, delta: i64) -> DbResult<()> {
        batch::change_received(&mut *self.tx, batch_id, delta).await
    }

    pub async fn record_movement(&mut self, entry: &StockMovement) -> DbResult<()> {
        movement::insert(&mut *self.tx, entry).await
    }

    /// Takes the next gap-free invoice number.
    pub async fn next_invoice_number(&mut self) -> DbResult<i64> {
        invoice::next_number(&mut *self.tx).await
    }

    pub async fn insert_invoice(&mut self, posted: &Invoice) -> DbResult<()> {
        invoice::insert(&mut *self.tx, posted).await
    }

    pub async fn invoice(&mut self, id: &str) -> DbResult<Option<Invoice>> {
        invoice::load(&mut *self.tx, id).await
    }

    pub async fn mark_invoice_voided(&mut self, id: &str, at: DateTime<Utc>) -> DbResult<()> {
        invoice::mark_voided(&mut *self.tx, id, at).await
    }

    pub async fn commit(self) -> DbResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        trace!("Write transaction committed");
        Ok(())
    }

    pub async fn rollback(self) -> DbResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }
}
