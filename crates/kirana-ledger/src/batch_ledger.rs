//! # Batch Ledger
//!
//! Owns stock at batch granularity: receiving purchases, FIFO consumption,
//! reversal, manual adjustment and expiry write-off.
//!
//! ## Consumption
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reserve_and_consume(product, 15)                                       │
//! │                                                                         │
//! │  1. lock product                 (bounded wait)                        │
//! │  2. begin_write()                (database write lock)                 │
//! │  3. read batches in the tx  ──►  BatchQueue (BTreeMap, FIFO order)     │
//! │  4. plan 15 units                B1: 10 @ ₹5   B2: 5 @ ₹6               │
//! │  5. per take: quantity_remaining -= q, append `sale` movement          │
//! │  6. commit                       (any error: rollback, nothing moved)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The invoice engine runs steps 3-5 for many lines inside its own
//! transaction through [`consume_in`] and [`reverse_in`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use ts_rs::TS;

use crate::error::{LedgerError, LedgerResult};
use crate::locks::ProductLocks;
use kirana_core::validation::{validate_price_paise, validate_quantity};
use kirana_core::{Batch, BatchQueue, BatchTake, MovementReason, StockMovement};
use kirana_db::{generate_batch_id, generate_movement_id, Database, LedgerTx};

/// A purchase entry or opening stock load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReceiveBatch {
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_paise: i64,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    /// Defaults to now. Opening stock may carry an older date.
    #[ts(as = "Option<String>")]
    pub received_at: Option<DateTime<Utc>>,
    pub supplier_id: Option<String>,
    pub supplier_invoice: Option<String>,
}

impl ReceiveBatch {
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_cost_paise: i64) -> Self {
        ReceiveBatch {
            product_id: product_id.into(),
            quantity,
            unit_cost_paise,
            expiry_date: None,
            received_at: None,
            supplier_id: None,
            supplier_invoice: None,
        }
    }

    pub fn expiring(mut self, expiry_date: NaiveDate) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }

    pub fn received_at(mut self, at: DateTime<Utc>) -> Self {
        self.received_at = Some(at);
        self
    }

    pub fn from_supplier(mut self, supplier_id: impl Into<String>, invoice: Option<String>) -> Self {
        self.supplier_id = Some(supplier_id.into());
        self.supplier_invoice = invoice;
        self
    }
}

/// Batch-level stock operations.
#[derive(Debug, Clone)]
pub struct BatchLedger {
    db: Database,
    locks: Arc<ProductLocks>,
}

impl BatchLedger {
    pub fn new(db: Database, locks: Arc<ProductLocks>) -> Self {
        BatchLedger { db, locks }
    }

    /// Appends a new batch and its `purchase` movement.
    ///
    /// ## Errors
    /// - `InvalidQuantity` when quantity is not positive or too large
    /// - `Validation` for a unit cost outside the accepted range
    /// - `NotFound` for an unknown product or supplier
    pub async fn receive_batch(&self, request: ReceiveBatch) -> LedgerResult<Batch> {
        validate_quantity(request.quantity).map_err(|e| LedgerError::InvalidQuantity {
            quantity: request.quantity,
            reason: e.to_string(),
        })?;
        validate_price_paise("unit_cost", request.unit_cost_paise)?;

        if self.db.products().get_by_id(&request.product_id).await?.is_none() {
            return Err(LedgerError::not_found("Product", &request.product_id));
        }
        if let Some(supplier_id) = &request.supplier_id {
            if self.db.suppliers().get_by_id(supplier_id).await?.is_none() {
                return Err(LedgerError::not_found("Supplier", supplier_id));
            }
        }

        let now = Utc::now();
        let batch = Batch {
            id: generate_batch_id(),
            product_id: request.product_id,
            supplier_id: request.supplier_id,
            supplier_invoice: request.supplier_invoice,
            original_quantity: request.quantity,
            quantity_remaining: request.quantity,
            unit_cost_paise: request.unit_cost_paise,
            received_at: request.received_at.unwrap_or(now),
            expiry_date: request.expiry_date,
        };

        let mut tx = self.db.begin_write().await?;
        let written = insert_in(&mut tx, &batch, now).await;
        finish(tx, written).await?;

        info!(
            product_id = %batch.product_id,
            batch_id = %batch.id,
            quantity = batch.original_quantity,
            unit_cost_paise = batch.unit_cost_paise,
            "Batch received"
        );
        Ok(batch)
    }

    /// Consumes `quantity` units of one product, oldest batches first.
    ///
    /// Expired batches are skipped. Returns the takes in consumption order.
    pub async fn reserve_and_consume(
        &self,
        product_id: &str,
        quantity: i64,
    ) -> LedgerResult<Vec<BatchTake>> {
        let _guards = self.locks.acquire([product_id]).await?;

        let mut tx = self.db.begin_write().await?;
        let consumed = consume_in(&mut tx, product_id, quantity, None, today(), Utc::now()).await;
        finish(tx, consumed).await
    }

    /// Puts consumed quantities back on their batches.
    ///
    /// ## Errors
    /// - `InconsistentReversal` if a named batch no longer exists or the
    ///   restore would exceed what the batch has given out; nothing is
    ///   restored in that case
    pub async fn reverse(&self, takes: &[BatchTake], reference: Option<&str>) -> LedgerResult<()> {
        let mut product_ids = Vec::with_capacity(takes.len());
        for take in takes {
            match self.db.batches().get_by_id(&take.batch_id).await? {
                Some(batch) => product_ids.push(batch.product_id),
                None => return Err(inconsistent(&take.batch_id, "batch no longer exists")),
            }
        }

        let _guards = self.locks.acquire(product_ids.iter().map(String::as_str)).await?;
        let mut tx = self.db.begin_write().await?;
        let restored = reverse_in(&mut tx, takes, reference, Utc::now()).await;
        finish(tx, restored).await
    }

    /// Manual correction of one batch (count mismatch, damage, found stock).
    ///
    /// Changes both the received and remaining quantity and appends an
    /// `adjustment` movement carrying `note`.
    pub async fn adjust(&self, batch_id: &str, delta: i64, note: &str) -> LedgerResult<Batch> {
        if delta == 0 {
            return Err(LedgerError::InvalidQuantity {
                quantity: delta,
                reason: "adjustment must change the quantity".to_string(),
            });
        }

        let product_id = self
            .db
            .batches()
            .get_by_id(batch_id)
            .await?
            .map(|b| b.product_id)
            .ok_or_else(|| LedgerError::not_found("Batch", batch_id))?;

        let _guards = self.locks.acquire([product_id.as_str()]).await?;
        let mut tx = self.db.begin_write().await?;
        let adjusted = adjust_in(&mut tx, batch_id, delta, note).await;
        let batch = finish(tx, adjusted).await?;

        info!(batch_id = %batch_id, delta, "Batch adjusted");
        Ok(batch)
    }

    /// Zeroes every expired batch of a product that still holds stock.
    pub async fn write_off_expired(&self, product_id: &str) -> LedgerResult<Vec<BatchTake>> {
        if self.db.products().get_by_id(product_id).await?.is_none() {
            return Err(LedgerError::not_found("Product", product_id));
        }

        let _guards = self.locks.acquire([product_id]).await?;
        let mut tx = self.db.begin_write().await?;
        let written_off = write_off_in(&mut tx, product_id, today(), Utc::now()).await;
        let takes = finish(tx, written_off).await?;

        if !takes.is_empty() {
            info!(product_id = %product_id, batches = takes.len(), "Expired stock written off");
        }
        Ok(takes)
    }

    /// Purchase history of a product in FIFO order, empty batches included.
    pub async fn batches(&self, product_id: &str) -> LedgerResult<Vec<Batch>> {
        Ok(self.db.batches().list_for_product(product_id).await?)
    }

    /// Movement journal of a product, oldest first.
    pub async fn movements(&self, product_id: &str) -> LedgerResult<Vec<StockMovement>> {
        Ok(self.db.movements().list_for_product(product_id).await?)
    }

    /// Units a sale could draw right now.
    pub async fn available(&self, product_id: &str) -> LedgerResult<i64> {
        let batches = self.db.batches().list_for_product(product_id).await?;
        Ok(BatchQueue::from_batches(product_id, &batches).available(today()))
    }
}

// =============================================================================
// Transaction-level operations
// =============================================================================

/// FIFO consumption inside an open write transaction.
///
/// Re-reads the product's batches through `tx`, so several lines for the
/// same product in one transaction see each other's consumption.
pub(crate) async fn consume_in(
    tx: &mut LedgerTx,
    product_id: &str,
    quantity: i64,
    reference: Option<&str>,
    today: NaiveDate,
    at: DateTime<Utc>,
) -> LedgerResult<Vec<BatchTake>> {
    let batches = tx.batches_for_product(product_id).await?;
    let queue = BatchQueue::from_batches(product_id, &batches);

    let takes = queue.plan(quantity, today).map_err(|e| {
        let err = LedgerError::from(e);
        if let LedgerError::InsufficientStock { available, .. } = &err {
            warn!(product_id = %product_id, requested = quantity, available, "Insufficient stock");
        }
        err
    })?;

    for take in &takes {
        tx.change_remaining(&take.batch_id, -take.quantity).await?;
        tx.record_movement(&movement(
            &take.batch_id,
            product_id,
            -take.quantity,
            MovementReason::Sale,
            reference.map(str::to_string),
            at,
        ))
        .await?;
    }

    debug!(product_id = %product_id, quantity, batches = takes.len(), "Stock consumed");
    Ok(takes)
}

async fn insert_in(tx: &mut LedgerTx, batch: &Batch, at: DateTime<Utc>) -> LedgerResult<()> {
    tx.insert_batch(batch).await?;
    tx.record_movement(&movement(
        &batch.id,
        &batch.product_id,
        batch.original_quantity,
        MovementReason::Purchase,
        batch.supplier_invoice.clone(),
        at,
    ))
    .await?;
    Ok(())
}

async fn adjust_in(tx: &mut LedgerTx, batch_id: &str, delta: i64, note: &str) -> LedgerResult<Batch> {
    let batch = tx
        .batch(batch_id)
        .await?
        .ok_or_else(|| LedgerError::not_found("Batch", batch_id))?;
    if batch.quantity_remaining + delta < 0 {
        return Err(LedgerError::InvalidQuantity {
            quantity: delta,
            reason: format!("batch has only {} left", batch.quantity_remaining),
        });
    }

    tx.change_received(batch_id, delta).await?;
    let note = note.trim();
    tx.record_movement(&movement(
        batch_id,
        &batch.product_id,
        delta,
        MovementReason::Adjustment,
        (!note.is_empty()).then(|| note.to_string()),
        Utc::now(),
    ))
    .await?;

    Ok(Batch {
        original_quantity: batch.original_quantity + delta,
        quantity_remaining: batch.quantity_remaining + delta,
        ..batch
    })
}

async fn write_off_in(
    tx: &mut LedgerTx,
    product_id: &str,
    today: NaiveDate,
    at: DateTime<Utc>,
) -> LedgerResult<Vec<BatchTake>> {
    let mut takes = Vec::new();

    for batch in tx.batches_for_product(product_id).await? {
        if !batch.is_expired(today) || batch.quantity_remaining == 0 {
            continue;
        }
        tx.change_remaining(&batch.id, -batch.quantity_remaining).await?;
        tx.record_movement(&movement(
            &batch.id,
            product_id,
            -batch.quantity_remaining,
            MovementReason::ExpiryWriteoff,
            batch.expiry_date.map(|d| format!("expired {}", d)),
            at,
        ))
        .await?;
        takes.push(BatchTake {
            batch_id: batch.id,
            quantity: batch.quantity_remaining,
            unit_cost_paise: batch.unit_cost_paise,
        });
    }

    Ok(takes)
}

/// Restores takes inside an open write transaction, appending one
/// `void_reversal` movement per take.
///
/// Every batch is checked before any quantity changes: it must exist and
/// the restored units, summed per batch, must fit in what it has given out.
pub(crate) async fn reverse_in(
    tx: &mut LedgerTx,
    takes: &[BatchTake],
    reference: Option<&str>,
    at: DateTime<Utc>,
) -> LedgerResult<()> {
    let mut owners = Vec::with_capacity(takes.len());
    let mut restoring: HashMap<&str, i64> = HashMap::new();
    for take in takes {
        if take.quantity <= 0 {
            return Err(inconsistent(
                &take.batch_id,
                &format!("restored quantity must be positive, got {}", take.quantity),
            ));
        }
        let batch = match tx.batch(&take.batch_id).await? {
            Some(batch) => batch,
            None => return Err(inconsistent(&take.batch_id, "batch no longer exists")),
        };

        let pending = restoring.entry(take.batch_id.as_str()).or_insert(0);
        *pending += take.quantity;
        if *pending > batch.quantity_consumed() {
            return Err(inconsistent(
                &take.batch_id,
                &format!(
                    "restoring {} units but only {} were consumed",
                    pending,
                    batch.quantity_consumed()
                ),
            ));
        }
        owners.push(batch.product_id);
    }

    for (take, product_id) in takes.iter().zip(&owners) {
        tx.change_remaining(&take.batch_id, take.quantity).await?;
        tx.record_movement(&movement(
            &take.batch_id,
            product_id,
            take.quantity,
            MovementReason::VoidReversal,
            reference.map(str::to_string),
            at,
        ))
        .await?;
    }

    Ok(())
}

/// Commits on success. On failure rolls back explicitly before handing the
/// error back, so no partial mutation is ever visible.
pub(crate) async fn finish<T>(tx: LedgerTx, outcome: LedgerResult<T>) -> LedgerResult<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                error!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn inconsistent(batch_id: &str, reason: &str) -> LedgerError {
    error!(batch_id = %batch_id, reason, "Reversal does not match the ledger");
    LedgerError::InconsistentReversal {
        batch_id: batch_id.to_string(),
        reason: reason.to_string(),
    }
}

fn movement(
    batch_id: &str,
    product_id: &str,
    delta: i64,
    reason: MovementReason,
    reference: Option<String>,
    at: DateTime<Utc>,
) -> StockMovement {
    StockMovement {
        id: generate_movement_id(),
        batch_id: batch_id.to_string(),
        product_id: product_id.to_string(),
        delta,
        reason,
        reference,
        created_at: at,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
