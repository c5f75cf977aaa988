//! # Batch Repository
//!
//! Batch rows are the ledger's stock. Reads through [`BatchRepository`] use
//! the pool; every quantity change goes through [`crate::LedgerTx`], which
//! calls the executor-generic functions below inside its write transaction.
//!
//! ## Quantity Guards
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  UPDATE batches SET quantity_remaining = quantity_remaining + Δ     │
//! │                                                                     │
//! │  CHECK (quantity_remaining >= 0)   → negative stock aborts the     │
//! │                                      statement (ConstraintViolation)│
//! │  BEFORE DELETE trigger             → batches are never deleted     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kirana_core::Batch;

/// Read access to batches.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Batch>> {
        fetch_by_id(&self.pool, id).await
    }

    /// All batches of a product in FIFO order, empty ones included
    /// (purchase history).
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<Batch>> {
        fetch_for_product(&self.pool, product_id).await
    }

    /// Batches with stock left whose expiry falls in `[from, until]`.
    pub async fn list_expiring(&self, from: NaiveDate, until: NaiveDate) -> DbResult<Vec<Batch>> {
        fetch_expiring(&self.pool, from, until).await
    }
}

pub(crate) async fn fetch_by_id<'e, E>(executor: E, id: &str) -> DbResult<Option<Batch>>
where
    E: SqliteExecutor<'e>,
{
    let batch = sqlx::query_as::<_, Batch>(
        r#"
        SELECT
            id, product_id, supplier_id, supplier_invoice, original_quantity,
            quantity_remaining, unit_cost_paise, received_at, expiry_date
        FROM batches
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(batch)
}

pub(crate) async fn fetch_for_product<'e, E>(executor: E, product_id: &str) -> DbResult<Vec<Batch>>
where
    E: SqliteExecutor<'e>,
{
    let batches = sqlx::query_as::<_, Batch>(
        r#"
        SELECT
            id, product_id, supplier_id, supplier_invoice, original_quantity,
            quantity_remaining, unit_cost_paise, received_at, expiry_date
        FROM batches
        WHERE product_id = ?1
        ORDER BY received_at, id
        "#,
    )
    .bind(product_id)
    .fetch_all(executor)
    .await?;

    Ok(batches)
}

/// Every batch that still holds stock, grouped by product.
pub(crate) async fn fetch_in_stock<'e, E>(executor: E) -> DbResult<Vec<Batch>>
where
    E: SqliteExecutor<'e>,
{
    let batches = sqlx::query_as::<_, Batch>(
        r#"
        SELECT
            id, product_id, supplier_id, supplier_invoice, original_quantity,
            quantity_remaining, unit_cost_paise, received_at, expiry_date
        FROM batches
        WHERE quantity_remaining > 0
        ORDER BY product_id, received_at, id
        "#,
    )
    .fetch_all(executor)
    .await?;

    Ok(batches)
}

pub(crate) async fn fetch_expiring<'e, E>(
    executor: E,
    from: NaiveDate,
    until: NaiveDate,
) -> DbResult<Vec<Batch>>
where
    E: SqliteExecutor<'e>,
{
    let batches = sqlx::query_as::<_, Batch>(
        r#"
        SELECT
            id, product_id, supplier_id, supplier_invoice, original_quantity,
            quantity_remaining, unit_cost_paise, received_at, expiry_date
        FROM batches
        WHERE expiry_date IS NOT NULL
          AND expiry_date BETWEEN ?1 AND ?2
          AND quantity_remaining > 0
        ORDER BY expiry_date, received_at, id
        "#,
    )
    .bind(from)
    .bind(until)
    .fetch_all(executor)
    .await?;

    Ok(batches)
}

pub(crate) async fn insert<'e, E>(executor: E, batch: &Batch) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(product_id = %batch.product_id, quantity = batch.original_quantity, "Inserting batch");

    sqlx::query(
        r#"
        INSERT INTO batches (
            id, product_id, supplier_id, supplier_invoice, original_quantity,
            quantity_remaining, unit_cost_paise, received_at, expiry_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&batch.id)
    .bind(&batch.product_id)
    .bind(&batch.supplier_id)
    .bind(&batch.supplier_invoice)
    .bind(batch.original_quantity)
    .bind(batch.quantity_remaining)
    .bind(batch.unit_cost_paise)
    .bind(batch.received_at)
    .bind(batch.expiry_date)
    .execute(executor)
    .await?;

    Ok(())
}

/// Adds `delta` to the remaining quantity (negative for consumption).
pub(crate) async fn change_remaining<'e, E>(executor: E, id: &str, delta: i64) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE batches
        SET quantity_remaining = quantity_remaining + ?2
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(delta)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Batch", id));
    }

    Ok(())
}

/// Adds `delta` to both original and remaining quantity (manual correction).
pub(crate) async fn change_received<'e, E>(executor: E, id: &str, delta: i64) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE batches
        SET original_quantity = original_quantity + ?2,
            quantity_remaining = quantity_remaining + ?2
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(delta)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Batch", id));
    }

    Ok(())
}

/// Time-ordered id for a new batch.
pub fn generate_batch_id() -> String {
    Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{batch, memory_db, seeded_product};
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_list_for_product_is_fifo_ordered() {
        let db = memory_db().await;
        let p = seeded_product(&db, "Maggi").await;
        let now = Utc::now();

        let late = batch(&p.id, 5, 100, now);
        let early = batch(&p.id, 5, 90, now - Duration::hours(2));
        insert(db.pool(), &late).await.unwrap();
        insert(db.pool(), &early).await.unwrap();

        let ids: Vec<String> = db
            .batches()
            .list_for_product(&p.id)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![early.id, late.id]);
    }

    #[tokio::test]
    async fn test_remaining_stays_within_received() {
        let db = memory_db().await;
        let p = seeded_product(&db, "Bread").await;
        let b = batch(&p.id, 3, 2500, Utc::now());
        insert(db.pool(), &b).await.unwrap();

        change_remaining(db.pool(), &b.id, -3).await.unwrap();
        let err = change_remaining(db.pool(), &b.id, -1).await.unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));

        change_remaining(db.pool(), &b.id, 3).await.unwrap();
        let err = change_remaining(db.pool(), &b.id, 1).await.unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));

        let stored = db.batches().get_by_id(&b.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity_remaining, 3);
        assert_eq!(stored.original_quantity, 3);
    }

    #[tokio::test]
    async fn test_change_missing_batch_is_not_found() {
        let db = memory_db().await;
        let err = change_remaining(db.pool(), "nope", 1).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_batches_cannot_be_deleted() {
        let db = memory_db().await;
        let p = seeded_product(&db, "Curd").await;
        let b = batch(&p.id, 1, 100, Utc::now());
        insert(db.pool(), &b).await.unwrap();

        let result = sqlx::query("DELETE FROM batches WHERE id = ?1")
            .bind(&b.id)
            .execute(db.pool())
            .await;
        assert!(matches!(result.map_err(DbError::from), Err(DbError::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_expiring_window() {
        let db = memory_db().await;
        let p = seeded_product(&db, "Milk").await;
        let today = Utc::now().date_naive();

        let mut soon = batch(&p.id, 4, 50, Utc::now());
        soon.expiry_date = Some(today + Duration::days(2));
        let mut later = batch(&p.id, 4, 50, Utc::now());
        later.expiry_date = Some(today + Duration::days(30));
        insert(db.pool(), &soon).await.unwrap();
        insert(db.pool(), &later).await.unwrap();

        let found = db.batches().list_expiring(today, today + Duration::days(7)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, soon.id);

        let in_stock = fetch_in_stock(db.pool()).await.unwrap();
        assert_eq!(in_stock.len(), 2);
    }
}
