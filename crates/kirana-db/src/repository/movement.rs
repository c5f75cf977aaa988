//! # Stock Movement Repository
//!
//! Append-only journal of batch quantity changes. Triggers in the schema
//! reject UPDATE and DELETE on `stock_movements`.

use sqlx::{SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::error::DbResult;
use kirana_core::StockMovement;

#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Movements of one product, oldest first.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, batch_id, product_id, delta, reason, reference, created_at
            FROM stock_movements
            WHERE product_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Movements written for one reference, e.g. every sale and reversal
    /// row of an invoice.
    pub async fn list_for_reference(&self, reference: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, batch_id, product_id, delta, reason, reference, created_at
            FROM stock_movements
            WHERE reference = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(reference)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Net of all movements of a batch. Equals its remaining quantity when
    /// the journal is consistent.
    pub async fn net_for_batch(&self, batch_id: &str) -> DbResult<i64> {
        let net: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(delta), 0) FROM stock_movements WHERE batch_id = ?1",
        )
        .bind(batch_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(net)
    }
}

pub(crate) async fn insert<'e, E>(executor: E, movement: &StockMovement) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO stock_movements (id, batch_id, product_id, delta, reason, reference, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.batch_id)
    .bind(&movement.product_id)
    .bind(movement.delta)
    .bind(movement.reason)
    .bind(&movement.reference)
    .bind(movement.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Time-ordered id for a new movement.
pub fn generate_movement_id() -> String {
    Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::batch;
    use crate::test_support::{memory_db, seeded_product};
    use chrono::Utc;
    use kirana_core::MovementReason;

    #[tokio::test]
    async fn test_movements_are_append_only() {
        let db = memory_db().await;
        let p = seeded_product(&db, "Soap").await;
        let b = crate::test_support::batch(&p.id, 10, 3000, Utc::now());
        batch::insert(db.pool(), &b).await.unwrap();

        let m = StockMovement {
            id: generate_movement_id(),
            batch_id: b.id.clone(),
            product_id: p.id.clone(),
            delta: 10,
            reason: MovementReason::Purchase,
            reference: None,
            created_at: Utc::now(),
        };
        insert(db.pool(), &m).await.unwrap();

        let update = sqlx::query("UPDATE stock_movements SET delta = 99 WHERE id = ?1")
            .bind(&m.id)
            .execute(db.pool())
            .await
            .map_err(DbError::from);
        assert!(matches!(update, Err(DbError::ConstraintViolation(_))));

        let listed = db.movements().list_for_product(&p.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].reason, MovementReason::Purchase);
        assert_eq!(db.movements().net_for_batch(&b.id).await.unwrap(), 10);
    }
}
