//! # Tax Slab Repository
//!
//! GST slab master data. Slabs are insert-only: editing a rate would
//! silently change how unposted stock is taxed, so a new rate is a new slab.

use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use kirana_core::TaxSlab;

/// Repository for GST slabs.
#[derive(Debug, Clone)]
pub struct TaxSlabRepository {
    pool: SqlitePool,
}

impl TaxSlabRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TaxSlabRepository { pool }
    }

    /// Inserts a new slab.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - a slab with that name exists
    pub async fn insert(&self, slab: &TaxSlab) -> DbResult<()> {
        debug!(name = %slab.name, "Inserting tax slab");

        sqlx::query(
            r#"
            INSERT INTO tax_slabs (id, name, cgst_bps, sgst_bps, cess_bps, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&slab.id)
        .bind(&slab.name)
        .bind(slab.cgst_bps)
        .bind(slab.sgst_bps)
        .bind(slab.cess_bps)
        .bind(slab.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<TaxSlab>> {
        fetch_by_id(&self.pool, id).await
    }

    /// Lists slabs ordered by combined rate, lowest first.
    pub async fn list(&self) -> DbResult<Vec<TaxSlab>> {
        let slabs = sqlx::query_as::<_, TaxSlab>(
            r#"
            SELECT id, name, cgst_bps, sgst_bps, cess_bps, created_at
            FROM tax_slabs
            ORDER BY cgst_bps + sgst_bps, cess_bps, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(slabs)
    }
}

pub(crate) async fn fetch_by_id<'e, E>(executor: E, id: &str) -> DbResult<Option<TaxSlab>>
where
    E: SqliteExecutor<'e>,
{
    let slab = sqlx::query_as::<_, TaxSlab>(
        r#"
        SELECT id, name, cgst_bps, sgst_bps, cess_bps, created_at
        FROM tax_slabs
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(slab)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::test_support::{memory_db, slab};

    #[tokio::test]
    async fn test_insert_and_list_ordered_by_rate() {
        let db = memory_db().await;
        let repo = db.tax_slabs();

        repo.insert(&slab("GST 18%", 900, 900, 0)).await.unwrap();
        repo.insert(&slab("GST 5%", 250, 250, 0)).await.unwrap();
        repo.insert(&slab("GST 28% + cess", 1400, 1400, 1200)).await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["GST 5%", "GST 18%", "GST 28% + cess"]);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = memory_db().await;
        let repo = db.tax_slabs();

        repo.insert(&slab("GST 12%", 600, 600, 0)).await.unwrap();
        let err = repo.insert(&slab("GST 12%", 600, 600, 0)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_get_by_id_roundtrips_rates() {
        let db = memory_db().await;
        let s = slab("GST 18% + 1%", 900, 900, 100);
        db.tax_slabs().insert(&s).await.unwrap();

        let loaded = db.tax_slabs().get_by_id(&s.id).await.unwrap().unwrap();
        assert_eq!(loaded.cgst_bps, 900);
        assert_eq!(loaded.cess_bps, 100);
        assert!(db.tax_slabs().get_by_id("missing").await.unwrap().is_none());
    }
}
