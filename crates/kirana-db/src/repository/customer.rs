//! # Customer Repository

use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use kirana_core::Customer;

/// Repository for billed customers.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(name = %customer.name, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, gstin, jurisdiction, address, contact, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.gstin)
        .bind(customer.jurisdiction)
        .bind(&customer.address)
        .bind(&customer.contact)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        fetch_by_id(&self.pool, id).await
    }

    /// Lists customers by name (the customer report).
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, gstin, jurisdiction, address, contact, created_at
            FROM customers
            ORDER BY name COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }
}

pub(crate) async fn fetch_by_id<'e, E>(executor: E, id: &str) -> DbResult<Option<Customer>>
where
    E: SqliteExecutor<'e>,
{
    let customer = sqlx::query_as::<_, Customer>(
        r#"
        SELECT id, name, gstin, jurisdiction, address, contact, created_at
        FROM customers
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(customer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{customer, memory_db};
    use kirana_core::Jurisdiction;

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = memory_db().await;
        let c = customer("Sharma Stores", Jurisdiction::InterState);
        db.customers().insert(&c).await.unwrap();

        let loaded = db.customers().get_by_id(&c.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Sharma Stores");
        assert_eq!(loaded.jurisdiction, Jurisdiction::InterState);
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let db = memory_db().await;
        db.customers().insert(&customer("zeta", Jurisdiction::IntraState)).await.unwrap();
        db.customers().insert(&customer("Alpha", Jurisdiction::IntraState)).await.unwrap();

        let names: Vec<String> = db.customers().list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Alpha", "zeta"]);
    }
}
