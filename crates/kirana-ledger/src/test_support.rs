//! Fixtures shared by the engine tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kirana_core::{Customer, Jurisdiction, Product, TaxSlab};
use kirana_db::{generate_product_id, Database, DbConfig};
use uuid::Uuid;

use crate::batch_ledger::BatchLedger;
use crate::locks::ProductLocks;

pub struct Fixture {
    pub db: Database,
    pub locks: Arc<ProductLocks>,
    pub ledger: BatchLedger,
    path: Option<PathBuf>,
}

impl Fixture {
    fn with_db(db: Database, path: Option<PathBuf>) -> Self {
        let locks = Arc::new(ProductLocks::new(Duration::from_secs(5)));
        let ledger = BatchLedger::new(db.clone(), locks.clone());
        Fixture { db, locks, ledger, path }
    }

    /// Closes the pool and deletes the database files of a file fixture.
    pub async fn cleanup(self) {
        self.db.close().await;
        if let Some(path) = self.path {
            for suffix in ["", "-wal", "-shm"] {
                let mut file = path.clone().into_os_string();
                file.push(suffix);
                let _ = std::fs::remove_file(file);
            }
        }
    }
}

/// In-memory ledger on a single connection.
pub async fn ledger_fixture() -> Fixture {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    Fixture::with_db(db, None)
}

/// File-backed ledger with several connections, for concurrency tests.
pub async fn file_fixture() -> Fixture {
    let path = std::env::temp_dir().join(format!("kirana-test-{}.db", Uuid::new_v4()));
    let db = Database::new(DbConfig::new(&path).max_connections(4)).await.unwrap();
    Fixture::with_db(db, Some(path))
}

/// Inserts a slab with the given rates and a product priced at ₹10.
pub async fn seed_product(db: &Database, name: &str, cgst_bps: u32, sgst_bps: u32, cess_bps: u32) -> Product {
    let slab = TaxSlab {
        id: Uuid::new_v4().to_string(),
        name: format!("{} slab", name),
        cgst_bps,
        sgst_bps,
        cess_bps,
        created_at: Utc::now(),
    };
    db.tax_slabs().insert(&slab).await.unwrap();

    let now = Utc::now();
    let product = Product {
        id: generate_product_id(),
        name: name.to_string(),
        brand: None,
        unit: "pcs".to_string(),
        sale_price_paise: 1000,
        reorder_threshold: 5,
        tax_slab_id: slab.id,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.products().insert(&product).await.unwrap();
    product
}

pub async fn seed_customer(db: &Database, name: &str, jurisdiction: Jurisdiction) -> Customer {
    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        gstin: None,
        jurisdiction,
        address: None,
        contact: None,
        created_at: Utc::now(),
    };
    db.customers().insert(&customer).await.unwrap();
    customer
}
