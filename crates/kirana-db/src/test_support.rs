//! Fixtures shared by the repository tests.

use chrono::{DateTime, Utc};
use kirana_core::{Batch, Customer, Jurisdiction, Product, TaxSlab};
use uuid::Uuid;

use crate::pool::{Database, DbConfig};

pub async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub fn slab(name: &str, cgst_bps: u32, sgst_bps: u32, cess_bps: u32) -> TaxSlab {
    TaxSlab {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        cgst_bps,
        sgst_bps,
        cess_bps,
        created_at: Utc::now(),
    }
}

pub fn product(name: &str, tax_slab_id: &str) -> Product {
    let now = Utc::now();
    Product {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        brand: None,
        unit: "pcs".to_string(),
        sale_price_paise: 1000,
        reorder_threshold: 5,
        tax_slab_id: tax_slab_id.to_string(),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub fn customer(name: &str, jurisdiction: Jurisdiction) -> Customer {
    Customer {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        gstin: None,
        jurisdiction,
        address: None,
        contact: None,
        created_at: Utc::now(),
    }
}

pub fn batch(product_id: &str, quantity: i64, unit_cost_paise: i64, received_at: DateTime<Utc>) -> Batch {
    Batch {
        id: Uuid::now_v7().to_string(),
        product_id: product_id.to_string(),
        supplier_id: None,
        supplier_invoice: None,
        original_quantity: quantity,
        quantity_remaining: quantity,
        unit_cost_paise,
        received_at,
        expiry_date: None,
    }
}

/// Inserts a 0% slab and a product using it.
pub async fn seeded_product(db: &Database, name: &str) -> Product {
    let s = slab(&format!("Slab for {}", name), 0, 0, 0);
    db.tax_slabs().insert(&s).await.unwrap();
    let p = product(name, &s.id);
    db.products().insert(&p).await.unwrap();
    p
}
