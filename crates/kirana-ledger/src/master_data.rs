//! # Master Data
//!
//! Tax slabs, products, customers and suppliers. Names are normalised and
//! validated on the way in; a customer's jurisdiction is derived from the
//! GSTIN state code unless given explicitly.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use kirana_core::validation::{
    format_name, jurisdiction_for, validate_gstin, validate_name, validate_price_paise,
    validate_reorder_threshold, validate_tax_slab,
};
use kirana_core::{Customer, Jurisdiction, Product, Supplier, TaxSlab};
use kirana_db::{generate_product_id, Database};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTaxSlab {
    pub name: String,
    pub cgst_bps: u32,
    pub sgst_bps: u32,
    pub cess_bps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub brand: Option<String>,
    pub unit: Option<String>,
    pub sale_price_paise: i64,
    /// Falls back to the configured default.
    pub reorder_threshold: Option<i64>,
    pub tax_slab_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCustomer {
    pub name: String,
    pub gstin: Option<String>,
    /// Overrides the jurisdiction derived from the GSTIN.
    pub jurisdiction: Option<Jurisdiction>,
    pub address: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSupplier {
    pub name: String,
    pub gstin: Option<String>,
    pub contact: Option<String>,
}

/// Creates and lists master records.
#[derive(Debug, Clone)]
pub struct MasterData {
    db: Database,
    seller_state_code: String,
    default_reorder_threshold: i64,
}

impl MasterData {
    pub fn new(db: Database, seller_state_code: impl Into<String>, default_reorder_threshold: i64) -> Self {
        MasterData {
            db,
            seller_state_code: seller_state_code.into(),
            default_reorder_threshold,
        }
    }

    pub async fn add_tax_slab(&self, request: NewTaxSlab) -> LedgerResult<TaxSlab> {
        let name = request.name.split_whitespace().collect::<Vec<_>>().join(" ");
        validate_name("name", &name)?;
        validate_tax_slab(request.cgst_bps, request.sgst_bps, request.cess_bps)?;

        let slab = TaxSlab {
            id: Uuid::new_v4().to_string(),
            name,
            cgst_bps: request.cgst_bps,
            sgst_bps: request.sgst_bps,
            cess_bps: request.cess_bps,
            created_at: Utc::now(),
        };
        self.db.tax_slabs().insert(&slab).await?;

        info!(name = %slab.name, gst_bps = slab.gst_rate().bps(), "Tax slab added");
        Ok(slab)
    }

    pub async fn tax_slabs(&self) -> LedgerResult<Vec<TaxSlab>> {
        Ok(self.db.tax_slabs().list().await?)
    }

    pub async fn add_product(&self, request: NewProduct) -> LedgerResult<Product> {
        validate_name("name", &request.name)?;
        validate_price_paise("sale_price", request.sale_price_paise)?;
        let reorder_threshold = request.reorder_threshold.unwrap_or(self.default_reorder_threshold);
        validate_reorder_threshold(reorder_threshold)?;

        if self.db.tax_slabs().get_by_id(&request.tax_slab_id).await?.is_none() {
            return Err(LedgerError::not_found("Tax slab", &request.tax_slab_id));
        }

        let unit = request
            .unit
            .map(|u| u.trim().to_lowercase())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| "pcs".to_string());
        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            name: format_name(&request.name),
            brand: optional_name(request.brand),
            unit,
            sale_price_paise: request.sale_price_paise,
            reorder_threshold,
            tax_slab_id: request.tax_slab_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.db.products().insert(&product).await?;

        info!(product_id = %product.id, name = %product.name, "Product added");
        Ok(product)
    }

    pub async fn set_reorder_threshold(&self, product_id: &str, threshold: i64) -> LedgerResult<()> {
        validate_reorder_threshold(threshold)?;
        Ok(self.db.products().set_reorder_threshold(product_id, threshold).await?)
    }

    /// Stops a product from being invoiced. Its batches and history stay.
    pub async fn deactivate_product(&self, product_id: &str) -> LedgerResult<()> {
        Ok(self.db.products().soft_delete(product_id).await?)
    }

    pub async fn products(&self) -> LedgerResult<Vec<Product>> {
        Ok(self.db.products().list_active().await?)
    }

    pub async fn add_customer(&self, request: NewCustomer) -> LedgerResult<Customer> {
        validate_name("name", &request.name)?;
        let gstin = request.gstin.as_deref().map(validate_gstin).transpose()?;
        let jurisdiction = request
            .jurisdiction
            .unwrap_or_else(|| jurisdiction_for(gstin.as_deref(), &self.seller_state_code));

        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: format_name(&request.name),
            gstin,
            jurisdiction,
            address: trimmed(request.address),
            contact: trimmed(request.contact),
            created_at: Utc::now(),
        };
        self.db.customers().insert(&customer).await?;

        info!(
            customer_id = %customer.id,
            jurisdiction = customer.jurisdiction.as_str(),
            "Customer added"
        );
        Ok(customer)
    }

    pub async fn customers(&self) -> LedgerResult<Vec<Customer>> {
        Ok(self.db.customers().list().await?)
    }

    pub async fn add_supplier(&self, request: NewSupplier) -> LedgerResult<Supplier> {
        validate_name("name", &request.name)?;
        let gstin = request.gstin.as_deref().map(validate_gstin).transpose()?;

        let supplier = Supplier {
            id: Uuid::new_v4().to_string(),
            name: format_name(&request.name),
            gstin,
            contact: trimmed(request.contact),
            created_at: Utc::now(),
        };
        self.db.suppliers().insert(&supplier).await?;

        info!(supplier_id = %supplier.id, name = %supplier.name, "Supplier added");
        Ok(supplier)
    }

    pub async fn suppliers(&self) -> LedgerResult<Vec<Supplier>> {
        Ok(self.db.suppliers().list().await?)
    }
}

fn optional_name(value: Option<String>) -> Option<String> {
    value.map(|v| format_name(&v)).filter(|v| !v.is_empty())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ledger_fixture;

    fn master(db: &Database) -> MasterData {
        MasterData::new(db.clone(), "27", 5)
    }

    fn slab(name: &str, cgst_bps: u32, sgst_bps: u32) -> NewTaxSlab {
        NewTaxSlab {
            name: name.to_string(),
            cgst_bps,
            sgst_bps,
            cess_bps: 0,
        }
    }

    #[tokio::test]
    async fn test_tax_slabs_are_validated_and_unique() {
        let fx = ledger_fixture().await;
        let m = master(&fx.db);

        let gst18 = m.add_tax_slab(slab("  GST   18% ", 900, 900)).await.unwrap();
        assert_eq!(gst18.name, "GST 18%");

        let err = m.add_tax_slab(slab("Odd", 900, 600)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let err = m.add_tax_slab(slab("GST 18%", 900, 900)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        assert_eq!(m.tax_slabs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_products_are_normalised() {
        let fx = ledger_fixture().await;
        let m = master(&fx.db);
        let s = m.add_tax_slab(slab("GST 5%", 250, 250)).await.unwrap();

        let product = m
            .add_product(NewProduct {
                name: "  tata   SALT ".to_string(),
                brand: Some(" tata ".to_string()),
                unit: Some(" KG ".to_string()),
                sale_price_paise: 2800,
                reorder_threshold: None,
                tax_slab_id: s.id.clone(),
            })
            .await
            .unwrap();
        assert_eq!(product.name, "Tata Salt");
        assert_eq!(product.brand.as_deref(), Some("Tata"));
        assert_eq!(product.unit, "kg");
        assert_eq!(product.reorder_threshold, 5);

        let err = m
            .add_product(NewProduct {
                name: "Ghost".to_string(),
                brand: None,
                unit: None,
                sale_price_paise: 100,
                reorder_threshold: Some(-1),
                tax_slab_id: s.id.clone(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let err = m
            .add_product(NewProduct {
                name: "Ghost".to_string(),
                brand: None,
                unit: None,
                sale_price_paise: 100,
                reorder_threshold: None,
                tax_slab_id: "no-such-slab".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));

        m.deactivate_product(&product.id).await.unwrap();
        assert!(m.products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_customer_jurisdiction_follows_gstin() {
        let fx = ledger_fixture().await;
        let m = master(&fx.db);
        let new = |gstin: Option<&str>| NewCustomer {
            name: "Patel Traders".to_string(),
            gstin: gstin.map(str::to_string),
            jurisdiction: None,
            address: None,
            contact: Some("  ".to_string()),
        };

        let local = m.add_customer(new(Some("27aapfu0939f1zv"))).await.unwrap();
        assert_eq!(local.jurisdiction, Jurisdiction::IntraState);
        assert_eq!(local.gstin.as_deref(), Some("27AAPFU0939F1ZV"));
        assert_eq!(local.contact, None);

        let remote = m.add_customer(new(Some("29AAPFU0939F1ZV"))).await.unwrap();
        assert_eq!(remote.jurisdiction, Jurisdiction::InterState);

        let walk_in = m.add_customer(new(None)).await.unwrap();
        assert_eq!(walk_in.jurisdiction, Jurisdiction::IntraState);

        let err = m.add_customer(new(Some("27-BAD"))).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        assert_eq!(m.customers().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_suppliers() {
        let fx = ledger_fixture().await;
        let m = master(&fx.db);

        let supplier = m
            .add_supplier(NewSupplier {
                name: "hindustan   unilever".to_string(),
                gstin: None,
                contact: None,
            })
            .await
            .unwrap();
        assert_eq!(supplier.name, "Hindustan Unilever");
        assert_eq!(m.suppliers().await.unwrap().len(), 1);

        let err = m
            .add_supplier(NewSupplier {
                name: "   ".to_string(),
                gstin: None,
                contact: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }
}
