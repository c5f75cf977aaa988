//! # kirana-db: Ledger Store
//!
//! SQLite persistence for the batch ledger and invoices, using sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kirana Ledger Data Flow                          │
//! │                                                                         │
//! │  kirana-ledger engine (receive / post_invoice / void / reports)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kirana-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │   (reads)     │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │    │ BatchRepo     │    │ 001_initial  │  │   │
//! │  │   │ begin_write() │───►│ InvoiceRepo   │    │  _schema.sql │  │   │
//! │  │   │  = LedgerTx   │    │ ...           │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`transaction`] - The write transaction every mutation runs in
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Per-table read access
//! - [`snapshot`] - Consistent stock reads for reports
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kirana_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("kirana.db")).await?;
//!
//! let mut tx = db.begin_write().await?;
//! let batches = tx.batches_for_product(&product_id).await?;
//! // ...
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod snapshot;
pub mod transaction;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use snapshot::StockSnapshot;
pub use transaction::LedgerTx;

// Repository re-exports for convenience
pub use repository::batch::generate_batch_id;
pub use repository::invoice::generate_invoice_id;
pub use repository::movement::generate_movement_id;
pub use repository::product::generate_product_id;
pub use repository::{
    BatchRepository, CustomerRepository, InvoiceRepository, MovementRepository, ProductRepository,
    ProductSales, SupplierRepository, TaxSlabRepository,
};
