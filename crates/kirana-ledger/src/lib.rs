//! # kirana-ledger: Ledger Engine
//!
//! The operations a storefront calls: receive purchases, post and void
//! invoices, value stock and export reports.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Ledger Engine Layout                            │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 LedgerService (single entry point)               │  │
//! │  │                                                                  │  │
//! │  │  Built once from LedgerConfig; owns Database + ProductLocks     │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │     ┌──────────────┬──────────┼───────────────┬──────────────┐         │
//! │     ▼              ▼          ▼               ▼              ▼          │
//! │  ┌─────────┐ ┌───────────┐ ┌───────────┐ ┌──────────┐ ┌──────────┐    │
//! │  │ Batch   │ │ Invoice   │ │ Valuation │ │ Master   │ │ Export   │    │
//! │  │ Ledger  │ │ Engine    │ │ Engine    │ │ Data     │ │ rows     │    │
//! │  │         │ │           │ │           │ │          │ │          │    │
//! │  │ FIFO    │ │ post/void │ │ value,    │ │ slabs,   │ │ CSV,     │    │
//! │  │ consume │ │ all-or-   │ │ low stock,│ │ products,│ │ JSON     │    │
//! │  │ reverse │ │ nothing   │ │ expiry    │ │ parties  │ │          │    │
//! │  └────┬────┘ └─────┬─────┘ └───────────┘ └──────────┘ └──────────┘    │
//! │       │            │                                                    │
//! │       └─────┬──────┘                                                    │
//! │             ▼                                                           │
//! │  ┌──────────────────────┐    ┌──────────────────────────────────────┐  │
//! │  │ ProductLocks         │    │ kirana-db LedgerTx                   │  │
//! │  │ sorted, one deadline │───►│ one SQLite write transaction         │  │
//! │  └──────────────────────┘    └──────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`service`] - `LedgerService`, every exposed operation
//! - [`batch_ledger`] - Purchases, FIFO consumption, reversal, adjustments
//! - [`invoice_engine`] - Invoice posting, voiding, sales reports
//! - [`valuation_engine`] - Stock value, low-stock and expiry reports
//! - [`master_data`] - Tax slabs, products, customers, suppliers
//! - [`export`] - Spreadsheet rows as CSV or JSON
//! - [`locks`] - Per-product consumption locks
//! - [`config`] - `kirana.toml` + environment configuration
//! - [`telemetry`] - `tracing` subscriber setup for binaries
//! - [`error`] - `LedgerError`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kirana_ledger::{LedgerConfig, LedgerService, LineRequest};
//!
//! let config = LedgerConfig::load()?;
//! let ledger = LedgerService::open(&config).await?;
//!
//! let invoice = ledger
//!     .post_invoice(&customer_id, &[LineRequest::new(&product_id, 2)])
//!     .await?;
//! println!("Posted {}", invoice.display_number);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod batch_ledger;
pub mod config;
pub mod error;
pub mod export;
pub mod invoice_engine;
pub mod locks;
pub mod master_data;
pub mod service;
pub mod telemetry;
pub mod valuation_engine;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use batch_ledger::{BatchLedger, ReceiveBatch};
pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use export::{
    batch_take_rows, invoice_line_rows, to_csv, to_json, BatchTakeExportRow, ExportRow,
    InvoiceLineExportRow,
};
pub use invoice_engine::{InvoiceEngine, InvoiceSettings, LineRequest, SalesReport};
pub use locks::{ProductGuards, ProductLocks};
pub use master_data::{MasterData, NewCustomer, NewProduct, NewSupplier, NewTaxSlab};
pub use service::LedgerService;
pub use telemetry::{init_tracing, try_init_tracing};
pub use valuation_engine::{LowStockSignal, PurchaseHistoryRow, StockValuationRow, ValuationEngine};
