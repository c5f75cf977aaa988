//! # kirana-core: Pure Ledger Logic
//!
//! Everything the inventory ledger and billing engine decides without
//! touching a database: money, GST, FIFO planning and valuation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Kirana Ledger Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Storefront UI (external caller)                    │   │
//! │  │    Purchase entry ──► Billing ──► Reports ──► Export           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │     kirana-ledger: locks, transactions, exposed operations      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kirana-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────┐  │   │
//! │  │   │  types  │ │  money  │ │   tax   │ │   fifo   │ │valuation│ │   │
//! │  │   │ Batch   │ │  Money  │ │ CGST/   │ │ Batch    │ │ value,  │ │   │
//! │  │   │ Invoice │ │ paise   │ │ SGST/.. │ │ Queue    │ │ expiry  │ │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └──────────┘ └────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO LOCKS • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                kirana-db (Ledger Store, SQLite)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Batch, Invoice, ...)
//! - [`money`] - Money in paise with half-even rounding
//! - [`tax`] - Per-line GST breakdown
//! - [`fifo`] - FIFO batch consumption planner
//! - [`valuation`] - Stock value, low-stock and expiry window
//! - [`fiscal`] - Fiscal-year invoice labels
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation, GSTIN checks
//!
//! ## Example Usage
//!
//! ```rust
//! use kirana_core::money::Money;
//! use kirana_core::types::TaxRate;
//!
//! let subtotal = Money::from_paise(1000);
//! let cgst = subtotal.apply_rate(TaxRate::from_bps(900));
//! assert_eq!(cgst.paise(), 90);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod fifo;
pub mod fiscal;
pub mod money;
pub mod tax;
pub mod types;
pub mod validation;
pub mod valuation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use fifo::BatchQueue;
pub use money::Money;
pub use tax::{compute_line, TaxBreakdown};
pub use types::*;
pub use valuation::{ExpiryWindow, StockPosition};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest quantity accepted on one invoice line or purchase entry.
///
/// Catches typing slips (10000 for 100) before they reach the ledger.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

/// Largest unit price or unit cost, in paise (₹1 crore).
///
/// With [`MAX_LINE_QUANTITY`] this keeps a line subtotal under 10^15 paise.
pub const MAX_UNIT_PRICE_PAISE: i64 = 1_000_000_000;

/// Reorder threshold used when a product is created without one.
pub const DEFAULT_REORDER_THRESHOLD: i64 = 5;
