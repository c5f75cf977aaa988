//! # Domain Types
//!
//! Core domain types of the inventory ledger and billing engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │1 *│     Batch       │1 *│ StockMovement   │       │
//! │  │  ─────────────  │──►│  ─────────────  │──►│  ─────────────  │       │
//! │  │  id, name       │   │  remaining qty  │   │  delta, reason  │       │
//! │  │  reorder level  │   │  unit cost      │   │  (append-only)  │       │
//! │  │  tax_slab_id    │   │  received_at    │   └─────────────────┘       │
//! │  └─────────────────┘   │  expiry_date    │                              │
//! │                        └─────────────────┘                              │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Invoice      │1 *│  InvoiceLine    │1 *│   BatchTake     │       │
//! │  │  number, status │──►│  qty, price     │──►│  batch, qty,    │       │
//! │  │  totals         │   │  tax breakdown  │   │  unit cost      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity is keyed by a UUID string. Batches and movements use UUID v7
//! so their ids sort in creation order; the FIFO tie-break relies on that.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::tax::TaxBreakdown;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 900 bps = 9% (one half of the 18% GST slab).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage as typed on a slab form.
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Tax Slab
// =============================================================================

/// A GST rate slab: CGST and SGST halves plus an independent CESS.
///
/// ## Jurisdiction
/// ```text
/// Intra-state sale:  CGST (cgst_bps) + SGST (sgst_bps) + CESS
/// Inter-state sale:  IGST (cgst_bps + sgst_bps)        + CESS
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TaxSlab {
    pub id: String,
    /// Display label, e.g. "GST 18%".
    pub name: String,
    pub cgst_bps: u32,
    pub sgst_bps: u32,
    pub cess_bps: u32,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl TaxSlab {
    #[inline]
    pub fn cgst(&self) -> TaxRate {
        TaxRate::from_bps(self.cgst_bps)
    }

    #[inline]
    pub fn sgst(&self) -> TaxRate {
        TaxRate::from_bps(self.sgst_bps)
    }

    #[inline]
    pub fn cess(&self) -> TaxRate {
        TaxRate::from_bps(self.cess_bps)
    }

    /// Combined GST rate, charged as IGST on inter-state sales.
    #[inline]
    pub fn gst_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.cgst_bps + self.sgst_bps)
    }
}

// =============================================================================
// Jurisdiction
// =============================================================================

/// Where a customer sits relative to the seller's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Jurisdiction {
    /// Same state as the seller: CGST + SGST.
    IntraState,
    /// Another state: IGST.
    InterState,
}

impl Jurisdiction {
    /// True when the sale crosses a state border.
    #[inline]
    pub const fn is_cross(&self) -> bool {
        matches!(self, Jurisdiction::InterState)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Jurisdiction::IntraState => "intra_state",
            Jurisdiction::InterState => "inter_state",
        }
    }
}

impl Default for Jurisdiction {
    fn default() -> Self {
        Jurisdiction::IntraState
    }
}

// =============================================================================
// Parties
// =============================================================================

/// A billed customer.
///
/// Purchase history is not stored here; it is served from the invoices
/// that reference `id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// GST registration number (GSTIN), if the customer is registered.
    pub gstin: Option<String>,
    pub jurisdiction: Jurisdiction,
    pub address: Option<String>,
    pub contact: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A supplying company; purchase batches may reference one.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub gstin: Option<String>,
    pub contact: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A stocked product. Quantities live on its batches, not here.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub brand: Option<String>,
    /// Selling unit, e.g. "pcs", "kg".
    pub unit: String,
    /// List price in paise; an invoice line may override it.
    pub sale_price_paise: i64,
    /// Low-stock signal fires when on-hand falls below this. Never negative.
    pub reorder_threshold: i64,
    pub tax_slab_id: String,
    /// Soft delete flag. Inactive products cannot be invoiced.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_paise(self.sale_price_paise)
    }
}

// =============================================================================
// Batch
// =============================================================================

/// A lot of stock received at one time with its own cost and expiry.
///
/// ## Invariants
/// - `quantity_remaining >= 0`
/// - Batches of one product are ordered by `(received_at, id)`; that order
///   is the FIFO consumption order.
/// - A batch that reaches zero is kept for audit, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Batch {
    pub id: String,
    pub product_id: String,
    pub supplier_id: Option<String>,
    /// The supplier's own bill number for this purchase.
    pub supplier_invoice: Option<String>,
    /// Quantity as received, moved only by manual adjustments.
    pub original_quantity: i64,
    pub quantity_remaining: i64,
    pub unit_cost_paise: i64,
    #[ts(as = "String")]
    pub received_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
}

impl Batch {
    #[inline]
    pub fn unit_cost(&self) -> Money {
        Money::from_paise(self.unit_cost_paise)
    }

    /// Expired means the expiry date is strictly before `today`.
    /// A batch expiring today is still sellable today.
    #[inline]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.map_or(false, |expiry| expiry < today)
    }

    /// Units drawn from this batch so far (sold or written off).
    #[inline]
    pub fn quantity_consumed(&self) -> i64 {
        self.original_quantity - self.quantity_remaining
    }

    /// Remaining quantity valued at this batch's cost.
    #[inline]
    pub fn remaining_value(&self) -> Money {
        self.unit_cost().multiply_quantity(self.quantity_remaining)
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// Why a batch quantity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    Purchase,
    Sale,
    Adjustment,
    ExpiryWriteoff,
    /// Compensating movement written when a posted invoice is voided.
    VoidReversal,
}

impl MovementReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementReason::Purchase => "purchase",
            MovementReason::Sale => "sale",
            MovementReason::Adjustment => "adjustment",
            MovementReason::ExpiryWriteoff => "expiry_writeoff",
            MovementReason::VoidReversal => "void_reversal",
        }
    }
}

/// Immutable, append-only journal entry for one batch quantity change.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub batch_id: String,
    pub product_id: String,
    /// Signed: positive adds stock, negative removes it.
    pub delta: i64,
    pub reason: MovementReason,
    /// Invoice id for sales and reversals, free text for adjustments.
    pub reference: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Batch Take
// =============================================================================

/// One slice of a FIFO consumption: `quantity` units taken from `batch_id`
/// at that batch's unit cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BatchTake {
    pub batch_id: String,
    pub quantity: i64,
    pub unit_cost_paise: i64,
}

impl BatchTake {
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_paise(self.unit_cost_paise).multiply_quantity(self.quantity)
    }
}

/// Total cost basis of a consumption breakdown.
pub fn cost_basis(takes: &[BatchTake]) -> Money {
    takes.iter().map(BatchTake::cost).sum()
}

// =============================================================================
// Invoice Status
// =============================================================================

/// Invoice lifecycle.
///
/// ```text
/// Draft ──post──► Posted ──void──► Voided
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Posted,
    Voided,
}

impl InvoiceStatus {
    /// Only `Draft → Posted` and `Posted → Voided` are allowed.
    pub const fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        matches!(
            (self, next),
            (InvoiceStatus::Draft, InvoiceStatus::Posted)
                | (InvoiceStatus::Posted, InvoiceStatus::Voided)
        )
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Posted => "posted",
            InvoiceStatus::Voided => "voided",
        }
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Draft
    }
}

// =============================================================================
// Invoice Line
// =============================================================================

/// A posted invoice line with its cost trace and tax breakdown.
/// Product name is snapshotted at posting time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceLine {
    /// 1-based position in the invoice.
    pub line_no: i64,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_paise: i64,
    /// unit_price × quantity, before tax.
    pub subtotal_paise: i64,
    pub tax: TaxBreakdown,
    /// subtotal + total tax.
    pub line_total_paise: i64,
    /// FIFO consumption in the order batches were drawn.
    pub takes: Vec<BatchTake>,
}

impl InvoiceLine {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_paise(self.subtotal_paise)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_paise(self.line_total_paise)
    }

    /// FIFO cost of the goods on this line.
    pub fn cost_basis(&self) -> Money {
        cost_basis(&self.takes)
    }
}

// =============================================================================
// Invoice Totals
// =============================================================================

/// Invoice-level totals. Every field is the exact sum of already-rounded
/// line amounts; nothing here is rounded again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceTotals {
    pub subtotal_paise: i64,
    pub cgst_paise: i64,
    pub sgst_paise: i64,
    pub igst_paise: i64,
    pub cess_paise: i64,
    pub total_tax_paise: i64,
    pub grand_total_paise: i64,
}

impl InvoiceTotals {
    /// Sums the lines, or `None` if any total leaves the `i64` range.
    pub fn from_lines(lines: &[InvoiceLine]) -> Option<Self> {
        lines.iter().try_fold(InvoiceTotals::default(), |acc, line| {
            Some(InvoiceTotals {
                subtotal_paise: acc.subtotal_paise.checked_add(line.subtotal_paise)?,
                cgst_paise: acc.cgst_paise.checked_add(line.tax.cgst_paise)?,
                sgst_paise: acc.sgst_paise.checked_add(line.tax.sgst_paise)?,
                igst_paise: acc.igst_paise.checked_add(line.tax.igst_paise)?,
                cess_paise: acc.cess_paise.checked_add(line.tax.cess_paise)?,
                total_tax_paise: acc.total_tax_paise.checked_add(line.tax.total_tax_paise)?,
                grand_total_paise: acc.grand_total_paise.checked_add(line.line_total_paise)?,
            })
        })
    }

    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_paise(self.grand_total_paise)
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// A sales invoice.
///
/// Once `Posted`, lines and totals never change. Voiding flips the status
/// and reverses stock but leaves totals as they were for audit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    /// Global sequence number: strictly increasing, never reused.
    pub number: i64,
    /// Printed number, e.g. `INV/2026-27/000042`.
    pub display_number: String,
    pub customer_id: String,
    /// Customer jurisdiction at posting time.
    pub jurisdiction: Jurisdiction,
    pub status: InvoiceStatus,
    pub lines: Vec<InvoiceLine>,
    pub totals: InvoiceTotals,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub posted_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub voided_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Cost of goods sold across all lines.
    pub fn cost_basis(&self) -> Money {
        self.lines.iter().map(InvoiceLine::cost_basis).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
