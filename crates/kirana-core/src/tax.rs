//! # Tax Calculator
//!
//! Per-line GST computation.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  compute_line(subtotal, slab, cross_jurisdiction)                       │
//! │                                                                         │
//! │  cross = false (intra-state)      cross = true (inter-state)            │
//! │  ─────────────────────────        ──────────────────────────            │
//! │  cgst = round(sub × cgst%)        cgst = 0                              │
//! │  sgst = round(sub × sgst%)        sgst = 0                              │
//! │  igst = 0                         igst = round(sub × (cgst%+sgst%))     │
//! │                                                                         │
//! │  cess = round(sub × cess%)  ← always, independent of jurisdiction      │
//! │  total_tax = cgst + sgst + igst + cess  (sum of ROUNDED parts)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rounding is half-to-even, once per component per line. Invoice totals
//! are sums of these values and are never rounded again, so printed line
//! amounts always add up to the printed grand total.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::TaxSlab;

/// Tax owed on one invoice line, in paise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxBreakdown {
    pub cgst_paise: i64,
    pub sgst_paise: i64,
    pub igst_paise: i64,
    pub cess_paise: i64,
    pub total_tax_paise: i64,
}

impl TaxBreakdown {
    /// Builds a breakdown whose total is the sum of the given components.
    pub fn from_components(cgst: Money, sgst: Money, igst: Money, cess: Money) -> Self {
        TaxBreakdown {
            cgst_paise: cgst.paise(),
            sgst_paise: sgst.paise(),
            igst_paise: igst.paise(),
            cess_paise: cess.paise(),
            total_tax_paise: (cgst + sgst + igst + cess).paise(),
        }
    }

    #[inline]
    pub fn total_tax(&self) -> Money {
        Money::from_paise(self.total_tax_paise)
    }

    /// True when the components add up to the stored total.
    pub fn is_additive(&self) -> bool {
        self.cgst_paise + self.sgst_paise + self.igst_paise + self.cess_paise
            == self.total_tax_paise
    }
}

/// Computes the tax breakdown for one line subtotal.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use kirana_core::money::Money;
/// use kirana_core::tax::compute_line;
/// use kirana_core::types::TaxSlab;
///
/// let slab = TaxSlab {
///     id: "s18".into(),
///     name: "GST 18% + 1% cess".into(),
///     cgst_bps: 900,
///     sgst_bps: 900,
///     cess_bps: 100,
///     created_at: Utc::now(),
/// };
///
/// let tax = compute_line(Money::from_paise(1000), &slab, false);
/// assert_eq!(tax.cgst_paise, 90);
/// assert_eq!(tax.sgst_paise, 90);
/// assert_eq!(tax.igst_paise, 0);
/// assert_eq!(tax.cess_paise, 10);
/// assert_eq!(tax.total_tax_paise, 190);
/// ```
pub fn compute_line(line_subtotal: Money, slab: &TaxSlab, cross_jurisdiction: bool) -> TaxBreakdown {
    let cess = line_subtotal.apply_rate(slab.cess());

    if cross_jurisdiction {
        let igst = line_subtotal.apply_rate(slab.gst_rate());
        TaxBreakdown::from_components(Money::zero(), Money::zero(), igst, cess)
    } else {
        let cgst = line_subtotal.apply_rate(slab.cgst());
        let sgst = line_subtotal.apply_rate(slab.sgst());
        TaxBreakdown::from_components(cgst, sgst, Money::zero(), cess)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
