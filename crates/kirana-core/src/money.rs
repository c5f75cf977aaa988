//! # Money Module
//!
//! Provides the `Money` type for handling rupee amounts safely.
//!
//! ## Why Integer Paise?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With floats:                                                           │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  On a GST invoice:                                                      │
//! │    9% of ₹10.05 = ₹0.9045 → which paisa does the customer pay?         │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise + one explicit rounding step               │
//! │    1005 paise × 900 bps / 10000 = 90.45 → 90 paise (half-even)         │
//! │    Rounded ONCE per tax component per line, never again                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kirana_core::money::Money;
//!
//! let price = Money::from_paise(1099); // ₹10.99
//! let doubled = price * 2;             // ₹21.98
//! let total = price + Money::from_paise(500);
//! assert_eq!(total.paise(), 1599);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

/// Basis points in one whole (100.00%).
pub const BPS_SCALE: i128 = 10_000;

// =============================================================================
// Rounding
// =============================================================================

/// Divides `numerator` by `denominator` rounding half to even.
///
/// ## Bankers Rounding
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────┐
/// │  Half-up always rounds .5 upward and drifts over many invoices:     │
/// │    0.5 → 1, 1.5 → 2, 2.5 → 3, 3.5 → 4                              │
/// │                                                                     │
/// │  Half-even rounds .5 to the nearest EVEN integer:                  │
/// │    0.5 → 0, 1.5 → 2, 2.5 → 2, 3.5 → 4                              │
/// └─────────────────────────────────────────────────────────────────────┘
/// ```
///
/// `denominator` must be positive. Negative numerators round symmetrically
/// because the remainder is taken against the floor quotient.
pub fn round_half_even_div(numerator: i128, denominator: i128) -> i128 {
    debug_assert!(denominator > 0, "denominator must be positive");

    let quotient = numerator.div_euclid(denominator);
    let remainder = numerator.rem_euclid(denominator);
    let twice = remainder * 2;

    if twice > denominator || (twice == denominator && quotient % 2 != 0) {
        quotient + 1
    } else {
        quotient
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise (1/100 rupee).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for adjustments and reversals
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **No float constructor**: amounts enter the ledger as paise only
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    ///
    /// ## Example
    /// ```rust
    /// use kirana_core::money::Money;
    ///
    /// let price = Money::from_paise(1099);
    /// assert_eq!(price.paise(), 1099);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// For negative amounts only the rupee part carries the sign:
    /// `from_rupees_paise(-5, 50)` is -₹5.50.
    #[inline]
    pub const fn from_rupees_paise(rupees: i64, paise: i64) -> Self {
        if rupees < 0 {
            Money(rupees * 100 - paise)
        } else {
            Money(rupees * 100 + paise)
        }
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Applies a rate in basis points and rounds half to even.
    ///
    /// This is the single rounding step of the tax calculator. Callers sum
    /// the results; they never round a sum again.
    ///
    /// ## Example
    /// ```rust
    /// use kirana_core::money::Money;
    /// use kirana_core::types::TaxRate;
    ///
    /// // 9% of ₹10.00
    /// let tax = Money::from_paise(1000).apply_rate(TaxRate::from_bps(900));
    /// assert_eq!(tax.paise(), 90);
    ///
    /// // 2.5% of ₹0.50 = 1.25 paise → 1
    /// let tax = Money::from_paise(50).apply_rate(TaxRate::from_bps(250));
    /// assert_eq!(tax.paise(), 1);
    /// ```
    pub fn apply_rate(&self, rate: TaxRate) -> Money {
        // i128 keeps large invoice subtotals from overflowing
        let scaled = self.0 as i128 * rate.bps() as i128;
        Money::from_paise(round_half_even_div(scaled, BPS_SCALE) as i64)
    }

    /// Multiplies a unit amount by a quantity, or `None` on overflow.
    ///
    /// ```rust
    /// use kirana_core::money::Money;
    ///
    /// let line = Money::from_paise(299).checked_multiply_quantity(3);
    /// assert_eq!(line.map(|m| m.paise()), Some(897));
    ///
    /// assert!(Money::from_paise(i64::MAX / 2).checked_multiply_quantity(3).is_none());
    /// ```
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(paise) => Some(Money(paise)),
            None => None,
        }
    }

    /// Multiplies a unit amount by a quantity, clamping at the `i64` range.
    ///
    /// For stored batches, whose cost and quantity are already bounded by
    /// validation. New invoice lines use [`Money::checked_multiply_quantity`].
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Adds two amounts, or `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(paise) => Some(Money(paise)),
            None => None,
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly rendering. The storefront UI does its own locale formatting.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paise() {
        let money = Money::from_paise(1099);
        assert_eq!(money.paise(), 1099);
        assert_eq!(money.rupees(), 10);
        assert_eq!(money.paise_part(), 99);
    }

    #[test]
    fn test_from_rupees_paise() {
        assert_eq!(Money::from_rupees_paise(10, 99).paise(), 1099);
        assert_eq!(Money::from_rupees_paise(-5, 50).paise(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_paise(1099).to_string(), "₹10.99");
        assert_eq!(Money::from_paise(500).to_string(), "₹5.00");
        assert_eq!(Money::from_paise(-550).to_string(), "-₹5.50");
        assert_eq!(Money::from_paise(0).to_string(), "₹0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_paise(1000);
        let b = Money::from_paise(500);

        assert_eq!((a + b).paise(), 1500);
        assert_eq!((a - b).paise(), 500);
        assert_eq!((a * 3).paise(), 3000);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.paise(), 2000);
    }

    #[test]
    fn test_quantity_multiplication_overflow() {
        let unit = Money::from_paise(299);
        assert_eq!(unit.checked_multiply_quantity(3), Some(Money::from_paise(897)));
        assert_eq!(unit.multiply_quantity(3).paise(), 897);

        let huge = Money::from_paise(i64::MAX / 2);
        assert_eq!(huge.checked_multiply_quantity(3), None);
        assert_eq!(huge.multiply_quantity(3).paise(), i64::MAX);
        assert_eq!(huge.checked_add(huge).map(|m| m.paise()), Some(i64::MAX - 1));
        assert_eq!(huge.checked_add(Money::from_paise(i64::MAX)), None);
    }

    #[test]
    fn test_round_half_even_ties() {
        // 0.5 → 0, 1.5 → 2, 2.5 → 2, 3.5 → 4
        assert_eq!(round_half_even_div(5, 10), 0);
        assert_eq!(round_half_even_div(15, 10), 2);
        assert_eq!(round_half_even_div(25, 10), 2);
        assert_eq!(round_half_even_div(35, 10), 4);
    }

    #[test]
    fn test_round_half_even_non_ties() {
        assert_eq!(round_half_even_div(14, 10), 1);
        assert_eq!(round_half_even_div(16, 10), 2);
        assert_eq!(round_half_even_div(0, 10), 0);
        assert_eq!(round_half_even_div(20, 10), 2);
    }

    #[test]
    fn test_round_half_even_negative() {
        // -2.5 → -2, -3.5 → -4, -1.4 → -1, -1.6 → -2
        assert_eq!(round_half_even_div(-25, 10), -2);
        assert_eq!(round_half_even_div(-35, 10), -4);
        assert_eq!(round_half_even_div(-14, 10), -1);
        assert_eq!(round_half_even_div(-16, 10), -2);
    }

    #[test]
    fn test_apply_rate_basic() {
        let amount = Money::from_paise(1000);
        assert_eq!(amount.apply_rate(TaxRate::from_bps(900)).paise(), 90);
        assert_eq!(amount.apply_rate(TaxRate::from_bps(100)).paise(), 10);
        assert_eq!(amount.apply_rate(TaxRate::zero()).paise(), 0);
    }

    #[test]
    fn test_apply_rate_rounds_half_to_even() {
        // 250 paise at 1% = 2.5 → 2
        assert_eq!(Money::from_paise(250).apply_rate(TaxRate::from_bps(100)).paise(), 2);
        // 350 paise at 1% = 3.5 → 4
        assert_eq!(Money::from_paise(350).apply_rate(TaxRate::from_bps(100)).paise(), 4);
        // 1005 paise at 9% = 90.45 → 90
        assert_eq!(Money::from_paise(1005).apply_rate(TaxRate::from_bps(900)).paise(), 90);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        assert!(Money::from_paise(100).is_positive());
        assert!(Money::from_paise(-100).is_negative());
        assert_eq!(Money::from_paise(-100).abs().paise(), 100);
    }
}
