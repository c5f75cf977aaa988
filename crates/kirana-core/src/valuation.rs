//! # Valuation
//!
//! Stock value and shelf signals derived from batch snapshots.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Batch snapshot ──► StockPosition                                 │
//! │                      ├── on_hand   (all batches, incl. expired)  │
//! │                      ├── sellable  (non-expired)                 │
//! │                      ├── expired                                 │
//! │                      └── value     (Σ sellable qty × unit cost)  │
//! │                                                                   │
//! │  on_hand < reorder_threshold  ──►  low-stock signal              │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Expired stock still occupies shelf space, so it counts towards the
//! low-stock check but not towards FIFO value.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::Batch;

// =============================================================================
// Stock Position
// =============================================================================

/// Quantities and FIFO value of one product at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockPosition {
    pub product_id: String,
    pub on_hand: i64,
    pub sellable: i64,
    pub expired: i64,
    pub value_paise: i64,
}

impl StockPosition {
    /// Summarises the batches of `product_id` as of `today`.
    pub fn from_batches(product_id: &str, batches: &[Batch], today: NaiveDate) -> Self {
        let mut position = StockPosition {
            product_id: product_id.to_string(),
            on_hand: 0,
            sellable: 0,
            expired: 0,
            value_paise: 0,
        };

        for batch in batches.iter().filter(|b| b.product_id == product_id) {
            position.on_hand += batch.quantity_remaining;
            if batch.is_expired(today) {
                position.expired += batch.quantity_remaining;
            } else {
                position.sellable += batch.quantity_remaining;
                position.value_paise += batch.remaining_value().paise();
            }
        }

        position
    }

    #[inline]
    pub fn value(&self) -> Money {
        Money::from_paise(self.value_paise)
    }
}

/// FIFO-cost value of non-expired stock.
pub fn stock_value(batches: &[Batch], today: NaiveDate) -> Money {
    batches
        .iter()
        .filter(|b| !b.is_expired(today))
        .map(Batch::remaining_value)
        .sum()
}

/// Units physically on the shelf, expired included.
pub fn on_hand(batches: &[Batch]) -> i64 {
    batches.iter().map(|b| b.quantity_remaining).sum()
}

/// Low stock means strictly below the threshold.
#[inline]
pub fn is_low_stock(on_hand: i64, reorder_threshold: i64) -> bool {
    on_hand < reorder_threshold
}

// =============================================================================
// Expiry Window
// =============================================================================

/// Batches whose expiry falls within `[from, until]`, ordered by expiry.
///
/// Holds a snapshot; iterate it as many times as needed. Filtering happens
/// while iterating, so callers that stop early pay only for what they read.
#[derive(Debug, Clone)]
pub struct ExpiryWindow {
    snapshot: Vec<Batch>,
    from: NaiveDate,
    until: NaiveDate,
}

impl ExpiryWindow {
    /// Builds the window. Batches without an expiry or with nothing left
    /// are dropped; the rest are ordered by `(expiry_date, received_at, id)`.
    pub fn new(batches: Vec<Batch>, from: NaiveDate, until: NaiveDate) -> Self {
        let mut snapshot: Vec<Batch> = batches
            .into_iter()
            .filter(|b| b.expiry_date.is_some() && b.quantity_remaining > 0)
            .collect();
        snapshot.sort_by(|a, b| {
            (a.expiry_date, a.received_at, &a.id).cmp(&(b.expiry_date, b.received_at, &b.id))
        });

        ExpiryWindow { snapshot, from, until }
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn until(&self) -> NaiveDate {
        self.until
    }

    /// Starts a fresh pass over the window.
    pub fn iter(&self) -> ExpiringBatches<'_> {
        ExpiringBatches {
            window: self,
            position: 0,
        }
    }
}

impl<'a> IntoIterator for &'a ExpiryWindow {
    type Item = &'a Batch;
    type IntoIter = ExpiringBatches<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One pass over an [`ExpiryWindow`].
#[derive(Debug, Clone)]
pub struct ExpiringBatches<'a> {
    window: &'a ExpiryWindow,
    position: usize,
}

impl<'a> Iterator for ExpiringBatches<'a> {
    type Item = &'a Batch;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(batch) = self.window.snapshot.get(self.position) {
            self.position += 1;
            let Some(expiry) = batch.expiry_date else {
                continue;
            };
            // Sorted by expiry: past the window end, nothing else can match
            if expiry > self.window.until {
                self.position = self.window.snapshot.len();
                return None;
            }
            if expiry >= self.window.from {
                return Some(batch);
            }
        }
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
