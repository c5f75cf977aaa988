//! # FIFO Planner
//!
//! Decides which batches a sale draws from. Pure: the ledger store loads
//! the batches, asks this module for a plan, then applies it inside its
//! own transaction.
//!
//! ## Ordering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BTreeMap<FifoKey, Lot>   FifoKey = (received_at, batch_id)            │
//! │                                                                         │
//! │   (t1, b-01) ─► 10 @ ₹5    ◄── drawn first                             │
//! │   (t2, b-02) ─► 10 @ ₹6                                                │
//! │   (t2, b-03) ─►  4 @ ₹6    ◄── same timestamp: lower id first          │
//! │   (t3, b-04) ─►  0         ◄── empty, skipped (kept for audit)         │
//! │   (t4, b-05) ─►  8 EXPIRED ◄── skipped, still counted on-hand          │
//! │                                                                         │
//! │  plan(15) → [b-01 × 10 @ 5, b-02 × 5 @ 6]                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{CoreError, CoreResult};
use crate::types::{Batch, BatchTake};

/// FIFO position of a batch. Derived `Ord` compares `received_at` first,
/// then `batch_id`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FifoKey {
    pub received_at: DateTime<Utc>,
    pub batch_id: String,
}

#[derive(Debug, Clone)]
struct Lot {
    remaining: i64,
    unit_cost_paise: i64,
    expiry_date: Option<NaiveDate>,
}

impl Lot {
    fn is_sellable(&self, today: NaiveDate) -> bool {
        self.remaining > 0 && self.expiry_date.map_or(true, |expiry| expiry >= today)
    }
}

/// Ordered index over one product's batches.
#[derive(Debug, Clone)]
pub struct BatchQueue {
    product_id: String,
    lots: BTreeMap<FifoKey, Lot>,
    by_id: HashMap<String, FifoKey>,
}

impl BatchQueue {
    pub fn new(product_id: impl Into<String>) -> Self {
        BatchQueue {
            product_id: product_id.into(),
            lots: BTreeMap::new(),
            by_id: HashMap::new(),
        }
    }

    /// Builds a queue from batch records. Batches of other products are ignored.
    pub fn from_batches<'a>(
        product_id: impl Into<String>,
        batches: impl IntoIterator<Item = &'a Batch>,
    ) -> Self {
        let mut queue = BatchQueue::new(product_id);
        for batch in batches {
            queue.insert(batch);
        }
        queue
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    /// Adds (or replaces) a batch in the queue.
    pub fn insert(&mut self, batch: &Batch) {
        if batch.product_id != self.product_id {
            return;
        }

        let key = FifoKey {
            received_at: batch.received_at,
            batch_id: batch.id.clone(),
        };
        let lot = Lot {
            remaining: batch.quantity_remaining,
            unit_cost_paise: batch.unit_cost_paise,
            expiry_date: batch.expiry_date,
        };

        if let Some(old_key) = self.by_id.insert(batch.id.clone(), key.clone()) {
            self.lots.remove(&old_key);
        }
        self.lots.insert(key, lot);
    }

    /// Quantity that a sale could draw today (non-expired, non-empty batches).
    pub fn available(&self, today: NaiveDate) -> i64 {
        self.lots
            .values()
            .filter(|lot| lot.is_sellable(today))
            .map(|lot| lot.remaining)
            .sum()
    }

    /// Computes the takes covering exactly `quantity` units without
    /// changing the queue.
    ///
    /// ## Errors
    /// - `InvalidQuantity` if `quantity <= 0`
    /// - `InsufficientStock` if sellable stock is short
    pub fn plan(&self, quantity: i64, today: NaiveDate) -> CoreResult<Vec<BatchTake>> {
        if quantity <= 0 {
            return Err(CoreError::InvalidQuantity {
                quantity,
                reason: "sale quantity must be positive".to_string(),
            });
        }

        let available = self.available(today);
        if available < quantity {
            return Err(CoreError::InsufficientStock {
                product_id: self.product_id.clone(),
                available,
                requested: quantity,
            });
        }

        let mut outstanding = quantity;
        let mut takes = Vec::new();

        for (key, lot) in self.lots.iter().filter(|(_, lot)| lot.is_sellable(today)) {
            if outstanding == 0 {
                break;
            }
            let taken = outstanding.min(lot.remaining);
            takes.push(BatchTake {
                batch_id: key.batch_id.clone(),
                quantity: taken,
                unit_cost_paise: lot.unit_cost_paise,
            });
            outstanding -= taken;
        }

        Ok(takes)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn batch(id: &str, qty: i64, cost: i64, received: i64, expiry: Option<NaiveDate>) -> Batch {
        Batch {
            id: id.to_string(),
            product_id: "p".to_string(),
            supplier_id: None,
            supplier_invoice: None,
            original_quantity: qty,
            quantity_remaining: qty,
            unit_cost_paise: cost,
            received_at: at(received),
            expiry_date: expiry,
        }
    }

    fn three_batches() -> Vec<Batch> {
        vec![
            batch("b3", 10, 7, 3, None),
            batch("b1", 10, 5, 1, None),
            batch("b2", 10, 6, 2, None),
        ]
    }

    /// Applies a plan the way the ledger store does, then rebuilds the queue.
    fn apply(batches: &mut [Batch], takes: &[BatchTake]) -> BatchQueue {
        for take in takes {
            if let Some(b) = batches.iter_mut().find(|b| b.id == take.batch_id) {
                b.quantity_remaining -= take.quantity;
            }
        }
        BatchQueue::from_batches("p", batches.iter())
    }

    fn remaining(batches: &[Batch], id: &str) -> i64 {
        batches.iter().find(|b| b.id == id).map_or(0, |b| b.quantity_remaining)
    }

    #[test]
    fn test_sale_of_exactly_first_batch() {
        let mut batches = three_batches();
        let takes = BatchQueue::from_batches("p", &batches).plan(10, today()).unwrap();
        apply(&mut batches, &takes);

        assert_eq!(takes.len(), 1);
        assert_eq!(takes[0].batch_id, "b1");
        assert_eq!(remaining(&batches, "b1"), 0);
        assert_eq!(remaining(&batches, "b2"), 10);
        assert_eq!(remaining(&batches, "b3"), 10);
    }

    #[test]
    fn test_sale_spills_one_unit_into_second_batch() {
        let batches = three_batches();
        let takes = BatchQueue::from_batches("p", &batches).plan(11, today()).unwrap();

        assert_eq!(takes.len(), 2);
        assert_eq!((takes[0].batch_id.as_str(), takes[0].quantity), ("b1", 10));
        assert_eq!((takes[1].batch_id.as_str(), takes[1].quantity), ("b2", 1));
    }

    #[test]
    fn test_fifteen_units_cost_eighty() {
        let mut batches = vec![batch("B1", 10, 5, 1, None), batch("B2", 10, 6, 2, None)];
        let takes = BatchQueue::from_batches("p", &batches).plan(15, today()).unwrap();
        let queue = apply(&mut batches, &takes);

        assert_eq!(crate::types::cost_basis(&takes).paise(), 80);
        assert_eq!(remaining(&batches, "B1"), 0);
        assert_eq!(remaining(&batches, "B2"), 5);
        assert_eq!(queue.available(today()), 5);
    }

    #[test]
    fn test_same_timestamp_breaks_tie_on_id() {
        let batches = vec![batch("b-z", 5, 1, 1, None), batch("b-a", 5, 2, 1, None)];
        let queue = BatchQueue::from_batches("p", &batches);

        let takes = queue.plan(3, today()).unwrap();
        assert_eq!(takes[0].batch_id, "b-a");
    }

    #[test]
    fn test_expired_batches_are_skipped() {
        let yesterday = today() - Duration::days(1);
        let batches = vec![
            batch("old", 10, 5, 1, Some(yesterday)),
            batch("fresh", 10, 6, 2, Some(today())),
        ];
        let queue = BatchQueue::from_batches("p", &batches);

        assert_eq!(queue.available(today()), 10);
        let takes = queue.plan(4, today()).unwrap();
        assert_eq!(takes[0].batch_id, "fresh");

        let err = queue.plan(11, today()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 10, requested: 11, .. }
        ));
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let queue = BatchQueue::from_batches("p", &three_batches());
        assert!(matches!(queue.plan(0, today()), Err(CoreError::InvalidQuantity { .. })));
        assert!(matches!(queue.plan(-3, today()), Err(CoreError::InvalidQuantity { .. })));
    }

    #[test]
    fn test_reinserting_a_batch_replaces_it() {
        let mut batches = three_batches();
        let mut queue = BatchQueue::from_batches("p", &batches);
        batches[1].quantity_remaining = 2;
        queue.insert(&batches[1]);

        assert_eq!(queue.available(today()), 22);
        let takes = queue.plan(3, today()).unwrap();
        assert_eq!((takes[0].batch_id.as_str(), takes[0].quantity), ("b1", 2));
    }

    #[test]
    fn test_other_products_ignored() {
        let mut other = batch("x", 10, 5, 1, None);
        other.product_id = "q".to_string();
        let queue = BatchQueue::from_batches("p", &[other]);
        assert_eq!(queue.available(today()), 0);
    }

    proptest! {
        #[test]
        fn consumption_is_exact_fifo_and_never_negative(
            quantities in prop::collection::vec(0i64..50, 1..8),
            sales in prop::collection::vec(1i64..40, 1..12),
        ) {
            let mut batches: Vec<Batch> = quantities
                .iter()
                .enumerate()
                .map(|(i, q)| batch(&format!("b{:02}", i), *q, 10 + i as i64, i as i64, None))
                .collect();
            let mut queue = BatchQueue::from_batches("p", &batches);
            let received: i64 = quantities.iter().sum();
            let mut consumed = 0;

            for sale in sales {
                let before = queue.available(today());
                match queue.plan(sale, today()) {
                    Ok(takes) => {
                        prop_assert_eq!(takes.iter().map(|t| t.quantity).sum::<i64>(), sale);
                        queue = apply(&mut batches, &takes);
                        // Every batch before the last one taken is now empty
                        for take in &takes[..takes.len() - 1] {
                            prop_assert_eq!(remaining(&batches, &take.batch_id), 0);
                        }
                        consumed += sale;
                    }
                    Err(CoreError::InsufficientStock { available, .. }) => {
                        prop_assert!(sale > before);
                        prop_assert_eq!(available, before);
                    }
                    Err(other) => prop_assert!(false, "unexpected error {other}"),
                }
                for b in &batches {
                    prop_assert!(b.quantity_remaining >= 0);
                }
            }

            prop_assert!(consumed <= received);
            prop_assert_eq!(queue.available(today()), received - consumed);
        }
    }
}
