//! # Product Locks
//!
//! One async mutex per product id. A posting takes the locks of every
//! product on the invoice before it reads any stock.
//!
//! ```text
//! invoice A: [rice, atta]          invoice B: [atta, rice]
//!        │                                │
//!        ▼ sorted                         ▼ sorted
//!   lock atta → lock rice            lock atta (waits) ...
//!
//! Both take "atta" first, so neither can hold one lock while waiting
//! for the other's.
//! ```
//!
//! The whole acquisition shares one deadline. When it passes, already-taken
//! locks are released and the caller gets `LedgerStoreUnavailable`.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::{timeout_at, Instant};
use tracing::{trace, warn};

use crate::error::{LedgerError, LedgerResult};

/// Lock table shared by every engine of one ledger.
#[derive(Debug)]
pub struct ProductLocks {
    table: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    timeout: Duration,
}

/// Held product locks. Dropping releases them.
#[derive(Debug)]
pub struct ProductGuards {
    product_ids: Vec<String>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl ProductGuards {
    /// Locked product ids, ascending.
    pub fn product_ids(&self) -> &[String] {
        &self.product_ids
    }
}

impl ProductLocks {
    pub fn new(timeout: Duration) -> Self {
        ProductLocks {
            table: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Locks every given product (duplicates ignored) in ascending id order.
    pub async fn acquire<'a, I>(&self, product_ids: I) -> LedgerResult<ProductGuards>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let ordered: BTreeSet<&str> = product_ids.into_iter().collect();
        let deadline = Instant::now() + self.timeout;
        let mut guards = Vec::with_capacity(ordered.len());

        for product_id in &ordered {
            let lock = self.entry(product_id);
            match timeout_at(deadline, lock.lock_owned()).await {
                Ok(guard) => guards.push(guard),
                Err(_) => {
                    warn!(
                        product_id = %product_id,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Timed out waiting for product lock"
                    );
                    return Err(LedgerError::LedgerStoreUnavailable(format!(
                        "timed out after {} ms waiting for product {}",
                        self.timeout.as_millis(),
                        product_id
                    )));
                }
            }
        }

        trace!(count = guards.len(), "Product locks acquired");
        Ok(ProductGuards {
            product_ids: ordered.into_iter().map(str::to_string).collect(),
            _guards: guards,
        })
    }

    fn entry(&self, product_id: &str) -> Arc<AsyncMutex<()>> {
        // The table is only touched by this short non-async section, so a
        // poisoned lock still holds a usable map.
        let mut table = self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        table
            .entry(product_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}
