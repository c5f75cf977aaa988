//! # Ledger Error Type
//!
//! What callers of the engine see.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Kirana Ledger                          │
//! │                                                                         │
//! │  post_invoice(customer, lines)                                          │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Bad line? ──────────── InvalidLine        (nothing written)    │  │
//! │  │         │                                                        │  │
//! │  │  Lock wait expired? ─── LedgerStoreUnavailable                  │  │
//! │  │         │                                                        │  │
//! │  │  Short on stock? ────── InsufficientStock  (tx rolled back)     │  │
//! │  │         │                                                        │  │
//! │  │  SQLite failure? ────── LedgerStoreUnavailable (tx rolled back) │  │
//! │  │         │                                                        │  │
//! │  │  Success ───────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `code()` gives a stable machine-readable tag for the UI layer.

use kirana_core::{CoreError, ValidationError};
use kirana_db::DbError;
use thiserror::Error;

/// Errors returned by every ledger operation.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// An invoice line was rejected before any mutation.
    ///
    /// `line_no` is 1-based; 0 means the request as a whole (e.g. no lines).
    #[error("Invalid line {line_no}: {reason}")]
    InvalidLine { line_no: usize, reason: String },

    /// A quantity that must be positive (or keep a batch non-negative) was not.
    #[error("Invalid quantity {quantity}: {reason}")]
    InvalidQuantity { quantity: i64, reason: String },

    /// Sellable stock does not cover the request. Recoverable: the caller
    /// may lower the quantity and retry.
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Invoice lifecycle misuse, e.g. voiding a voided invoice.
    #[error("Invoice {invoice_id} is {current}, cannot move to {requested}")]
    InvalidTransition {
        invoice_id: String,
        current: String,
        requested: String,
    },

    /// A reversal does not match the ledger: the batch is gone, or the
    /// restore would put back more than the batch gave out.
    #[error("Inconsistent reversal of batch {batch_id}: {reason}")]
    InconsistentReversal { batch_id: String, reason: String },

    /// The store could not be reached, a lock wait timed out, or a query
    /// failed. Not retried inside the engine.
    #[error("Ledger store unavailable: {0}")]
    LedgerStoreUnavailable(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load configuration: {0}")]
    ConfigLoadFailed(String),

    /// Rendering export rows failed.
    #[error("Export failed: {0}")]
    Export(String),
}

impl LedgerError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn invalid_line(line_no: usize, reason: impl Into<String>) -> Self {
        LedgerError::InvalidLine {
            line_no,
            reason: reason.into(),
        }
    }

    /// Machine-readable error code for the UI layer.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidLine { .. } => "INVALID_LINE",
            LedgerError::InvalidQuantity { .. } => "INVALID_QUANTITY",
            LedgerError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            LedgerError::InvalidTransition { .. } => "INVALID_TRANSITION",
            LedgerError::InconsistentReversal { .. } => "INCONSISTENT_REVERSAL",
            LedgerError::LedgerStoreUnavailable(_) => "LEDGER_STORE_UNAVAILABLE",
            LedgerError::NotFound { .. } => "NOT_FOUND",
            LedgerError::Validation(_) => "VALIDATION_ERROR",
            LedgerError::InvalidConfig(_) => "INVALID_CONFIG",
            LedgerError::ConfigLoadFailed(_) => "CONFIG_LOAD_FAILED",
            LedgerError::Export(_) => "EXPORT_FAILED",
        }
    }

    /// True for failures the caller can fix by changing the request.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidLine { .. }
                | LedgerError::InvalidQuantity { .. }
                | LedgerError::InsufficientStock { .. }
                | LedgerError::NotFound { .. }
                | LedgerError::Validation(_)
        )
    }
}

/// Converts store errors. Only `NotFound` keeps its meaning; everything
/// else is an infrastructure failure from the caller's point of view.
impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => LedgerError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } => {
                LedgerError::Validation(ValidationError::NotAllowed {
                    field,
                    allowed: vec![format!("a value other than '{}'", value)],
                })
            }
            other => {
                tracing::error!(error = %other, "Ledger store failure");
                LedgerError::LedgerStoreUnavailable(other.to_string())
            }
        }
    }
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock {
                product_id,
                available,
                requested,
            } => LedgerError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            CoreError::InvalidQuantity { quantity, reason } => {
                LedgerError::InvalidQuantity { quantity, reason }
            }
            CoreError::InvalidTransition {
                invoice_id,
                current,
                requested,
            } => LedgerError::InvalidTransition {
                invoice_id,
                current,
                requested,
            },
            CoreError::Validation(e) => LedgerError::Validation(e),
        }
    }
}

/// Convenience type alias for Results with LedgerError.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_errors_become_store_unavailable() {
        let err: LedgerError = DbError::PoolExhausted.into();
        assert!(matches!(err, LedgerError::LedgerStoreUnavailable(_)));
        assert!(!err.is_recoverable());

        let err: LedgerError = DbError::not_found("Product", "p-1").into();
        assert!(matches!(err, LedgerError::NotFound { .. }));
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_core_errors_keep_their_meaning() {
        let err: LedgerError = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            available: 3,
            requested: 5,
        }
        .into();
        assert_eq!(err.code(), "INSUFFICIENT_STOCK");
        assert!(err.is_recoverable());

        let err: LedgerError = CoreError::InvalidQuantity {
            quantity: 0,
            reason: "sale quantity must be positive".to_string(),
        }
        .into();
        assert_eq!(err.code(), "INVALID_QUANTITY");
    }
}
