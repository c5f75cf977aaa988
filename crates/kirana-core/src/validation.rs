//! # Validation Module
//!
//! Input validation for master data and invoice lines.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront UI                                                │
//! │  └── Immediate feedback on empty fields                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (called by kirana-ledger before any mutation)    │
//! │  ├── names, quantities, prices                                         │
//! │  ├── tax slab shape (CGST = SGST)                                      │
//! │  └── GSTIN structure and state code                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite CHECK / FOREIGN KEY constraints                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::Jurisdiction;
use crate::{MAX_LINE_QUANTITY, MAX_UNIT_PRICE_PAISE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Length of a GST registration number.
pub const GSTIN_LEN: usize = 15;

// =============================================================================
// Names
// =============================================================================

/// Normalises a name for storage: whitespace collapsed, each word in
/// sentence case.
///
/// ```rust
/// use kirana_core::validation::format_name;
///
/// assert_eq!(format_name("  aashirvaad   ATTA "), "Aashirvaad Atta");
/// ```
pub fn format_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Validates a product, customer or supplier name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line or purchase quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_LINE_QUANTITY`]
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price or cost in paise. Zero is allowed (free goods).
///
/// ## Rules
/// - Must not be negative
/// - Must not exceed [`MAX_UNIT_PRICE_PAISE`]
pub fn validate_price_paise(field: &str, paise: i64) -> ValidationResult<()> {
    if !(0..=MAX_UNIT_PRICE_PAISE).contains(&paise) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_UNIT_PRICE_PAISE,
        });
    }

    Ok(())
}

/// Validates a reorder threshold (never negative).
pub fn validate_reorder_threshold(threshold: i64) -> ValidationResult<()> {
    if threshold < 0 {
        return Err(ValidationError::OutOfRange {
            field: "reorder_threshold".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

/// Validates a GST slab.
///
/// ## Rules
/// - Every component within 0% to 100%
/// - CGST and SGST are equal halves of the GST rate
pub fn validate_tax_slab(cgst_bps: u32, sgst_bps: u32, cess_bps: u32) -> ValidationResult<()> {
    validate_tax_rate_bps("cgst", cgst_bps)?;
    validate_tax_rate_bps("sgst", sgst_bps)?;
    validate_tax_rate_bps("cess", cess_bps)?;

    if cgst_bps != sgst_bps {
        return Err(ValidationError::InvalidFormat {
            field: "sgst".to_string(),
            reason: format!("must equal cgst ({} bps), got {} bps", cgst_bps, sgst_bps),
        });
    }

    Ok(())
}

// =============================================================================
// GST Registration
// =============================================================================

/// Validates a two-digit GST state code (01-38, 97 other territory, 99 centre).
pub fn validate_state_code(code: &str) -> ValidationResult<u8> {
    let invalid = || ValidationError::InvalidFormat {
        field: "state_code".to_string(),
        reason: "must be a two-digit GST state code".to_string(),
    };

    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let value: u8 = code.parse().map_err(|_| invalid())?;
    match value {
        1..=38 | 97 | 99 => Ok(value),
        _ => Err(invalid()),
    }
}

/// Validates the structure of a GSTIN and returns it upper-cased.
///
/// ## Layout
/// ```text
///  27  AAPFU0939F  1  Z  V
///  ──  ──────────  ─  ─  ─
///  │   PAN         │  │  └── check character
///  │               │  └───── default 'Z'
///  │               └──────── entity number
///  └──────────────────────── state code
/// ```
///
/// The check character is not verified.
pub fn validate_gstin(gstin: &str) -> ValidationResult<String> {
    let gstin = gstin.trim().to_ascii_uppercase();
    let bad = |reason: &str| ValidationError::InvalidFormat {
        field: "gstin".to_string(),
        reason: reason.to_string(),
    };

    if gstin.is_empty() {
        return Err(ValidationError::Required {
            field: "gstin".to_string(),
        });
    }
    if gstin.len() != GSTIN_LEN || !gstin.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(bad("must be 15 letters and digits"));
    }

    let bytes = gstin.as_bytes();
    validate_state_code(&gstin[0..2]).map_err(|_| bad("unknown state code"))?;

    let pan_ok = bytes[2..7].iter().all(u8::is_ascii_alphabetic)
        && bytes[7..11].iter().all(u8::is_ascii_digit)
        && bytes[11].is_ascii_alphabetic();
    if !pan_ok {
        return Err(bad("characters 3-12 must be a PAN"));
    }

    if bytes[12] == b'0' {
        return Err(bad("entity number must be 1-9 or A-Z"));
    }

    Ok(gstin)
}

/// Jurisdiction of a customer relative to the seller's state code.
///
/// Unregistered customers (no GSTIN) are billed as intra-state.
pub fn jurisdiction_for(gstin: Option<&str>, seller_state_code: &str) -> Jurisdiction {
    match gstin.and_then(|g| g.get(0..2)) {
        Some(state) if state != seller_state_code => Jurisdiction::InterState,
        _ => Jurisdiction::IntraState,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
