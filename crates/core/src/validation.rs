//! Input validation utilities.
//!
//! This module contains functions for validating caller-supplied values before they are used
//! in pricing arithmetic or embedded into issued identifiers.

use crate::{PortalError, PortalResult};

/// Validates that a quotation-number prefix is safe to embed in an identifier.
///
/// Issued numbers take the form `{prefix}-{YYYYMMDD}-{suffix}` and are printed on documents
/// and used in file names, so the prefix is restricted to a short upper-case ASCII set:
/// - Rejects empty or whitespace-only strings
/// - Bounds the length
/// - Allows only `A-Z`, `0-9` and `_`
///
/// # Errors
///
/// Returns a `PortalError::InvalidInput` if the prefix is invalid.
pub fn validate_quotation_prefix(prefix: &str) -> PortalResult<()> {
    const MAX_PREFIX_LEN: usize = 12;

    if prefix.trim().is_empty() {
        return Err(PortalError::InvalidInput(
            "quotation prefix cannot be empty".into(),
        ));
    }

    if prefix.len() > MAX_PREFIX_LEN {
        return Err(PortalError::InvalidInput(format!(
            "quotation prefix exceeds maximum length of {} characters",
            MAX_PREFIX_LEN
        )));
    }

    let ok = prefix
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'A'..=b'Z' | b'_'));

    if !ok {
        return Err(PortalError::InvalidInput(
            "quotation prefix contains invalid characters (only A-Z, 0-9, '_' allowed)".into(),
        ));
    }

    Ok(())
}

/// Validates a monetary amount supplied to the pricing engine.
///
/// # Errors
///
/// Returns `PortalError::InvalidAmount` for negative, NaN or infinite values.
pub fn validate_amount(amount: f64) -> PortalResult<f64> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(amount)
    } else {
        Err(PortalError::InvalidAmount(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_prefixes() {
        assert!(validate_quotation_prefix("QT").is_ok());
        assert!(validate_quotation_prefix("LAB_2").is_ok());
    }

    #[test]
    fn rejects_bad_prefixes() {
        for bad in ["", "  ", "qt", "QT-1", "QUOTATIONPREFIX", "Q T"] {
            assert!(
                matches!(
                    validate_quotation_prefix(bad),
                    Err(PortalError::InvalidInput(_))
                ),
                "prefix {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn amount_must_be_finite_and_non_negative() {
        assert_eq!(validate_amount(0.0).expect("zero is fine"), 0.0);
        assert_eq!(validate_amount(7500.0).expect("positive is fine"), 7500.0);
        assert!(matches!(
            validate_amount(-1.0),
            Err(PortalError::InvalidAmount(_))
        ));
        assert!(validate_amount(f64::NAN).is_err());
        assert!(validate_amount(f64::INFINITY).is_err());
    }
}
