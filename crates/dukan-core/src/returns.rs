//! # Return / Exchange Availability
//!
//! The cap rule: a sold line can be returned or exchanged at most as many
//! units as were originally sold.
//!
//! ```text
//! original invoice line: Abaya × 3
//!
//!   returned  (Σ ReturnTracking)    1
//!   exchanged (Σ ExchangeTracking)  1
//!   ───────────────────────────────────
//!   available                       3 - (1 + 1) = 1
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

/// What is left of an invoice line for further returns and exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReturnAvailability {
    pub original_quantity: i64,
    pub returned_quantity: i64,
    pub exchanged_quantity: i64,
}

impl ReturnAvailability {
    pub fn already_used(&self) -> i64 {
        self.returned_quantity + self.exchanged_quantity
    }

    /// Units still returnable; never negative.
    pub fn available(&self) -> i64 {
        (self.original_quantity - self.already_used()).max(0)
    }
}

/// Rejects a request that would push returns + exchanges past the original
/// quantity.
pub fn check_against_invoice(
    product_id: &str,
    availability: ReturnAvailability,
    requested: i64,
) -> CoreResult<()> {
    ensure_positive(requested)?;

    let available = availability.available();
    if requested > available {
        return Err(CoreError::QuantityExceedsAvailable {
            product_id: product_id.to_string(),
            available,
            requested,
        });
    }
    Ok(())
}

/// Rejects a return without an invoice reference when the customer has
/// not bought enough of the product overall.
///
/// `net_purchased` is the sum of the customer's signed quantities for the
/// product, so earlier returns are already subtracted.
pub fn check_against_purchases(product_id: &str, net_purchased: i64, requested: i64) -> CoreResult<()> {
    ensure_positive(requested)?;

    let available = net_purchased.max(0);
    if requested > available {
        return Err(CoreError::QuantityExceedsAvailable {
            product_id: product_id.to_string(),
            available,
            requested,
        });
    }
    Ok(())
}

fn ensure_positive(requested: i64) -> CoreResult<()> {
    if requested <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "return quantity".to_string(),
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(original: i64, returned: i64, exchanged: i64) -> ReturnAvailability {
        ReturnAvailability {
            original_quantity: original,
            returned_quantity: returned,
            exchanged_quantity: exchanged,
        }
    }

    #[test]
    fn test_available_counts_returns_and_exchanges() {
        assert_eq!(line(3, 1, 1).available(), 1);
        assert_eq!(line(3, 0, 0).available(), 3);
        assert_eq!(line(3, 2, 2).available(), 0);
    }

    #[test]
    fn test_within_cap_is_accepted() {
        assert!(check_against_invoice("p-1", line(3, 1, 0), 2).is_ok());
    }

    #[test]
    fn test_over_cap_is_rejected() {
        let err = check_against_invoice("p-1", line(3, 1, 1), 2).unwrap_err();
        assert!(matches!(
            err,
            CoreError::QuantityExceedsAvailable {
                available: 1,
                requested: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_non_positive_request_is_rejected() {
        assert!(matches!(
            check_against_invoice("p-1", line(3, 0, 0), 0),
            Err(CoreError::Validation(_))
        ));
        assert!(check_against_purchases("p-1", 5, -1).is_err());
    }

    #[test]
    fn test_purchases_rule() {
        assert!(check_against_purchases("p-1", 2, 2).is_ok());
        assert!(check_against_purchases("p-1", 2, 3).is_err());
        assert!(check_against_purchases("p-1", -1, 1).is_err());
    }
}
