//! # Line Pricing
//!
//! Turns a signed cart line into its stored amounts, and derives cost and
//! profit from the captured cost basis.
//!
//! ## Formulas
//! ```text
//! total    = (unit_price - discount) × quantity      (discount = 0 if qty ≤ 0)
//! cost     = unit_cost × quantity                    (0 if no cost basis)
//! profit   = total - cost                            (0 if no cost basis)
//! refund   = paid unit price = unit_price - discount  of the original line
//! ```
//!
//! ## Example: sale then return
//! ```rust
//! use dukan_core::pricing::{price_line, return_line};
//!
//! let sale = price_line(3, 10_000, 1000).unwrap();
//! assert_eq!(sale.total_price_cents, 27_000);
//!
//! let refund = return_line(10_000, 1000, 1).unwrap();
//! assert_eq!(refund.total_price_cents, -9000);
//! assert_eq!(refund.discount_cents, 0);
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::Money;
use crate::validation::{
    validate_discount_cents, validate_line_quantity, validate_positive_quantity,
    validate_price_cents,
};

/// The amounts stored on a ledger entry for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LinePrice {
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub discount_cents: i64,
    pub total_price_cents: i64,
}

impl LinePrice {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }

    /// Discount granted across the whole line (zero for returns).
    #[inline]
    pub fn line_discount_cents(&self) -> i64 {
        if self.quantity > 0 {
            self.discount_cents * self.quantity
        } else {
            0
        }
    }
}

/// Prices a signed cart line.
///
/// Discounts only apply to sale lines; a negative quantity forces the
/// discount to zero so a refund is never discounted twice.
pub fn price_line(quantity: i64, unit_price_cents: i64, discount_cents: i64) -> CoreResult<LinePrice> {
    validate_line_quantity(quantity)?;
    validate_price_cents(unit_price_cents)?;

    let discount_cents = if quantity > 0 {
        validate_discount_cents(discount_cents, unit_price_cents)?;
        discount_cents
    } else {
        0
    };

    let total = Money::from_cents(unit_price_cents - discount_cents).multiply_quantity(quantity);

    Ok(LinePrice {
        quantity,
        unit_price_cents,
        discount_cents,
        total_price_cents: total.cents(),
    })
}

/// Unit amount the customer actually paid on a sale line.
#[inline]
pub fn paid_unit_price(unit_price_cents: i64, discount_cents: i64) -> i64 {
    unit_price_cents - discount_cents
}

/// Prices the negative leg that reverses `quantity` units of a sold line.
///
/// The refund uses the paid unit price so the original discount is
/// reversed exactly once.
pub fn return_line(
    original_unit_price_cents: i64,
    original_discount_cents: i64,
    quantity: i64,
) -> CoreResult<LinePrice> {
    validate_positive_quantity(quantity)?;
    let paid = paid_unit_price(original_unit_price_cents, original_discount_cents).max(0);
    price_line(-quantity, paid, 0)
}

/// Cost of a line at the captured cost basis; zero when no basis exists.
pub fn line_cost_cents(unit_cost_cents: Option<i64>, quantity: i64) -> i64 {
    match unit_cost_cents {
        Some(cost) if cost > 0 => cost * quantity,
        _ => 0,
    }
}

/// Profit of a line at its unit price; zero when no basis exists.
///
/// The sign follows `quantity`, so refunds subtract.
pub fn line_profit_cents(price_cents: i64, unit_cost_cents: Option<i64>, quantity: i64) -> i64 {
    match unit_cost_cents {
        Some(cost) if cost > 0 => (price_cents - cost) * quantity,
        _ => 0,
    }
}

/// Per-unit cost derived from a carton price over the units received.
///
/// ```rust
/// use dukan_core::pricing::unit_cost_from_carton;
///
/// assert_eq!(unit_cost_from_carton(Some(60_000), 10), Some(6000));
/// assert_eq!(unit_cost_from_carton(Some(10_000), 3), Some(3333));
/// assert_eq!(unit_cost_from_carton(None, 10), None);
/// ```
pub fn unit_cost_from_carton(carton_price_cents: Option<i64>, quantity: i64) -> Option<i64> {
    match carton_price_cents {
        Some(carton) if carton > 0 && quantity > 0 => {
            Some(Money::from_cents(carton).scale(1, quantity).cents())
        }
        _ => None,
    }
}

/// Amount owed by the customer when exchanging (negative = shop refunds).
pub fn exchange_price_difference(
    new_unit_price_cents: i64,
    old_paid_unit_cents: i64,
    quantity: i64,
) -> i64 {
    new_unit_price_cents * quantity - old_paid_unit_cents * quantity
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, ValidationError};

    #[test]
    fn test_simple_sale() {
        let line = price_line(3, 10_000, 1000).unwrap();
        assert_eq!(line.total_price_cents, 27_000);
        assert_eq!(line.line_discount_cents(), 3000);
    }

    #[test]
    fn test_negative_line_drops_discount() {
        let line = price_line(-2, 10_000, 1000).unwrap();
        assert_eq!(line.discount_cents, 0);
        assert_eq!(line.total_price_cents, -20_000);
        assert_eq!(line.line_discount_cents(), 0);
    }

    #[test]
    fn test_sign_follows_quantity() {
        for qty in [-5, -1, 1, 5] {
            let line = price_line(qty, 2500, 0).unwrap();
            assert_eq!(line.total_price_cents.signum(), qty.signum());
        }
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let err = price_line(0, 10_000, 0).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MustBeNonZero { .. })
        ));
    }

    #[test]
    fn test_discount_above_price_rejected() {
        assert!(price_line(1, 1000, 1500).is_err());
    }

    #[test]
    fn test_return_line_uses_paid_price() {
        let line = return_line(10_000, 1000, 1).unwrap();
        assert_eq!(line.quantity, -1);
        assert_eq!(line.unit_price_cents, 9000);
        assert_eq!(line.total_price_cents, -9000);
    }

    #[test]
    fn test_no_cost_basis_means_no_profit() {
        assert_eq!(line_cost_cents(None, 3), 0);
        assert_eq!(line_cost_cents(Some(0), 3), 0);
        assert_eq!(line_profit_cents(10_000, None, 3), 0);
        assert_eq!(line_profit_cents(10_000, Some(0), 3), 0);
    }

    #[test]
    fn test_profit_with_cost_basis() {
        assert_eq!(line_cost_cents(Some(6000), 3), 18_000);
        assert_eq!(line_profit_cents(10_000, Some(6000), 3), 12_000);
        // refunds subtract
        assert_eq!(line_profit_cents(9000, Some(6000), -1), -3000);
    }

    #[test]
    fn test_exchange_price_difference() {
        assert_eq!(exchange_price_difference(7000, 5000, 1), 2000);
        assert_eq!(exchange_price_difference(4000, 5000, 2), -2000);
    }
}
