//! # Inventory Ledger Rules
//!
//! Pure rules deciding how a product's on-hand quantity moves.
//!
//! ## Movement Table
//! ```text
//! ┌───────────────────────────┬──────────────────────────┬────────────────┐
//! │ Event                     │ Movement                 │ Stock check?   │
//! ├───────────────────────────┼──────────────────────────┼────────────────┤
//! │ record sale (qty > 0)     │ Decrease(qty)            │ yes            │
//! │ record return (qty < 0)   │ Increase(|qty|)          │ no             │
//! │ edit (delta = new - old)  │ delta>0 Decrease(delta)  │ yes            │
//! │                           │ delta<0 Increase(|delta|)│ no             │
//! │ delete sale               │ Increase(qty)            │ no             │
//! │ delete return             │ Remove(|qty|), clamp ≥ 0 │ no             │
//! └───────────────────────────┴──────────────────────────┴────────────────┘
//! ```
//!
//! The database layer executes a `StockMovement` as a single conditional
//! UPDATE.

use serde::{Deserialize, Serialize};

/// A planned change to a product's on-hand quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "quantity", rename_all = "snake_case")]
pub enum StockMovement {
    /// Take units out of stock; requires enough on hand.
    Decrease(i64),
    /// Put units back into stock unconditionally.
    Increase(i64),
    /// Take units out without a stock check, never going below zero.
    Remove(i64),
    Unchanged,
}

impl StockMovement {
    /// Signed change relative to current stock (before clamping).
    pub fn signed_delta(&self) -> i64 {
        match *self {
            StockMovement::Decrease(q) | StockMovement::Remove(q) => -q,
            StockMovement::Increase(q) => q,
            StockMovement::Unchanged => 0,
        }
    }
}

/// Movement for recording a new signed line.
pub fn movement_for_line(quantity: i64) -> StockMovement {
    match quantity {
        q if q > 0 => StockMovement::Decrease(q),
        q if q < 0 => StockMovement::Increase(-q),
        _ => StockMovement::Unchanged,
    }
}

/// Movement for editing a line from `old_quantity` to `new_quantity`.
///
/// ```rust
/// use dukan_core::ledger::{movement_for_edit, StockMovement};
///
/// // sold 3, corrected to 5: two more units leave the shelf
/// assert_eq!(movement_for_edit(3, 5), StockMovement::Decrease(2));
/// // sold 3, corrected to -1 (it was a return): four units come back
/// assert_eq!(movement_for_edit(3, -1), StockMovement::Increase(4));
/// ```
pub fn movement_for_edit(old_quantity: i64, new_quantity: i64) -> StockMovement {
    movement_for_line(new_quantity - old_quantity)
}

/// Movement that exactly reverses a deleted line.
pub fn movement_for_delete(quantity: i64) -> StockMovement {
    match quantity {
        q if q > 0 => StockMovement::Increase(q),
        q if q < 0 => StockMovement::Remove(-q),
        _ => StockMovement::Unchanged,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_then_return_conserves_stock() {
        let sale = movement_for_line(3);
        let refund = movement_for_line(-3);
        assert_eq!(sale, StockMovement::Decrease(3));
        assert_eq!(refund, StockMovement::Increase(3));
        assert_eq!(sale.signed_delta() + refund.signed_delta(), 0);
    }

    #[test]
    fn test_zero_line_moves_nothing() {
        assert_eq!(movement_for_line(0), StockMovement::Unchanged);
        assert_eq!(movement_for_delete(0), StockMovement::Unchanged);
    }

    #[test]
    fn test_edit_uses_delta() {
        assert_eq!(movement_for_edit(3, 3), StockMovement::Unchanged);
        assert_eq!(movement_for_edit(5, 3), StockMovement::Increase(2));
        assert_eq!(movement_for_edit(-1, 2), StockMovement::Decrease(3));
    }

    #[test]
    fn test_edit_increase_checks_only_the_delta() {
        // raising a sale of 3 to 10 needs 7 more units, not 10
        assert_eq!(movement_for_edit(3, 10), StockMovement::Decrease(7));
    }

    #[test]
    fn test_delete_reverses_exactly() {
        assert_eq!(movement_for_delete(3), StockMovement::Increase(3));
        assert_eq!(movement_for_delete(-2), StockMovement::Remove(2));
    }

    #[test]
    fn test_delete_of_return_removes_without_check() {
        let undo = movement_for_delete(-4);
        assert_eq!(undo, StockMovement::Remove(4));
        assert_eq!(undo.signed_delta(), -4);
    }

    #[test]
    fn test_signed_delta() {
        assert_eq!(StockMovement::Decrease(2).signed_delta(), -2);
        assert_eq!(StockMovement::Increase(2).signed_delta(), 2);
        assert_eq!(StockMovement::Unchanged.signed_delta(), 0);
    }
}
