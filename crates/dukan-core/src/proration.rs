//! # Payment Proration
//!
//! Distributes one invoice payment across its transactions.
//!
//! ## Algorithm
//! ```text
//! totals:  [100.00, 50.00, 30.00]      payment: 54.00
//!
//!   weight = Σ positive totals = 180.00
//!   tx 1:  54.00 × 100/180 = 30.00
//!   tx 2:  54.00 ×  50/180 = 15.00
//!   tx 3:  54.00 - (30.00 + 15.00) =  9.00   ← last positive absorbs residual
//! ```
//!
//! Only transactions with a positive total take part. Returns and
//! zero-value lines receive nothing, so a refund line never appears to have
//! been "paid".

use crate::money::Money;

/// Splits `payment` over `totals`, returning one allocation per total.
///
/// The allocations always sum to `payment` when at least one total is
/// positive and the payment is positive; otherwise every allocation is zero.
///
/// ```rust
/// use dukan_core::money::Money;
/// use dukan_core::proration::prorate;
///
/// let totals = [Money::from_cents(10_000), Money::from_cents(5000), Money::from_cents(3000)];
/// let split = prorate(Money::from_cents(5400), &totals);
/// assert_eq!(split, vec![Money::from_cents(3000), Money::from_cents(1500), Money::from_cents(900)]);
/// ```
pub fn prorate(payment: Money, totals: &[Money]) -> Vec<Money> {
    let mut allocations = vec![Money::zero(); totals.len()];

    if !payment.is_positive() {
        return allocations;
    }

    let weight: i64 = totals
        .iter()
        .filter(|t| t.is_positive())
        .map(|t| t.cents())
        .sum();
    let last_positive = match totals.iter().rposition(|t| t.is_positive()) {
        Some(index) => index,
        None => return allocations,
    };

    let mut allocated = Money::zero();
    for (index, total) in totals.iter().enumerate() {
        if !total.is_positive() {
            continue;
        }
        let share = if index == last_positive {
            payment - allocated
        } else {
            payment.scale(total.cents(), weight)
        };
        allocated += share;
        allocations[index] = share;
    }

    allocations
}

// =============================================================================
// Unit Tests
// =============================================================================
