//! # Invoice Rules
//!
//! Totals, status and number formatting for invoice snapshots.
//!
//! ## Settlement Rules
//! ```text
//! subtotal  = Σ line totals (signed)
//! total     = subtotal                      shipping is display only
//! paid      = requested, or subtotal when subtotal < 0 (refund)
//! remaining = max(total - paid, 0)          0 when total < 0
//!
//! status:   total < 0 or remaining == 0  → Paid
//!           paid > 0                     → PartiallyPaid
//!           otherwise                    → Unpaid
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{CustomerTransaction, InvoiceStatus};
use crate::INVOICE_NUMBER_WIDTH;

/// Computed header amounts for an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceTotals {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub shipping_cents: i64,
    pub total_amount_cents: i64,
    pub amount_paid_cents: i64,
    pub remaining_amount_cents: i64,
    pub status: InvoiceStatus,
}

/// Computes invoice totals from the lines being invoiced.
pub fn compute_totals(
    transactions: &[CustomerTransaction],
    requested_payment_cents: i64,
    shipping_cents: i64,
) -> InvoiceTotals {
    let subtotal: i64 = transactions.iter().map(|t| t.total_price_cents).sum();
    let discount: i64 = transactions
        .iter()
        .filter(|t| t.quantity > 0)
        .map(|t| t.discount_cents * t.quantity)
        .sum();

    let total = subtotal;
    let paid = if subtotal < 0 {
        subtotal
    } else {
        requested_payment_cents
    };
    let remaining = if total >= 0 { (total - paid).max(0) } else { 0 };

    InvoiceTotals {
        subtotal_cents: subtotal,
        discount_cents: discount,
        shipping_cents,
        total_amount_cents: total,
        amount_paid_cents: paid,
        remaining_amount_cents: remaining,
        status: settlement_status(total, paid, remaining),
    }
}

/// Derives the status from settled amounts.
pub fn settlement_status(total_cents: i64, paid_cents: i64, remaining_cents: i64) -> InvoiceStatus {
    if total_cents < 0 || remaining_cents == 0 {
        InvoiceStatus::Paid
    } else if paid_cents > 0 {
        InvoiceStatus::PartiallyPaid
    } else {
        InvoiceStatus::Unpaid
    }
}

// =============================================================================
// Numbering
// =============================================================================

/// Zero-pads a counter value.
///
/// ```rust
/// use dukan_core::invoice::format_number;
///
/// assert_eq!(format_number(7), "0007");
/// assert_eq!(format_number(12345), "12345");
/// ```
pub fn format_number(value: i64) -> String {
    format!("{:0width$}", value, width = INVOICE_NUMBER_WIDTH)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionKind;
    use chrono::{NaiveDate, Utc};

    fn line(qty: i64, price: i64, discount: i64) -> CustomerTransaction {
        let discount = if qty > 0 { discount } else { 0 };
        CustomerTransaction {
            id: format!("t{}{}", qty, price),
            customer_id: "c-1".to_string(),
            product_id: Some("p".to_string()),
            kind: TransactionKind::for_quantity(qty),
            quantity: qty,
            price_cents: price,
            discount_cents: discount,
            total_price_cents: (price - discount) * qty,
            unit_cost_cents: None,
            shipping_cents: 0,
            amount_paid_cents: 0,
            transaction_date: NaiveDate::from_ymd_opt(2026, 10, 19)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            invoice_number: None,
            notes: None,
            color: None,
            size: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_partial_payment() {
        let totals = compute_totals(&[line(3, 10_000, 1000)], 10_000, 500);
        assert_eq!(totals.subtotal_cents, 27_000);
        assert_eq!(totals.total_amount_cents, 27_000);
        assert_eq!(totals.discount_cents, 3000);
        assert_eq!(totals.shipping_cents, 500);
        assert_eq!(totals.remaining_amount_cents, 17_000);
        assert_eq!(totals.status, InvoiceStatus::PartiallyPaid);
    }

    #[test]
    fn test_full_payment_and_unpaid() {
        assert_eq!(
            compute_totals(&[line(1, 5000, 0)], 5000, 0).status,
            InvoiceStatus::Paid
        );
        assert_eq!(
            compute_totals(&[line(1, 5000, 0)], 0, 0).status,
            InvoiceStatus::Unpaid
        );
    }

    #[test]
    fn test_overpayment_leaves_nothing_remaining() {
        let totals = compute_totals(&[line(1, 5000, 0)], 8000, 0);
        assert_eq!(totals.remaining_amount_cents, 0);
        assert_eq!(totals.status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_refund_invoice_is_settled() {
        let totals = compute_totals(&[line(-1, 9000, 0)], 0, 0);
        assert_eq!(totals.total_amount_cents, -9000);
        assert_eq!(totals.amount_paid_cents, -9000);
        assert_eq!(totals.remaining_amount_cents, 0);
        assert_eq!(totals.status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_mixed_cart_discount_counts_sale_lines_only() {
        let totals = compute_totals(&[line(2, 5000, 500), line(-1, 4000, 500)], 0, 0);
        assert_eq!(totals.discount_cents, 1000);
        assert_eq!(totals.subtotal_cents, 9000 - 4000);
    }

    #[test]
    fn test_number_padding() {
        assert_eq!(format_number(1), "0001");
        assert_eq!(format_number(12_345), "12345");
    }
}
