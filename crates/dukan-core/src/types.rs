//! # Domain Types
//!
//! Core domain types used throughout Dukan POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────────┐   ┌─────────────────┐  │
//! │  │    Product      │   │ CustomerTransaction  │   │    Customer     │  │
//! │  │  quantity       │◄──│  kind, quantity (±)  │──►│  phone (unique) │  │
//! │  │  price_cents    │   │  total_price (±)     │   └─────────────────┘  │
//! │  │  unit_cost      │   │  amount_paid         │                        │
//! │  └─────────────────┘   └──────────┬───────────┘                        │
//! │                                   │                                     │
//! │            ┌──────────────────────┼───────────────────────┐            │
//! │            ▼                      ▼                       ▼            │
//! │  ┌─────────────────┐   ┌──────────────────────┐   ┌─────────────────┐  │
//! │  │ Invoice / Items │   │ Return / Exchange    │   │ DailyInventory  │  │
//! │  │ (snapshot)      │   │ Tracking (cap)       │   │ + summaries     │  │
//! │  └─────────────────┘   └──────────────────────┘   └─────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Signed Quantity Convention
//! Positive quantity is a sale (stock decreases), negative quantity is a
//! return (stock increases). `total_price_cents` always carries the same sign.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, also used as a lookup fallback by the cashier.
    pub name: String,

    /// On-hand quantity. Not strictly kept non-negative.
    pub quantity: i64,

    /// Selling price per unit.
    pub price_cents: i64,

    /// Wholesale cost of the last received batch.
    pub carton_price_cents: Option<i64>,

    /// Cost basis per unit, frozen when the carton price was entered.
    pub unit_cost_cents: Option<i64>,

    pub color: Option<String>,
    pub size: Option<String>,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the selling price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the usable cost basis. Zero or missing means "unknown".
    pub fn cost_basis(&self) -> Option<i64> {
        self.unit_cost_cents.filter(|cost| *cost > 0)
    }

    /// Checks if the requested quantity can be taken from stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.quantity >= quantity
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A shop customer. Phone numbers are unique.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub address: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Transaction Kind
// =============================================================================

/// What produced a ledger entry. Set when the entry is created and never
/// inferred from free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Positive-quantity cart line.
    Sale,
    /// Negative-quantity line, from the cart or from a tracked return.
    Return,
    /// Either leg of a tracked exchange.
    Exchange,
    /// Debt payment with no product attached.
    Payment,
}

impl TransactionKind {
    /// Kind for a cart line with the given signed quantity.
    pub fn for_quantity(quantity: i64) -> Self {
        if quantity < 0 {
            TransactionKind::Return
        } else {
            TransactionKind::Sale
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Sale => "sale",
            TransactionKind::Return => "return",
            TransactionKind::Exchange => "exchange",
            TransactionKind::Payment => "payment",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Customer Transaction
// =============================================================================

/// The ledger entry. Single source of truth for profit and debt.
///
/// ## Invariants
/// - `total_price_cents = (price_cents - discount_cents) × quantity`
/// - `discount_cents == 0` whenever `quantity <= 0`
/// - `sign(total_price_cents) == sign(quantity)` for item rows
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CustomerTransaction {
    pub id: String,
    pub customer_id: String,
    /// None only for `TransactionKind::Payment`.
    pub product_id: Option<String>,
    pub kind: TransactionKind,
    /// Signed: > 0 sale, < 0 return.
    pub quantity: i64,
    /// Unit price charged (or refunded) per unit.
    pub price_cents: i64,
    /// Discount per unit, only on sale lines.
    pub discount_cents: i64,
    pub total_price_cents: i64,
    /// Cost basis captured from the product when the entry was recorded.
    pub unit_cost_cents: Option<i64>,
    /// Display only, never part of a financial sum.
    pub shipping_cents: i64,
    pub amount_paid_cents: i64,
    /// Shop-local business timestamp used for daily bucketing.
    #[ts(as = "String")]
    pub transaction_date: NaiveDateTime,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl CustomerTransaction {
    /// Returns the signed line total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }

    /// Calendar day this entry belongs to.
    #[inline]
    pub fn business_date(&self) -> NaiveDate {
        self.transaction_date.date()
    }

    /// Whether the entry moves stock (has a product).
    #[inline]
    pub fn is_item(&self) -> bool {
        self.product_id.is_some()
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// What kind of operation an invoice documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    Sale,
    Return,
    Exchange,
}

/// Settlement status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Unpaid,
    PartiallyPaid,
    Paid,
    Cancelled,
}

/// Immutable invoice snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    pub order_number: String,
    pub customer_id: String,
    pub invoice_type: InvoiceType,
    pub status: InvoiceStatus,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    /// Display only.
    pub shipping_cents: i64,
    pub total_amount_cents: i64,
    pub amount_paid_cents: i64,
    pub remaining_amount_cents: i64,
    /// Set on return and exchange invoices.
    pub original_invoice_number: Option<String>,
    pub cashier_name: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub issued_at: NaiveDateTime,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A frozen invoice line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    pub transaction_id: String,
    pub product_id: String,
    /// Product name at time of invoicing (frozen).
    pub product_name: String,
    /// Signed like the transaction it mirrors.
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub discount_cents: i64,
    pub total_price_cents: i64,
}

// =============================================================================
// Return / Exchange Tracking
// =============================================================================

/// Links a return invoice to the invoice it reverses.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ReturnTracking {
    pub id: String,
    pub original_invoice_number: String,
    pub return_invoice_number: String,
    pub product_id: String,
    pub returned_quantity: i64,
    pub reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// Links an exchange invoice to the invoice it partially reverses.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ExchangeTracking {
    pub id: String,
    pub original_invoice_number: String,
    pub exchange_invoice_number: String,
    pub old_product_id: String,
    pub new_product_id: String,
    pub exchanged_quantity: i64,
    /// Positive when the customer owes more.
    pub price_difference_cents: i64,
    pub reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

// =============================================================================
// Daily Inventory
// =============================================================================

/// Lifecycle of a day's aggregate.
///
/// ```text
/// Active ──close──► Closed ──reopen──► Active
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DailyStatus {
    Active,
    Closed,
}

impl DailyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DailyStatus::Active => "active",
            DailyStatus::Closed => "closed",
        }
    }
}

impl Default for DailyStatus {
    fn default() -> Self {
        DailyStatus::Active
    }
}

/// One row per calendar date.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DailyInventory {
    pub id: String,
    #[ts(as = "String")]
    pub business_date: NaiveDate,
    pub status: DailyStatus,
    pub total_sales_cents: i64,
    pub total_cost_cents: i64,
    pub total_discounts_cents: i64,
    pub net_profit_cents: i64,
    pub total_payments_cents: i64,
    pub total_debts_cents: i64,
    pub transactions_count: i64,
    pub customers_count: i64,
    pub products_sold_count: i64,
    pub total_quantity_sold: i64,
    pub returns_count: i64,
    pub exchanges_count: i64,
    /// Set when a side-channel update could not be applied.
    pub pending_reconciliation: bool,
    /// Bumped by every full rebuild.
    pub aggregation_version: i64,
    pub notes: Option<String>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl DailyInventory {
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.status == DailyStatus::Closed
    }
}

/// Snapshot of a transaction as it was aggregated into a day.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DailySaleTransaction {
    pub id: String,
    pub daily_inventory_id: String,
    pub transaction_id: String,
    pub customer_id: String,
    pub product_id: Option<String>,
    pub kind: TransactionKind,
    pub quantity: i64,
    pub price_cents: i64,
    pub discount_cents: i64,
    pub total_price_cents: i64,
    pub unit_cost_cents: Option<i64>,
    pub amount_paid_cents: i64,
    pub shipping_cents: i64,
    #[ts(as = "String")]
    pub transaction_date: NaiveDateTime,
}

/// Per-day, per-product aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DailyProductSummary {
    pub daily_inventory_id: String,
    pub product_id: String,
    pub total_quantity_sold: i64,
    pub total_sales_value_cents: i64,
    pub total_cost_value_cents: i64,
    pub total_discounts_cents: i64,
    pub net_sales_value_cents: i64,
    pub net_profit_cents: i64,
    pub transactions_count: i64,
}

/// Per-day, per-customer aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DailyCustomerSummary {
    pub daily_inventory_id: String,
    pub customer_id: String,
    pub transactions_count: i64,
    pub total_purchases_cents: i64,
    pub total_payments_cents: i64,
    /// Purchases minus payments. Negative means the shop owes a refund.
    pub debt_amount_cents: i64,
}

// =============================================================================
// Activity Log
// =============================================================================

/// An audit-trail line written after meaningful mutations.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ActivityLog {
    pub id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: Option<String>,
    pub actor: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
