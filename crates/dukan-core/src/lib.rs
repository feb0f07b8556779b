//! # dukan-core: Pure Business Logic for Dukan POS
//!
//! This crate is the **heart** of Dukan POS. It contains the reconciliation
//! rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Dukan POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Callers (web UI, admin CLI)                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    dukan-engine (services)                      │   │
//! │  │   Cashier • Invoices • Returns • Daily • Reconciliation         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ dukan-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌────────┐  │   │
//! │  │   │  types  │ │  money  │ │  ledger  │ │ pricing │ │ daily  │  │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └─────────┘ └────────┘  │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌──────────────────┐    │   │
//! │  │   │proration│ │ returns │ │ invoice  │ │   validation     │    │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └──────────────────┘    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    dukan-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, CustomerTransaction, DailyInventory, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`ledger`] - Stock movements for sales, returns, edits and deletes
//! - [`pricing`] - Line totals, refunds, cost and profit
//! - [`proration`] - Splitting a payment over invoice lines
//! - [`returns`] - Return/exchange availability cap
//! - [`daily`] - Daily summary accumulators and annual projection
//! - [`invoice`] - Invoice totals, status and numbering
//! - [`error`] - Domain error types
//! - [`validation`] - Field and cart validation
//!
//! ## Example Usage
//!
//! ```rust
//! use dukan_core::pricing::price_line;
//! use dukan_core::proration::prorate;
//! use dukan_core::Money;
//!
//! let line = price_line(3, 10_000, 1000).unwrap();
//! assert_eq!(line.total(), Money::from_cents(27_000));
//!
//! let split = prorate(Money::from_cents(10_000), &[line.total()]);
//! assert_eq!(split[0].cents(), 10_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod daily;
pub mod error;
pub mod invoice;
pub mod ledger;
pub mod money;
pub mod pricing;
pub mod proration;
pub mod returns;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum |quantity| of a single cart line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Minimum digits of generated invoice and order numbers.
pub const INVOICE_NUMBER_WIDTH: usize = 4;
