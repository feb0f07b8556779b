//! # Error Types
//!
//! Domain-specific error types for dukan-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  dukan-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  dukan-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  dukan-engine errors                                                   │
//! │  ├── EngineError      - Service failures (Core | Db | timeout)         │
//! │  └── ApiError         - What callers see (serialized)                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → ApiError            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Propagation Policy
//! Validation failures (not-found, over-limit, insufficient stock) block the
//! triggering operation entirely. Aggregation failures are logged by the
//! engine and never surface through these types to the cashier.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be resolved by id or by exact name.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Insufficient stock to complete a sale.
    ///
    /// ## User Workflow
    /// ```text
    /// Sell (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Abaya Black", available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// A different customer already owns this phone number.
    #[error("Phone number {0} is already registered to another customer")]
    DuplicatePhoneNumber(String),

    /// The invoice referenced by a return/exchange does not exist.
    #[error("Original invoice not found: {0}")]
    OriginalInvoiceNotFound(String),

    /// The product is not a line of the referenced invoice.
    #[error("Product {product_id} is not part of invoice {invoice_number}")]
    ProductNotInOriginalInvoice {
        invoice_number: String,
        product_id: String,
    },

    /// Requested return/exchange quantity exceeds what is still returnable.
    #[error("Requested quantity {requested} exceeds available quantity {available} for product {product_id}")]
    QuantityExceedsAvailable {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Customer lookup or creation failed.
    #[error("Customer validation failed: {0}")]
    CustomerValidationFailed(String),

    /// A daily rebuild could not complete.
    #[error("Inventory recalculation failed for {date}: {reason}")]
    InventoryRecalculationFailed { date: String, reason: String },

    /// Conflicting concurrent write; the caller may retry.
    #[error("Database conflict: {0}")]
    DatabaseConflict(String),

    /// Ledger entry cannot be found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Day status does not allow the requested transition.
    #[error("Daily inventory for {date} is {status}, cannot {action}")]
    InvalidDayStatus {
        date: String,
        status: String,
        action: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Whether this error was caused by caller input rather than by the system.
    pub fn is_validation_failure(&self) -> bool {
        !matches!(
            self,
            CoreError::InventoryRecalculationFailed { .. } | CoreError::DatabaseConflict(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be zero.
    #[error("{field} must not be zero")]
    MustBeNonZero { field: String },

    /// Invalid format (e.g., invalid UUID, invalid phone).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
