//! # Engine Errors
//!
//! Two error types live here:
//!
//! - [`EngineError`]: what services return. Wraps domain and database
//!   errors so `?` works across both layers.
//! - [`ApiError`]: what callers show to a user. Serializable, with a
//!   machine-readable code and a message that never carries raw SQL.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Service call                                                           │
//! │  EngineResult<T>                                                        │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Rule failed? ──── CoreError::InsufficientStock ────┐                   │
//! │         │                                           │                   │
//! │         ▼                                           ▼                   │
//! │  SQLite busy? ──── DbError::Conflict ──► CoreError::DatabaseConflict    │
//! │         │                                           │                   │
//! │         ▼                                           ▼                   │
//! │  Other DB error ── DbError::QueryFailed ──► logged, ApiError(DATABASE)  │
//! │                                                                         │
//! │  try {                                                                  │
//! │    await checkout(cart)                                                 │
//! │  } catch (e) {                                                          │
//! │    // e.code = "INSUFFICIENT_STOCK"                                     │
//! │    // e.message = "Insufficient stock for Abaya Black M: ..."           │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use dukan_core::{CoreError, ValidationError};
use dukan_db::DbError;
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

/// Errors returned by engine services.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A business rule rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The database failed underneath the operation.
    #[error(transparent)]
    Db(DbError),

    /// An export did not finish within the configured timeout.
    #[error("Export for {date} timed out after {seconds}s")]
    ExportTimedOut { date: NaiveDate, seconds: u64 },

    /// Filesystem failure while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Whether this is a rejected request rather than an infrastructure
    /// failure.
    pub fn is_validation_failure(&self) -> bool {
        match self {
            EngineError::Core(e) => e.is_validation_failure(),
            _ => false,
        }
    }
}

/// Busy/locked SQLite errors become the domain's `DatabaseConflict`.
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict(message) => EngineError::Core(CoreError::DatabaseConflict(message)),
            other => EngineError::Db(other),
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::from(DbError::from(err))
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

// =============================================================================
// User-facing error
// =============================================================================

/// Error shape handed to front ends.
///
/// ```json
/// {
///   "code": "QUANTITY_EXCEEDS_AVAILABLE",
///   "message": "Requested quantity 3 exceeds available quantity 2 for product ..."
/// }
/// ```
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Not enough stock for a sale line
    InsufficientStock,

    /// Return or exchange beyond what was sold
    QuantityExceedsAvailable,

    /// Business rule blocked the action (422)
    BusinessLogic,

    /// Another writer holds the database; retry later (409)
    Conflict,

    /// Export did not finish in time
    Timeout,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Record is still referenced")
            }
            DbError::Conflict(e) => {
                tracing::warn!("Database conflict: {}", e);
                ApiError::new(ErrorCode::Conflict, "Database is busy, try again")
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts domain errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::TransactionNotFound(id) => ApiError::not_found("Transaction", &id),
            CoreError::OriginalInvoiceNotFound(number) => ApiError::not_found("Invoice", &number),
            CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, message)
            }
            CoreError::QuantityExceedsAvailable { .. } => {
                ApiError::new(ErrorCode::QuantityExceedsAvailable, message)
            }
            CoreError::DuplicatePhoneNumber(_)
            | CoreError::CustomerValidationFailed(_)
            | CoreError::Validation(_) => ApiError::validation(message),
            CoreError::ProductNotInOriginalInvoice { .. } | CoreError::InvalidDayStatus { .. } => {
                ApiError::new(ErrorCode::BusinessLogic, message)
            }
            CoreError::DatabaseConflict(e) => {
                tracing::warn!("Database conflict: {}", e);
                ApiError::new(ErrorCode::Conflict, "Database is busy, try again")
            }
            CoreError::InventoryRecalculationFailed { date, reason } => {
                tracing::error!(date = %date, reason = %reason, "Recalculation failed");
                ApiError::internal(format!("Inventory recalculation failed for {}", date))
            }
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Core(e) => e.into(),
            EngineError::Db(e) => e.into(),
            EngineError::ExportTimedOut { date, seconds } => ApiError::new(
                ErrorCode::Timeout,
                format!("Export for {} timed out after {}s", date, seconds),
            ),
            EngineError::Io(e) => {
                tracing::error!("I/O error: {}", e);
                ApiError::internal("Storage is not accessible")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_database_maps_to_conflict() {
        let err = EngineError::from(DbError::Conflict("database is locked".to_string()));
        assert!(matches!(err, EngineError::Core(CoreError::DatabaseConflict(_))));
        assert!(!err.is_validation_failure());

        let api: ApiError = err.into();
        assert_eq!(api.code, ErrorCode::Conflict);
    }

    #[test]
    fn test_return_cap_has_dedicated_code() {
        let err = EngineError::from(CoreError::QuantityExceedsAvailable {
            product_id: "p-1".to_string(),
            available: 2,
            requested: 3,
        });
        assert!(err.is_validation_failure());

        let api = ApiError::from(err);
        assert_eq!(api.code, ErrorCode::QuantityExceedsAvailable);
        assert!(api.message.contains("available quantity 2"));
    }

    #[test]
    fn test_query_failure_hides_sql() {
        let api = ApiError::from(DbError::QueryFailed("no such column: foo".to_string()));
        assert_eq!(api.code, ErrorCode::DatabaseError);
        assert!(!api.message.contains("foo"));
    }

    #[test]
    fn test_serialized_shape() {
        let api = ApiError::not_found("Invoice", "0042");
        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Invoice not found: 0042");
    }
}
