//! # Validation Module
//!
//! Input validation utilities for Dukan POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Engine request (Rust)                                        │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: field and cart rules                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Domain rules (ledger, returns)                               │
//! │  ├── Stock availability                                                │
//! │  └── Return/exchange cap                                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE constraints (phone, invoice number, business date)         │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use dukan_core::validation::{validate_phone, validate_line_quantity};
//!
//! assert!(validate_phone("+92 300 1234567").is_ok());
//! assert!(validate_line_quantity(-2).is_ok());
//! assert!(validate_line_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use dukan_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Abaya Black").is_ok());
/// assert!(validate_product_name("").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a customer name.
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "customer name".to_string(),
        });
    }

    if name.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "customer name".to_string(),
            max: 100,
        });
    }

    Ok(())
}

/// Validates a phone number and returns its normalized form.
///
/// ## Rules
/// - Required
/// - Digits, spaces, hyphens and one leading `+` only
/// - Between 7 and 15 digits
///
/// Normalization strips spaces and hyphens so "0300-1234567" and
/// "0300 1234567" find the same customer.
pub fn validate_phone(phone: &str) -> ValidationResult<String> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    let mut normalized = String::with_capacity(phone.len());
    for (i, c) in phone.chars().enumerate() {
        match c {
            '0'..='9' => normalized.push(c),
            '+' if i == 0 => normalized.push(c),
            ' ' | '-' => {}
            _ => {
                return Err(ValidationError::InvalidFormat {
                    field: "phone".to_string(),
                    reason: "must contain only digits, spaces, hyphens and a leading +"
                        .to_string(),
                })
            }
        }
    }

    let digits = normalized.chars().filter(|c| c.is_ascii_digit()).count();
    if digits < 7 {
        return Err(ValidationError::TooShort {
            field: "phone".to_string(),
            min: 7,
        });
    }
    if digits > 15 {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max: 15,
        });
    }

    Ok(normalized)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a signed cart line quantity.
///
/// ## Rules
/// - Must not be zero (positive = sale, negative = return)
/// - |quantity| must not exceed MAX_ITEM_QUANTITY
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cart line: quantity -1 (customer returns one unit)                     │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_line_quantity(-1) ← THIS FUNCTION                            │
/// │       │                                                                 │
/// │       ├── qty == 0?        → Error: "quantity must not be zero"        │
/// │       ├── |qty| > 999?     → Error: out of range                       │
/// │       └── OK → validate_return_request, then record                    │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_line_quantity(qty: i64) -> ValidationResult<()> {
    if qty == 0 {
        return Err(ValidationError::MustBeNonZero {
            field: "quantity".to_string(),
        });
    }

    if qty.abs() > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: -MAX_ITEM_QUANTITY,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a strictly positive quantity (returns, exchanges, restocks).
pub fn validate_positive_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items).
///
/// ## Example
/// ```rust
/// use dukan_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a per-unit discount against the unit price.
pub fn validate_discount_cents(discount: i64, unit_price: i64) -> ValidationResult<()> {
    if discount < 0 || discount > unit_price {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: unit_price.max(0),
        });
    }

    Ok(())
}

/// Validates a payment amount in cents.
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

/// Validates an optional non-negative amount (shipping, requested payment).
pub fn validate_non_negative(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines in a cart.
///
/// ## Rules
/// - At least one line
/// - At most MAX_CART_ITEMS lines
pub fn validate_cart_size(items: usize) -> ValidationResult<()> {
    if items == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if items > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 1,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Abaya Black").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name("   ").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_phone_normalizes() {
        assert_eq!(validate_phone("0300-1234567").unwrap(), "03001234567");
        assert_eq!(validate_phone("+92 300 1234567").unwrap(), "+923001234567");
    }

    #[test]
    fn test_validate_phone_rejects_bad_input() {
        assert!(validate_phone("").is_err());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("0300-12a4567").is_err());
        assert!(validate_phone("03+001234567").is_err());
        assert!(validate_phone(&"1".repeat(20)).is_err());
    }

    #[test]
    fn test_validate_line_quantity() {
        assert!(validate_line_quantity(1).is_ok());
        assert!(validate_line_quantity(-1).is_ok());
        assert!(validate_line_quantity(999).is_ok());

        assert!(matches!(
            validate_line_quantity(0),
            Err(ValidationError::MustBeNonZero { .. })
        ));
        assert!(validate_line_quantity(1000).is_err());
        assert!(validate_line_quantity(-1000).is_err());
    }

    #[test]
    fn test_validate_positive_quantity() {
        assert!(validate_positive_quantity(2).is_ok());
        assert!(validate_positive_quantity(0).is_err());
        assert!(validate_positive_quantity(-2).is_err());
    }

    #[test]
    fn test_validate_discount() {
        assert!(validate_discount_cents(0, 10_000).is_ok());
        assert!(validate_discount_cents(1000, 10_000).is_ok());
        assert!(validate_discount_cents(10_000, 10_000).is_ok());
        assert!(validate_discount_cents(10_001, 10_000).is_err());
        assert!(validate_discount_cents(-1, 10_000).is_err());
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(1).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS).is_ok());
        assert!(validate_cart_size(0).is_err());
        assert!(validate_cart_size(MAX_CART_ITEMS + 1).is_err());
    }

    #[test]
    fn test_validate_price_and_payment() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(-1).is_err());
        assert!(validate_payment_amount(1).is_ok());
        assert!(validate_payment_amount(0).is_err());
        assert!(validate_non_negative("shipping", 0).is_ok());
        assert!(validate_non_negative("shipping", -5).is_err());
    }
}
