//! # Error Types
//!
//! Domain-specific error types for hive-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  hive-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  hive-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  hive-backoffice errors (service layer)                                │
//! │  └── ApiError         - What the HTTP edge sees (with status codes)    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, ID, available quantity)
//! 3. Errors are enum variants, never bare strings

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. They are recovered at the
/// service boundary into structured responses; no transition partially applies.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found, or was soft-deleted.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Insufficient stock to sell the requested quantity.
    ///
    /// The message names the available quantity so the front end can show
    /// the shortfall to the cashier.
    #[error("Insufficient stock for {sku}: {available} available, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Sale is not in a state that allows the requested transition.
    ///
    /// Covers complete-on-non-pending, cancel-on-non-pending and
    /// refund-on-non-completed. The failed operation mutates nothing.
    #[error("Sale {sale_id} is {current_status}, cannot {operation}")]
    InvalidSaleStatus {
        sale_id: String,
        current_status: String,
        operation: String,
    },

    /// The refund window for a completed sale has passed.
    #[error("Sale {sale_id} is outside the {window_days}-day refund window")]
    RefundWindowExpired { sale_id: String, window_days: i64 },

    /// A sale cannot be completed without line items.
    #[error("Sale {0} has no line items")]
    EmptySale(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when user input doesn't meet requirements; used for early
/// validation before business logic runs.
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

    /// Invalid format (e.g., malformed email or SKU).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate SKU or email).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_names_available_quantity() {
        let err = CoreError::InsufficientStock {
            sku: "HONEY500".to_string(),
            available: 2,
            requested: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("2 available"));
        assert!(msg.contains("requested 3"));
    }

    #[test]
    fn test_invalid_status_message() {
        let err = CoreError::InvalidSaleStatus {
            sale_id: "s1".to_string(),
            current_status: "cancelled".to_string(),
            operation: "complete".to_string(),
        };
        assert_eq!(err.to_string(), "Sale s1 is cancelled, cannot complete");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sku".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
