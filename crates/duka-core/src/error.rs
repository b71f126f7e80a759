//! # Error Types
//!
//! Domain-specific error types for duka-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  duka-core errors (this file)                                          │
//! │  ├── CoreError        - Stock ceilings, cart lookups, settlement       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  duka-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Register API errors (apps/register)                                   │
//! │  └── ApiError         - What the UI sees (serialized)                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → UI                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Stock errors are recovered locally: the cart operation is rejected, the
/// cart is left unchanged and the message is shown to the seller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Product has nothing on hand.
    #[error("{product} is out of stock")]
    OutOfStock { product: String },

    /// The requested reservation would exceed stock on hand.
    ///
    /// ## User Workflow
    /// ```text
    /// add_pack("Dozen", 12 units × 1) with 10 on hand
    ///      │
    ///      ▼
    /// StockExceeded { available: 10, reserved: 0, requested: 12,
    ///                 max_allowed: 0 }
    ///      │
    ///      ▼
    /// UI shows: "Only 10 left; 2 short"
    /// ```
    ///
    /// `max_allowed` is expressed in the unit of the attempted operation:
    /// packs for `add_pack`/`update_quantity`, base units for singles.
    #[error(
        "Not enough stock for {product}: {available} on hand, {reserved} already in cart, \
         {requested} requested ({} short, at most {max_allowed} allowed)",
        .requested + .reserved - .available
    )]
    StockExceeded {
        product: String,
        available: i64,
        reserved: i64,
        requested: i64,
        max_allowed: i64,
    },

    /// Line item is not in the cart.
    #[error("Cart line not found: {0}")]
    LineNotFound(String),

    /// Cart has reached its maximum number of distinct lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Units missing to satisfy the rejected request (0 for non-stock errors).
    pub fn shortfall(&self) -> i64 {
        match self {
            CoreError::StockExceeded {
                available,
                reserved,
                requested,
                ..
            } => (requested + reserved - available).max(0),
            CoreError::OutOfStock { .. } => 1,
            _ => 0,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID, bad date).
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_exceeded_message() {
        let err = CoreError::StockExceeded {
            product: "Soda 500ml".to_string(),
            available: 10,
            reserved: 0,
            requested: 12,
            max_allowed: 0,
        };
        assert_eq!(
            err.to_string(),
            "Not enough stock for Soda 500ml: 10 on hand, 0 already in cart, 12 requested \
             (2 short, at most 0 allowed)"
        );
        assert_eq!(err.shortfall(), 2);
    }

    #[test]
    fn test_out_of_stock_message() {
        let err = CoreError::OutOfStock {
            product: "Sugar 1kg".to_string(),
        };
        assert_eq!(err.to_string(), "Sugar 1kg is out of stock");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "units_per_pack".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.shortfall(), 0);
    }
}
