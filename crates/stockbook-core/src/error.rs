//! # Error Types
//!
//! Domain-specific error types for stockbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockbook-core errors (this file)                                     │
//! │  ├── CoreError        - Stock ledger business failures                 │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stockbook-db errors (separate crate)                                  │
//! │  └── DbError          - Storage failures, embeds CoreError             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller (HTTP layer)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Caller Guidance
//! | Error                    | Meaning                          | Retry?          |
//! |--------------------------|----------------------------------|-----------------|
//! | `Validation`             | malformed input                  | fix + resend    |
//! | `NotFound`               | product/variant/branch/batch     | no              |
//! | `InsufficientStock`      | business rule, show to end user  | no              |
//! | `NoAvailableBatches`     | nothing eligible to pick         | no              |
//! | `ImmutabilityViolation`  | programming error in the caller  | never           |

use thiserror::Error;

use crate::quantity::{Quantity, MAX_QUANTITY};

// =============================================================================
// Core Error
// =============================================================================

/// Stock ledger business errors.
///
/// Every engine operation is all-or-nothing: when one of these is returned,
/// no ledger entry from that operation was written.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed or missing input.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A referenced product, variant, branch, batch or entry does not exist
    /// for the tenant.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Not enough stock in the scope to satisfy the request.
    ///
    /// ## User Workflow
    /// ```text
    /// RemoveStock (qty: 50)
    ///      │
    ///      ▼
    /// currentBalance(scope) = 30
    ///      │
    ///      ▼
    /// InsufficientStock { available: 30, required: 50 }
    ///      │
    ///      ▼
    /// Caller shows: "Insufficient stock. Available: 30, Required: 50"
    /// ```
    #[error("Insufficient stock. Available: {available}, Required: {required}")]
    InsufficientStock { available: Quantity, required: Quantity },

    /// Picking was requested but no batch in the scope has stock.
    #[error("No available batches found for product {product_id}")]
    NoAvailableBatches { product_id: i64 },

    /// Attempted update or delete of a persisted ledger entry.
    ///
    /// Always a bug in the calling component. Corrections must be recorded
    /// as new ADJUSTMENT entries.
    #[error("Stock ledger entry {entry_id} cannot be {action}; record an adjustment entry instead")]
    ImmutabilityViolation { entry_id: String, action: String },
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates an ImmutabilityViolation for an attempted action.
    pub fn immutable(entry_id: impl ToString, action: impl Into<String>) -> Self {
        CoreError::ImmutabilityViolation {
            entry_id: entry_id.to_string(),
            action: action.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any ledger work starts, so they are never partially applied.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Value carries more fractional digits than the ledger stores.
    #[error("{field} must have at most {max_scale} decimal places")]
    TooPrecise { field: String, max_scale: u32 },

    /// Value exceeds the largest magnitude the ledger stores.
    #[error("{field} is out of range (maximum {max})")]
    OutOfRange { field: String, max: String },

    /// Invalid format (e.g., unparseable decimal, bad strategy name).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Two fields must differ (e.g., source and destination branch).
    #[error("{field} must be different from {other}")]
    MustDiffer { field: String, other: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate batch number).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// A referenced record exists but has been deactivated.
    #[error("{field} {value} is not active")]
    Inactive { field: String, value: String },

    /// A referenced record exists but does not belong to the requested scope.
    #[error("{field} {value} does not belong to {owner}")]
    Mismatch {
        field: String,
        value: String,
        owner: String,
    },
}

impl ValidationError {
    /// Creates an OutOfRange error against [`MAX_QUANTITY`].
    pub fn out_of_range(field: impl Into<String>) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            max: MAX_QUANTITY.to_string(),
        }
    }
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
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            available: Quantity::from_units(30),
            required: "50.5".parse().unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock. Available: 30, Required: 50.5"
        );
    }

    #[test]
    fn test_immutability_message() {
        let err = CoreError::immutable(42, "updated");
        assert_eq!(
            err.to_string(),
            "Stock ledger entry 42 cannot be updated; record an adjustment entry instead"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "branch_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "Validation error: branch_id is required");
    }

    #[test]
    fn test_out_of_range_message() {
        let err = ValidationError::out_of_range("quantity");
        assert_eq!(
            err.to_string(),
            "quantity is out of range (maximum 99999999999.9999)"
        );
    }
}
