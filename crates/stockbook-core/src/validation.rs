//! # Validation Module
//!
//! Input validation for stock operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request types (serde)                                        │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── Quantity precision (at most 4 decimal places)                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Positive quantities, non-negative costs and targets               │
//! │  └── Distinct transfer branches, text lengths                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Engine (stockbook-db)                                        │
//! │  ├── Product / variant / branch / batch existence (NotFound)           │
//! │  └── Balance checks (InsufficientStock)                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  ├── CHECK / UNIQUE / FOREIGN KEY constraints                          │
//! │  └── Immutability triggers on the ledger                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All checks here run before any storage work, so a failure never leaves a
//! partial write behind.
//!
//! ## Usage
//! ```rust
//! use stockbook_core::operations::TransferRequest;
//! use stockbook_core::validation::validate_transfer;
//! use stockbook_core::Quantity;
//!
//! let same_branch = TransferRequest::new(1, 1, 7, Quantity::from_units(5));
//! assert!(validate_transfer(&same_branch).is_err());
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::operations::{
    AdjustmentRequest, AvailableBatchesQuery, MovementHistoryQuery, PickRequest,
    StockMovementRequest, TransferRequest,
};
use crate::quantity::Quantity;
use crate::types::{NewBatch, NewLedgerEntry, TransactionType};
use crate::{MAX_NOTES_LENGTH, MAX_PAGE_SIZE, MAX_REFERENCE_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates an entity id (must be positive).
pub fn validate_id(field: &str, id: i64) -> ValidationResult<()> {
    if id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an optional entity id.
pub fn validate_optional_id(field: &str, id: Option<i64>) -> ValidationResult<()> {
    match id {
        Some(id) => validate_id(field, id),
        None => Ok(()),
    }
}

/// Validates a movement quantity (smallest accepted value is 0.0001).
///
/// ## Example
/// ```rust
/// use stockbook_core::validation::validate_positive_quantity;
/// use stockbook_core::Quantity;
///
/// assert!(validate_positive_quantity("quantity", Quantity::from_raw(1)).is_ok());
/// assert!(validate_positive_quantity("quantity", Quantity::ZERO).is_err());
/// ```
pub fn validate_positive_quantity(field: &str, quantity: Quantity) -> ValidationResult<()> {
    if !quantity.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    validate_quantity_limit(field, quantity)
}

/// Validates a quantity that may be zero.
pub fn validate_non_negative_quantity(field: &str, quantity: Quantity) -> ValidationResult<()> {
    if quantity.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    validate_quantity_limit(field, quantity)
}

/// Validates that a quantity fits the ledger's `decimal(15,4)` range.
pub fn validate_quantity_limit(field: &str, quantity: Quantity) -> ValidationResult<()> {
    if !quantity.is_within_limit() {
        return Err(ValidationError::out_of_range(field));
    }
    Ok(())
}

/// Validates an optional unit cost (must be ≥ 0).
pub fn validate_unit_cost(unit_cost: Option<Decimal>) -> ValidationResult<()> {
    if let Some(cost) = unit_cost {
        if cost.is_sign_negative() && !cost.is_zero() {
            return Err(ValidationError::MustNotBeNegative {
                field: "unit_cost".to_string(),
            });
        }
    }
    Ok(())
}

/// Validates optional free text: trimmed length must not exceed `max`.
pub fn validate_optional_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    if let Some(value) = value {
        if value.trim().chars().count() > max {
            return Err(ValidationError::TooLong {
                field: field.to_string(),
                max,
            });
        }
    }
    Ok(())
}

/// Validates a SKU or branch code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only letters, numbers, hyphens and underscores
///
/// ## Example
/// ```rust
/// use stockbook_core::validation::validate_code;
///
/// assert!(validate_code("sku", "RICE-5KG").is_ok());
/// assert!(validate_code("sku", "").is_err());
/// assert!(validate_code("sku", "RICE 5KG").is_err());
/// ```
pub fn validate_code(field: &str, code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 50,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (1 to 200 characters).
pub fn validate_name(name: &str) -> ValidationResult<()> {
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

/// Validates a batch number.
///
/// ## Rules
/// - Must not be empty
/// - At most 100 characters
pub fn validate_batch_number(batch_number: &str) -> ValidationResult<()> {
    let batch_number = batch_number.trim();

    if batch_number.is_empty() {
        return Err(ValidationError::Required {
            field: "batch_number".to_string(),
        });
    }

    if batch_number.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "batch_number".to_string(),
            max: 100,
        });
    }

    Ok(())
}

fn validate_reference(
    reference_type: Option<&str>,
    reference_id: Option<&str>,
    notes: Option<&str>,
) -> ValidationResult<()> {
    validate_optional_text("reference_type", reference_type, MAX_REFERENCE_LENGTH)?;
    validate_optional_text("reference_id", reference_id, MAX_REFERENCE_LENGTH)?;
    validate_optional_text("notes", notes, MAX_NOTES_LENGTH)
}

// =============================================================================
// Request Validators
// =============================================================================

/// Validates an add/remove request.
pub fn validate_movement(req: &StockMovementRequest) -> ValidationResult<()> {
    validate_id("branch_id", req.branch_id)?;
    validate_id("product_id", req.product_id)?;
    validate_optional_id("variant_id", req.variant_id)?;
    validate_optional_id("batch_id", req.batch_id)?;
    validate_positive_quantity("quantity", req.quantity)?;
    validate_unit_cost(req.unit_cost)?;
    validate_reference(
        req.reference_type.as_deref(),
        req.reference_id.as_deref(),
        req.notes.as_deref(),
    )
}

/// Validates a transfer request.
///
/// ## Rules
/// - Positive quantity
/// - `to_branch_id` must differ from `from_branch_id`
pub fn validate_transfer(req: &TransferRequest) -> ValidationResult<()> {
    validate_id("from_branch_id", req.from_branch_id)?;
    validate_id("to_branch_id", req.to_branch_id)?;
    if req.from_branch_id == req.to_branch_id {
        return Err(ValidationError::MustDiffer {
            field: "to_branch_id".to_string(),
            other: "from_branch_id".to_string(),
        });
    }
    validate_id("product_id", req.product_id)?;
    validate_optional_id("variant_id", req.variant_id)?;
    validate_optional_id("batch_id", req.batch_id)?;
    validate_positive_quantity("quantity", req.quantity)?;
    validate_unit_cost(req.unit_cost)?;
    validate_reference(
        req.reference_type.as_deref(),
        req.reference_id.as_deref(),
        req.notes.as_deref(),
    )
}

/// Validates an adjustment request (`target_balance ≥ 0`).
pub fn validate_adjustment(req: &AdjustmentRequest) -> ValidationResult<()> {
    validate_id("branch_id", req.branch_id)?;
    validate_id("product_id", req.product_id)?;
    validate_optional_id("variant_id", req.variant_id)?;
    validate_optional_id("batch_id", req.batch_id)?;
    validate_non_negative_quantity("target_balance", req.target_balance)?;
    validate_unit_cost(req.unit_cost)?;
    validate_reference(
        req.reference_type.as_deref(),
        req.reference_id.as_deref(),
        req.notes.as_deref(),
    )
}

/// Validates an available-batches query (`required_quantity ≥ 0`).
pub fn validate_available_batches(query: &AvailableBatchesQuery) -> ValidationResult<()> {
    validate_id("product_id", query.product_id)?;
    validate_optional_id("variant_id", query.variant_id)?;
    validate_optional_id("branch_id", query.branch_id)?;
    validate_non_negative_quantity("required_quantity", query.required_quantity)
}

/// Validates a pick request.
pub fn validate_pick(req: &PickRequest) -> ValidationResult<()> {
    validate_id("product_id", req.product_id)?;
    validate_id("branch_id", req.branch_id)?;
    validate_optional_id("variant_id", req.variant_id)?;
    validate_positive_quantity("quantity", req.quantity)?;
    validate_reference(
        req.reference_type.as_deref(),
        req.reference_id.as_deref(),
        req.notes.as_deref(),
    )
}

/// Validates a movement history query.
pub fn validate_history(query: &MovementHistoryQuery) -> ValidationResult<()> {
    validate_id("product_id", query.product_id)?;
    validate_optional_id("variant_id", query.variant_id)?;
    validate_optional_id("branch_id", query.branch_id)?;

    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        if end < start {
            return Err(ValidationError::InvalidFormat {
                field: "end_date".to_string(),
                reason: "must not be before start_date".to_string(),
            });
        }
    }

    if query.page == Some(0) {
        return Err(ValidationError::MustBePositive {
            field: "page".to_string(),
        });
    }

    if let Some(per_page) = query.per_page {
        if per_page == 0 || per_page > MAX_PAGE_SIZE {
            return Err(ValidationError::InvalidFormat {
                field: "per_page".to_string(),
                reason: format!("must be between 1 and {}", MAX_PAGE_SIZE),
            });
        }
    }

    Ok(())
}

/// Validates a batch registration.
pub fn validate_new_batch(batch: &NewBatch) -> ValidationResult<()> {
    validate_id("product_id", batch.product_id)?;
    validate_optional_id("variant_id", batch.variant_id)?;
    validate_id("branch_id", batch.branch_id)?;
    validate_batch_number(&batch.batch_number)?;
    validate_optional_text("lot_number", batch.lot_number.as_deref(), 100)?;
    validate_optional_text("serial_number", batch.serial_number.as_deref(), 100)?;
    validate_optional_text("notes", batch.notes.as_deref(), MAX_NOTES_LENGTH)?;
    if batch.cost_price.is_some_and(|c| c.is_sign_negative() && !c.is_zero()) {
        return Err(ValidationError::MustNotBeNegative {
            field: "cost_price".to_string(),
        });
    }

    if let (Some(made), Some(expires)) = (batch.manufactured_date, batch.expiry_date) {
        if expires < made {
            return Err(ValidationError::InvalidFormat {
                field: "expiry_date".to_string(),
                reason: "must not be before manufactured_date".to_string(),
            });
        }
    }

    Ok(())
}

/// Validates a ledger entry before it is appended.
///
/// ## Sign Rules
/// - `In`: quantity > 0
/// - `Out`: quantity < 0
/// - `Transfer`: quantity ≠ 0
/// - `Adjustment`: any sign, including zero
pub fn validate_new_entry(entry: &NewLedgerEntry) -> ValidationResult<()> {
    validate_id("tenant_id", entry.tenant_id)?;
    validate_id("branch_id", entry.branch_id)?;
    validate_id("product_id", entry.product_id)?;
    validate_optional_id("variant_id", entry.variant_id)?;
    validate_optional_id("batch_id", entry.batch_id)?;
    validate_unit_cost(entry.unit_cost)?;
    validate_quantity_limit("quantity", entry.quantity)?;
    entry.total_cost()?;

    let sign_ok = match entry.transaction_type {
        TransactionType::In => entry.quantity.is_positive(),
        TransactionType::Out => entry.quantity.is_negative(),
        TransactionType::Transfer => !entry.quantity.is_zero(),
        TransactionType::Adjustment => true,
    };
    if !sign_ok {
        return Err(ValidationError::InvalidFormat {
            field: "quantity".to_string(),
            reason: format!(
                "{} has the wrong sign for a {} entry",
                entry.quantity, entry.transaction_type
            ),
        });
    }

    validate_reference(
        entry.reference_type.as_deref(),
        entry.reference_id.as_deref(),
        entry.notes.as_deref(),
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::MAX_QUANTITY;
    use crate::types::ScopeKey;
    use chrono::{NaiveDate, Utc};

    fn q(units: i64) -> Quantity {
        Quantity::from_units(units)
    }

    #[test]
    fn test_validate_movement() {
        assert!(validate_movement(&StockMovementRequest::new(1, 7, q(10))).is_ok());
        assert!(validate_movement(&StockMovementRequest::new(1, 7, Quantity::from_raw(1))).is_ok());
        assert!(validate_movement(&StockMovementRequest::new(1, 7, Quantity::ZERO)).is_err());
        assert!(validate_movement(&StockMovementRequest::new(1, 7, q(-5))).is_err());
        assert!(validate_movement(&StockMovementRequest::new(0, 7, q(1))).is_err());

        let negative_cost =
            StockMovementRequest::new(1, 7, q(1)).with_unit_cost(Decimal::new(-1, 2));
        assert!(matches!(
            validate_movement(&negative_cost),
            Err(ValidationError::MustNotBeNegative { .. })
        ));

        let free = StockMovementRequest::new(1, 7, q(1)).with_unit_cost(Decimal::ZERO);
        assert!(validate_movement(&free).is_ok());
    }

    #[test]
    fn test_quantity_limit() {
        assert!(validate_movement(&StockMovementRequest::new(1, 7, MAX_QUANTITY)).is_ok());

        let too_large = Quantity::from_raw(MAX_QUANTITY.raw() + 1);
        assert!(matches!(
            validate_movement(&StockMovementRequest::new(1, 7, too_large)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate_adjustment(&AdjustmentRequest::new(1, 7, too_large)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_pick(&PickRequest::new(7, 1, too_large)).is_err());
        assert!(validate_transfer(&TransferRequest::new(1, 2, 7, too_large)).is_err());
    }

    #[test]
    fn test_entry_total_cost_overflow() {
        let scope = ScopeKey::new(1, 7, None, 1);
        let mut entry = NewLedgerEntry::new(&scope, TransactionType::In, q(1_000_000), Utc::now());
        entry.unit_cost = Some(Decimal::MAX);
        assert!(matches!(
            validate_new_entry(&entry),
            Err(ValidationError::OutOfRange { ref field, .. }) if field == "total_cost"
        ));
    }

    #[test]
    fn test_validate_code_and_name() {
        assert!(validate_code("code", "MAIN_01").is_ok());
        assert!(validate_code("code", &"A".repeat(51)).is_err());
        assert!(validate_name("Main warehouse").is_ok());
        assert!(validate_name("  ").is_err());
    }

    #[test]
    fn test_validate_transfer_requires_distinct_branches() {
        assert!(validate_transfer(&TransferRequest::new(1, 2, 7, q(5))).is_ok());
        assert!(matches!(
            validate_transfer(&TransferRequest::new(1, 1, 7, q(5))),
            Err(ValidationError::MustDiffer { .. })
        ));
    }

    #[test]
    fn test_validate_adjustment_allows_zero_target() {
        assert!(validate_adjustment(&AdjustmentRequest::new(1, 7, Quantity::ZERO)).is_ok());
        assert!(validate_adjustment(&AdjustmentRequest::new(1, 7, q(-1))).is_err());
    }

    #[test]
    fn test_validate_history() {
        let day = |d| NaiveDate::from_ymd_opt(2026, 1, d).unwrap();

        assert!(validate_history(&MovementHistoryQuery::new(7)).is_ok());
        assert!(validate_history(&MovementHistoryQuery::new(7).between(Some(day(5)), Some(day(5)))).is_ok());
        assert!(validate_history(&MovementHistoryQuery::new(7).between(Some(day(5)), Some(day(4)))).is_err());
        assert!(validate_history(&MovementHistoryQuery::new(7).page(0, 50)).is_err());
        assert!(validate_history(&MovementHistoryQuery::new(7).page(1, MAX_PAGE_SIZE + 1)).is_err());
    }

    #[test]
    fn test_validate_new_batch() {
        assert!(validate_new_batch(&NewBatch::new(7, 1, "LOT-2026-01")).is_ok());
        assert!(matches!(
            validate_new_batch(&NewBatch::new(7, 1, "   ")),
            Err(ValidationError::Required { .. })
        ));

        let mut backwards = NewBatch::new(7, 1, "B1");
        backwards.manufactured_date = NaiveDate::from_ymd_opt(2026, 5, 1);
        backwards.expiry_date = NaiveDate::from_ymd_opt(2026, 4, 1);
        assert!(validate_new_batch(&backwards).is_err());
    }

    #[test]
    fn test_validate_new_entry_signs() {
        let scope = ScopeKey::new(1, 7, None, 1);
        let entry = |kind, units| NewLedgerEntry::new(&scope, kind, q(units), Utc::now());

        assert!(validate_new_entry(&entry(TransactionType::In, 5)).is_ok());
        assert!(validate_new_entry(&entry(TransactionType::In, -5)).is_err());
        assert!(validate_new_entry(&entry(TransactionType::Out, -5)).is_ok());
        assert!(validate_new_entry(&entry(TransactionType::Out, 5)).is_err());
        assert!(validate_new_entry(&entry(TransactionType::Transfer, -5)).is_ok());
        assert!(validate_new_entry(&entry(TransactionType::Transfer, 0)).is_err());
        assert!(validate_new_entry(&entry(TransactionType::Adjustment, 0)).is_ok());

        let no_tenant = NewLedgerEntry::new(
            &ScopeKey::new(0, 7, None, 1),
            TransactionType::In,
            q(1),
            Utc::now(),
        );
        assert!(validate_new_entry(&no_tenant).is_err());
    }

    #[test]
    fn test_notes_length() {
        let long = "x".repeat(MAX_NOTES_LENGTH + 1);
        let req = StockMovementRequest::new(1, 7, q(1)).with_notes(long);
        assert!(matches!(
            validate_movement(&req),
            Err(ValidationError::TooLong { .. })
        ));
    }
}
