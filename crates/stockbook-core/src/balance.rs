//! # Balance Arithmetic
//!
//! Pure balance rules shared by the engine: how an entry moves a balance and
//! whether a stock-out can be covered. The authoritative balance itself is
//! always a `SUM(quantity)` over the ledger, computed by the store.

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::quantity::Quantity;

/// Balance after applying a signed delta.
///
/// Fails with `OutOfRange` when the result leaves the storable range.
pub fn running_balance_after(current: Quantity, delta: Quantity) -> CoreResult<Quantity> {
    current
        .checked_add(delta)
        .filter(Quantity::is_within_limit)
        .ok_or_else(|| ValidationError::out_of_range("running_balance").into())
}

/// Fails with `InsufficientStock` when `available` cannot cover `required`.
///
/// `required` is a magnitude; its sign is ignored.
pub fn ensure_sufficient(available: Quantity, required: Quantity) -> CoreResult<()> {
    let required = required.abs();
    if available < required {
        return Err(CoreError::InsufficientStock {
            available,
            required,
        });
    }
    Ok(())
}

/// Signed delta that brings `current` to `target`.
pub fn adjustment_delta(current: Quantity, target: Quantity) -> CoreResult<Quantity> {
    target
        .checked_sub(current)
        .filter(Quantity::is_within_limit)
        .ok_or_else(|| ValidationError::out_of_range("adjustment").into())
}

/// Replays a sequence of signed quantities, returning the running balance
/// after each one.
pub fn replay(start: Quantity, deltas: &[Quantity]) -> CoreResult<Vec<Quantity>> {
    let mut balance = start;
    deltas
        .iter()
        .map(|delta| {
            balance = running_balance_after(balance, *delta)?;
            Ok(balance)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::MAX_QUANTITY;

    fn q(units: i64) -> Quantity {
        Quantity::from_units(units)
    }

    #[test]
    fn test_running_balance_after() {
        assert_eq!(running_balance_after(q(100), q(-30)).unwrap(), q(70));
        assert_eq!(running_balance_after(Quantity::ZERO, q(5)).unwrap(), q(5));
    }

    #[test]
    fn test_running_balance_out_of_range() {
        assert_eq!(running_balance_after(MAX_QUANTITY, Quantity::ZERO).unwrap(), MAX_QUANTITY);

        let err = running_balance_after(MAX_QUANTITY, Quantity::from_raw(1)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "running_balance"
        ));

        // i64 overflow is reported the same way instead of panicking
        let huge = Quantity::from_raw(i64::MAX);
        assert!(running_balance_after(huge, huge).is_err());
    }

    #[test]
    fn test_ensure_sufficient() {
        assert!(ensure_sufficient(q(30), q(30)).is_ok());
        assert!(ensure_sufficient(q(30), q(-30)).is_ok());

        match ensure_sufficient(q(30), q(50)) {
            Err(CoreError::InsufficientStock {
                available,
                required,
            }) => {
                assert_eq!(available, q(30));
                assert_eq!(required, q(50));
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
    }

    #[test]
    fn test_adjustment_delta() {
        assert_eq!(adjustment_delta(q(70), q(65)).unwrap(), q(-5));
        assert_eq!(adjustment_delta(q(70), q(80)).unwrap(), q(10));
        assert_eq!(adjustment_delta(q(70), q(70)).unwrap(), Quantity::ZERO);
        assert!(adjustment_delta(Quantity::from_raw(i64::MIN), q(1)).is_err());
    }

    #[test]
    fn test_replay() {
        assert_eq!(
            replay(Quantity::ZERO, &[q(100), q(-30), q(5)]).unwrap(),
            vec![q(100), q(70), q(75)]
        );
        assert!(replay(MAX_QUANTITY, &[q(1)]).is_err());
    }
}
