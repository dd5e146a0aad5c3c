//! # Batch Allocation
//!
//! FIFO/FEFO selection of source batches for a stock-out request.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Greedy Multi-Batch Picking                           │
//! │                                                                         │
//! │  candidates (available > 0 only)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  sort by strategy key, ties by batch id                                │
//! │    FIFO: received_at ↑                                                 │
//! │    FEFO: expiry_date ↑ (no expiry last, then received_at ↑)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  still_needed = required                                               │
//! │  for batch in order:                                                   │
//! │      pick = min(batch.available, still_needed)                         │
//! │      still_needed -= pick                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  every candidate is returned; batches visited after the requirement   │
//! │  is met carry pick = 0                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use chrono::{NaiveDate, TimeZone, Utc};
//! use stockbook_core::allocation::{allocate, BatchCandidate};
//! use stockbook_core::{PickingStrategy, Quantity};
//!
//! let received = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
//! let candidates = vec![
//!     BatchCandidate {
//!         batch_id: 1,
//!         batch_number: "B1".into(),
//!         expiry_date: NaiveDate::from_ymd_opt(2026, 6, 10),
//!         received_at: received,
//!         available: Quantity::from_units(5),
//!     },
//!     BatchCandidate {
//!         batch_id: 2,
//!         batch_number: "B2".into(),
//!         expiry_date: NaiveDate::from_ymd_opt(2026, 6, 5),
//!         received_at: received,
//!         available: Quantity::from_units(5),
//!     },
//! ];
//!
//! let picks = allocate(candidates, Quantity::from_units(8), PickingStrategy::Fefo);
//! assert_eq!(picks[0].batch_number, "B2");
//! assert_eq!(picks[1].pick_quantity, Quantity::from_units(3));
//! ```
//!
//! Allocation never fails: an empty result or a short total is for the
//! caller to judge.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::quantity::Quantity;
use crate::types::PickingStrategy;

/// A batch eligible for picking, with its ledger-derived balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCandidate {
    pub batch_id: i64,
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    /// When the batch was received (FIFO key).
    pub received_at: DateTime<Utc>,
    /// Remaining quantity in the queried scope.
    pub available: Quantity,
}

/// One line of an allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPick {
    pub batch_id: i64,
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub available_quantity: Quantity,
    pub pick_quantity: Quantity,
}

/// Orders candidates per strategy and greedily assigns pick quantities.
///
/// A `required` of zero (or less) lists every candidate with
/// `pick_quantity == available_quantity`.
pub fn allocate(
    mut candidates: Vec<BatchCandidate>,
    required: Quantity,
    strategy: PickingStrategy,
) -> Vec<BatchPick> {
    candidates.retain(|c| c.available.is_positive());
    candidates.sort_by(|a, b| compare(a, b, strategy));

    let list_everything = !required.is_positive();
    let mut still_needed = required;

    candidates
        .into_iter()
        .map(|candidate| {
            let pick_quantity = if list_everything {
                candidate.available
            } else {
                let pick = candidate.available.min(still_needed);
                still_needed -= pick;
                pick
            };

            BatchPick {
                batch_id: candidate.batch_id,
                batch_number: candidate.batch_number,
                expiry_date: candidate.expiry_date,
                available_quantity: candidate.available,
                pick_quantity,
            }
        })
        .collect()
}

/// Sum of `pick_quantity` over an allocation.
pub fn total_picked(picks: &[BatchPick]) -> Quantity {
    picks.iter().map(|p| p.pick_quantity).sum()
}

fn compare(a: &BatchCandidate, b: &BatchCandidate, strategy: PickingStrategy) -> Ordering {
    let primary = match strategy {
        PickingStrategy::Fifo => a.received_at.cmp(&b.received_at),
        PickingStrategy::Fefo => match (a.expiry_date, b.expiry_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.received_at.cmp(&b.received_at),
        },
    };

    primary.then_with(|| a.batch_id.cmp(&b.batch_id))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn received(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 1, hour, 0, 0).unwrap()
    }

    fn candidate(id: i64, expiry: Option<NaiveDate>, hour: u32, units: i64) -> BatchCandidate {
        BatchCandidate {
            batch_id: id,
            batch_number: format!("B{}", id),
            expiry_date: expiry,
            received_at: received(hour),
            available: Quantity::from_units(units),
        }
    }

    fn ids(picks: &[BatchPick]) -> Vec<i64> {
        picks.iter().map(|p| p.batch_id).collect()
    }

    fn picked_units(picks: &[BatchPick]) -> Vec<Quantity> {
        picks.iter().map(|p| p.pick_quantity).collect()
    }

    #[test]
    fn test_fefo_orders_by_expiry_with_nulls_last() {
        let candidates = vec![
            candidate(1, Some(day(10)), 1, 5),
            candidate(2, Some(day(5)), 2, 5),
            candidate(3, None, 3, 5),
        ];

        let picks = allocate(candidates, Quantity::from_units(8), PickingStrategy::Fefo);

        assert_eq!(ids(&picks), vec![2, 1, 3]);
        assert_eq!(
            picked_units(&picks),
            vec![
                Quantity::from_units(5),
                Quantity::from_units(3),
                Quantity::ZERO
            ]
        );
        assert_eq!(total_picked(&picks), Quantity::from_units(8));
    }

    #[test]
    fn test_fifo_ignores_expiry() {
        let candidates = vec![
            candidate(3, Some(day(1)), 3, 5),
            candidate(1, Some(day(20)), 1, 5),
            candidate(2, None, 2, 5),
        ];

        let picks = allocate(candidates, Quantity::from_units(6), PickingStrategy::Fifo);

        assert_eq!(ids(&picks), vec![1, 2, 3]);
        assert_eq!(
            picked_units(&picks),
            vec![
                Quantity::from_units(5),
                Quantity::from_units(1),
                Quantity::ZERO
            ]
        );
    }

    #[test]
    fn test_fefo_null_expiries_fall_back_to_receipt_order() {
        let candidates = vec![candidate(9, None, 5, 1), candidate(4, None, 2, 1)];
        let picks = allocate(candidates, Quantity::ZERO, PickingStrategy::Fefo);
        assert_eq!(ids(&picks), vec![4, 9]);
    }

    #[test]
    fn test_ties_broken_by_batch_id() {
        let candidates = vec![
            candidate(7, Some(day(5)), 1, 1),
            candidate(2, Some(day(5)), 1, 1),
            candidate(5, Some(day(5)), 1, 1),
        ];

        assert_eq!(
            ids(&allocate(candidates.clone(), Quantity::ZERO, PickingStrategy::Fefo)),
            vec![2, 5, 7]
        );
        assert_eq!(
            ids(&allocate(candidates, Quantity::ZERO, PickingStrategy::Fifo)),
            vec![2, 5, 7]
        );
    }

    #[test]
    fn test_zero_required_lists_everything_available() {
        let candidates = vec![candidate(1, None, 1, 4), candidate(2, None, 2, 6)];
        let picks = allocate(candidates, Quantity::ZERO, PickingStrategy::Fifo);

        assert!(picks.iter().all(|p| p.pick_quantity == p.available_quantity));
        assert_eq!(total_picked(&picks), Quantity::from_units(10));
    }

    #[test]
    fn test_non_positive_batches_are_skipped() {
        let candidates = vec![
            candidate(1, None, 1, 0),
            candidate(2, None, 2, -3),
            candidate(3, None, 3, 2),
        ];
        let picks = allocate(candidates, Quantity::from_units(1), PickingStrategy::Fifo);
        assert_eq!(ids(&picks), vec![3]);
    }

    #[test]
    fn test_empty_candidates_is_not_an_error() {
        let picks = allocate(vec![], Quantity::from_units(5), PickingStrategy::Fefo);
        assert!(picks.is_empty());
        assert_eq!(total_picked(&picks), Quantity::ZERO);
    }

    #[test]
    fn test_under_supply_picks_everything() {
        let candidates = vec![candidate(1, None, 1, 3), candidate(2, None, 2, 2)];
        let picks = allocate(candidates, Quantity::from_units(10), PickingStrategy::Fifo);
        assert_eq!(total_picked(&picks), Quantity::from_units(5));
    }

    #[test]
    fn test_fractional_quantities() {
        let mut a = candidate(1, None, 1, 0);
        a.available = "1.25".parse().unwrap();
        let b = candidate(2, None, 2, 1);

        let picks = allocate(vec![a, b], "1.5".parse().unwrap(), PickingStrategy::Fifo);
        assert_eq!(picks[1].pick_quantity.to_string(), "0.25");
    }
}
