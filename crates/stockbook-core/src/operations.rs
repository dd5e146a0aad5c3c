//! # Operation Requests and Results
//!
//! Typed request/response structs for every stock operation the engine
//! exposes. HTTP controllers and other services deserialize into these and
//! hand them to `stockbook_db::StockService`.
//!
//! ## Operation Map
//! ```text
//! ┌──────────────────────┬──────────────────────────┬──────────────────────┐
//! │ Operation            │ Request                  │ Result               │
//! ├──────────────────────┼──────────────────────────┼──────────────────────┤
//! │ add / remove stock   │ StockMovementRequest     │ MovementResult       │
//! │ transfer stock       │ TransferRequest          │ TransferResult       │
//! │ adjust stock         │ AdjustmentRequest        │ AdjustmentResult     │
//! │ available batches    │ AvailableBatchesQuery    │ Vec<BatchPick>       │
//! │ pick stock           │ PickRequest              │ PickResult           │
//! │ movement history     │ MovementHistoryQuery     │ Page<LedgerEntry>    │
//! │ stock balance        │ (product, variant?, br?) │ StockBalance         │
//! └──────────────────────┴──────────────────────────┴──────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::allocation::BatchPick;
use crate::quantity::Quantity;
use crate::types::{LedgerEntry, PickingStrategy, ScopeKey};

// =============================================================================
// Add / Remove
// =============================================================================

/// Request shared by `add_stock` and `remove_stock`.
///
/// `quantity` is always given as a positive magnitude; remove negates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovementRequest {
    pub branch_id: i64,
    pub product_id: i64,
    #[serde(default)]
    pub variant_id: Option<i64>,
    #[serde(default)]
    pub batch_id: Option<i64>,
    pub quantity: Quantity,
    #[serde(default)]
    pub unit_cost: Option<Decimal>,
    #[serde(default)]
    pub reference_type: Option<String>,
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Defaults to now.
    #[serde(default)]
    pub transaction_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl StockMovementRequest {
    pub fn new(branch_id: i64, product_id: i64, quantity: Quantity) -> Self {
        StockMovementRequest {
            branch_id,
            product_id,
            variant_id: None,
            batch_id: None,
            quantity,
            unit_cost: None,
            reference_type: None,
            reference_id: None,
            notes: None,
            transaction_date: None,
            metadata: None,
        }
    }

    pub fn with_variant(mut self, variant_id: i64) -> Self {
        self.variant_id = Some(variant_id);
        self
    }

    pub fn with_batch(mut self, batch_id: i64) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    pub fn with_unit_cost(mut self, unit_cost: Decimal) -> Self {
        self.unit_cost = Some(unit_cost);
        self
    }

    pub fn with_reference(
        mut self,
        reference_type: impl Into<String>,
        reference_id: impl Into<String>,
    ) -> Self {
        self.reference_type = Some(reference_type.into());
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_transaction_date(mut self, date: DateTime<Utc>) -> Self {
        self.transaction_date = Some(date);
        self
    }

    /// The running-balance scope this request moves stock in.
    pub fn scope(&self, tenant_id: i64) -> ScopeKey {
        ScopeKey::new(tenant_id, self.product_id, self.variant_id, self.branch_id)
    }
}

/// Result of `add_stock` / `remove_stock`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementResult {
    pub entry: LedgerEntry,
    /// Scope balance after the movement.
    pub new_balance: Quantity,
}

// =============================================================================
// Transfer
// =============================================================================

/// Moves stock between two branches of the same tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_branch_id: i64,
    pub to_branch_id: i64,
    pub product_id: i64,
    #[serde(default)]
    pub variant_id: Option<i64>,
    /// Carried on both entries so the lot stays traceable at the destination.
    #[serde(default)]
    pub batch_id: Option<i64>,
    pub quantity: Quantity,
    #[serde(default)]
    pub unit_cost: Option<Decimal>,
    /// Defaults to `"transfer"`.
    #[serde(default)]
    pub reference_type: Option<String>,
    #[serde(default)]
    pub reference_id: Option<String>,
    /// Applied to both entries; defaults to "Transfer out" / "Transfer in".
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub transaction_date: Option<DateTime<Utc>>,
}

impl TransferRequest {
    pub fn new(from_branch_id: i64, to_branch_id: i64, product_id: i64, quantity: Quantity) -> Self {
        TransferRequest {
            from_branch_id,
            to_branch_id,
            product_id,
            variant_id: None,
            batch_id: None,
            quantity,
            unit_cost: None,
            reference_type: None,
            reference_id: None,
            notes: None,
            transaction_date: None,
        }
    }

    pub fn with_variant(mut self, variant_id: i64) -> Self {
        self.variant_id = Some(variant_id);
        self
    }

    pub fn with_batch(mut self, batch_id: i64) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    pub fn with_reference(
        mut self,
        reference_type: impl Into<String>,
        reference_id: impl Into<String>,
    ) -> Self {
        self.reference_type = Some(reference_type.into());
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn source_scope(&self, tenant_id: i64) -> ScopeKey {
        ScopeKey::new(tenant_id, self.product_id, self.variant_id, self.from_branch_id)
    }

    pub fn destination_scope(&self, tenant_id: i64) -> ScopeKey {
        ScopeKey::new(tenant_id, self.product_id, self.variant_id, self.to_branch_id)
    }
}

/// Both halves of a committed transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferResult {
    /// Shared by both entries (the transfer correlation reference).
    pub operation_id: String,
    pub out_entry: LedgerEntry,
    pub in_entry: LedgerEntry,
    pub from_balance: Quantity,
    pub to_balance: Quantity,
}

// =============================================================================
// Adjust
// =============================================================================

/// Sets a scope (or one batch of it) to an absolute counted balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentRequest {
    pub branch_id: i64,
    pub product_id: i64,
    #[serde(default)]
    pub variant_id: Option<i64>,
    /// When set, the target applies to this batch's balance only.
    #[serde(default)]
    pub batch_id: Option<i64>,
    pub target_balance: Quantity,
    #[serde(default)]
    pub unit_cost: Option<Decimal>,
    #[serde(default)]
    pub reference_type: Option<String>,
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub transaction_date: Option<DateTime<Utc>>,
}

impl AdjustmentRequest {
    pub fn new(branch_id: i64, product_id: i64, target_balance: Quantity) -> Self {
        AdjustmentRequest {
            branch_id,
            product_id,
            variant_id: None,
            batch_id: None,
            target_balance,
            unit_cost: None,
            reference_type: None,
            reference_id: None,
            notes: None,
            transaction_date: None,
        }
    }

    pub fn with_variant(mut self, variant_id: i64) -> Self {
        self.variant_id = Some(variant_id);
        self
    }

    pub fn with_batch(mut self, batch_id: i64) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn scope(&self, tenant_id: i64) -> ScopeKey {
        ScopeKey::new(tenant_id, self.product_id, self.variant_id, self.branch_id)
    }
}

/// Outcome of an adjustment.
///
/// When the request named a batch, `old_balance` and `new_balance` are that
/// batch's balance in the branch while `entry.running_balance` is the whole
/// scope's. Without a batch all three are the scope balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentResult {
    /// The `ADJUSTMENT` entry; its `running_balance` is always scope-level.
    pub entry: LedgerEntry,
    /// Counted-against balance before the entry (batch-level if a batch was named).
    pub old_balance: Quantity,
    /// Signed delta written to the ledger (may be zero).
    pub adjustment: Quantity,
    /// The requested target, at the same level as `old_balance`.
    pub new_balance: Quantity,
}

// =============================================================================
// Batches and Picking
// =============================================================================

/// Query for `get_available_batches`.
///
/// `variant_id`/`branch_id` left as `None` match every variant/branch.
/// A `required_quantity` of zero lists everything available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableBatchesQuery {
    pub product_id: i64,
    #[serde(default)]
    pub variant_id: Option<i64>,
    #[serde(default)]
    pub branch_id: Option<i64>,
    #[serde(default)]
    pub required_quantity: Quantity,
    /// Defaults to the configured strategy.
    #[serde(default)]
    pub strategy: Option<PickingStrategy>,
}

impl AvailableBatchesQuery {
    pub fn new(product_id: i64) -> Self {
        AvailableBatchesQuery {
            product_id,
            variant_id: None,
            branch_id: None,
            required_quantity: Quantity::ZERO,
            strategy: None,
        }
    }

    pub fn in_branch(mut self, branch_id: i64) -> Self {
        self.branch_id = Some(branch_id);
        self
    }

    pub fn requiring(mut self, quantity: Quantity) -> Self {
        self.required_quantity = quantity;
        self
    }

    pub fn with_strategy(mut self, strategy: PickingStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// Picks stock out of batches in strategy order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickRequest {
    pub product_id: i64,
    pub branch_id: i64,
    #[serde(default)]
    pub variant_id: Option<i64>,
    pub quantity: Quantity,
    /// Defaults to the configured strategy.
    #[serde(default)]
    pub strategy: Option<PickingStrategy>,
    /// Defaults to `"picking"`.
    #[serde(default)]
    pub reference_type: Option<String>,
    #[serde(default)]
    pub reference_id: Option<String>,
    /// Defaults to "Picked using {strategy} strategy".
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub transaction_date: Option<DateTime<Utc>>,
}

impl PickRequest {
    pub fn new(product_id: i64, branch_id: i64, quantity: Quantity) -> Self {
        PickRequest {
            product_id,
            branch_id,
            variant_id: None,
            quantity,
            strategy: None,
            reference_type: None,
            reference_id: None,
            notes: None,
            transaction_date: None,
        }
    }

    pub fn with_variant(mut self, variant_id: i64) -> Self {
        self.variant_id = Some(variant_id);
        self
    }

    pub fn with_strategy(mut self, strategy: PickingStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_reference(
        mut self,
        reference_type: impl Into<String>,
        reference_id: impl Into<String>,
    ) -> Self {
        self.reference_type = Some(reference_type.into());
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn scope(&self, tenant_id: i64) -> ScopeKey {
        ScopeKey::new(tenant_id, self.product_id, self.variant_id, self.branch_id)
    }
}

/// Outcome of a committed pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickResult {
    pub operation_id: String,
    pub strategy: PickingStrategy,
    /// Batches with a non-zero pick, in strategy order.
    pub batches_used: Vec<BatchPick>,
    /// One OUT entry per batch used.
    pub entries: Vec<LedgerEntry>,
    pub total_picked: Quantity,
}

// =============================================================================
// History and Balances
// =============================================================================

/// Query for `get_movement_history`.
///
/// Dates are inclusive calendar days (UTC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementHistoryQuery {
    pub product_id: i64,
    #[serde(default)]
    pub variant_id: Option<i64>,
    #[serde(default)]
    pub branch_id: Option<i64>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// 1-based; defaults to the first page.
    #[serde(default)]
    pub page: Option<u32>,
    /// Defaults to the configured page size.
    #[serde(default)]
    pub per_page: Option<u32>,
}

impl MovementHistoryQuery {
    pub fn new(product_id: i64) -> Self {
        MovementHistoryQuery {
            product_id,
            variant_id: None,
            branch_id: None,
            start_date: None,
            end_date: None,
            page: None,
            per_page: None,
        }
    }

    pub fn in_branch(mut self, branch_id: i64) -> Self {
        self.branch_id = Some(branch_id);
        self
    }

    pub fn between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn page(mut self, page: u32, per_page: u32) -> Self {
        self.page = Some(page);
        self.per_page = Some(per_page);
        self
    }
}

/// Answer of `get_stock_balance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBalance {
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub branch_id: Option<i64>,
    pub balance: Quantity,
}

/// Result of cross-checking a scope's summed balance against the
/// running balance cached on its latest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceCheck {
    pub scope: ScopeKey,
    /// Authoritative: sum of every entry's quantity.
    pub summed: Quantity,
    /// Cached on the latest entry; `None` for an empty scope.
    pub latest_running_balance: Option<Quantity>,
    pub entry_count: u64,
}

impl BalanceCheck {
    pub fn is_consistent(&self) -> bool {
        match self.latest_running_balance {
            Some(cached) => cached == self.summed,
            None => self.summed.is_zero(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_request_from_json() {
        let json = r#"{
            "branch_id": 1,
            "product_id": 7,
            "quantity": "12.5",
            "unit_cost": "3.20",
            "reference_type": "purchase"
        }"#;
        let req: StockMovementRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.quantity.raw(), 125_000);
        assert_eq!(req.unit_cost, Some(Decimal::new(320, 2)));
        assert_eq!(req.variant_id, None);
        assert_eq!(req.scope(3), ScopeKey::new(3, 7, None, 1));
    }

    #[test]
    fn test_pick_request_strategy_accepts_lowercase() {
        let json = r#"{"product_id": 7, "branch_id": 1, "quantity": 8, "strategy": "fifo"}"#;
        let req: PickRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.strategy, Some(PickingStrategy::Fifo));
    }

    #[test]
    fn test_transfer_scopes() {
        let req = TransferRequest::new(1, 2, 7, Quantity::from_units(5)).with_variant(9);
        assert_eq!(req.source_scope(1), ScopeKey::new(1, 7, Some(9), 1));
        assert_eq!(req.destination_scope(1), ScopeKey::new(1, 7, Some(9), 2));
    }

    #[test]
    fn test_balance_check_consistency() {
        let scope = ScopeKey::new(1, 7, None, 1);
        let empty = BalanceCheck {
            scope,
            summed: Quantity::ZERO,
            latest_running_balance: None,
            entry_count: 0,
        };
        assert!(empty.is_consistent());

        let drifted = BalanceCheck {
            summed: Quantity::from_units(70),
            latest_running_balance: Some(Quantity::from_units(100)),
            entry_count: 2,
            ..empty
        };
        assert!(!drifted.is_consistent());
    }
}
