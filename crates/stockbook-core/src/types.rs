//! # Domain Types
//!
//! Core domain types used throughout the stock ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  LedgerEntry    │   │     Batch       │   │ StockOperation  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (autoinc)   │   │  id             │   │  id (UUID)      │       │
//! │  │  scope key      │   │  batch_number   │   │  kind           │       │
//! │  │  quantity ±     │   │  expiry_date    │   │  reference      │       │
//! │  │  running_balance│   │  is_active      │   │  actor          │       │
//! │  │  operation_id ──┼───┼─────────────────┼──►│                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │   immutable             mutable metadata      immutable journal         │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ TransactionType │   │ PickingStrategy │   │    ScopeKey     │       │
//! │  │  In / Out       │   │  Fifo           │   │ tenant, product │       │
//! │  │  Transfer       │   │  Fefo           │   │ variant?, branch│       │
//! │  │  Adjustment     │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership of Quantity Truth
//! The ledger exclusively owns quantities. A batch's remaining quantity, a
//! product's "in stock" flag and every balance are derived by summing ledger
//! entries. None of them is ever stored as a mutable field.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::quantity::Quantity;

// =============================================================================
// Tenant Context
// =============================================================================

/// Explicit tenant/user context threaded through every engine call.
///
/// There is no ambient "current tenant": whoever handles the request builds
/// one of these from its auth layer and passes it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: i64,

    /// User performing the operation, stamped on every ledger entry.
    pub user_id: Option<i64>,
}

impl TenantContext {
    pub fn new(tenant_id: i64) -> Self {
        TenantContext {
            tenant_id,
            user_id: None,
        }
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

// =============================================================================
// Transaction Type
// =============================================================================

/// Kind of ledger movement.
///
/// ## Sign Convention
/// | Type         | quantity sign                                  |
/// |--------------|------------------------------------------------|
/// | `In`         | always positive                                |
/// | `Out`        | always negative                                |
/// | `Transfer`   | negative at source, positive at destination    |
/// | `Adjustment` | signed delta (may be zero)                     |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
pub enum TransactionType {
    In,
    Out,
    Transfer,
    Adjustment,
}

impl TransactionType {
    /// Stored (lowercase) representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::In => "in",
            TransactionType::Out => "out",
            TransactionType::Transfer => "transfer",
            TransactionType::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

// =============================================================================
// Picking Strategy
// =============================================================================

/// Batch ordering used by the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PickingStrategy {
    /// First-In-First-Out: oldest received batch first.
    #[serde(alias = "fifo")]
    Fifo,
    /// First-Expired-First-Out: soonest expiry first, no-expiry batches last.
    #[default]
    #[serde(alias = "fefo")]
    Fefo,
}

impl PickingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickingStrategy::Fifo => "FIFO",
            PickingStrategy::Fefo => "FEFO",
        }
    }
}

impl fmt::Display for PickingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive: `"fifo"`, `"FIFO"` and `"Fifo"` are all accepted.
impl FromStr for PickingStrategy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FIFO" => Ok(PickingStrategy::Fifo),
            "FEFO" => Ok(PickingStrategy::Fefo),
            _ => Err(ValidationError::NotAllowed {
                field: "strategy".to_string(),
                allowed: vec!["FIFO".to_string(), "FEFO".to_string()],
            }),
        }
    }
}

// =============================================================================
// Scope Keys and Filters
// =============================================================================

/// The exact (tenant, product, variant, branch) tuple a running balance
/// belongs to.
///
/// `variant_id: None` means the base product (variant IS NULL), not "any
/// variant". Batch is deliberately absent: the running balance stored on an
/// entry covers every batch of the scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeKey {
    pub tenant_id: i64,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub branch_id: i64,
}

impl ScopeKey {
    pub fn new(tenant_id: i64, product_id: i64, variant_id: Option<i64>, branch_id: i64) -> Self {
        ScopeKey {
            tenant_id,
            product_id,
            variant_id,
            branch_id,
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant_id {
            Some(variant) => write!(
                f,
                "tenant={} product={} variant={} branch={}",
                self.tenant_id, self.product_id, variant, self.branch_id
            ),
            None => write!(
                f,
                "tenant={} product={} branch={}",
                self.tenant_id, self.product_id, self.branch_id
            ),
        }
    }
}

/// How a query matches the variant column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VariantFilter {
    /// Every variant, including the base product.
    #[default]
    Any,
    /// Only entries without a variant.
    Base,
    /// Only entries for this variant.
    Exact(i64),
}

impl VariantFilter {
    /// Exact match used for scope balances: `None` selects the base product.
    pub fn exact(variant_id: Option<i64>) -> Self {
        match variant_id {
            Some(id) => VariantFilter::Exact(id),
            None => VariantFilter::Base,
        }
    }

    /// Optional match used for aggregate queries: `None` selects all.
    pub fn optional(variant_id: Option<i64>) -> Self {
        match variant_id {
            Some(id) => VariantFilter::Exact(id),
            None => VariantFilter::Any,
        }
    }
}

/// Filter for aggregate balance queries.
///
/// Unlike [`ScopeKey`], any dimension may be left open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceFilter {
    pub tenant_id: i64,
    pub product_id: i64,
    pub variant: VariantFilter,
    pub branch_id: Option<i64>,
    pub batch_id: Option<i64>,
}

impl BalanceFilter {
    /// All stock of a product across variants and branches.
    pub fn product(tenant_id: i64, product_id: i64) -> Self {
        BalanceFilter {
            tenant_id,
            product_id,
            variant: VariantFilter::Any,
            branch_id: None,
            batch_id: None,
        }
    }

    /// Exactly one scope.
    pub fn scope(scope: &ScopeKey) -> Self {
        BalanceFilter {
            tenant_id: scope.tenant_id,
            product_id: scope.product_id,
            variant: VariantFilter::exact(scope.variant_id),
            branch_id: Some(scope.branch_id),
            batch_id: None,
        }
    }

    /// One batch within one scope.
    pub fn batch(scope: &ScopeKey, batch_id: i64) -> Self {
        BalanceFilter {
            batch_id: Some(batch_id),
            ..BalanceFilter::scope(scope)
        }
    }

    pub fn with_variant(mut self, variant: VariantFilter) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_branch(mut self, branch_id: Option<i64>) -> Self {
        self.branch_id = branch_id;
        self
    }
}

// =============================================================================
// Ledger Entry
// =============================================================================

/// One immutable stock movement.
///
/// Created only by the stock operations engine. Once stored it is never
/// updated or deleted; corrections are new `Adjustment` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Auto-assigned, increasing in creation order.
    pub id: i64,
    pub tenant_id: i64,
    pub branch_id: i64,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub batch_id: Option<i64>,
    pub transaction_type: TransactionType,

    /// Signed movement.
    pub quantity: Quantity,

    /// Informational cost per unit.
    pub unit_cost: Option<Decimal>,

    /// `unit_cost × |quantity|`, informational.
    pub total_cost: Option<Decimal>,

    /// Scope balance immediately after this entry.
    pub running_balance: Quantity,

    /// Loose pointer to the originating business document.
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,

    /// Logical event time (may differ from `created_at`).
    pub transaction_date: DateTime<Utc>,
    pub actor_id: Option<i64>,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,

    /// Journal row of the engine run that wrote this entry.
    pub operation_id: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// The running-balance scope this entry belongs to.
    pub fn scope(&self) -> ScopeKey {
        ScopeKey::new(self.tenant_id, self.product_id, self.variant_id, self.branch_id)
    }
}

/// Input for appending a ledger entry.
///
/// `running_balance` and `total_cost` are computed by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    pub tenant_id: i64,
    pub branch_id: i64,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub batch_id: Option<i64>,
    pub transaction_type: TransactionType,
    pub quantity: Quantity,
    pub unit_cost: Option<Decimal>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub transaction_date: DateTime<Utc>,
    pub actor_id: Option<i64>,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl NewLedgerEntry {
    /// Starts an entry for a scope with only the required fields set.
    pub fn new(
        scope: &ScopeKey,
        transaction_type: TransactionType,
        quantity: Quantity,
        transaction_date: DateTime<Utc>,
    ) -> Self {
        NewLedgerEntry {
            tenant_id: scope.tenant_id,
            branch_id: scope.branch_id,
            product_id: scope.product_id,
            variant_id: scope.variant_id,
            batch_id: None,
            transaction_type,
            quantity,
            unit_cost: None,
            reference_type: None,
            reference_id: None,
            transaction_date,
            actor_id: None,
            notes: None,
            metadata: None,
        }
    }

    pub fn scope(&self) -> ScopeKey {
        ScopeKey::new(self.tenant_id, self.product_id, self.variant_id, self.branch_id)
    }

    /// `unit_cost × |quantity|`.
    ///
    /// Fails with `OutOfRange` when the product overflows a decimal.
    pub fn total_cost(&self) -> Result<Option<Decimal>, ValidationError> {
        self.unit_cost
            .map(|cost| {
                cost.checked_mul(self.quantity.abs().to_decimal())
                    .ok_or_else(|| ValidationError::OutOfRange {
                        field: "total_cost".to_string(),
                        max: Decimal::MAX.to_string(),
                    })
            })
            .transpose()
    }
}

/// Result ordering for ledger queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LedgerOrder {
    /// transaction_date ascending, then creation order.
    #[default]
    Chronological,
    /// transaction_date descending, then newest creation first.
    NewestFirst,
}

/// Read-only ledger query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerFilter {
    pub tenant_id: i64,
    pub product_id: Option<i64>,
    pub variant: VariantFilter,
    pub branch_id: Option<i64>,
    pub batch_id: Option<i64>,
    pub transaction_type: Option<TransactionType>,

    /// Inclusive lower bound on transaction_date.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on transaction_date.
    pub until: Option<DateTime<Utc>>,

    pub order: LedgerOrder,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl LedgerFilter {
    /// Every entry of a tenant.
    pub fn tenant(tenant_id: i64) -> Self {
        LedgerFilter {
            tenant_id,
            product_id: None,
            variant: VariantFilter::Any,
            branch_id: None,
            batch_id: None,
            transaction_type: None,
            from: None,
            until: None,
            order: LedgerOrder::Chronological,
            limit: None,
            offset: 0,
        }
    }

    /// Every entry of one exact scope.
    pub fn scope(scope: &ScopeKey) -> Self {
        LedgerFilter {
            product_id: Some(scope.product_id),
            variant: VariantFilter::exact(scope.variant_id),
            branch_id: Some(scope.branch_id),
            ..LedgerFilter::tenant(scope.tenant_id)
        }
    }
}

// =============================================================================
// Batch
// =============================================================================

/// Batch metadata: lot/serial/expiry for goods received together.
///
/// Mutable, but only its `is_active` flag changes after creation. Remaining
/// quantity is always derived from the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: i64,
    pub tenant_id: i64,
    pub product_id: i64,
    pub variant_id: Option<i64>,

    /// Branch the goods were received at.
    pub branch_id: i64,

    /// Unique per tenant.
    pub batch_number: String,
    pub lot_number: Option<String>,
    pub serial_number: Option<String>,
    pub manufactured_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub cost_price: Option<Decimal>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub metadata: Option<serde_json::Value>,

    /// Receipt time; the FIFO ordering key.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Expired when the expiry date is today or earlier.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry <= today)
    }

    /// Not yet expired, but expiring within `days` days.
    pub fn is_expiring_soon(&self, today: NaiveDate, days: u32) -> bool {
        let horizon = today + Duration::days(i64::from(days));
        self.expiry_date
            .is_some_and(|expiry| expiry > today && expiry <= horizon)
    }

    /// Days until expiry (negative once past), `None` without an expiry date.
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiry_date
            .map(|expiry| expiry.signed_duration_since(today).num_days())
    }
}

/// Input for registering a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBatch {
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub branch_id: i64,
    pub batch_number: String,
    pub lot_number: Option<String>,
    pub serial_number: Option<String>,
    pub manufactured_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub cost_price: Option<Decimal>,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl NewBatch {
    pub fn new(product_id: i64, branch_id: i64, batch_number: impl Into<String>) -> Self {
        NewBatch {
            product_id,
            variant_id: None,
            branch_id,
            batch_number: batch_number.into(),
            lot_number: None,
            serial_number: None,
            manufactured_date: None,
            expiry_date: None,
            cost_price: None,
            notes: None,
            metadata: None,
        }
    }

    pub fn with_variant(mut self, variant_id: i64) -> Self {
        self.variant_id = Some(variant_id);
        self
    }

    pub fn with_expiry(mut self, expiry_date: NaiveDate) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }

    pub fn with_lot(mut self, lot_number: impl Into<String>) -> Self {
        self.lot_number = Some(lot_number.into());
        self
    }
}

/// Batch metadata joined with its ledger-derived state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchState {
    pub batch: Batch,
    /// Sum of every ledger entry for the batch.
    pub remaining: Quantity,
    pub expired: bool,
    pub expiring_soon: bool,
    /// Active, not expired and with positive remaining stock.
    pub available: bool,
}

impl BatchState {
    pub fn derive(batch: Batch, remaining: Quantity, today: NaiveDate, soon_days: u32) -> Self {
        let expired = batch.is_expired(today);
        let expiring_soon = batch.is_expiring_soon(today, soon_days);
        let available = batch.is_active && !expired && remaining.is_positive();
        BatchState {
            batch,
            remaining,
            expired,
            expiring_soon,
            available,
        }
    }
}

// =============================================================================
// Operation Journal
// =============================================================================

/// Engine operation that produced a set of ledger entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum OperationKind {
    AddStock,
    RemoveStock,
    TransferStock,
    AdjustStock,
    PickStock,
}

/// One engine run, recorded before any of its entries.
///
/// Callers look these up by reference to dedupe retries of operations that
/// are not idempotent (add, remove, pick).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockOperation {
    /// UUID v4.
    pub id: String,
    pub tenant_id: i64,
    pub kind: OperationKind,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub actor_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Catalog (external collaborator records)
// =============================================================================

/// A stock-holding location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Branch {
    pub id: i64,
    pub tenant_id: i64,
    pub code: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A stocked product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub tenant_id: i64,
    pub sku: String,
    pub name: String,

    /// Reorder when the balance falls to or below this level.
    pub reorder_level: Option<Quantity>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// True when a reorder level is set and `balance` is at or below it.
    pub fn needs_reorder(&self, balance: Quantity) -> bool {
        self.reorder_level.is_some_and(|level| balance <= level)
    }
}

/// A variant (size, colour, pack) of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductVariant {
    pub id: i64,
    pub tenant_id: i64,
    pub product_id: i64,
    pub sku: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Pagination
// =============================================================================

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based.
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.per_page))
    }

    pub fn has_more(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn batch(expiry: Option<NaiveDate>, is_active: bool) -> Batch {
        Batch {
            id: 1,
            tenant_id: 1,
            product_id: 7,
            variant_id: None,
            branch_id: 1,
            batch_number: "B-001".to_string(),
            lot_number: None,
            serial_number: None,
            manufactured_date: None,
            expiry_date: expiry,
            cost_price: None,
            notes: None,
            is_active,
            metadata: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("fifo".parse::<PickingStrategy>().unwrap(), PickingStrategy::Fifo);
        assert_eq!(" FEFO ".parse::<PickingStrategy>().unwrap(), PickingStrategy::Fefo);
        assert!("lifo".parse::<PickingStrategy>().is_err());
        assert_eq!(PickingStrategy::default(), PickingStrategy::Fefo);
    }

    #[test]
    fn test_transaction_type_serde() {
        let json = serde_json::to_string(&TransactionType::Adjustment).unwrap();
        assert_eq!(json, "\"ADJUSTMENT\"");
        assert_eq!(TransactionType::Out.to_string(), "OUT");
        assert_eq!(TransactionType::Transfer.as_str(), "transfer");
    }

    #[test]
    fn test_batch_expiry_boundaries() {
        let today = date(2026, 3, 10);

        // Expiring today counts as expired
        assert!(batch(Some(today), true).is_expired(today));
        assert!(!batch(Some(date(2026, 3, 11)), true).is_expired(today));
        assert!(!batch(None, true).is_expired(today));

        let soon = batch(Some(date(2026, 4, 9)), true);
        assert!(soon.is_expiring_soon(today, 30));
        assert!(!soon.is_expiring_soon(today, 29));
        assert!(!batch(Some(today), true).is_expiring_soon(today, 30));
        assert_eq!(soon.days_until_expiry(today), Some(30));
    }

    #[test]
    fn test_batch_state_availability() {
        let today = date(2026, 3, 10);
        let ten = Quantity::from_units(10);

        assert!(BatchState::derive(batch(None, true), ten, today, 30).available);
        assert!(!BatchState::derive(batch(None, false), ten, today, 30).available);
        assert!(!BatchState::derive(batch(None, true), Quantity::ZERO, today, 30).available);

        let expired = BatchState::derive(batch(Some(date(2026, 3, 1)), true), ten, today, 30);
        assert!(expired.expired);
        assert!(!expired.available);
    }

    #[test]
    fn test_needs_reorder() {
        let mut product = Product {
            id: 7,
            tenant_id: 1,
            sku: "RICE-5KG".to_string(),
            name: "Rice 5kg".to_string(),
            reorder_level: Some(Quantity::from_units(20)),
            is_active: true,
            created_at: Utc::now(),
        };
        assert!(product.needs_reorder(Quantity::from_units(20)));
        assert!(!product.needs_reorder(Quantity::from_units(21)));

        product.reorder_level = None;
        assert!(!product.needs_reorder(Quantity::ZERO));
    }

    #[test]
    fn test_total_cost_uses_magnitude() {
        let scope = ScopeKey::new(1, 7, None, 1);
        let mut entry = NewLedgerEntry::new(
            &scope,
            TransactionType::Out,
            Quantity::from_units(-3),
            Utc::now(),
        );
        assert_eq!(entry.total_cost().unwrap(), None);

        entry.unit_cost = Some(Decimal::new(250, 2));
        assert_eq!(entry.total_cost().unwrap(), Some(Decimal::new(750, 2)));

        entry.unit_cost = Some(Decimal::MAX);
        assert!(entry.total_cost().is_err());
    }

    #[test]
    fn test_page_math() {
        let page: Page<i32> = Page {
            items: vec![],
            page: 1,
            per_page: 50,
            total: 101,
        };
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_more());
    }
}
