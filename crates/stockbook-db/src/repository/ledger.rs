//! # Ledger Store
//!
//! Append-only persistence for stock movements.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  StockService (inside one transaction)                                  │
//! │       │                                                                 │
//! │       ├── record_operation()  INSERT stock_operations  ← takes the     │
//! │       │                                                  write lock     │
//! │       ├── scope_balance()     SUM(quantity) for the scope              │
//! │       └── append_entry()      INSERT stock_ledger with                 │
//! │                               running_balance = sum + quantity          │
//! │                                                                         │
//! │  There is no UPDATE or DELETE path. `update`/`delete` on this          │
//! │  repository always fail, and SQL triggers reject them for any other    │
//! │  connection.                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes are `pub(crate)`: only the engine appends entries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::str::FromStr;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::push_variant_filter;
use stockbook_core::balance::running_balance_after;
use stockbook_core::validation::validate_new_entry;
use stockbook_core::{
    BalanceFilter, CoreError, LedgerEntry, LedgerFilter, LedgerOrder, NewLedgerEntry,
    OperationKind, Quantity, ScopeKey, StockOperation, TenantContext, TransactionType,
    VariantFilter,
};

const ENTRY_COLUMNS: &str = "id, tenant_id, branch_id, product_id, variant_id, batch_id, \
     transaction_type, quantity, unit_cost, total_cost, running_balance, reference_type, \
     reference_id, transaction_date, actor_id, notes, metadata, operation_id, created_at";

const OPERATION_COLUMNS: &str =
    "id, tenant_id, kind, reference_type, reference_id, actor_id, created_at";

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    id: i64,
    tenant_id: i64,
    branch_id: i64,
    product_id: i64,
    variant_id: Option<i64>,
    batch_id: Option<i64>,
    transaction_type: TransactionType,
    quantity: Quantity,
    unit_cost: Option<String>,
    total_cost: Option<String>,
    running_balance: Quantity,
    reference_type: Option<String>,
    reference_id: Option<String>,
    transaction_date: DateTime<Utc>,
    actor_id: Option<i64>,
    notes: Option<String>,
    metadata: Option<String>,
    operation_id: String,
    created_at: DateTime<Utc>,
}

fn parse_decimal(column: &str, value: Option<String>) -> DbResult<Option<Decimal>> {
    value
        .as_deref()
        .map(Decimal::from_str)
        .transpose()
        .map_err(|e| DbError::Internal(format!("invalid stock_ledger.{}: {}", column, e)))
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = DbError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        let metadata = row
            .metadata
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(LedgerEntry {
            id: row.id,
            tenant_id: row.tenant_id,
            branch_id: row.branch_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            batch_id: row.batch_id,
            transaction_type: row.transaction_type,
            quantity: row.quantity,
            unit_cost: parse_decimal("unit_cost", row.unit_cost)?,
            total_cost: parse_decimal("total_cost", row.total_cost)?,
            running_balance: row.running_balance,
            reference_type: row.reference_type,
            reference_id: row.reference_id,
            transaction_date: row.transaction_date,
            actor_id: row.actor_id,
            notes: row.notes,
            metadata,
            operation_id: row.operation_id,
            created_at: row.created_at,
        })
    }
}

fn into_entries(rows: Vec<LedgerRow>) -> DbResult<Vec<LedgerEntry>> {
    rows.into_iter().map(LedgerEntry::try_from).collect()
}

// =============================================================================
// Repository
// =============================================================================

/// Read access to the ledger and the operation journal.
///
/// ## Usage
/// ```rust,ignore
/// let ledger = db.ledger();
///
/// // Everything one sale order moved
/// let entries = ledger.find_by_reference(tenant_id, "sale", "SO-1042").await?;
///
/// // Has this purchase receipt already been booked?
/// let ops = ledger.find_operations_by_reference(tenant_id, "purchase", "PO-77").await?;
/// if !ops.is_empty() {
///     return Ok(()); // skip the retry
/// }
/// ```
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Gets an entry by ID.
    pub async fn get(&self, tenant_id: i64, id: i64) -> DbResult<Option<LedgerEntry>> {
        let sql = format!(
            "SELECT {} FROM stock_ledger WHERE tenant_id = ?1 AND id = ?2",
            ENTRY_COLUMNS
        );
        let row: Option<LedgerRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(LedgerEntry::try_from).transpose()
    }

    /// Entries matching a filter, in the filter's order.
    pub async fn query(&self, filter: &LedgerFilter) -> DbResult<Vec<LedgerEntry>> {
        let mut conn = self.pool.acquire().await?;
        query_entries(&mut conn, filter).await
    }

    /// Number of entries matching a filter. Ordering and paging are ignored.
    pub async fn count(&self, filter: &LedgerFilter) -> DbResult<u64> {
        let mut conn = self.pool.acquire().await?;
        count_entries(&mut conn, filter).await
    }

    /// Entries booked against a business document, in append order.
    pub async fn find_by_reference(
        &self,
        tenant_id: i64,
        reference_type: &str,
        reference_id: &str,
    ) -> DbResult<Vec<LedgerEntry>> {
        let sql = format!(
            "SELECT {} FROM stock_ledger \
             WHERE tenant_id = ?1 AND reference_type = ?2 AND reference_id = ?3 \
             ORDER BY id",
            ENTRY_COLUMNS
        );
        let rows: Vec<LedgerRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(reference_type)
            .bind(reference_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(tenant_id, reference_type, reference_id, count = rows.len(), "Found entries by reference");
        into_entries(rows)
    }

    /// Entries written by one engine operation, in append order.
    pub async fn find_by_operation(
        &self,
        tenant_id: i64,
        operation_id: &str,
    ) -> DbResult<Vec<LedgerEntry>> {
        let sql = format!(
            "SELECT {} FROM stock_ledger WHERE tenant_id = ?1 AND operation_id = ?2 ORDER BY id",
            ENTRY_COLUMNS
        );
        let rows: Vec<LedgerRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(operation_id)
            .fetch_all(&self.pool)
            .await?;
        into_entries(rows)
    }

    /// Sum of quantities matching a balance filter.
    pub async fn balance(&self, filter: &BalanceFilter) -> DbResult<Quantity> {
        let mut conn = self.pool.acquire().await?;
        sum_balance(&mut conn, filter).await
    }

    /// Authoritative balance of one exact scope.
    pub async fn scope_balance(&self, scope: &ScopeKey) -> DbResult<Quantity> {
        let mut conn = self.pool.acquire().await?;
        scope_balance(&mut conn, scope).await
    }

    /// Most recently appended entry of a scope.
    pub async fn latest_entry(&self, scope: &ScopeKey) -> DbResult<Option<LedgerEntry>> {
        let mut conn = self.pool.acquire().await?;
        latest_scope_entry(&mut conn, scope).await
    }

    /// Gets a journal record by ID.
    pub async fn get_operation(
        &self,
        tenant_id: i64,
        operation_id: &str,
    ) -> DbResult<Option<StockOperation>> {
        let sql = format!(
            "SELECT {} FROM stock_operations WHERE tenant_id = ?1 AND id = ?2",
            OPERATION_COLUMNS
        );
        let op = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(operation_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(op)
    }

    /// Journal records for a business document, oldest first.
    ///
    /// Add, remove and pick are not idempotent. Check here before retrying one.
    pub async fn find_operations_by_reference(
        &self,
        tenant_id: i64,
        reference_type: &str,
        reference_id: &str,
    ) -> DbResult<Vec<StockOperation>> {
        let sql = format!(
            "SELECT {} FROM stock_operations \
             WHERE tenant_id = ?1 AND reference_type = ?2 AND reference_id = ?3 \
             ORDER BY created_at, id",
            OPERATION_COLUMNS
        );
        let ops = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(reference_type)
            .bind(reference_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ops)
    }

    /// Always fails: ledger entries are never modified.
    ///
    /// Corrections are new `ADJUSTMENT` entries made through
    /// `StockService::adjust_stock`.
    pub async fn update(&self, entry: &LedgerEntry) -> DbResult<LedgerEntry> {
        error!(
            entry_id = entry.id,
            tenant_id = entry.tenant_id,
            "Attempted to update a stock ledger entry"
        );
        Err(CoreError::immutable(entry.id, "updated").into())
    }

    /// Always fails: ledger entries are never removed.
    pub async fn delete(&self, tenant_id: i64, id: i64) -> DbResult<()> {
        error!(entry_id = id, tenant_id, "Attempted to delete a stock ledger entry");
        Err(CoreError::immutable(id, "deleted").into())
    }
}

// =============================================================================
// Connection-level helpers (usable inside a transaction)
// =============================================================================

/// Inserts the journal row for an engine run.
///
/// Must be the first statement of the run's transaction.
pub(crate) async fn record_operation(
    conn: &mut SqliteConnection,
    ctx: &TenantContext,
    kind: OperationKind,
    reference_type: Option<&str>,
    reference_id: Option<&str>,
) -> DbResult<StockOperation> {
    let sql = format!(
        "INSERT INTO stock_operations (id, tenant_id, kind, reference_type, reference_id, actor_id, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING {}",
        OPERATION_COLUMNS
    );
    let op: StockOperation = sqlx::query_as(&sql)
        .bind(Uuid::new_v4().to_string())
        .bind(ctx.tenant_id)
        .bind(kind)
        .bind(reference_type)
        .bind(reference_id)
        .bind(ctx.user_id)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

    debug!(operation_id = %op.id, tenant_id = ctx.tenant_id, kind = ?kind, "Recorded stock operation");
    Ok(op)
}

/// Appends one entry, stamping its running balance from the scope's current
/// sum.
pub(crate) async fn append_entry(
    conn: &mut SqliteConnection,
    operation_id: &str,
    entry: &NewLedgerEntry,
) -> DbResult<LedgerEntry> {
    validate_new_entry(entry)?;

    let total_cost = entry.total_cost()?;
    let current = scope_balance(conn, &entry.scope()).await?;
    let running = running_balance_after(current, entry.quantity)?;
    let metadata = entry
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let sql = format!(
        "INSERT INTO stock_ledger (tenant_id, branch_id, product_id, variant_id, batch_id, \
         transaction_type, quantity, unit_cost, total_cost, running_balance, reference_type, \
         reference_id, transaction_date, actor_id, notes, metadata, operation_id, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18) \
         RETURNING {}",
        ENTRY_COLUMNS
    );
    let row: LedgerRow = sqlx::query_as(&sql)
        .bind(entry.tenant_id)
        .bind(entry.branch_id)
        .bind(entry.product_id)
        .bind(entry.variant_id)
        .bind(entry.batch_id)
        .bind(entry.transaction_type)
        .bind(entry.quantity)
        .bind(entry.unit_cost.map(|c| c.to_string()))
        .bind(total_cost.map(|c| c.to_string()))
        .bind(running)
        .bind(&entry.reference_type)
        .bind(&entry.reference_id)
        .bind(entry.transaction_date)
        .bind(entry.actor_id)
        .bind(&entry.notes)
        .bind(metadata)
        .bind(operation_id)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

    let appended = LedgerEntry::try_from(row)?;
    debug!(
        entry_id = appended.id,
        operation_id,
        transaction_type = %appended.transaction_type,
        quantity = %appended.quantity,
        running_balance = %appended.running_balance,
        "Appended ledger entry"
    );
    Ok(appended)
}

pub(crate) async fn sum_balance(
    conn: &mut SqliteConnection,
    filter: &BalanceFilter,
) -> DbResult<Quantity> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT COALESCE(SUM(quantity), 0) FROM stock_ledger WHERE tenant_id = ",
    );
    qb.push_bind(filter.tenant_id);
    qb.push(" AND product_id = ").push_bind(filter.product_id);
    push_variant_filter(&mut qb, "variant_id", filter.variant);
    if let Some(branch_id) = filter.branch_id {
        qb.push(" AND branch_id = ").push_bind(branch_id);
    }
    if let Some(batch_id) = filter.batch_id {
        qb.push(" AND batch_id = ").push_bind(batch_id);
    }

    let raw: i64 = qb.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;
    Ok(Quantity::from_raw(raw))
}

pub(crate) async fn scope_balance(
    conn: &mut SqliteConnection,
    scope: &ScopeKey,
) -> DbResult<Quantity> {
    sum_balance(conn, &BalanceFilter::scope(scope)).await
}

/// Portion of a scope's balance not held in any batch.
pub(crate) async fn unbatched_balance(
    conn: &mut SqliteConnection,
    scope: &ScopeKey,
) -> DbResult<Quantity> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT COALESCE(SUM(quantity), 0) FROM stock_ledger WHERE tenant_id = ",
    );
    qb.push_bind(scope.tenant_id);
    qb.push(" AND product_id = ").push_bind(scope.product_id);
    push_variant_filter(&mut qb, "variant_id", VariantFilter::exact(scope.variant_id));
    qb.push(" AND branch_id = ").push_bind(scope.branch_id);
    qb.push(" AND batch_id IS NULL");

    let raw: i64 = qb.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;
    Ok(Quantity::from_raw(raw))
}

/// Latest entry of a scope in append order.
pub(crate) async fn latest_scope_entry(
    conn: &mut SqliteConnection,
    scope: &ScopeKey,
) -> DbResult<Option<LedgerEntry>> {
    let mut qb = select_entries(&LedgerFilter::scope(scope));
    qb.push(" ORDER BY id DESC LIMIT 1");
    let row: Option<LedgerRow> = qb.build_query_as().fetch_optional(&mut *conn).await?;
    row.map(LedgerEntry::try_from).transpose()
}

pub(crate) async fn query_entries(
    conn: &mut SqliteConnection,
    filter: &LedgerFilter,
) -> DbResult<Vec<LedgerEntry>> {
    let mut qb = select_entries(filter);
    match filter.order {
        LedgerOrder::Chronological => qb.push(" ORDER BY transaction_date, id"),
        LedgerOrder::NewestFirst => qb.push(" ORDER BY transaction_date DESC, id DESC"),
    };
    if let Some(limit) = filter.limit {
        qb.push(" LIMIT ").push_bind(i64::from(limit));
        qb.push(" OFFSET ").push_bind(i64::from(filter.offset));
    }

    let rows: Vec<LedgerRow> = qb.build_query_as().fetch_all(&mut *conn).await?;
    debug!(tenant_id = filter.tenant_id, count = rows.len(), "Queried ledger");
    into_entries(rows)
}

pub(crate) async fn count_entries(
    conn: &mut SqliteConnection,
    filter: &LedgerFilter,
) -> DbResult<u64> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM stock_ledger");
    push_entry_filter(&mut qb, filter);
    let count: i64 = qb.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;
    Ok(count.max(0) as u64)
}

fn select_entries(filter: &LedgerFilter) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM stock_ledger", ENTRY_COLUMNS));
    push_entry_filter(&mut qb, filter);
    qb
}

fn push_entry_filter(qb: &mut QueryBuilder<'static, Sqlite>, filter: &LedgerFilter) {
    qb.push(" WHERE tenant_id = ").push_bind(filter.tenant_id);
    if let Some(product_id) = filter.product_id {
        qb.push(" AND product_id = ").push_bind(product_id);
    }
    push_variant_filter(qb, "variant_id", filter.variant);
    if let Some(branch_id) = filter.branch_id {
        qb.push(" AND branch_id = ").push_bind(branch_id);
    }
    if let Some(batch_id) = filter.batch_id {
        qb.push(" AND batch_id = ").push_bind(batch_id);
    }
    if let Some(transaction_type) = filter.transaction_type {
        qb.push(" AND transaction_type = ").push_bind(transaction_type);
    }
    if let Some(from) = filter.from {
        qb.push(" AND transaction_date >= ").push_bind(from);
    }
    if let Some(until) = filter.until {
        qb.push(" AND transaction_date < ").push_bind(until);
    }
}
