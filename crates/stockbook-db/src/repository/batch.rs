//! # Batch Registry
//!
//! Lot/expiry metadata for goods received together.
//!
//! ## Metadata vs. Quantity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  batches (this repository)          stock_ledger                        │
//! │  ─────────────────────────          ────────────                        │
//! │  batch_number, lot, serial          +50  IN    batch 3                  │
//! │  manufactured / expiry dates        -20  OUT   batch 3                  │
//! │  is_active flag                     +5   ADJ   batch 3                  │
//! │                                                                         │
//! │  remaining(batch 3) = SUM(ledger.quantity WHERE batch_id = 3) = 35     │
//! │                                                                         │
//! │  Nothing here stores a quantity. Exhausted or withdrawn batches are    │
//! │  deactivated, never deleted.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::catalog;
use crate::repository::push_variant_filter;
use stockbook_core::validation::validate_new_batch;
use stockbook_core::{
    Batch, BatchCandidate, BatchState, NewBatch, Quantity, ValidationError, VariantFilter,
};

const BATCH_COLUMNS: &str = "id, tenant_id, product_id, variant_id, branch_id, batch_number, \
     lot_number, serial_number, manufactured_date, expiry_date, cost_price, notes, is_active, \
     metadata, created_at, updated_at";

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw `batches` row; decimal and JSON columns are TEXT.
#[derive(Debug, sqlx::FromRow)]
struct BatchRow {
    id: i64,
    tenant_id: i64,
    product_id: i64,
    variant_id: Option<i64>,
    branch_id: i64,
    batch_number: String,
    lot_number: Option<String>,
    serial_number: Option<String>,
    manufactured_date: Option<NaiveDate>,
    expiry_date: Option<NaiveDate>,
    cost_price: Option<String>,
    notes: Option<String>,
    is_active: bool,
    metadata: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BatchRow> for Batch {
    type Error = DbError;

    fn try_from(row: BatchRow) -> Result<Self, Self::Error> {
        let cost_price = row
            .cost_price
            .as_deref()
            .map(Decimal::from_str)
            .transpose()
            .map_err(|e| DbError::Internal(format!("invalid batches.cost_price: {}", e)))?;
        let metadata = row
            .metadata
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(Batch {
            id: row.id,
            tenant_id: row.tenant_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            branch_id: row.branch_id,
            batch_number: row.batch_number,
            lot_number: row.lot_number,
            serial_number: row.serial_number,
            manufactured_date: row.manufactured_date,
            expiry_date: row.expiry_date,
            cost_price,
            notes: row.notes,
            is_active: row.is_active,
            metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_batches(rows: Vec<BatchRow>) -> DbResult<Vec<Batch>> {
    rows.into_iter().map(Batch::try_from).collect()
}

/// Aggregated candidate row for the allocator.
#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    batch_id: i64,
    batch_number: String,
    expiry_date: Option<NaiveDate>,
    received_at: DateTime<Utc>,
    available: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for batch metadata.
///
/// ## Usage
/// ```rust,ignore
/// let batch = db.batches().create(tenant_id, NewBatch::new(7, 1, "LOT-2026-001")
///     .with_expiry(expiry)).await?;
///
/// let state = db.batches().state(tenant_id, batch.id, today, 30).await?;
/// println!("{} remaining, available: {}", state.remaining, state.available);
/// ```
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    /// Creates a new BatchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    /// Registers a batch.
    ///
    /// ## Errors
    /// - `Validation(Duplicate)` if the tenant already has this batch number
    /// - `NotFound` if the product, variant or branch does not exist
    pub async fn create(&self, tenant_id: i64, new: NewBatch) -> DbResult<Batch> {
        validate_new_batch(&new)?;

        let mut conn = self.pool.acquire().await?;
        catalog::ensure_product(&mut conn, tenant_id, new.product_id, new.variant_id).await?;
        catalog::ensure_branch(&mut conn, tenant_id, new.branch_id).await?;

        let now = Utc::now();
        let metadata = new
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let sql = format!(
            "INSERT INTO batches (tenant_id, product_id, variant_id, branch_id, batch_number, \
             lot_number, serial_number, manufactured_date, expiry_date, cost_price, notes, \
             is_active, metadata, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 1, ?12, ?13, ?13) \
             RETURNING {}",
            BATCH_COLUMNS
        );
        let row: BatchRow = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(new.product_id)
            .bind(new.variant_id)
            .bind(new.branch_id)
            .bind(new.batch_number.trim())
            .bind(&new.lot_number)
            .bind(&new.serial_number)
            .bind(new.manufactured_date)
            .bind(new.expiry_date)
            .bind(new.cost_price.map(|c| c.to_string()))
            .bind(&new.notes)
            .bind(metadata)
            .bind(now)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { .. } => ValidationError::Duplicate {
                    field: "batch_number".to_string(),
                    value: new.batch_number.trim().to_string(),
                }
                .into(),
                other => other,
            })?;

        let batch = Batch::try_from(row)?;
        info!(
            tenant_id,
            batch_id = batch.id,
            batch_number = %batch.batch_number,
            product_id = batch.product_id,
            "Registered batch"
        );
        Ok(batch)
    }

    /// Gets a batch by ID.
    pub async fn get(&self, tenant_id: i64, id: i64) -> DbResult<Option<Batch>> {
        let mut conn = self.pool.acquire().await?;
        fetch_batch(&mut conn, tenant_id, id).await
    }

    /// Gets a batch by its tenant-unique batch number.
    pub async fn get_by_number(&self, tenant_id: i64, batch_number: &str) -> DbResult<Option<Batch>> {
        let sql = format!(
            "SELECT {} FROM batches WHERE tenant_id = ?1 AND batch_number = ?2",
            BATCH_COLUMNS
        );
        let row: Option<BatchRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(batch_number.trim())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Batch::try_from).transpose()
    }

    /// Lists a product's batches in receipt order.
    pub async fn list_for_product(
        &self,
        tenant_id: i64,
        product_id: i64,
        include_inactive: bool,
    ) -> DbResult<Vec<Batch>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM batches WHERE tenant_id = ", BATCH_COLUMNS));
        qb.push_bind(tenant_id);
        qb.push(" AND product_id = ").push_bind(product_id);
        if !include_inactive {
            qb.push(" AND is_active = 1");
        }
        qb.push(" ORDER BY created_at, id");

        let rows: Vec<BatchRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        into_batches(rows)
    }

    /// Marks a batch inactive. It stays in the ledger history but is never
    /// offered for picking or new receipts.
    pub async fn deactivate(&self, tenant_id: i64, id: i64) -> DbResult<Batch> {
        let batch = self.set_active(tenant_id, id, false).await?;
        info!(tenant_id, batch_id = id, "Deactivated batch");
        Ok(batch)
    }

    /// Returns a deactivated batch to service.
    pub async fn reactivate(&self, tenant_id: i64, id: i64) -> DbResult<Batch> {
        let batch = self.set_active(tenant_id, id, true).await?;
        info!(tenant_id, batch_id = id, "Reactivated batch");
        Ok(batch)
    }

    async fn set_active(&self, tenant_id: i64, id: i64, active: bool) -> DbResult<Batch> {
        let sql = format!(
            "UPDATE batches SET is_active = ?1, updated_at = ?2 \
             WHERE tenant_id = ?3 AND id = ?4 RETURNING {}",
            BATCH_COLUMNS
        );
        let row: Option<BatchRow> = sqlx::query_as(&sql)
            .bind(active)
            .bind(Utc::now())
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Batch::try_from)
            .transpose()?
            .ok_or_else(|| DbError::not_found("Batch", id))
    }

    /// Active batches expiring after `today` and within `days` days,
    /// soonest first.
    pub async fn list_expiring_soon(
        &self,
        tenant_id: i64,
        today: NaiveDate,
        days: u32,
    ) -> DbResult<Vec<Batch>> {
        let horizon = today + Duration::days(i64::from(days));
        let sql = format!(
            "SELECT {} FROM batches \
             WHERE tenant_id = ?1 AND is_active = 1 \
             AND expiry_date > ?2 AND expiry_date <= ?3 \
             ORDER BY expiry_date, id",
            BATCH_COLUMNS
        );
        let rows: Vec<BatchRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(today)
            .bind(horizon)
            .fetch_all(&self.pool)
            .await?;

        debug!(tenant_id, days, count = rows.len(), "Listed expiring batches");
        into_batches(rows)
    }

    /// Active batches whose expiry date is `today` or earlier.
    pub async fn list_expired(&self, tenant_id: i64, today: NaiveDate) -> DbResult<Vec<Batch>> {
        let sql = format!(
            "SELECT {} FROM batches \
             WHERE tenant_id = ?1 AND is_active = 1 AND expiry_date <= ?2 \
             ORDER BY expiry_date, id",
            BATCH_COLUMNS
        );
        let rows: Vec<BatchRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(today)
            .fetch_all(&self.pool)
            .await?;
        into_batches(rows)
    }

    /// Remaining quantity of a batch across all branches.
    pub async fn remaining(&self, tenant_id: i64, id: i64) -> DbResult<Quantity> {
        let raw: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM stock_ledger WHERE tenant_id = ?1 AND batch_id = ?2",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(Quantity::from_raw(raw))
    }

    /// Batch metadata with its ledger-derived state.
    pub async fn state(
        &self,
        tenant_id: i64,
        id: i64,
        today: NaiveDate,
        soon_days: u32,
    ) -> DbResult<BatchState> {
        let batch = self
            .get(tenant_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Batch", id))?;
        let remaining = self.remaining(tenant_id, id).await?;
        Ok(BatchState::derive(batch, remaining, today, soon_days))
    }
}

// =============================================================================
// Connection-level helpers (usable inside a transaction)
// =============================================================================

pub(crate) async fn fetch_batch(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    id: i64,
) -> DbResult<Option<Batch>> {
    let sql = format!(
        "SELECT {} FROM batches WHERE tenant_id = ?1 AND id = ?2",
        BATCH_COLUMNS
    );
    let row: Option<BatchRow> = sqlx::query_as(&sql)
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(Batch::try_from).transpose()
}

/// The batch must exist and carry the same product and variant as the
/// movement. Inbound movements also require it to be active.
pub(crate) async fn ensure_batch(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    batch_id: i64,
    product_id: i64,
    variant_id: Option<i64>,
    require_active: bool,
) -> DbResult<Batch> {
    let batch = fetch_batch(conn, tenant_id, batch_id)
        .await?
        .ok_or_else(|| DbError::not_found("Batch", batch_id))?;

    if batch.product_id != product_id || batch.variant_id != variant_id {
        return Err(ValidationError::Mismatch {
            field: "batch_id".to_string(),
            value: batch_id.to_string(),
            owner: match variant_id {
                Some(variant) => format!("product {} variant {}", product_id, variant),
                None => format!("product {}", product_id),
            },
        }
        .into());
    }

    if require_active && !batch.is_active {
        return Err(ValidationError::Inactive {
            field: "batch_id".to_string(),
            value: batch_id.to_string(),
        }
        .into());
    }

    Ok(batch)
}

/// Batches holding positive stock for a product, with their balance in the
/// queried scope.
///
/// Inactive batches are never returned. When `expired_on_or_before` is set,
/// batches expiring on or before that date are skipped too. Ordering is left
/// to the allocator.
pub(crate) async fn available_candidates(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    product_id: i64,
    variant: VariantFilter,
    branch_id: Option<i64>,
    expired_on_or_before: Option<NaiveDate>,
) -> DbResult<Vec<BatchCandidate>> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT b.id AS batch_id, b.batch_number, b.expiry_date, b.created_at AS received_at, \
         SUM(l.quantity) AS available \
         FROM stock_ledger l JOIN batches b ON b.id = l.batch_id \
         WHERE l.tenant_id = ",
    );
    qb.push_bind(tenant_id);
    qb.push(" AND l.product_id = ").push_bind(product_id);
    push_variant_filter(&mut qb, "l.variant_id", variant);
    if let Some(branch_id) = branch_id {
        qb.push(" AND l.branch_id = ").push_bind(branch_id);
    }
    qb.push(" AND b.is_active = 1");
    if let Some(today) = expired_on_or_before {
        qb.push(" AND (b.expiry_date IS NULL OR b.expiry_date > ")
            .push_bind(today)
            .push(")");
    }
    qb.push(
        " GROUP BY b.id, b.batch_number, b.expiry_date, b.created_at \
         HAVING SUM(l.quantity) > 0",
    );

    let rows: Vec<CandidateRow> = qb.build_query_as().fetch_all(&mut *conn).await?;

    debug!(
        tenant_id,
        product_id,
        branch_id = ?branch_id,
        count = rows.len(),
        "Loaded batch candidates"
    );

    Ok(rows
        .into_iter()
        .map(|row| BatchCandidate {
            batch_id: row.batch_id,
            batch_number: row.batch_number,
            expiry_date: row.expiry_date,
            received_at: row.received_at,
            available: Quantity::from_raw(row.available),
        })
        .collect())
}
