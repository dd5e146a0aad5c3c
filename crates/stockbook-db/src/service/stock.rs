//! # Stock Operations Engine
//!
//! The only component that writes ledger entries.
//!
//! ## Operation Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request ──► validate (pure, no I/O)                                    │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  BEGIN                                                                  │
//! │    INSERT stock_operations        ← first statement: takes SQLite's    │
//! │                 │                   write lock, waits ≤ busy_timeout    │
//! │                 ▼                                                       │
//! │    existence checks (product, variant, branch, batch)                   │
//! │    read balance / allocate batches                                      │
//! │    business rules (InsufficientStock, NoAvailableBatches)               │
//! │    append 1..N ledger entries                                           │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: nothing is written,    │
//! │  not even the journal row.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Because the journal insert precedes every read, two writers can never
//! both read the same pre-decrement balance. The second one blocks until
//! the first commits, then reads the new balance.
//!
//! ## Entries Per Operation
//! | Operation  | Entries                                                  |
//! |------------|----------------------------------------------------------|
//! | add        | 1 × IN (+qty)                                            |
//! | remove     | 1 × OUT (−qty)                                           |
//! | transfer   | TRANSFER (−qty) at source, TRANSFER (+qty) at destination |
//! | adjust     | 1 × ADJUSTMENT (target − current, may be zero)           |
//! | pick       | 1 × OUT (−pick) per batch with a non-zero pick           |

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::config::StockSettings;
use crate::error::{DbError, DbResult};
use crate::repository::{batch, catalog, ledger};
use stockbook_core::allocation::{allocate, total_picked};
use stockbook_core::balance::{adjustment_delta, ensure_sufficient, running_balance_after};
use stockbook_core::validation::{
    validate_adjustment, validate_available_batches, validate_history, validate_movement,
    validate_pick, validate_transfer,
};
use stockbook_core::{
    AdjustmentRequest, AdjustmentResult, AvailableBatchesQuery, BalanceCheck, BalanceFilter,
    BatchPick, BatchState, CoreError, LedgerEntry, LedgerFilter, LedgerOrder,
    MovementHistoryQuery, MovementResult, NewLedgerEntry, OperationKind, Page, PickRequest,
    PickResult, Quantity, ScopeKey, StockBalance, StockMovementRequest,
    TenantContext, TransactionType, TransferRequest, TransferResult, ValidationError,
    VariantFilter, PICKING_REFERENCE_TYPE, TRANSFER_REFERENCE_TYPE,
};

/// Stock operations engine.
///
/// ## Usage
/// ```rust,ignore
/// let stock = db.stock();
/// let ctx = TenantContext::new(1).with_user(42);
///
/// stock.add_stock(&ctx, StockMovementRequest::new(1, 7, Quantity::from_units(100))).await?;
/// stock.remove_stock(&ctx, StockMovementRequest::new(1, 7, Quantity::from_units(30))).await?;
///
/// let balance = stock.get_stock_balance(&ctx, 7, None, Some(1)).await?;
/// assert_eq!(balance.balance, Quantity::from_units(70));
/// ```
#[derive(Debug, Clone)]
pub struct StockService {
    pool: SqlitePool,
    settings: StockSettings,
}

impl StockService {
    /// Creates a new StockService.
    pub fn new(pool: SqlitePool, settings: StockSettings) -> Self {
        StockService { pool, settings }
    }

    /// Engine settings in effect.
    pub fn settings(&self) -> &StockSettings {
        &self.settings
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Receives stock into a scope with one `IN` entry.
    ///
    /// A named batch must be active, belong to the product/variant and be
    /// registered to the receiving branch.
    pub async fn add_stock(
        &self,
        ctx: &TenantContext,
        req: StockMovementRequest,
    ) -> DbResult<MovementResult> {
        validate_movement(&req)?;
        let scope = req.scope(ctx.tenant_id);

        let mut tx = self.pool.begin().await?;
        let op = ledger::record_operation(
            &mut tx,
            ctx,
            OperationKind::AddStock,
            req.reference_type.as_deref(),
            req.reference_id.as_deref(),
        )
        .await?;

        catalog::ensure_scope(&mut tx, &scope).await?;
        if let Some(batch_id) = req.batch_id {
            let batch =
                batch::ensure_batch(&mut tx, ctx.tenant_id, batch_id, req.product_id, req.variant_id, true)
                    .await?;
            if batch.branch_id != req.branch_id {
                return Err(ValidationError::Mismatch {
                    field: "batch_id".to_string(),
                    value: batch_id.to_string(),
                    owner: format!("branch {}", req.branch_id),
                }
                .into());
            }
        }

        let entry = movement_entry(ctx, &scope, TransactionType::In, req.quantity, &req);
        let entry = ledger::append_entry(&mut tx, &op.id, &entry).await?;
        tx.commit().await?;

        info!(
            tenant_id = ctx.tenant_id,
            product_id = req.product_id,
            branch_id = req.branch_id,
            batch_id = ?req.batch_id,
            quantity = %req.quantity,
            new_balance = %entry.running_balance,
            operation_id = %op.id,
            "Stock added"
        );

        Ok(MovementResult {
            new_balance: entry.running_balance,
            entry,
        })
    }

    /// Issues stock from a scope with one `OUT` entry.
    ///
    /// With a batch, the batch's balance in that branch must cover the
    /// quantity; otherwise the scope's unbatched stock must. Batched stock
    /// leaves only by naming the batch or through `pick_stock`.
    ///
    /// ## Errors
    /// - `InsufficientStock` when the balance is lower than the quantity
    pub async fn remove_stock(
        &self,
        ctx: &TenantContext,
        req: StockMovementRequest,
    ) -> DbResult<MovementResult> {
        validate_movement(&req)?;
        let scope = req.scope(ctx.tenant_id);

        let mut tx = self.pool.begin().await?;
        let op = ledger::record_operation(
            &mut tx,
            ctx,
            OperationKind::RemoveStock,
            req.reference_type.as_deref(),
            req.reference_id.as_deref(),
        )
        .await?;

        catalog::ensure_scope(&mut tx, &scope).await?;
        let available = outbound_available(&mut tx, &scope, req.batch_id).await?;

        if let Err(err) = ensure_sufficient(available, req.quantity) {
            warn!(
                tenant_id = ctx.tenant_id,
                product_id = req.product_id,
                branch_id = req.branch_id,
                available = %available,
                required = %req.quantity,
                "Rejected stock removal"
            );
            return Err(err.into());
        }

        let entry = movement_entry(ctx, &scope, TransactionType::Out, req.quantity.as_outbound(), &req);
        let entry = ledger::append_entry(&mut tx, &op.id, &entry).await?;
        tx.commit().await?;

        info!(
            tenant_id = ctx.tenant_id,
            product_id = req.product_id,
            branch_id = req.branch_id,
            batch_id = ?req.batch_id,
            quantity = %req.quantity,
            new_balance = %entry.running_balance,
            operation_id = %op.id,
            "Stock removed"
        );

        Ok(MovementResult {
            new_balance: entry.running_balance,
            entry,
        })
    }

    /// Moves stock between branches as a pair of `TRANSFER` entries that
    /// share one operation id.
    ///
    /// Availability at the source follows the same rules as `remove_stock`.
    /// `reference_type` defaults to `"transfer"` and `reference_id` to the
    /// operation id.
    pub async fn transfer_stock(
        &self,
        ctx: &TenantContext,
        req: TransferRequest,
    ) -> DbResult<TransferResult> {
        validate_transfer(&req)?;
        let source = req.source_scope(ctx.tenant_id);
        let destination = req.destination_scope(ctx.tenant_id);
        let reference_type = req
            .reference_type
            .clone()
            .unwrap_or_else(|| TRANSFER_REFERENCE_TYPE.to_string());

        let mut tx = self.pool.begin().await?;
        let op = ledger::record_operation(
            &mut tx,
            ctx,
            OperationKind::TransferStock,
            Some(&reference_type),
            req.reference_id.as_deref(),
        )
        .await?;

        catalog::ensure_scope(&mut tx, &source).await?;
        catalog::ensure_branch(&mut tx, ctx.tenant_id, req.to_branch_id).await?;

        let available = outbound_available(&mut tx, &source, req.batch_id).await?;

        if let Err(err) = ensure_sufficient(available, req.quantity) {
            warn!(
                tenant_id = ctx.tenant_id,
                product_id = req.product_id,
                from_branch_id = req.from_branch_id,
                to_branch_id = req.to_branch_id,
                available = %available,
                required = %req.quantity,
                "Rejected stock transfer"
            );
            return Err(err.into());
        }

        let reference_id = req.reference_id.clone().unwrap_or_else(|| op.id.clone());
        let date = req.transaction_date.unwrap_or_else(Utc::now);

        let transfer_entry = |scope: &ScopeKey, quantity: Quantity, default_notes: &str| {
            let mut entry = NewLedgerEntry::new(scope, TransactionType::Transfer, quantity, date);
            entry.batch_id = req.batch_id;
            entry.unit_cost = req.unit_cost;
            entry.reference_type = Some(reference_type.clone());
            entry.reference_id = Some(reference_id.clone());
            entry.actor_id = ctx.user_id;
            entry.notes = Some(req.notes.clone().unwrap_or_else(|| default_notes.to_string()));
            entry
        };

        let out_entry = transfer_entry(&source, req.quantity.as_outbound(), "Transfer out");
        let in_entry = transfer_entry(&destination, req.quantity, "Transfer in");

        let out_entry = ledger::append_entry(&mut tx, &op.id, &out_entry).await?;
        let in_entry = ledger::append_entry(&mut tx, &op.id, &in_entry).await?;
        tx.commit().await?;

        info!(
            tenant_id = ctx.tenant_id,
            product_id = req.product_id,
            from_branch_id = req.from_branch_id,
            to_branch_id = req.to_branch_id,
            quantity = %req.quantity,
            operation_id = %op.id,
            "Stock transferred"
        );

        Ok(TransferResult {
            operation_id: op.id,
            from_balance: out_entry.running_balance,
            to_balance: in_entry.running_balance,
            out_entry,
            in_entry,
        })
    }

    /// Sets a scope (or one batch in it) to a counted balance with a single
    /// `ADJUSTMENT` entry carrying the delta.
    ///
    /// A zero delta is still written so every count leaves an audit record.
    /// A batch adjustment may not take the scope balance below zero.
    pub async fn adjust_stock(
        &self,
        ctx: &TenantContext,
        req: AdjustmentRequest,
    ) -> DbResult<AdjustmentResult> {
        validate_adjustment(&req)?;
        let scope = req.scope(ctx.tenant_id);

        let mut tx = self.pool.begin().await?;
        let op = ledger::record_operation(
            &mut tx,
            ctx,
            OperationKind::AdjustStock,
            req.reference_type.as_deref(),
            req.reference_id.as_deref(),
        )
        .await?;

        catalog::ensure_scope(&mut tx, &scope).await?;
        let scope_total = ledger::scope_balance(&mut tx, &scope).await?;
        let current = match req.batch_id {
            Some(batch_id) => {
                batch::ensure_batch(&mut tx, ctx.tenant_id, batch_id, req.product_id, req.variant_id, false)
                    .await?;
                ledger::sum_balance(&mut tx, &BalanceFilter::batch(&scope, batch_id)).await?
            }
            None => scope_total,
        };

        let delta = adjustment_delta(current, req.target_balance)?;
        if running_balance_after(scope_total, delta)?.is_negative() {
            warn!(
                tenant_id = ctx.tenant_id,
                product_id = req.product_id,
                branch_id = req.branch_id,
                batch_id = ?req.batch_id,
                scope_balance = %scope_total,
                adjustment = %delta,
                "Rejected adjustment below zero"
            );
            return Err(CoreError::InsufficientStock {
                available: scope_total,
                required: delta.abs(),
            }
            .into());
        }
        let notes = match (&req.notes, delta.is_zero()) {
            (Some(notes), _) => Some(notes.clone()),
            (None, true) => Some("No change detected".to_string()),
            (None, false) => None,
        };

        let mut entry = NewLedgerEntry::new(
            &scope,
            TransactionType::Adjustment,
            delta,
            req.transaction_date.unwrap_or_else(Utc::now),
        );
        entry.batch_id = req.batch_id;
        entry.unit_cost = req.unit_cost;
        entry.reference_type = req.reference_type.clone();
        entry.reference_id = req.reference_id.clone();
        entry.actor_id = ctx.user_id;
        entry.notes = notes;

        let entry = ledger::append_entry(&mut tx, &op.id, &entry).await?;
        tx.commit().await?;

        info!(
            tenant_id = ctx.tenant_id,
            product_id = req.product_id,
            branch_id = req.branch_id,
            batch_id = ?req.batch_id,
            old_balance = %current,
            adjustment = %delta,
            new_balance = %req.target_balance,
            operation_id = %op.id,
            "Stock adjusted"
        );

        Ok(AdjustmentResult {
            entry,
            old_balance: current,
            adjustment: delta,
            new_balance: req.target_balance,
        })
    }

    /// Picks stock out of batches in strategy order, one `OUT` entry per
    /// batch used.
    ///
    /// ## Errors
    /// - `NoAvailableBatches` when no batch in the scope holds stock
    /// - `InsufficientStock` when all batches together cannot cover the
    ///   quantity, or when the scope balance cannot; nothing is picked in
    ///   either case
    pub async fn pick_stock(&self, ctx: &TenantContext, req: PickRequest) -> DbResult<PickResult> {
        validate_pick(&req)?;
        let scope = req.scope(ctx.tenant_id);
        let strategy = req.strategy.unwrap_or(self.settings.default_strategy);
        let reference_type = req
            .reference_type
            .clone()
            .unwrap_or_else(|| PICKING_REFERENCE_TYPE.to_string());

        let mut tx = self.pool.begin().await?;
        let op = ledger::record_operation(
            &mut tx,
            ctx,
            OperationKind::PickStock,
            Some(&reference_type),
            req.reference_id.as_deref(),
        )
        .await?;

        catalog::ensure_scope(&mut tx, &scope).await?;
        let candidates = batch::available_candidates(
            &mut tx,
            ctx.tenant_id,
            req.product_id,
            VariantFilter::exact(req.variant_id),
            Some(req.branch_id),
            self.expiry_cutoff(),
        )
        .await?;

        let picks = allocate(candidates, req.quantity, strategy);
        if picks.is_empty() {
            warn!(
                tenant_id = ctx.tenant_id,
                product_id = req.product_id,
                branch_id = req.branch_id,
                "No batches available to pick from"
            );
            return Err(CoreError::NoAvailableBatches {
                product_id: req.product_id,
            }
            .into());
        }

        let total = total_picked(&picks);
        if total < req.quantity {
            warn!(
                tenant_id = ctx.tenant_id,
                product_id = req.product_id,
                branch_id = req.branch_id,
                available = %total,
                required = %req.quantity,
                "Rejected pick"
            );
            return Err(CoreError::InsufficientStock {
                available: total,
                required: req.quantity,
            }
            .into());
        }

        let scope_total = ledger::scope_balance(&mut tx, &scope).await?;
        if let Err(err) = ensure_sufficient(scope_total, req.quantity) {
            warn!(
                tenant_id = ctx.tenant_id,
                product_id = req.product_id,
                branch_id = req.branch_id,
                scope_balance = %scope_total,
                required = %req.quantity,
                "Rejected pick beyond scope balance"
            );
            return Err(err.into());
        }

        let batches_used: Vec<BatchPick> = picks
            .into_iter()
            .filter(|pick| pick.pick_quantity.is_positive())
            .collect();

        let date = req.transaction_date.unwrap_or_else(Utc::now);
        let notes = req
            .notes
            .clone()
            .unwrap_or_else(|| format!("Picked using {} strategy", strategy.as_str()));

        let mut entries = Vec::with_capacity(batches_used.len());
        for pick in &batches_used {
            let mut entry = NewLedgerEntry::new(
                &scope,
                TransactionType::Out,
                pick.pick_quantity.as_outbound(),
                date,
            );
            entry.batch_id = Some(pick.batch_id);
            entry.reference_type = Some(reference_type.clone());
            entry.reference_id = req.reference_id.clone();
            entry.actor_id = ctx.user_id;
            entry.notes = Some(notes.clone());
            entries.push(ledger::append_entry(&mut tx, &op.id, &entry).await?);
        }
        tx.commit().await?;

        info!(
            tenant_id = ctx.tenant_id,
            product_id = req.product_id,
            branch_id = req.branch_id,
            quantity = %req.quantity,
            strategy = strategy.as_str(),
            batches = batches_used.len(),
            operation_id = %op.id,
            "Stock picked"
        );

        Ok(PickResult {
            operation_id: op.id,
            strategy,
            batches_used,
            entries,
            total_picked: total,
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Batches with stock for a product in strategy order, with the pick
    /// each would contribute towards `required_quantity`.
    ///
    /// An empty list is a valid answer.
    pub async fn get_available_batches(
        &self,
        ctx: &TenantContext,
        query: AvailableBatchesQuery,
    ) -> DbResult<Vec<BatchPick>> {
        validate_available_batches(&query)?;
        let strategy = query.strategy.unwrap_or(self.settings.default_strategy);

        let mut conn = self.pool.acquire().await?;
        catalog::ensure_product(&mut conn, ctx.tenant_id, query.product_id, query.variant_id).await?;

        let candidates = batch::available_candidates(
            &mut conn,
            ctx.tenant_id,
            query.product_id,
            VariantFilter::optional(query.variant_id),
            query.branch_id,
            self.expiry_cutoff(),
        )
        .await?;

        Ok(allocate(candidates, query.required_quantity, strategy))
    }

    /// One page of a product's movements, newest first.
    pub async fn get_movement_history(
        &self,
        ctx: &TenantContext,
        query: MovementHistoryQuery,
    ) -> DbResult<Page<LedgerEntry>> {
        validate_history(&query)?;
        let page = query.page.unwrap_or(1);
        let per_page = query.per_page.unwrap_or(self.settings.history_page_size);

        let filter = LedgerFilter {
            product_id: Some(query.product_id),
            variant: VariantFilter::optional(query.variant_id),
            branch_id: query.branch_id,
            from: query.start_date.map(start_of_day),
            until: query
                .end_date
                .and_then(|end| end.succ_opt())
                .map(start_of_day),
            order: LedgerOrder::NewestFirst,
            limit: Some(per_page),
            offset: (page - 1).saturating_mul(per_page),
            ..LedgerFilter::tenant(ctx.tenant_id)
        };

        // One read transaction so the count and the page see the same rows
        let mut tx = self.pool.begin().await?;
        catalog::ensure_product(&mut tx, ctx.tenant_id, query.product_id, query.variant_id).await?;
        let total = ledger::count_entries(&mut tx, &filter).await?;
        let items = ledger::query_entries(&mut tx, &filter).await?;
        tx.commit().await?;

        debug!(
            tenant_id = ctx.tenant_id,
            product_id = query.product_id,
            page,
            per_page,
            total,
            "Loaded movement history"
        );

        Ok(Page {
            items,
            page,
            per_page,
            total,
        })
    }

    /// Balance of a product, optionally narrowed to a variant and/or branch.
    ///
    /// `None` means every variant (or branch), not the base product only.
    pub async fn get_stock_balance(
        &self,
        ctx: &TenantContext,
        product_id: i64,
        variant_id: Option<i64>,
        branch_id: Option<i64>,
    ) -> DbResult<StockBalance> {
        let mut conn = self.pool.acquire().await?;
        catalog::ensure_product(&mut conn, ctx.tenant_id, product_id, variant_id).await?;

        let filter = BalanceFilter::product(ctx.tenant_id, product_id)
            .with_variant(VariantFilter::optional(variant_id))
            .with_branch(branch_id);
        let balance = ledger::sum_balance(&mut conn, &filter).await?;

        Ok(StockBalance {
            product_id,
            variant_id,
            branch_id,
            balance,
        })
    }

    /// True when the product has a positive balance (in one branch, or in
    /// total).
    pub async fn is_in_stock(
        &self,
        ctx: &TenantContext,
        product_id: i64,
        branch_id: Option<i64>,
    ) -> DbResult<bool> {
        let balance = self.get_stock_balance(ctx, product_id, None, branch_id).await?;
        Ok(balance.balance.is_positive())
    }

    /// True when the product has a reorder level and its balance has fallen
    /// to or below it.
    pub async fn needs_reorder(
        &self,
        ctx: &TenantContext,
        product_id: i64,
        branch_id: Option<i64>,
    ) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        let product = catalog::ensure_product(&mut conn, ctx.tenant_id, product_id, None).await?;

        let filter = BalanceFilter::product(ctx.tenant_id, product_id).with_branch(branch_id);
        let balance = ledger::sum_balance(&mut conn, &filter).await?;
        Ok(product.needs_reorder(balance))
    }

    /// Compares a scope's summed balance with the running balance stored on
    /// its latest entry.
    pub async fn verify_scope(&self, scope: &ScopeKey) -> DbResult<BalanceCheck> {
        let mut tx = self.pool.begin().await?;
        let summed = ledger::scope_balance(&mut tx, scope).await?;
        let latest = ledger::latest_scope_entry(&mut tx, scope).await?;
        let entry_count = ledger::count_entries(&mut tx, &LedgerFilter::scope(scope)).await?;
        tx.commit().await?;

        let check = BalanceCheck {
            scope: *scope,
            summed,
            latest_running_balance: latest.map(|entry| entry.running_balance),
            entry_count,
        };

        if !check.is_consistent() {
            warn!(
                scope = %scope,
                summed = %check.summed,
                cached = ?check.latest_running_balance,
                "Running balance does not match ledger sum"
            );
        }

        Ok(check)
    }

    /// Batch metadata with its ledger-derived state, using the configured
    /// expiring-soon horizon.
    pub async fn batch_state(&self, ctx: &TenantContext, batch_id: i64) -> DbResult<BatchState> {
        let mut conn = self.pool.acquire().await?;
        let batch = batch::fetch_batch(&mut conn, ctx.tenant_id, batch_id)
            .await?
            .ok_or_else(|| DbError::not_found("Batch", batch_id))?;

        let filter = BalanceFilter {
            batch_id: Some(batch_id),
            ..BalanceFilter::product(ctx.tenant_id, batch.product_id)
        };
        let remaining = ledger::sum_balance(&mut conn, &filter).await?;

        Ok(BatchState::derive(
            batch,
            remaining,
            today(),
            self.settings.expiring_soon_days,
        ))
    }

    /// Batches that expire on or before this date are not offered for
    /// picking.
    fn expiry_cutoff(&self) -> Option<NaiveDate> {
        self.settings.skip_expired_batches.then(today)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Stock an outbound movement may draw on: the named batch's balance in the
/// scope, or the scope's unbatched stock, never more than the scope balance.
async fn outbound_available(
    conn: &mut SqliteConnection,
    scope: &ScopeKey,
    batch_id: Option<i64>,
) -> DbResult<Quantity> {
    let scope_total = ledger::scope_balance(conn, scope).await?;
    let held = match batch_id {
        Some(batch_id) => {
            batch::ensure_batch(conn, scope.tenant_id, batch_id, scope.product_id, scope.variant_id, false)
                .await?;
            ledger::sum_balance(conn, &BalanceFilter::batch(scope, batch_id)).await?
        }
        None => ledger::unbatched_balance(conn, scope).await?,
    };
    Ok(held.min(scope_total))
}

fn movement_entry(
    ctx: &TenantContext,
    scope: &ScopeKey,
    transaction_type: TransactionType,
    quantity: Quantity,
    req: &StockMovementRequest,
) -> NewLedgerEntry {
    let mut entry = NewLedgerEntry::new(
        scope,
        transaction_type,
        quantity,
        req.transaction_date.unwrap_or_else(Utc::now),
    );
    entry.batch_id = req.batch_id;
    entry.unit_cost = req.unit_cost;
    entry.reference_type = req.reference_type.clone();
    entry.reference_id = req.reference_id.clone();
    entry.actor_id = ctx.user_id;
    entry.notes = req.notes.clone();
    entry.metadata = req.metadata.clone();
    entry
}
