//! End-to-end behaviour of the stock operations engine against SQLite.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::path::PathBuf;
use stockbook_core::balance::replay;
use stockbook_core::{
    AdjustmentRequest, AvailableBatchesQuery, CoreError, LedgerFilter, MovementHistoryQuery,
    NewBatch, PickRequest, PickingStrategy, Quantity, ScopeKey, StockMovementRequest,
    TenantContext, TransactionType, TransferRequest, ValidationError, MAX_QUANTITY,
};
use stockbook_db::{Database, DbConfig, DbError};
use uuid::Uuid;

const TENANT: i64 = 1;

struct Fixture {
    db: Database,
    ctx: TenantContext,
    branch_id: i64,
    warehouse_id: i64,
    product_id: i64,
}

impl Fixture {
    async fn new() -> Self {
        Self::with_database(Database::new(DbConfig::in_memory()).await.unwrap()).await
    }

    async fn with_database(db: Database) -> Self {
        let catalog = db.catalog();
        let branch = catalog.create_branch(TENANT, "B1", "Branch 1").await.unwrap();
        let warehouse = catalog.create_branch(TENANT, "WH", "Warehouse").await.unwrap();
        let product = catalog
            .create_product(TENANT, "SKU-7", "Product 7", None)
            .await
            .unwrap();

        Fixture {
            db,
            ctx: TenantContext::new(TENANT).with_user(5),
            branch_id: branch.id,
            warehouse_id: warehouse.id,
            product_id: product.id,
        }
    }

    fn scope(&self, branch_id: i64) -> ScopeKey {
        ScopeKey::new(TENANT, self.product_id, None, branch_id)
    }

    async fn balance(&self, branch_id: i64) -> Quantity {
        self.db
            .stock()
            .get_stock_balance(&self.ctx, self.product_id, None, Some(branch_id))
            .await
            .unwrap()
            .balance
    }

    async fn entry_count(&self) -> u64 {
        self.db.ledger().count(&LedgerFilter::tenant(TENANT)).await.unwrap()
    }

    async fn add(&self, branch_id: i64, n: i64) {
        self.db
            .stock()
            .add_stock(&self.ctx, StockMovementRequest::new(branch_id, self.product_id, units(n)))
            .await
            .unwrap();
    }

    async fn batch_with_stock(&self, number: &str, expiry_days: Option<i64>, n: i64) -> i64 {
        let mut new = NewBatch::new(self.product_id, self.branch_id, number);
        if let Some(days) = expiry_days {
            new = new.with_expiry(Utc::now().date_naive() + Duration::days(days));
        }
        let batch = self.db.batches().create(TENANT, new).await.unwrap();
        self.db
            .stock()
            .add_stock(
                &self.ctx,
                StockMovementRequest::new(self.branch_id, self.product_id, units(n)).with_batch(batch.id),
            )
            .await
            .unwrap();
        batch.id
    }
}

fn units(n: i64) -> Quantity {
    Quantity::from_units(n)
}

// =============================================================================
// Concrete scenario
// =============================================================================

#[tokio::test]
async fn add_then_remove_leaves_seventy() {
    let fx = Fixture::new().await;
    fx.add(fx.branch_id, 100).await;
    fx.db
        .stock()
        .remove_stock(&fx.ctx, StockMovementRequest::new(fx.branch_id, fx.product_id, units(30)))
        .await
        .unwrap();

    assert_eq!(fx.balance(fx.branch_id).await, units(70));

    let entries = fx
        .db
        .ledger()
        .query(&LedgerFilter::scope(&fx.scope(fx.branch_id)))
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].transaction_type, TransactionType::In);
    assert_eq!(entries[1].transaction_type, TransactionType::Out);
}

// =============================================================================
// Balance consistency
// =============================================================================

#[tokio::test]
async fn running_balances_replay_from_quantities() {
    let fx = Fixture::new().await;
    let stock = fx.db.stock();

    fx.add(fx.branch_id, 40).await;
    stock
        .remove_stock(&fx.ctx, StockMovementRequest::new(fx.branch_id, fx.product_id, units(15)))
        .await
        .unwrap();
    stock
        .transfer_stock(
            &fx.ctx,
            TransferRequest::new(fx.branch_id, fx.warehouse_id, fx.product_id, units(5)),
        )
        .await
        .unwrap();
    stock
        .adjust_stock(&fx.ctx, AdjustmentRequest::new(fx.branch_id, fx.product_id, units(30)))
        .await
        .unwrap();
    fx.add(fx.branch_id, 2).await;

    let scope = fx.scope(fx.branch_id);
    let entries = fx.db.ledger().query(&LedgerFilter::scope(&scope)).await.unwrap();
    let quantities: Vec<Quantity> = entries.iter().map(|e| e.quantity).collect();
    let cached: Vec<Quantity> = entries.iter().map(|e| e.running_balance).collect();

    assert_eq!(cached, replay(Quantity::ZERO, &quantities).unwrap());
    assert_eq!(fx.balance(fx.branch_id).await, units(32));

    let check = stock.verify_scope(&scope).await.unwrap();
    assert!(check.is_consistent());
    assert_eq!(check.summed, units(32));
    assert_eq!(check.entry_count, 5);
}

#[tokio::test]
async fn aggregate_balance_spans_branches() {
    let fx = Fixture::new().await;
    fx.add(fx.branch_id, 10).await;
    fx.add(fx.warehouse_id, 7).await;

    let total = fx
        .db
        .stock()
        .get_stock_balance(&fx.ctx, fx.product_id, None, None)
        .await
        .unwrap();
    assert_eq!(total.balance, units(17));
    assert_eq!(total.branch_id, None);
}

// =============================================================================
// Immutability
// =============================================================================

#[tokio::test]
async fn entries_cannot_be_changed() {
    let fx = Fixture::new().await;
    fx.add(fx.branch_id, 10).await;

    let ledger = fx.db.ledger();
    let entry = ledger
        .latest_entry(&fx.scope(fx.branch_id))
        .await
        .unwrap()
        .unwrap();

    assert!(matches!(
        ledger.update(&entry).await,
        Err(DbError::Core(CoreError::ImmutabilityViolation { .. }))
    ));
    assert!(matches!(
        ledger.delete(TENANT, entry.id).await,
        Err(DbError::Core(CoreError::ImmutabilityViolation { .. }))
    ));

    let raw = sqlx::query("UPDATE stock_ledger SET running_balance = 0")
        .execute(fx.db.pool())
        .await
        .unwrap_err();
    assert!(matches!(
        DbError::from(raw),
        DbError::Core(CoreError::ImmutabilityViolation { .. })
    ));

    assert_eq!(ledger.get(TENANT, entry.id).await.unwrap(), Some(entry));
}

// =============================================================================
// Non-negativity
// =============================================================================

#[tokio::test]
async fn overdraw_is_rejected_without_writes() {
    let fx = Fixture::new().await;
    fx.add(fx.branch_id, 10).await;
    let before = fx.entry_count().await;

    let err = fx
        .db
        .stock()
        .remove_stock(&fx.ctx, StockMovementRequest::new(fx.branch_id, fx.product_id, units(11)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DbError::Core(CoreError::InsufficientStock { available, required })
            if available == units(10) && required == units(11)
    ));
    assert_eq!(fx.entry_count().await, before);
    assert_eq!(fx.balance(fx.branch_id).await, units(10));
}

#[tokio::test]
async fn batch_removal_checks_the_batch_balance() {
    let fx = Fixture::new().await;
    let batch_id = fx.batch_with_stock("LOT-A", None, 4).await;
    fx.add(fx.branch_id, 100).await;

    let err = fx
        .db
        .stock()
        .remove_stock(
            &fx.ctx,
            StockMovementRequest::new(fx.branch_id, fx.product_id, units(5)).with_batch(batch_id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { .. })));
}

#[tokio::test]
async fn concurrent_removals_never_overdraw() {
    let path: PathBuf = std::env::temp_dir().join(format!("stockbook-{}.db", Uuid::new_v4()));
    let db = Database::new(DbConfig::new(&path).max_connections(8)).await.unwrap();
    let fx = Fixture::with_database(db).await;
    fx.add(fx.branch_id, 10).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let stock = fx.db.stock();
        let ctx = fx.ctx;
        let req = StockMovementRequest::new(fx.branch_id, fx.product_id, units(3));
        handles.push(tokio::spawn(async move { stock.remove_stock(&ctx, req).await }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(DbError::Core(CoreError::InsufficientStock { .. })) => {}
            Err(err) => assert!(err.is_retryable(), "unexpected error: {}", err),
        }
    }

    let balance = fx.balance(fx.branch_id).await;
    assert!(succeeded <= 3);
    assert!(balance >= Quantity::ZERO);
    assert_eq!(balance, units(10 - 3 * succeeded));

    let check = fx.db.stock().verify_scope(&fx.scope(fx.branch_id)).await.unwrap();
    assert!(check.is_consistent());

    fx.db.close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}

// =============================================================================
// Batched and unbatched stock in one scope
// =============================================================================

#[tokio::test]
async fn unbatched_removal_cannot_take_batched_stock() {
    let fx = Fixture::new().await;
    let lot = fx.batch_with_stock("LOT", None, 10).await;
    let stock = fx.db.stock();

    let err = stock
        .remove_stock(&fx.ctx, StockMovementRequest::new(fx.branch_id, fx.product_id, units(10)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::Core(CoreError::InsufficientStock { available, required })
            if available == Quantity::ZERO && required == units(10)
    ));

    let err = stock
        .transfer_stock(
            &fx.ctx,
            TransferRequest::new(fx.branch_id, fx.warehouse_id, fx.product_id, units(1)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { .. })));

    // The batch is still whole, so the pick takes all of it exactly once
    let picked = stock
        .pick_stock(&fx.ctx, PickRequest::new(fx.product_id, fx.branch_id, units(10)))
        .await
        .unwrap();
    assert_eq!(picked.entries.len(), 1);
    assert_eq!(picked.entries[0].batch_id, Some(lot));
    assert_eq!(fx.balance(fx.branch_id).await, Quantity::ZERO);
}

#[tokio::test]
async fn mixed_scope_draws_each_portion_separately() {
    let fx = Fixture::new().await;
    fx.batch_with_stock("LOT", None, 10).await;
    fx.add(fx.branch_id, 5).await;
    let stock = fx.db.stock();

    let err = stock
        .remove_stock(&fx.ctx, StockMovementRequest::new(fx.branch_id, fx.product_id, units(6)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::Core(CoreError::InsufficientStock { available, .. }) if available == units(5)
    ));

    stock
        .remove_stock(&fx.ctx, StockMovementRequest::new(fx.branch_id, fx.product_id, units(5)))
        .await
        .unwrap();
    stock
        .pick_stock(&fx.ctx, PickRequest::new(fx.product_id, fx.branch_id, units(10)))
        .await
        .unwrap();

    assert_eq!(fx.balance(fx.branch_id).await, Quantity::ZERO);
    let check = stock.verify_scope(&fx.scope(fx.branch_id)).await.unwrap();
    assert!(check.is_consistent());
}

#[tokio::test]
async fn pick_never_takes_scope_below_zero() {
    let fx = Fixture::new().await;
    let lot = fx.batch_with_stock("LOT", None, 10).await;
    let stock = fx.db.stock();

    // A scope-level count of zero leaves the batch rows untouched
    stock
        .adjust_stock(&fx.ctx, AdjustmentRequest::new(fx.branch_id, fx.product_id, Quantity::ZERO))
        .await
        .unwrap();
    assert_eq!(fx.balance(fx.branch_id).await, Quantity::ZERO);
    let before = fx.entry_count().await;

    let err = stock
        .pick_stock(&fx.ctx, PickRequest::new(fx.product_id, fx.branch_id, units(10)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::Core(CoreError::InsufficientStock { available, required })
            if available == Quantity::ZERO && required == units(10)
    ));

    let err = stock
        .remove_stock(
            &fx.ctx,
            StockMovementRequest::new(fx.branch_id, fx.product_id, units(1)).with_batch(lot),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { .. })));

    let err = stock
        .adjust_stock(
            &fx.ctx,
            AdjustmentRequest::new(fx.branch_id, fx.product_id, Quantity::ZERO).with_batch(lot),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { .. })));

    assert_eq!(fx.entry_count().await, before);
    assert_eq!(fx.balance(fx.branch_id).await, Quantity::ZERO);
}

// =============================================================================
// Magnitude limits
// =============================================================================

#[tokio::test]
async fn balances_stop_at_the_storable_maximum() {
    let fx = Fixture::new().await;
    let stock = fx.db.stock();

    stock
        .add_stock(&fx.ctx, StockMovementRequest::new(fx.branch_id, fx.product_id, MAX_QUANTITY))
        .await
        .unwrap();
    let before = fx.entry_count().await;

    let err = stock
        .add_stock(&fx.ctx, StockMovementRequest::new(fx.branch_id, fx.product_id, units(1)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::Core(CoreError::Validation(ValidationError::OutOfRange { .. }))
    ));

    let too_large = Quantity::from_raw(MAX_QUANTITY.raw() + 1);
    let err = stock
        .add_stock(&fx.ctx, StockMovementRequest::new(fx.warehouse_id, fx.product_id, too_large))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::Core(CoreError::Validation(ValidationError::OutOfRange { .. }))
    ));

    assert_eq!(fx.entry_count().await, before);
    assert_eq!(fx.balance(fx.branch_id).await, MAX_QUANTITY);
}

#[tokio::test]
async fn overflowing_total_cost_is_rejected() {
    let fx = Fixture::new().await;

    let err = fx
        .db
        .stock()
        .add_stock(
            &fx.ctx,
            StockMovementRequest::new(fx.branch_id, fx.product_id, units(1_000_000))
                .with_unit_cost(Decimal::MAX),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DbError::Core(CoreError::Validation(ValidationError::OutOfRange { ref field, .. }))
            if field == "total_cost"
    ));
    assert_eq!(fx.entry_count().await, 0);
}

// =============================================================================
// Transfers
// =============================================================================

#[tokio::test]
async fn transfer_conserves_stock() {
    let fx = Fixture::new().await;
    fx.add(fx.branch_id, 20).await;
    fx.add(fx.warehouse_id, 3).await;
    let before = fx.entry_count().await;

    let result = fx
        .db
        .stock()
        .transfer_stock(
            &fx.ctx,
            TransferRequest::new(fx.branch_id, fx.warehouse_id, fx.product_id, units(8))
                .with_reference("transfer_order", "TO-1"),
        )
        .await
        .unwrap();

    assert_eq!(fx.balance(fx.branch_id).await, units(12));
    assert_eq!(fx.balance(fx.warehouse_id).await, units(11));
    assert_eq!(result.from_balance, units(12));
    assert_eq!(result.to_balance, units(11));
    assert_eq!(fx.entry_count().await, before + 2);

    let paired = fx
        .db
        .ledger()
        .find_by_operation(TENANT, &result.operation_id)
        .await
        .unwrap();
    assert_eq!(paired.len(), 2);
    assert!(paired.iter().all(|e| e.transaction_type == TransactionType::Transfer));
    assert_eq!(paired[0].quantity + paired[1].quantity, Quantity::ZERO);

    let by_reference = fx
        .db
        .ledger()
        .find_by_reference(TENANT, "transfer_order", "TO-1")
        .await
        .unwrap();
    assert_eq!(by_reference.len(), 2);
}

#[tokio::test]
async fn short_transfer_writes_nothing() {
    let fx = Fixture::new().await;
    fx.add(fx.branch_id, 2).await;
    let before = fx.entry_count().await;

    let err = fx
        .db
        .stock()
        .transfer_stock(
            &fx.ctx,
            TransferRequest::new(fx.branch_id, fx.warehouse_id, fx.product_id, units(3)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { .. })));
    assert_eq!(fx.entry_count().await, before);
    assert_eq!(fx.balance(fx.warehouse_id).await, Quantity::ZERO);
}

// =============================================================================
// Adjustments
// =============================================================================

#[tokio::test]
async fn repeated_adjustment_is_a_zero_delta() {
    let fx = Fixture::new().await;
    fx.add(fx.branch_id, 9).await;
    let stock = fx.db.stock();

    let first = stock
        .adjust_stock(&fx.ctx, AdjustmentRequest::new(fx.branch_id, fx.product_id, units(12)))
        .await
        .unwrap();
    assert_eq!(first.adjustment, units(3));

    let before = fx.entry_count().await;
    let second = stock
        .adjust_stock(&fx.ctx, AdjustmentRequest::new(fx.branch_id, fx.product_id, units(12)))
        .await
        .unwrap();

    assert_eq!(second.entry.quantity, Quantity::ZERO);
    assert_eq!(second.old_balance, units(12));
    assert_eq!(second.new_balance, units(12));
    assert_eq!(fx.entry_count().await, before + 1);
    assert_eq!(fx.balance(fx.branch_id).await, units(12));
}

// =============================================================================
// Batch allocation and picking
// =============================================================================

#[tokio::test]
async fn fefo_orders_by_expiry_with_undated_last() {
    let fx = Fixture::new().await;
    let b1 = fx.batch_with_stock("B1", Some(10), 5).await;
    let b2 = fx.batch_with_stock("B2", Some(5), 5).await;
    let b3 = fx.batch_with_stock("B3", None, 5).await;

    let picks = fx
        .db
        .stock()
        .get_available_batches(
            &fx.ctx,
            AvailableBatchesQuery::new(fx.product_id)
                .in_branch(fx.branch_id)
                .requiring(units(8))
                .with_strategy(PickingStrategy::Fefo),
        )
        .await
        .unwrap();

    let order: Vec<i64> = picks.iter().map(|p| p.batch_id).collect();
    let quantities: Vec<Quantity> = picks.iter().map(|p| p.pick_quantity).collect();
    assert_eq!(order, vec![b2, b1, b3]);
    assert_eq!(quantities, vec![units(5), units(3), Quantity::ZERO]);
    assert!(picks.iter().all(|p| p.available_quantity == units(5)));
}

#[tokio::test]
async fn fifo_follows_receipt_order() {
    let fx = Fixture::new().await;
    let b1 = fx.batch_with_stock("B1", Some(30), 4).await;
    let b2 = fx.batch_with_stock("B2", Some(2), 4).await;
    let b3 = fx.batch_with_stock("B3", None, 4).await;

    let picks = fx
        .db
        .stock()
        .get_available_batches(
            &fx.ctx,
            AvailableBatchesQuery::new(fx.product_id).with_strategy(PickingStrategy::Fifo),
        )
        .await
        .unwrap();

    let order: Vec<i64> = picks.iter().map(|p| p.batch_id).collect();
    assert_eq!(order, vec![b1, b2, b3]);
    // Zero required lists everything available
    assert!(picks.iter().all(|p| p.pick_quantity == p.available_quantity));
}

#[tokio::test]
async fn pick_spans_batches_and_drains_them() {
    let fx = Fixture::new().await;
    let soon = fx.batch_with_stock("SOON", Some(3), 6).await;
    let later = fx.batch_with_stock("LATER", Some(40), 6).await;

    let result = fx
        .db
        .stock()
        .pick_stock(
            &fx.ctx,
            PickRequest::new(fx.product_id, fx.branch_id, units(8)).with_reference("sale", "SO-9"),
        )
        .await
        .unwrap();

    assert_eq!(result.total_picked, units(8));
    assert_eq!(result.entries.len(), 2);
    assert_eq!(result.entries[0].batch_id, Some(soon));
    assert_eq!(result.entries[0].quantity, units(-6));
    assert_eq!(result.entries[1].batch_id, Some(later));
    assert_eq!(result.entries[1].quantity, units(-2));

    assert_eq!(fx.db.batches().remaining(TENANT, soon).await.unwrap(), Quantity::ZERO);
    assert_eq!(fx.db.batches().remaining(TENANT, later).await.unwrap(), units(4));
    assert_eq!(fx.balance(fx.branch_id).await, units(4));

    let ops = fx
        .db
        .ledger()
        .find_operations_by_reference(TENANT, "sale", "SO-9")
        .await
        .unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].id, result.operation_id);
}

#[tokio::test]
async fn short_pick_writes_nothing() {
    let fx = Fixture::new().await;
    fx.batch_with_stock("ONLY", Some(20), 5).await;
    let before = fx.entry_count().await;

    let err = fx
        .db
        .stock()
        .pick_stock(&fx.ctx, PickRequest::new(fx.product_id, fx.branch_id, units(8)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DbError::Core(CoreError::InsufficientStock { available, required })
            if available == units(5) && required == units(8)
    ));
    assert_eq!(fx.entry_count().await, before);
}

#[tokio::test]
async fn deactivated_batches_are_not_offered() {
    let fx = Fixture::new().await;
    let withdrawn = fx.batch_with_stock("RECALLED", Some(20), 5).await;
    fx.db.batches().deactivate(TENANT, withdrawn).await.unwrap();

    let err = fx
        .db
        .stock()
        .pick_stock(&fx.ctx, PickRequest::new(fx.product_id, fx.branch_id, units(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::NoAvailableBatches { .. })));
}

// =============================================================================
// Movement history
// =============================================================================

#[tokio::test]
async fn history_is_newest_first_and_paged() {
    let fx = Fixture::new().await;
    let stock = fx.db.stock();
    let now = Utc::now();

    for (days_ago, n) in [(3, 10), (2, 20), (1, 30)] {
        stock
            .add_stock(
                &fx.ctx,
                StockMovementRequest::new(fx.branch_id, fx.product_id, units(n))
                    .with_transaction_date(now - Duration::days(days_ago)),
            )
            .await
            .unwrap();
    }

    let page = stock
        .get_movement_history(
            &fx.ctx,
            MovementHistoryQuery::new(fx.product_id)
                .in_branch(fx.branch_id)
                .page(1, 2),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.total_pages(), 2);
    let quantities: Vec<Quantity> = page.items.iter().map(|e| e.quantity).collect();
    assert_eq!(quantities, vec![units(30), units(20)]);

    let window_day = (now - Duration::days(2)).date_naive();
    let window = stock
        .get_movement_history(
            &fx.ctx,
            MovementHistoryQuery::new(fx.product_id).between(Some(window_day), Some(window_day)),
        )
        .await
        .unwrap();
    assert_eq!(window.total, 1);
    assert_eq!(window.items[0].quantity, units(20));
}
