//! # Seed Data Generator
//!
//! Provisions a demo tenant and runs every stock operation once, for local
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed using stockbook.toml (or defaults)
//! cargo run -p stockbook-db --bin seed
//!
//! # Specify database path and tenant
//! cargo run -p stockbook-db --bin seed -- --db ./data/stockbook.db --tenant 2
//!
//! # More verbose logging
//! RUST_LOG=debug cargo run -p stockbook-db --bin seed
//! ```
//!
//! ## Generated Data
//! - Two branches: `MAIN` and `WH`
//! - One product per entry in [`PRODUCTS`], with two batches each:
//!   one expiring in 10 days, one in 60 days
//! - A receipt into each batch, a batch transfer to the warehouse, a FEFO
//!   pick, and a stock count adjustment of the transferred batch

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;
use stockbook_core::{
    AdjustmentRequest, MovementHistoryQuery, NewBatch, PickRequest, PickingStrategy, Quantity,
    ScopeKey, StockMovementRequest, TenantContext, TransferRequest,
};
use stockbook_db::{Database, StockbookConfig};
use tracing_subscriber::EnvFilter;

/// (sku, name, reorder level, unit cost in cents)
const PRODUCTS: &[(&str, &str, i64, i64)] = &[
    ("DAIRY-MILK-1L", "Whole Milk 1L", 24, 89),
    ("DAIRY-YOG-500", "Greek Yogurt 500g", 12, 215),
    ("BAKE-BREAD-WW", "Wholewheat Bread", 10, 140),
    ("MEAT-CHK-1KG", "Chicken Breast 1kg", 6, 690),
    ("PHARM-IBU-200", "Ibuprofen 200mg x24", 30, 120),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stockbook=debug,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut db_path: Option<PathBuf> = None;
    let mut tenant_id: i64 = 1;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--tenant" | "-t" => {
                if i + 1 < args.len() {
                    tenant_id = args[i + 1].parse().unwrap_or(1);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("      --config <PATH>  Config file (default: platform config dir)");
                println!("  -d, --db <PATH>      Database file path (overrides config)");
                println!("  -t, --tenant <ID>    Tenant to seed (default: 1)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = StockbookConfig::load_or_default(config_path);
    if let Some(path) = db_path {
        config.database.path = path;
    }

    println!("Stockbook Seed Data Generator");
    println!("=============================");
    println!("Database: {}", config.database.path.display());
    println!("Tenant:   {}", tenant_id);
    println!();

    let db = Database::from_config(&config).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing branches
    let existing = db.catalog().list_branches(tenant_id).await?;
    if !existing.is_empty() {
        println!("⚠ Tenant {} already has {} branches", tenant_id, existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let ctx = TenantContext::new(tenant_id).with_user(1);
    let catalog = db.catalog();
    let stock = db.stock();
    let today = Utc::now().date_naive();

    let main = catalog.create_branch(tenant_id, "MAIN", "Main Store").await?;
    let warehouse = catalog.create_branch(tenant_id, "WH", "Central Warehouse").await?;
    println!("✓ Created branches {} and {}", main.code, warehouse.code);

    println!();
    println!("Receiving stock...");
    let start = std::time::Instant::now();

    let mut product_ids = Vec::with_capacity(PRODUCTS.len());
    let mut first_batches = Vec::new();
    for (idx, (sku, name, reorder, cost_cents)) in PRODUCTS.iter().enumerate() {
        let product = catalog
            .create_product(tenant_id, sku, name, Some(Quantity::from_units(*reorder)))
            .await?;
        product_ids.push(product.id);

        for (suffix, days, units) in [("A", 10, 40), ("B", 60, 25)] {
            let batch = db
                .batches()
                .create(
                    tenant_id,
                    NewBatch::new(product.id, main.id, format!("{}-{:02}{}", sku, idx, suffix))
                        .with_expiry(today + Duration::days(days))
                        .with_lot(format!("LOT-{}{}", idx, suffix)),
                )
                .await?;
            if idx == 0 {
                first_batches.push(batch.id);
            }

            stock
                .add_stock(
                    &ctx,
                    StockMovementRequest::new(main.id, product.id, Quantity::from_units(units))
                        .with_batch(batch.id)
                        .with_unit_cost(Decimal::new(*cost_cents, 2))
                        .with_reference("purchase", format!("PO-{:04}", idx + 1)),
                )
                .await?;
        }

        println!("  {} ({})", name, sku);
    }

    println!();
    println!("Running stock operations...");

    let first = product_ids[0];
    let shipped_batch = first_batches[0];

    let transfer = stock
        .transfer_stock(
            &ctx,
            TransferRequest::new(main.id, warehouse.id, first, Quantity::from_units(15))
                .with_batch(shipped_batch),
        )
        .await?;
    println!(
        "  Transfer: {} → {}, balances {} / {}",
        main.code, warehouse.code, transfer.from_balance, transfer.to_balance
    );

    let pick = stock
        .pick_stock(
            &ctx,
            PickRequest::new(first, main.id, Quantity::from_units(30))
                .with_strategy(PickingStrategy::Fefo)
                .with_reference("sale", "SO-0001"),
        )
        .await?;
    for used in &pick.batches_used {
        println!(
            "  Pick: {} × {} (expires {:?})",
            used.pick_quantity, used.batch_number, used.expiry_date
        );
    }

    let adjustment = stock
        .adjust_stock(
            &ctx,
            AdjustmentRequest::new(warehouse.id, first, Quantity::from_units(14))
                .with_batch(shipped_batch)
                .with_notes("Cycle count: one unit damaged"),
        )
        .await?;
    println!(
        "  Adjust: {} → {} ({})",
        adjustment.old_balance, adjustment.new_balance, adjustment.adjustment
    );

    let elapsed = start.elapsed();
    println!();
    println!("✓ Seeded {} products in {:?}", PRODUCTS.len(), elapsed);

    // Verify the ledger
    println!();
    println!("Verifying ledger...");
    for branch in [&main, &warehouse] {
        let check = stock
            .verify_scope(&ScopeKey::new(tenant_id, first, None, branch.id))
            .await?;
        println!(
            "  {}: balance {}, {} entries, consistent: {}",
            branch.code,
            check.summed,
            check.entry_count,
            check.is_consistent()
        );
    }

    let history = stock
        .get_movement_history(&ctx, MovementHistoryQuery::new(first).page(1, 5))
        .await?;
    println!("  History: {} movements, showing {}", history.total, history.items.len());
    for entry in &history.items {
        println!(
            "    {} {:>10} → {:>10}  {}",
            entry.transaction_type,
            entry.quantity,
            entry.running_balance,
            entry.notes.as_deref().unwrap_or("")
        );
    }

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
