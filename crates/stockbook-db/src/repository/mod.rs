//! # Repository Module
//!
//! Database access for the stock ledger, batch registry and catalog.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  StockService (service/stock.rs)                                        │
//! │       │                                                                 │
//! │       │  one transaction per operation,                                 │
//! │       │  calls the pub(crate) connection-level helpers below            │
//! │       ▼                                                                 │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────┐     │
//! │  │ LedgerRepository │  │ BatchRepository  │  │CatalogRepository │     │
//! │  │  record_operation│  │  ensure_batch    │  │  ensure_scope    │     │
//! │  │  append_entry    │  │  available_      │  │  ensure_product  │     │
//! │  │  scope_balance   │  │   candidates     │  │  ensure_branch   │     │
//! │  └──────────────────┘  └──────────────────┘  └──────────────────┘     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (stock_operations, stock_ledger, batches, catalog tables)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Public repository methods run against the pool. The helpers take a
//! `&mut SqliteConnection` so they compose inside a transaction.
//!
//! ## Available Repositories
//!
//! - [`LedgerRepository`](ledger::LedgerRepository) - Ledger reads and operation journal
//! - [`BatchRepository`](batch::BatchRepository) - Batch metadata and expiry reports
//! - [`CatalogRepository`](catalog::CatalogRepository) - Branches, products, variants

use sqlx::{QueryBuilder, Sqlite};
use stockbook_core::VariantFilter;

pub mod batch;
pub mod catalog;
pub mod ledger;

/// Appends the variant condition for `column`.
pub(crate) fn push_variant_filter<'args>(
    qb: &mut QueryBuilder<'args, Sqlite>,
    column: &str,
    variant: VariantFilter,
) {
    match variant {
        VariantFilter::Any => {}
        VariantFilter::Base => {
            qb.push(format!(" AND {} IS NULL", column));
        }
        VariantFilter::Exact(variant_id) => {
            qb.push(format!(" AND {} = ", column)).push_bind(variant_id);
        }
    }
}
