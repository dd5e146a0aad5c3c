//! # stockbook-db: Ledger Storage and Stock Operations Engine
//!
//! SQLite persistence for the stock ledger, built on sqlx, plus the engine
//! that is the only writer of ledger entries.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbook Data Flow                              │
//! │                                                                         │
//! │  Caller (HTTP handler, purchasing, sales, ...)                         │
//! │       │  TenantContext + typed request                                  │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   stockbook-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ StockService  │    │ Repositories  │    │  Migrations  │  │   │
//! │  │   │ (service/)    │───►│ ledger        │    │  (embedded)  │  │   │
//! │  │   │ add / remove  │    │ batch         │    │ 001_initial  │  │   │
//! │  │   │ transfer      │    │ catalog       │    │ 002_ledger   │  │   │
//! │  │   │ adjust / pick │    └───────────────┘    └──────────────┘  │   │
//! │  │   └───────────────┘            │                               │   │
//! │  │           │          ┌───────────────┐                         │   │
//! │  │           └─────────►│   Database    │ SqlitePool (pool.rs)    │   │
//! │  │                      └───────────────┘                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL), path from stockbook.toml or STOCKBOOK_DB_PATH      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `stockbook.toml` loading and environment overrides
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Ledger store, batch registry, catalog
//! - [`service`] - The stock operations engine
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockbook_core::{Quantity, StockMovementRequest, TenantContext};
//! use stockbook_db::{Database, StockbookConfig};
//!
//! let config = StockbookConfig::load_or_default(None);
//! let db = Database::from_config(&config).await?;
//!
//! let ctx = TenantContext::new(1).with_user(42);
//! let result = db
//!     .stock()
//!     .add_stock(&ctx, StockMovementRequest::new(1, 7, Quantity::from_units(100)))
//!     .await?;
//! println!("new balance: {}", result.new_balance);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DatabaseSettings, StockSettings, StockbookConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use service::StockService;

// Repository re-exports for convenience
pub use repository::batch::BatchRepository;
pub use repository::catalog::CatalogRepository;
pub use repository::ledger::LedgerRepository;
