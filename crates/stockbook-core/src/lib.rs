//! # stockbook-core: Pure Stock Ledger Logic
//!
//! This crate contains the domain logic of the inventory stock ledger as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbook Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │         Callers (HTTP controllers, procurement, sales)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ typed requests                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │       stockbook-db: StockService (transactions, ledger store)   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stockbook-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  quantity │  │   types   │  │allocation │  │ validation│  │   │
//! │  │   │ fixed-pt  │  │  ledger   │  │ FIFO/FEFO │  │   rules   │  │   │
//! │  │   │  decimal  │  │  batches  │  │  greedy   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`quantity`] - Fixed-point quantity (4 decimal places, exact sums)
//! - [`types`] - Ledger entries, batches, scopes, catalog records
//! - [`operations`] - Typed request/response structs per stock operation
//! - [`allocation`] - FIFO/FEFO batch allocator
//! - [`balance`] - Running balance arithmetic
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stockbook_core::balance::{ensure_sufficient, running_balance_after};
//! use stockbook_core::{CoreError, Quantity};
//!
//! let balance = running_balance_after(Quantity::ZERO, Quantity::from_units(100)).unwrap();
//! let balance = running_balance_after(balance, Quantity::from_units(-30)).unwrap();
//! assert_eq!(balance.to_string(), "70");
//!
//! let err = ensure_sufficient(balance, Quantity::from_units(80)).unwrap_err();
//! assert!(matches!(err, CoreError::InsufficientStock { .. }));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod balance;
pub mod error;
pub mod operations;
pub mod quantity;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use allocation::{BatchCandidate, BatchPick};
pub use error::{CoreError, CoreResult, ValidationError};
pub use operations::*;
pub use quantity::{Quantity, MAX_QUANTITY};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Movement history page size when neither the caller nor config sets one.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page a history query may request.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Default horizon for "expiring soon" batch reports.
pub const DEFAULT_EXPIRING_SOON_DAYS: u32 = 30;

/// Reference type stamped on transfers that do not name one.
pub const TRANSFER_REFERENCE_TYPE: &str = "transfer";

/// Reference type stamped on picks that do not name one.
pub const PICKING_REFERENCE_TYPE: &str = "picking";

/// Maximum length of reference type / id values.
pub const MAX_REFERENCE_LENGTH: usize = 100;

/// Maximum length of free-text notes.
pub const MAX_NOTES_LENGTH: usize = 1000;
