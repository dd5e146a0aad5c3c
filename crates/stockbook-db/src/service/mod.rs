//! # Services
//!
//! Multi-repository workflows that need a transaction boundary.
//!
//! - [`StockService`] - The stock operations engine (add, remove, transfer,
//!   adjust, pick) plus balance and history reads

pub mod stock;

pub use stock::StockService;
