//! Data models
//!
//! Shared between the engine and its callers.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY); timestamps are UTC
//! epoch milliseconds.

pub mod cart;
pub mod discount_code;
pub mod gift_card;
pub mod inventory;

// Re-exports
pub use cart::*;
pub use discount_code::*;
pub use gift_card::*;
pub use inventory::*;
