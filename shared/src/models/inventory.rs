//! Product Variant & Inventory Models

use serde::{Deserialize, Serialize};

/// Oversell policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum InventoryPolicy {
    /// Allow selling past on-hand stock (tracked as backorder)
    Continue,
    /// Hard stop at zero available-to-sell
    Deny,
}

/// Sellable product variant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ProductVariant {
    pub id: i64,
    pub product_id: i64,
    pub sku: Option<String>,
    /// On-hand total across locations; decremented on fulfilment
    pub inventory_quantity: i64,
    pub inventory_policy: InventoryPolicy,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Per-location stock counters for a variant.
///
/// Invariant: `committed <= available` unless the variant's policy is
/// `Continue`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct InventoryLevel {
    pub id: i64,
    pub variant_id: i64,
    pub location_id: i64,
    /// On-hand at this location
    pub available: i64,
    /// Reserved by in-flight orders
    pub committed: i64,
    /// Inbound stock not yet received
    pub incoming: i64,
    pub updated_at: i64,
}

/// Handle returned by a successful reserve; required to release or fulfil.
///
/// There is no expiry: an abandoned order must release its reservations
/// through the caller's compensation path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub variant_id: i64,
    pub location_id: i64,
    pub quantity: i64,
    pub order_id: Option<i64>,
}
