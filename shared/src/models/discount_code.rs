//! Discount Code Models

use serde::{Deserialize, Serialize};

/// Discount kind
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum DiscountKind {
    /// `value` is a percentage of the cart total
    Percentage,
    /// `value` is a flat amount, capped at the cart total
    FixedAmount,
    /// Buy `buy_quantity`, get `get_quantity` at `get_discount_percent` off
    BuyXGetY,
    /// Waives shipping; carries no amount of its own
    FreeShipping,
}

/// What a code applies to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum AppliesTo {
    All,
    SpecificProducts,
    SpecificCollections,
}

/// Discount target type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum DiscountTargetType {
    Product,
    Collection,
}

/// Discount code entity
///
/// `usage_count` is monotonic: it only moves through a committed redemption
/// (or its compensation) and never exceeds `usage_limit` when one is set.
/// Codes are never hard-deleted, only deactivated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct DiscountCode {
    pub id: i64,
    /// Unique, matched case-insensitively
    pub code: String,
    pub description: Option<String>,
    pub kind: DiscountKind,
    pub value: f64,
    pub buy_quantity: Option<i32>,
    pub get_quantity: Option<i32>,
    pub get_discount_percent: Option<f64>,
    pub applies_to: AppliesTo,
    pub minimum_purchase_amount: Option<f64>,
    /// Global cap; None = unlimited
    pub usage_limit: Option<i64>,
    pub usage_limit_per_customer: Option<i64>,
    pub usage_count: i64,
    pub starts_at: Option<i64>,
    /// Exclusive: the code is expired the instant `now == ends_at`
    pub ends_at: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Product/collection scope row for a code (only read when `applies_to`
/// is not `All`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct DiscountTarget {
    pub id: i64,
    pub discount_code_id: i64,
    pub target_type: DiscountTargetType,
    pub target_id: i64,
}

/// Immutable usage ledger row — one per committed redemption.
///
/// This table, not any cached counter, is the authoritative source for
/// per-customer limit checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct DiscountUsage {
    pub id: i64,
    pub discount_code_id: i64,
    pub order_id: i64,
    pub customer_id: i64,
    pub discount_amount: f64,
    pub created_at: i64,
}

/// Successful validation output: certifies eligibility and carries the rule
/// parameters plus the amount computed from them. Pricing proper stays with
/// the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountGrant {
    pub discount_code_id: i64,
    pub code: String,
    pub description: Option<String>,
    pub kind: DiscountKind,
    pub value: f64,
    pub buy_quantity: Option<i32>,
    pub get_quantity: Option<i32>,
    pub get_discount_percent: Option<f64>,
    /// Percentage/fixed amount resolved against the cart total; zero for
    /// free-shipping and buy-x-get-y (those resolve in the caller's pricing)
    pub discount_amount: f64,
    /// `usage_count` observed at validation time — the staleness marker the
    /// commit re-checks against live state
    pub observed_usage_count: i64,
}
