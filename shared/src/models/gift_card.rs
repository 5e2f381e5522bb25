//! Gift Card Models

use serde::{Deserialize, Serialize};

/// Gift card lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum GiftCardStatus {
    Active,
    /// Balance hit zero through redemption
    Used,
    Disabled,
    Expired,
}

impl std::fmt::Display for GiftCardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Used => "used",
            Self::Disabled => "disabled",
            Self::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

/// Ledger entry type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum TransactionType {
    /// Top-up beyond the initial value
    Issue,
    /// Checkout spend; amount is negative
    Redemption,
    /// Saga compensation or customer refund; amount is positive
    Refund,
    /// Manual correction; signed
    Adjustment,
}

/// Gift card entity
///
/// `current_balance` is a projection of the transaction ledger — it is only
/// ever written inside the same transaction as a ledger append, and
/// `initial_value + Σ(transaction.amount)` must reproduce it exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct GiftCard {
    pub id: i64,
    /// Unique, matched case-insensitively
    pub code: String,
    pub initial_value: f64,
    pub current_balance: f64,
    pub currency: String,
    pub status: GiftCardStatus,
    /// Purchaser
    pub customer_id: Option<i64>,
    /// Named recipient, when gifted to someone else
    pub recipient_id: Option<i64>,
    pub expires_at: Option<i64>,
    pub created_at: i64,
    /// Bumped on every balance move; doubles as the optimistic row version
    /// carried in validation tokens
    pub updated_at: i64,
}

/// Immutable append-only ledger row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct GiftCardTransaction {
    pub id: i64,
    pub gift_card_id: i64,
    /// None for non-order adjustments
    pub order_id: Option<i64>,
    pub transaction_type: TransactionType,
    /// Signed: negative for redemption
    pub amount: f64,
    pub created_at: i64,
}
