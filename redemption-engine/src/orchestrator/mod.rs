//! Redemption Orchestrator
//!
//! The two-phase coordinator. Each redemption attempt moves through
//! `Proposed → Validated → Committed | Rejected`, independently per
//! discount code, gift card, or inventory line:
//!
//! - `validate_*` runs the relevant validator against a read snapshot and
//!   returns a [`ValidationToken`] pinning the versions it observed
//!   (`usage_count`, `current_balance` + row version, `committed`). The
//!   token holds no lock and may be stale by commit time — that is
//!   expected.
//! - `commit` is the sole authority: one atomic unit per object whose
//!   conditional write re-checks the live invariant. A guard that loses the
//!   race surfaces as [`RedemptionError::Conflict`], always retryable,
//!   never swallowed.
//!
//! Cross-object atomicity for an order (discount + gift card + inventory
//! together) is the caller's saga: `commit_all` reports independent
//! per-object outcomes, and the compensation primitives
//! (`cancel_discount`, `refund_gift_card`, `release_reservation`) undo the
//! pieces that did land.

use crate::db::repository::discount::DiscountCommitOutcome;
use crate::db::repository::{discount, gift_card, inventory};
use crate::money;
use crate::validators;
use serde::{Deserialize, Serialize};
use shared::models::{
    AppliesTo, Cart, DiscountGrant, DiscountUsage, GiftCard, GiftCardTransaction, Reservation,
    TransactionType,
};
use shared::{RedemptionError, RedemptionResult};
use sqlx::SqlitePool;

/// Lifecycle of a single redemption attempt
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedemptionState {
    Proposed,
    Validated,
    Committed,
    Rejected,
}

/// Opaque snapshot-version carried from validate to commit.
///
/// The observed fields exist for staleness diagnostics; the commit's own
/// conditional check is the actual guarantee, not the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ValidationToken {
    Discount {
        discount_code_id: i64,
        customer_id: i64,
        discount_amount: f64,
        usage_limit_per_customer: Option<i64>,
        observed_usage_count: i64,
    },
    GiftCard {
        gift_card_id: i64,
        amount: f64,
        observed_balance: f64,
        observed_version: i64,
    },
    Inventory {
        variant_id: i64,
        location_id: i64,
        quantity: i64,
        observed_committed: i64,
    },
}

/// Successful discount validation
#[derive(Debug, Clone)]
pub struct ValidatedDiscount {
    pub grant: DiscountGrant,
    pub token: ValidationToken,
}

/// Successful gift card validation
#[derive(Debug, Clone)]
pub struct ValidatedGiftCard {
    pub card: GiftCard,
    /// min(balance, cart total) — the amount the token will redeem
    pub amount_to_apply: f64,
    pub token: ValidationToken,
}

/// Successful inventory validation
#[derive(Debug, Clone)]
pub struct ValidatedInventory {
    /// Sellable quantity observed; None = unbounded (`Continue` policy)
    pub available_to_sell: Option<i64>,
    pub token: ValidationToken,
}

/// What a successful commit produced
#[derive(Debug, Clone)]
pub enum Committed {
    Discount(DiscountUsage),
    GiftCard(GiftCardTransaction),
    Inventory(Reservation),
}

/// Per-object outcome from `commit_all`, for the caller's saga
#[derive(Debug)]
pub struct CommitOutcome {
    pub state: RedemptionState,
    pub result: RedemptionResult<Committed>,
}

/// Two-phase redemption coordinator over the engine's pool
#[derive(Clone)]
pub struct RedemptionOrchestrator {
    pool: SqlitePool,
}

impl RedemptionOrchestrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ========== Validate (read-only, advisory) ==========

    /// Validate a discount code against a proposed cart.
    pub async fn validate_discount(
        &self,
        code: &str,
        cart: &Cart,
        now_ms: i64,
    ) -> RedemptionResult<ValidatedDiscount> {
        let snapshot = discount::find_by_code(&self.pool, code)
            .await?
            .ok_or(RedemptionError::InvalidCode)?;

        let targets = if snapshot.applies_to == AppliesTo::All {
            Vec::new()
        } else {
            discount::find_targets(&self.pool, snapshot.id).await?
        };

        // The usage ledger, not the cached counter, answers per-customer caps
        let customer_usage = if snapshot.usage_limit_per_customer.is_some() {
            discount::customer_usage_count(&self.pool, snapshot.id, cart.customer_id).await?
        } else {
            0
        };

        let grant = validators::discount::check(&snapshot, &targets, cart, customer_usage, now_ms)?;
        tracing::debug!(
            code = %snapshot.code,
            customer_id = cart.customer_id,
            amount = grant.discount_amount,
            "discount validated"
        );

        let token = ValidationToken::Discount {
            discount_code_id: snapshot.id,
            customer_id: cart.customer_id,
            discount_amount: grant.discount_amount,
            usage_limit_per_customer: snapshot.usage_limit_per_customer,
            observed_usage_count: grant.observed_usage_count,
        };
        Ok(ValidatedDiscount { grant, token })
    }

    /// Validate a gift card for redemption against a cart total.
    pub async fn validate_gift_card(
        &self,
        code: &str,
        cart_total: f64,
        now_ms: i64,
    ) -> RedemptionResult<ValidatedGiftCard> {
        let card = gift_card::find_by_code(&self.pool, code)
            .await?
            .ok_or(RedemptionError::InvalidCode)?;

        validators::gift_card::check(&card, now_ms)?;
        let amount_to_apply = validators::gift_card::amount_to_apply(&card, cart_total);
        tracing::debug!(code = %card.code, amount = amount_to_apply, "gift card validated");

        let token = ValidationToken::GiftCard {
            gift_card_id: card.id,
            amount: amount_to_apply,
            observed_balance: card.current_balance,
            observed_version: card.updated_at,
        };
        Ok(ValidatedGiftCard {
            card,
            amount_to_apply,
            token,
        })
    }

    /// Validate a proposed inventory reservation.
    pub async fn validate_inventory(
        &self,
        variant_id: i64,
        location_id: i64,
        quantity: i64,
    ) -> RedemptionResult<ValidatedInventory> {
        let variant = inventory::find_variant(&self.pool, variant_id)
            .await?
            .ok_or_else(|| RedemptionError::NotFound(format!("variant {variant_id}")))?;
        let level = inventory::find_level(&self.pool, variant_id, location_id)
            .await?
            .ok_or_else(|| {
                RedemptionError::NotFound(format!(
                    "inventory level for variant {variant_id} at location {location_id}"
                ))
            })?;

        validators::inventory::check_reservable(&level, variant.inventory_policy, quantity)?;

        let token = ValidationToken::Inventory {
            variant_id,
            location_id,
            quantity,
            observed_committed: level.committed,
        };
        Ok(ValidatedInventory {
            available_to_sell: validators::inventory::available_to_sell(
                &level,
                variant.inventory_policy,
            ),
            token,
        })
    }

    /// Gift cards this customer can pick from (purchaser or recipient,
    /// active, balance > 0).
    pub async fn redeemable_cards(&self, customer_id: i64) -> RedemptionResult<Vec<GiftCard>> {
        Ok(gift_card::find_redeemable_by_customer(&self.pool, customer_id).await?)
    }

    // ========== Commit (atomic, authoritative) ==========

    /// Commit one validated redemption against an order.
    ///
    /// Runs the object's conditional write; a guard that lost the race
    /// since validation returns `Conflict(reason)`.
    pub async fn commit(
        &self,
        token: &ValidationToken,
        order_id: i64,
    ) -> RedemptionResult<Committed> {
        match token {
            ValidationToken::Discount {
                discount_code_id,
                customer_id,
                discount_amount,
                usage_limit_per_customer,
                ..
            } => {
                let outcome = discount::commit_usage(
                    &self.pool,
                    *discount_code_id,
                    order_id,
                    *customer_id,
                    *discount_amount,
                    *usage_limit_per_customer,
                )
                .await?;
                match outcome {
                    DiscountCommitOutcome::Committed(usage) => {
                        tracing::info!(
                            discount_code_id,
                            order_id,
                            amount = usage.discount_amount,
                            "discount redemption committed"
                        );
                        Ok(Committed::Discount(usage))
                    }
                    DiscountCommitOutcome::LimitReached => {
                        tracing::warn!(discount_code_id, order_id, "discount usage limit hit at commit");
                        Err(RedemptionError::conflict(RedemptionError::UsageLimitExceeded))
                    }
                    DiscountCommitOutcome::CustomerLimitReached => {
                        tracing::warn!(
                            discount_code_id,
                            order_id,
                            customer_id,
                            "per-customer limit hit at commit"
                        );
                        Err(RedemptionError::conflict(
                            RedemptionError::CustomerUsageLimitExceeded,
                        ))
                    }
                }
            }

            ValidationToken::GiftCard {
                gift_card_id,
                amount,
                ..
            } => {
                let redeemed = money::round(-amount.abs());
                match gift_card::append_transaction(
                    &self.pool,
                    *gift_card_id,
                    Some(order_id),
                    TransactionType::Redemption,
                    redeemed,
                )
                .await?
                {
                    Some(row) => {
                        tracing::info!(
                            gift_card_id,
                            order_id,
                            amount = row.amount,
                            "gift card redemption committed"
                        );
                        Ok(Committed::GiftCard(row))
                    }
                    None => {
                        tracing::warn!(gift_card_id, order_id, "gift card balance guard hit at commit");
                        Err(RedemptionError::conflict(RedemptionError::InsufficientBalance))
                    }
                }
            }

            ValidationToken::Inventory {
                variant_id,
                location_id,
                quantity,
                ..
            } => {
                match inventory::reserve(
                    &self.pool,
                    *variant_id,
                    *location_id,
                    *quantity,
                    Some(order_id),
                )
                .await?
                {
                    Some(reservation) => {
                        tracing::info!(variant_id, location_id, quantity, order_id, "inventory reserved");
                        Ok(Committed::Inventory(reservation))
                    }
                    None => {
                        tracing::warn!(variant_id, location_id, quantity, "inventory guard hit at commit");
                        Err(RedemptionError::conflict(
                            RedemptionError::InsufficientInventory,
                        ))
                    }
                }
            }
        }
    }

    /// Commit every token independently and report per-object outcomes.
    ///
    /// No cross-object transaction: one object failing does not stop or
    /// undo the others — the caller drives compensation from the outcomes.
    pub async fn commit_all(&self, tokens: &[ValidationToken], order_id: i64) -> Vec<CommitOutcome> {
        let mut outcomes = Vec::with_capacity(tokens.len());
        for token in tokens {
            let result = self.commit(token, order_id).await;
            let state = if result.is_ok() {
                RedemptionState::Committed
            } else {
                RedemptionState::Rejected
            };
            outcomes.push(CommitOutcome { state, result });
        }
        outcomes
    }

    // ========== Compensation primitives ==========

    /// Undo a committed discount redemption: drop the usage rows for the
    /// order and hand the uses back.
    pub async fn cancel_discount(
        &self,
        discount_code_id: i64,
        order_id: i64,
    ) -> RedemptionResult<bool> {
        let cancelled = discount::cancel_usage(&self.pool, discount_code_id, order_id).await?;
        if cancelled {
            tracing::info!(discount_code_id, order_id, "discount usage compensated");
        }
        Ok(cancelled)
    }

    /// Undo a committed gift card redemption by appending the reversing
    /// refund row. Re-activates a card the redemption had marked `Used`.
    pub async fn refund_gift_card(
        &self,
        gift_card_id: i64,
        order_id: Option<i64>,
        amount: f64,
    ) -> RedemptionResult<GiftCardTransaction> {
        let refunded = money::round(amount.abs());
        let row = gift_card::append_transaction(
            &self.pool,
            gift_card_id,
            order_id,
            TransactionType::Refund,
            refunded,
        )
        .await?
        // A positive append can only miss if the card row is gone
        .ok_or_else(|| RedemptionError::Storage(format!("gift card {gift_card_id} not found")))?;
        tracing::info!(gift_card_id, ?order_id, amount = refunded, "gift card refund appended");
        Ok(row)
    }

    /// Undo a committed reservation (order abandoned or saga compensation).
    pub async fn release_reservation(&self, reservation: &Reservation) -> RedemptionResult<()> {
        inventory::release(&self.pool, reservation).await?;
        tracing::info!(
            variant_id = reservation.variant_id,
            quantity = reservation.quantity,
            "reservation released"
        );
        Ok(())
    }

    /// Convert a reservation into shipped stock once the order finalizes.
    pub async fn fulfill_reservation(&self, reservation: &Reservation) -> RedemptionResult<bool> {
        Ok(inventory::fulfill(&self.pool, reservation).await?)
    }
}
