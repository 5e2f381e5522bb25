//! Discount Code Validation
//!
//! Fail-fast rule evaluation: the first failing check wins and later checks
//! never run. On success the grant certifies eligibility, carries the rule
//! parameters, and pins the `usage_count` observed for the commit to
//! re-check against live state.

use crate::money;
use shared::models::{
    AppliesTo, Cart, DiscountCode, DiscountGrant, DiscountKind, DiscountTarget,
    DiscountTargetType,
};
use shared::{RedemptionError, RedemptionResult};

/// Evaluate a code snapshot against a proposed cart.
///
/// `customer_usage` is the caller-supplied count of this customer's rows in
/// the usage ledger; `targets` are the code's scope rows (ignored when
/// `applies_to = All`). `now_ms` is UTC epoch milliseconds.
pub fn check(
    code: &DiscountCode,
    targets: &[DiscountTarget],
    cart: &Cart,
    customer_usage: i64,
    now_ms: i64,
) -> RedemptionResult<DiscountGrant> {
    if !code.is_active {
        return Err(RedemptionError::InvalidCode);
    }

    if let Some(starts_at) = code.starts_at {
        if now_ms < starts_at {
            return Err(RedemptionError::NotYetActive);
        }
    }
    // ends_at is exclusive: a code ending exactly now is already expired
    if let Some(ends_at) = code.ends_at {
        if now_ms >= ends_at {
            return Err(RedemptionError::Expired);
        }
    }

    if let Some(minimum) = code.minimum_purchase_amount {
        if cart.total < minimum {
            return Err(RedemptionError::BelowMinimumPurchase { minimum });
        }
    }

    if let Some(limit) = code.usage_limit {
        if code.usage_count >= limit {
            return Err(RedemptionError::UsageLimitExceeded);
        }
    }

    if let Some(limit) = code.usage_limit_per_customer {
        if customer_usage >= limit {
            return Err(RedemptionError::CustomerUsageLimitExceeded);
        }
    }

    if !applies_to_cart(code, targets, cart) {
        return Err(RedemptionError::NotApplicableToCart);
    }

    Ok(DiscountGrant {
        discount_code_id: code.id,
        code: code.code.clone(),
        description: code.description.clone(),
        kind: code.kind.clone(),
        value: code.value,
        buy_quantity: code.buy_quantity,
        get_quantity: code.get_quantity,
        get_discount_percent: code.get_discount_percent,
        discount_amount: discount_amount(code, cart.total),
        observed_usage_count: code.usage_count,
    })
}

/// Scope check: `All` always applies; product/collection scopes need an
/// overlap between the cart and the code's target set.
fn applies_to_cart(code: &DiscountCode, targets: &[DiscountTarget], cart: &Cart) -> bool {
    match code.applies_to {
        AppliesTo::All => true,
        AppliesTo::SpecificProducts => {
            overlaps(targets, DiscountTargetType::Product, &cart.product_ids)
        }
        AppliesTo::SpecificCollections => {
            overlaps(targets, DiscountTargetType::Collection, &cart.collection_ids)
        }
    }
}

fn overlaps(targets: &[DiscountTarget], target_type: DiscountTargetType, cart_ids: &[i64]) -> bool {
    targets
        .iter()
        .filter(|t| t.target_type == target_type)
        .any(|t| cart_ids.contains(&t.target_id))
}

/// Amount the code is worth against this cart total.
///
/// Free-shipping and buy-x-get-y codes certify eligibility only; their
/// value resolves in the caller's shipping/pricing math.
fn discount_amount(code: &DiscountCode, cart_total: f64) -> f64 {
    match code.kind {
        DiscountKind::Percentage => money::percentage_of(cart_total, code.value),
        DiscountKind::FixedAmount => money::min_amount(code.value, cart_total),
        DiscountKind::FreeShipping | DiscountKind::BuyXGetY => 0.0,
    }
}
