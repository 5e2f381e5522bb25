//! Gift Card Validation

use crate::money;
use shared::models::{GiftCard, GiftCardStatus};
use shared::{RedemptionError, RedemptionResult};

/// Evaluate a gift card snapshot for redeemability.
///
/// Lookup misses are reported as `InvalidCode` by the caller; this check
/// assumes the card exists.
pub fn check(card: &GiftCard, now_ms: i64) -> RedemptionResult<()> {
    if card.status != GiftCardStatus::Active {
        return Err(RedemptionError::GiftCardInactive {
            status: card.status,
        });
    }

    if card.current_balance <= 0.0 {
        return Err(RedemptionError::GiftCardZeroBalance);
    }

    if let Some(expires_at) = card.expires_at {
        if now_ms >= expires_at {
            return Err(RedemptionError::GiftCardExpired);
        }
    }

    Ok(())
}

/// How much of this card a checkout can consume: at most the balance, at
/// most the cart total.
pub fn amount_to_apply(card: &GiftCard, cart_total: f64) -> f64 {
    money::min_amount(card.current_balance, cart_total)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_750_000_000_000;

    fn make_card(balance: f64, status: GiftCardStatus) -> GiftCard {
        GiftCard {
            id: 1,
            code: "GIFT-50".to_string(),
            initial_value: 50.0,
            current_balance: balance,
            currency: "EUR".to_string(),
            status,
            customer_id: Some(7),
            recipient_id: None,
            expires_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_active_card_with_balance_passes() {
        let card = make_card(35.5, GiftCardStatus::Active);
        assert!(check(&card, NOW).is_ok());
    }

    #[test]
    fn test_inactive_card_reports_its_status() {
        for status in [
            GiftCardStatus::Used,
            GiftCardStatus::Disabled,
            GiftCardStatus::Expired,
        ] {
            let card = make_card(10.0, status);
            let err = check(&card, NOW).unwrap_err();
            match err {
                RedemptionError::GiftCardInactive { status: s } => assert_eq!(s, status),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_zero_balance_rejected() {
        let card = make_card(0.0, GiftCardStatus::Active);
        let err = check(&card, NOW).unwrap_err();
        assert!(matches!(err, RedemptionError::GiftCardZeroBalance));
    }

    #[test]
    fn test_expired_card_rejected() {
        let mut card = make_card(10.0, GiftCardStatus::Active);
        card.expires_at = Some(NOW);
        let err = check(&card, NOW).unwrap_err();
        assert!(matches!(err, RedemptionError::GiftCardExpired));

        card.expires_at = Some(NOW + 1);
        assert!(check(&card, NOW).is_ok());
    }

    #[test]
    fn test_status_check_wins_over_zero_balance() {
        let card = make_card(0.0, GiftCardStatus::Used);
        let err = check(&card, NOW).unwrap_err();
        assert!(matches!(err, RedemptionError::GiftCardInactive { .. }));
    }

    #[test]
    fn test_amount_to_apply_is_min_of_balance_and_total() {
        let card = make_card(35.5, GiftCardStatus::Active);
        assert_eq!(amount_to_apply(&card, 100.0), 35.5);
        assert_eq!(amount_to_apply(&card, 20.0), 20.0);
    }
}
