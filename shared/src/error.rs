//! Error taxonomy for the redemption engine
//!
//! Every check failure is an expected business outcome returned as a typed
//! result — nothing here is fatal to the process and nothing is
//! logged-and-swallowed. [`RedemptionError::Conflict`] is the one retryable
//! kind: it wraps the reason a commit-time re-validation failed after an
//! earlier `validate` succeeded.

use crate::models::GiftCardStatus;
use thiserror::Error;

/// Unified error type for validation and commit outcomes
#[derive(Debug, Error)]
pub enum RedemptionError {
    /// Code lookup failed or the code is deactivated
    #[error("invalid code")]
    InvalidCode,

    /// Discount window has not opened yet
    #[error("this code is not yet valid")]
    NotYetActive,

    /// Discount window has closed (`ends_at` is exclusive)
    #[error("this code has expired")]
    Expired,

    /// Cart total is below the code's minimum purchase amount
    #[error("minimum purchase of {minimum:.2} required")]
    BelowMinimumPurchase { minimum: f64 },

    /// Global usage cap reached
    #[error("this code has reached its usage limit")]
    UsageLimitExceeded,

    /// Per-customer usage cap reached
    #[error("this code has reached its usage limit for this customer")]
    CustomerUsageLimitExceeded,

    /// Code is scoped to products/collections absent from the cart
    #[error("this code does not apply to any item in the cart")]
    NotApplicableToCart,

    /// Gift card exists but is not in `Active` status
    #[error("this gift card is {status}")]
    GiftCardInactive { status: GiftCardStatus },

    /// Gift card has nothing left to redeem
    #[error("this gift card has a zero balance")]
    GiftCardZeroBalance,

    /// Gift card is past its expiry date
    #[error("this gift card has expired")]
    GiftCardExpired,

    /// Ledger append would drive the balance negative
    #[error("insufficient gift card balance")]
    InsufficientBalance,

    /// Reservation exceeds sellable quantity under a `Deny` policy
    #[error("insufficient inventory")]
    InsufficientInventory,

    /// Referenced entity (variant, stock location, card) does not exist.
    /// A business lookup miss, distinct from a persistence failure.
    #[error("not found: {0}")]
    NotFound(String),

    /// Commit-time re-validation failed after a successful validate.
    /// Always retryable: the caller may re-validate or drop the redemption.
    #[error("conflict at commit time: {0}")]
    Conflict(#[source] Box<RedemptionError>),

    /// Persistence failure propagated from the repository layer
    #[error("storage error: {0}")]
    Storage(String),
}

impl RedemptionError {
    /// Wrap a re-validation failure observed inside a commit
    pub fn conflict(reason: RedemptionError) -> Self {
        Self::Conflict(Box::new(reason))
    }

    /// Conflicts are the only errors worth retrying; everything else is a
    /// stable fact about the code/card/cart until an admin changes it.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Result type for engine operations
pub type RedemptionResult<T> = Result<T, RedemptionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_retryable() {
        let err = RedemptionError::conflict(RedemptionError::UsageLimitExceeded);
        assert!(err.is_retryable());
        assert!(!RedemptionError::UsageLimitExceeded.is_retryable());
    }

    #[test]
    fn test_inactive_message_names_actual_status() {
        let err = RedemptionError::GiftCardInactive {
            status: GiftCardStatus::Disabled,
        };
        assert_eq!(err.to_string(), "this gift card is disabled");
    }
}
