//! Inventory Availability

use shared::models::{InventoryLevel, InventoryPolicy};
use shared::{RedemptionError, RedemptionResult};

/// Sellable quantity at a location. `None` means unbounded: a `Continue`
/// variant always sells and tracks the shortfall as backorder.
pub fn available_to_sell(level: &InventoryLevel, policy: InventoryPolicy) -> Option<i64> {
    match policy {
        InventoryPolicy::Continue => None,
        InventoryPolicy::Deny => Some(level.available - level.committed),
    }
}

/// Advisory pre-check for a proposed reservation; the conditional UPDATE in
/// the repository is the authoritative gate.
pub fn check_reservable(
    level: &InventoryLevel,
    policy: InventoryPolicy,
    quantity: i64,
) -> RedemptionResult<()> {
    match available_to_sell(level, policy) {
        Some(available) if quantity > available => Err(RedemptionError::InsufficientInventory),
        _ => Ok(()),
    }
}
