//! Inventory Repository
//!
//! Reservations move the `committed` counter through a conditional UPDATE
//! guarded by the variant's oversell policy; fulfilment moves the level and
//! the variant's on-hand total together in one transaction.

use super::{RepoError, RepoResult};
use shared::models::{InventoryLevel, InventoryPolicy, ProductVariant, Reservation};
use sqlx::SqlitePool;

pub async fn find_variant(pool: &SqlitePool, variant_id: i64) -> RepoResult<Option<ProductVariant>> {
    let row = sqlx::query_as::<_, ProductVariant>(
        "SELECT id, product_id, sku, inventory_quantity, inventory_policy, created_at, updated_at FROM product_variant WHERE id = ?",
    )
    .bind(variant_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_level(
    pool: &SqlitePool,
    variant_id: i64,
    location_id: i64,
) -> RepoResult<Option<InventoryLevel>> {
    let row = sqlx::query_as::<_, InventoryLevel>(
        "SELECT id, variant_id, location_id, available, committed, incoming, updated_at FROM inventory_level WHERE variant_id = ? AND location_id = ?",
    )
    .bind(variant_id)
    .bind(location_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Atomically take `quantity` units of sellable capacity.
///
/// Under `Deny` the guard is `committed + qty <= available`; under
/// `Continue` the increment is unconditional (backorder). Returns
/// `Ok(None)` when the guard loses — capacity was consumed by a racer
/// since validation.
pub async fn reserve(
    pool: &SqlitePool,
    variant_id: i64,
    location_id: i64,
    quantity: i64,
    order_id: Option<i64>,
) -> RepoResult<Option<Reservation>> {
    let variant = find_variant(pool, variant_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Variant {variant_id}")))?;
    let allow_oversell = variant.inventory_policy == InventoryPolicy::Continue;
    let now = shared::util::now_millis();

    let res = sqlx::query(
        "UPDATE inventory_level SET committed = committed + ?1, updated_at = ?2 WHERE variant_id = ?3 AND location_id = ?4 AND (?5 OR committed + ?1 <= available)",
    )
    .bind(quantity)
    .bind(now)
    .bind(variant_id)
    .bind(location_id)
    .bind(allow_oversell)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        // Distinguish a lost race from a level that was never stocked here
        if find_level(pool, variant_id, location_id).await?.is_none() {
            return Err(RepoError::NotFound(format!(
                "Inventory level for variant {variant_id} at location {location_id}"
            )));
        }
        return Ok(None);
    }

    Ok(Some(Reservation {
        id: shared::util::snowflake_id(),
        variant_id,
        location_id,
        quantity,
        order_id,
    }))
}

/// Hand reserved capacity back (order abandoned or saga compensation).
/// Floored at zero so a duplicate release cannot drive `committed` negative.
pub async fn release(pool: &SqlitePool, reservation: &Reservation) -> RepoResult<()> {
    let now = shared::util::now_millis();
    sqlx::query(
        "UPDATE inventory_level SET committed = MAX(0, committed - ?1), updated_at = ?2 WHERE variant_id = ?3 AND location_id = ?4",
    )
    .bind(reservation.quantity)
    .bind(now)
    .bind(reservation.variant_id)
    .bind(reservation.location_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Convert a reservation into shipped stock: `available`, `committed` and
/// the variant's on-hand total all drop together. Returns false when the
/// reservation's units are no longer committed (already released or
/// fulfilled).
pub async fn fulfill(pool: &SqlitePool, reservation: &Reservation) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let res = sqlx::query(
        "UPDATE inventory_level SET available = available - ?1, committed = committed - ?1, updated_at = ?2 WHERE variant_id = ?3 AND location_id = ?4 AND committed >= ?1",
    )
    .bind(reservation.quantity)
    .bind(now)
    .bind(reservation.variant_id)
    .bind(reservation.location_id)
    .execute(&mut *tx)
    .await?;

    if res.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query(
        "UPDATE product_variant SET inventory_quantity = inventory_quantity - ?1, updated_at = ?2 WHERE id = ?3",
    )
    .bind(reservation.quantity)
    .bind(now)
    .bind(reservation.variant_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}
