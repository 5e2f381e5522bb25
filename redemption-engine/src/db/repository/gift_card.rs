//! Gift Card Repository
//!
//! The transaction table is the system of record; `current_balance` is a
//! projection of it, moved only inside the same SQL transaction as the
//! ledger insert. The append's own non-negative guard is the final defence
//! against double-spend, independent of whatever a pre-check saw.

use super::RepoResult;
use shared::models::{GiftCard, GiftCardStatus, GiftCardTransaction, TransactionType};
use sqlx::SqlitePool;

const GIFT_CARD_SELECT: &str = "SELECT id, code, initial_value, current_balance, currency, status, customer_id, recipient_id, expires_at, created_at, updated_at FROM gift_card";

/// Balances under half a cent are zero; 2dp-rounded f64 sums drift well
/// below this.
const ZERO_EPSILON: f64 = 0.005;

/// Case-insensitive code lookup (`code` is `COLLATE NOCASE`)
pub async fn find_by_code(pool: &SqlitePool, code: &str) -> RepoResult<Option<GiftCard>> {
    let sql = format!("{GIFT_CARD_SELECT} WHERE code = ?");
    let row = sqlx::query_as::<_, GiftCard>(&sql)
        .bind(code)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<GiftCard>> {
    let sql = format!("{GIFT_CARD_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, GiftCard>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Cards the customer purchased or is the named recipient of, still active
/// with something left to spend. Feeds the caller's selection UI.
pub async fn find_redeemable_by_customer(
    pool: &SqlitePool,
    customer_id: i64,
) -> RepoResult<Vec<GiftCard>> {
    let sql = format!(
        "{GIFT_CARD_SELECT} WHERE (customer_id = ?1 OR recipient_id = ?1) AND status = 'ACTIVE' AND current_balance > 0 ORDER BY created_at DESC"
    );
    let rows = sqlx::query_as::<_, GiftCard>(&sql)
        .bind(customer_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Append a signed ledger row and move the balance projection atomically.
///
/// Returns `Ok(None)` when the guard rejects the append: the resulting
/// balance would go negative, or a redemption targets a card that is no
/// longer `Active`. Status transitions ride the same statement — a
/// redemption landing on zero flips the card to `Used`, a refund lifting a
/// `Used` card back above zero re-activates it.
pub async fn append_transaction(
    pool: &SqlitePool,
    gift_card_id: i64,
    order_id: Option<i64>,
    transaction_type: TransactionType,
    amount: f64,
) -> RepoResult<Option<GiftCardTransaction>> {
    let now = shared::util::now_millis();
    // Only redemptions insist on an Active card; compensation money must be
    // returnable to a card in any state.
    let require_active = matches!(transaction_type, TransactionType::Redemption);

    let mut tx = pool.begin().await?;

    let res = sqlx::query(
        "UPDATE gift_card SET \
            current_balance = ROUND(current_balance + ?1, 2), \
            status = CASE \
                WHEN status = 'ACTIVE' AND ROUND(current_balance + ?1, 2) < ?4 THEN 'USED' \
                WHEN status = 'USED' AND ROUND(current_balance + ?1, 2) >= ?4 THEN 'ACTIVE' \
                ELSE status END, \
            updated_at = ?2 \
         WHERE id = ?3 AND current_balance + ?1 + ?4 > 0 AND (?5 = 0 OR status = 'ACTIVE')",
    )
    .bind(amount)
    .bind(now)
    .bind(gift_card_id)
    .bind(ZERO_EPSILON)
    .bind(require_active)
    .execute(&mut *tx)
    .await?;

    if res.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    let row = GiftCardTransaction {
        id: shared::util::snowflake_id(),
        gift_card_id,
        order_id,
        transaction_type,
        amount,
        created_at: now,
    };
    sqlx::query(
        "INSERT INTO gift_card_transaction (id, gift_card_id, order_id, transaction_type, amount, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(row.id)
    .bind(row.gift_card_id)
    .bind(row.order_id)
    .bind(row.transaction_type)
    .bind(row.amount)
    .bind(row.created_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(row))
}

/// Re-derive the balance from the ledger fold for audit/recovery.
///
/// Must reproduce the cached projection exactly; a mismatch means a write
/// bypassed `append_transaction`.
pub async fn recompute_balance(pool: &SqlitePool, gift_card_id: i64) -> RepoResult<f64> {
    let balance: f64 = sqlx::query_scalar(
        "SELECT ROUND(g.initial_value + COALESCE(SUM(t.amount), 0), 2) FROM gift_card g LEFT JOIN gift_card_transaction t ON t.gift_card_id = g.id WHERE g.id = ? GROUP BY g.id",
    )
    .bind(gift_card_id)
    .fetch_one(pool)
    .await?;
    Ok(balance)
}

pub async fn transactions_for_card(
    pool: &SqlitePool,
    gift_card_id: i64,
) -> RepoResult<Vec<GiftCardTransaction>> {
    let rows = sqlx::query_as::<_, GiftCardTransaction>(
        "SELECT id, gift_card_id, order_id, transaction_type, amount, created_at FROM gift_card_transaction WHERE gift_card_id = ? ORDER BY created_at, id",
    )
    .bind(gift_card_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// True when the projection and the ledger fold agree (test/audit helper)
pub async fn audit_balance(pool: &SqlitePool, gift_card_id: i64) -> RepoResult<bool> {
    let card = find_by_id(pool, gift_card_id)
        .await?
        .ok_or_else(|| super::RepoError::NotFound(format!("Gift card {gift_card_id}")))?;
    let derived = recompute_balance(pool, gift_card_id).await?;
    Ok((card.current_balance - derived).abs() < ZERO_EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    async fn test_pool() -> SqlitePool {
        let db = DbService::in_memory().await.unwrap();
        seed_card(&db.pool, 1, "GIFT-50", 50.0, 50.0, "ACTIVE").await;
        seed_card(&db.pool, 2, "GIFT-DEAD", 25.0, 10.0, "DISABLED").await;
        db.pool
    }

    async fn seed_card(
        pool: &SqlitePool,
        id: i64,
        code: &str,
        initial: f64,
        balance: f64,
        status: &str,
    ) {
        sqlx::query(
            "INSERT INTO gift_card (id, code, initial_value, current_balance, currency, status, customer_id) VALUES (?1, ?2, ?3, ?4, 'EUR', ?5, 7)",
        )
        .bind(id)
        .bind(code)
        .bind(initial)
        .bind(balance)
        .bind(status)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_redeem_partial_keeps_card_active() {
        let pool = test_pool().await;
        let row = append_transaction(&pool, 1, Some(100), TransactionType::Redemption, -20.0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.amount, -20.0);

        let card = find_by_id(&pool, 1).await.unwrap().unwrap();
        assert!((card.current_balance - 30.0).abs() < 0.005);
        assert_eq!(card.status, GiftCardStatus::Active);
    }

    #[tokio::test]
    async fn test_redeem_to_zero_marks_card_used() {
        let pool = test_pool().await;
        append_transaction(&pool, 1, Some(100), TransactionType::Redemption, -50.0)
            .await
            .unwrap()
            .unwrap();

        let card = find_by_id(&pool, 1).await.unwrap().unwrap();
        assert!(card.current_balance.abs() < 0.005);
        assert_eq!(card.status, GiftCardStatus::Used);
    }

    #[tokio::test]
    async fn test_overdraw_is_rejected_and_leaves_no_ledger_row() {
        let pool = test_pool().await;
        let res = append_transaction(&pool, 1, Some(100), TransactionType::Redemption, -50.01)
            .await
            .unwrap();
        assert!(res.is_none());

        let card = find_by_id(&pool, 1).await.unwrap().unwrap();
        assert!((card.current_balance - 50.0).abs() < 0.005);
        assert!(transactions_for_card(&pool, 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_redemption_requires_active_card() {
        let pool = test_pool().await;
        let res = append_transaction(&pool, 2, Some(100), TransactionType::Redemption, -5.0)
            .await
            .unwrap();
        assert!(res.is_none());
    }

    #[tokio::test]
    async fn test_refund_reactivates_used_card() {
        let pool = test_pool().await;
        append_transaction(&pool, 1, Some(100), TransactionType::Redemption, -50.0)
            .await
            .unwrap()
            .unwrap();
        append_transaction(&pool, 1, Some(100), TransactionType::Refund, 50.0)
            .await
            .unwrap()
            .unwrap();

        let card = find_by_id(&pool, 1).await.unwrap().unwrap();
        assert!((card.current_balance - 50.0).abs() < 0.005);
        assert_eq!(card.status, GiftCardStatus::Active);
    }

    #[tokio::test]
    async fn test_refund_on_disabled_card_keeps_status() {
        let pool = test_pool().await;
        append_transaction(&pool, 2, Some(100), TransactionType::Refund, 5.0)
            .await
            .unwrap()
            .unwrap();

        let card = find_by_id(&pool, 2).await.unwrap().unwrap();
        assert!((card.current_balance - 15.0).abs() < 0.005);
        assert_eq!(card.status, GiftCardStatus::Disabled);
    }

    #[tokio::test]
    async fn test_ledger_fold_reproduces_projection() {
        let pool = test_pool().await;
        append_transaction(&pool, 1, Some(100), TransactionType::Redemption, -12.5)
            .await
            .unwrap();
        append_transaction(&pool, 1, None, TransactionType::Adjustment, -0.5)
            .await
            .unwrap();
        append_transaction(&pool, 1, Some(101), TransactionType::Redemption, -7.25)
            .await
            .unwrap();
        append_transaction(&pool, 1, Some(100), TransactionType::Refund, 12.5)
            .await
            .unwrap();

        assert!(audit_balance(&pool, 1).await.unwrap());
        let derived = recompute_balance(&pool, 1).await.unwrap();
        assert!((derived - 42.25).abs() < 0.005);
    }

    #[tokio::test]
    async fn test_redeemable_cards_filter() {
        let pool = test_pool().await;
        // Card 1 active with balance, card 2 disabled: only card 1 shows
        let cards = find_redeemable_by_customer(&pool, 7).await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].code, "GIFT-50");

        // Draining card 1 removes it from the redeemable set
        append_transaction(&pool, 1, Some(100), TransactionType::Redemption, -50.0)
            .await
            .unwrap();
        assert!(find_redeemable_by_customer(&pool, 7).await.unwrap().is_empty());
    }
}
