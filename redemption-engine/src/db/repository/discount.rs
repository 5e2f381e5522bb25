//! Discount Code Repository
//!
//! Lookup plus the commit/compensation writes. The global usage cap is
//! enforced by a conditional increment (`WHERE usage_count < usage_limit`)
//! and the per-customer cap by a live recount inside the same transaction,
//! so two racing checkouts can never both land past the code's remaining
//! capacity.

use super::RepoResult;
use shared::models::{DiscountCode, DiscountTarget, DiscountUsage};
use sqlx::SqlitePool;

const DISCOUNT_SELECT: &str = "SELECT id, code, description, kind, value, buy_quantity, get_quantity, get_discount_percent, applies_to, minimum_purchase_amount, usage_limit, usage_limit_per_customer, usage_count, starts_at, ends_at, is_active, created_at, updated_at FROM discount_code";

/// Outcome of a commit attempt; the two guard failures are distinct so the
/// caller can report the reason the re-check lost the race.
#[derive(Debug)]
pub enum DiscountCommitOutcome {
    Committed(DiscountUsage),
    /// Conditional increment matched no row: cap reached (or code
    /// deactivated) since validation
    LimitReached,
    /// Live recount of usage rows hit the per-customer cap
    CustomerLimitReached,
}

/// Case-insensitive code lookup (`code` is `COLLATE NOCASE`)
pub async fn find_by_code(pool: &SqlitePool, code: &str) -> RepoResult<Option<DiscountCode>> {
    let sql = format!("{DISCOUNT_SELECT} WHERE code = ?");
    let row = sqlx::query_as::<_, DiscountCode>(&sql)
        .bind(code)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<DiscountCode>> {
    let sql = format!("{DISCOUNT_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, DiscountCode>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Scope rows for a code; empty when `applies_to = All`
pub async fn find_targets(pool: &SqlitePool, discount_code_id: i64) -> RepoResult<Vec<DiscountTarget>> {
    let rows = sqlx::query_as::<_, DiscountTarget>(
        "SELECT id, discount_code_id, target_type, target_id FROM discount_target WHERE discount_code_id = ?",
    )
    .bind(discount_code_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Count committed usages for `(code, customer)`.
///
/// The usage ledger is authoritative for per-customer limits; no cached
/// counter is consulted.
pub async fn customer_usage_count(
    pool: &SqlitePool,
    discount_code_id: i64,
    customer_id: i64,
) -> RepoResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM discount_usage WHERE discount_code_id = ? AND customer_id = ?",
    )
    .bind(discount_code_id)
    .bind(customer_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn find_usages_by_order(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<DiscountUsage>> {
    let rows = sqlx::query_as::<_, DiscountUsage>(
        "SELECT id, discount_code_id, order_id, customer_id, discount_amount, created_at FROM discount_usage WHERE order_id = ?",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Atomically consume one use of a code and record the usage row.
///
/// Single transaction:
/// 1. `usage_count` increment guarded by `usage_count < usage_limit` (or
///    unconditional when unlimited) and `is_active`;
/// 2. live per-customer recount against `discount_usage`;
/// 3. insert of the immutable usage row.
/// Any guard failure rolls the increment back and reports which check lost.
pub async fn commit_usage(
    pool: &SqlitePool,
    discount_code_id: i64,
    order_id: i64,
    customer_id: i64,
    discount_amount: f64,
    usage_limit_per_customer: Option<i64>,
) -> RepoResult<DiscountCommitOutcome> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    // The write lock taken here serializes every concurrent commit against
    // this code; the recount below therefore reads settled state.
    let res = sqlx::query(
        "UPDATE discount_code SET usage_count = usage_count + 1, updated_at = ?1 WHERE id = ?2 AND is_active = 1 AND (usage_limit IS NULL OR usage_count < usage_limit)",
    )
    .bind(now)
    .bind(discount_code_id)
    .execute(&mut *tx)
    .await?;

    if res.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(DiscountCommitOutcome::LimitReached);
    }

    if let Some(limit) = usage_limit_per_customer {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM discount_usage WHERE discount_code_id = ? AND customer_id = ?",
        )
        .bind(discount_code_id)
        .bind(customer_id)
        .fetch_one(&mut *tx)
        .await?;
        if count >= limit {
            tx.rollback().await?;
            return Ok(DiscountCommitOutcome::CustomerLimitReached);
        }
    }

    let usage = DiscountUsage {
        id: shared::util::snowflake_id(),
        discount_code_id,
        order_id,
        customer_id,
        discount_amount,
        created_at: now,
    };
    sqlx::query(
        "INSERT INTO discount_usage (id, discount_code_id, order_id, customer_id, discount_amount, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(usage.id)
    .bind(usage.discount_code_id)
    .bind(usage.order_id)
    .bind(usage.customer_id)
    .bind(usage.discount_amount)
    .bind(usage.created_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(DiscountCommitOutcome::Committed(usage))
}

/// Compensation: remove the usage rows for `(code, order)` and hand the
/// consumed uses back, floored at zero.
pub async fn cancel_usage(
    pool: &SqlitePool,
    discount_code_id: i64,
    order_id: i64,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query(
        "DELETE FROM discount_usage WHERE discount_code_id = ?1 AND order_id = ?2",
    )
    .bind(discount_code_id)
    .bind(order_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if deleted == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query(
        "UPDATE discount_code SET usage_count = MAX(0, usage_count - ?1), updated_at = ?2 WHERE id = ?3",
    )
    .bind(deleted as i64)
    .bind(now)
    .bind(discount_code_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    async fn test_pool() -> SqlitePool {
        let db = DbService::in_memory().await.unwrap();
        seed_code(&db.pool, 1, "SAVE20", Some(3), Some(1)).await;
        seed_code(&db.pool, 2, "OPEN", None, None).await;
        db.pool
    }

    async fn seed_code(
        pool: &SqlitePool,
        id: i64,
        code: &str,
        usage_limit: Option<i64>,
        per_customer: Option<i64>,
    ) {
        sqlx::query(
            "INSERT INTO discount_code (id, code, kind, value, applies_to, usage_limit, usage_limit_per_customer, is_active) VALUES (?1, ?2, 'PERCENTAGE', 20, 'ALL', ?3, ?4, 1)",
        )
        .bind(id)
        .bind(code)
        .bind(usage_limit)
        .bind(per_customer)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_find_by_code_is_case_insensitive() {
        let pool = test_pool().await;
        let found = find_by_code(&pool, "save20").await.unwrap();
        assert_eq!(found.unwrap().code, "SAVE20");
    }

    #[tokio::test]
    async fn test_find_by_code_unknown_is_none() {
        let pool = test_pool().await;
        assert!(find_by_code(&pool, "NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_increments_count_and_inserts_row() {
        let pool = test_pool().await;
        let outcome = commit_usage(&pool, 1, 100, 7, 5.0, Some(1)).await.unwrap();
        let usage = match outcome {
            DiscountCommitOutcome::Committed(u) => u,
            other => panic!("expected commit, got {other:?}"),
        };
        assert_eq!(usage.order_id, 100);
        assert_eq!(usage.customer_id, 7);

        let code = find_by_id(&pool, 1).await.unwrap().unwrap();
        assert_eq!(code.usage_count, 1);
        assert_eq!(customer_usage_count(&pool, 1, 7).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_commit_stops_at_global_limit() {
        let pool = test_pool().await;
        // Limit is 3; use distinct customers so the per-customer cap stays out
        for customer in [10, 11, 12] {
            let outcome = commit_usage(&pool, 1, customer, customer, 5.0, Some(1))
                .await
                .unwrap();
            assert!(matches!(outcome, DiscountCommitOutcome::Committed(_)));
        }
        let outcome = commit_usage(&pool, 1, 13, 13, 5.0, Some(1)).await.unwrap();
        assert!(matches!(outcome, DiscountCommitOutcome::LimitReached));

        // Counter never passed the cap
        let code = find_by_id(&pool, 1).await.unwrap().unwrap();
        assert_eq!(code.usage_count, 3);
    }

    #[tokio::test]
    async fn test_commit_stops_at_customer_limit_and_rolls_back_increment() {
        let pool = test_pool().await;
        let outcome = commit_usage(&pool, 1, 100, 7, 5.0, Some(1)).await.unwrap();
        assert!(matches!(outcome, DiscountCommitOutcome::Committed(_)));

        let outcome = commit_usage(&pool, 1, 101, 7, 5.0, Some(1)).await.unwrap();
        assert!(matches!(outcome, DiscountCommitOutcome::CustomerLimitReached));

        // The failed attempt's increment was rolled back with the transaction
        let code = find_by_id(&pool, 1).await.unwrap().unwrap();
        assert_eq!(code.usage_count, 1);
    }

    #[tokio::test]
    async fn test_unlimited_code_commits_freely() {
        let pool = test_pool().await;
        for order in 0..5 {
            let outcome = commit_usage(&pool, 2, order, 7, 1.0, None).await.unwrap();
            assert!(matches!(outcome, DiscountCommitOutcome::Committed(_)));
        }
        let code = find_by_id(&pool, 2).await.unwrap().unwrap();
        assert_eq!(code.usage_count, 5);
    }

    #[tokio::test]
    async fn test_inactive_code_cannot_commit() {
        let pool = test_pool().await;
        sqlx::query("UPDATE discount_code SET is_active = 0 WHERE id = 1")
            .execute(&pool)
            .await
            .unwrap();
        let outcome = commit_usage(&pool, 1, 100, 7, 5.0, None).await.unwrap();
        assert!(matches!(outcome, DiscountCommitOutcome::LimitReached));
    }

    #[tokio::test]
    async fn test_cancel_usage_restores_capacity() {
        let pool = test_pool().await;
        commit_usage(&pool, 1, 100, 7, 5.0, Some(1)).await.unwrap();

        assert!(cancel_usage(&pool, 1, 100).await.unwrap());
        let code = find_by_id(&pool, 1).await.unwrap().unwrap();
        assert_eq!(code.usage_count, 0);
        assert_eq!(customer_usage_count(&pool, 1, 7).await.unwrap(), 0);

        // Same customer can redeem again after the compensation
        let outcome = commit_usage(&pool, 1, 102, 7, 5.0, Some(1)).await.unwrap();
        assert!(matches!(outcome, DiscountCommitOutcome::Committed(_)));
    }

    #[tokio::test]
    async fn test_cancel_usage_without_rows_is_noop() {
        let pool = test_pool().await;
        assert!(!cancel_usage(&pool, 1, 999).await.unwrap());
        let code = find_by_id(&pool, 1).await.unwrap().unwrap();
        assert_eq!(code.usage_count, 0);
    }
}
