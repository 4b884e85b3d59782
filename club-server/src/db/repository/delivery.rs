//! Delivery Repository
//!
//! Append-only delivery facts and the flagged fraud attempts. Deliveries
//! are never updated; the only mutation on fraud attempts is the
//! authorization flag.

use super::{RepoError, RepoResult};
use shared::models::{Delivery, FraudAttempt, FraudKind};
use sqlx::SqlitePool;

const DELIVERY_SELECT: &str = "SELECT id, ticket_id, item_name, qty, server_id, server_name, bar, admin_user, delivered_at, created_at FROM delivery";

const FRAUD_SELECT: &str = "SELECT id, ticket_id, kind, attempt_count, item_name, qty, server_name, bar, authorized, flagged_at, created_at FROM fraud_attempt";

// ── Deliveries ───────────────────────────────────────────────

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Delivery>> {
    let sql = format!("{DELIVERY_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Delivery>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_ticket(pool: &SqlitePool, ticket_id: &str) -> RepoResult<Vec<Delivery>> {
    let sql = format!("{DELIVERY_SELECT} WHERE ticket_id = ? ORDER BY delivered_at");
    let rows = sqlx::query_as::<_, Delivery>(&sql)
        .bind(ticket_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Total quantity already redeemed for a ticket+item
pub async fn sum_delivered(pool: &SqlitePool, ticket_id: &str, item_name: &str) -> RepoResult<i64> {
    let sum = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(qty), 0) FROM delivery WHERE ticket_id = ? AND item_name = ? COLLATE NOCASE",
    )
    .bind(ticket_id)
    .bind(item_name)
    .fetch_one(pool)
    .await?;
    Ok(sum)
}

/// Number of delivery rows recorded for a ticket (the fraud evaluator's
/// attempt count)
pub async fn count_for_ticket(pool: &SqlitePool, ticket_id: &str) -> RepoResult<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM delivery WHERE ticket_id = ?")
        .bind(ticket_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[allow(clippy::too_many_arguments)]
pub async fn insert(
    pool: &SqlitePool,
    ticket_id: &str,
    item_name: &str,
    qty: i64,
    server_id: &str,
    server_name: &str,
    bar: &str,
    admin_user: Option<&str>,
    now: i64,
) -> RepoResult<Delivery> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO delivery (ticket_id, item_name, qty, server_id, server_name, bar, admin_user, delivered_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8) RETURNING id",
    )
    .bind(ticket_id)
    .bind(item_name)
    .bind(qty)
    .bind(server_id)
    .bind(server_name)
    .bind(bar)
    .bind(admin_user)
    .bind(now)
    .fetch_one(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to record delivery".into()))
}

/// Administrative correction; deliveries are otherwise never removed
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM delivery WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

// ── Fraud attempts ───────────────────────────────────────────

pub async fn find_attempt_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<FraudAttempt>> {
    let sql = format!("{FRAUD_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, FraudAttempt>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_attempts_by_ticket(
    pool: &SqlitePool,
    ticket_id: &str,
) -> RepoResult<Vec<FraudAttempt>> {
    let sql = format!("{FRAUD_SELECT} WHERE ticket_id = ? ORDER BY flagged_at DESC, id DESC");
    let rows = sqlx::query_as::<_, FraudAttempt>(&sql)
        .bind(ticket_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Most recent authorized attempt of a kind for a ticket
pub async fn latest_authorized_attempt(
    pool: &SqlitePool,
    ticket_id: &str,
    kind: FraudKind,
) -> RepoResult<Option<FraudAttempt>> {
    let sql = format!(
        "{FRAUD_SELECT} WHERE ticket_id = ? AND kind = ? AND authorized = 1 ORDER BY flagged_at DESC, id DESC LIMIT 1"
    );
    let row = sqlx::query_as::<_, FraudAttempt>(&sql)
        .bind(ticket_id)
        .bind(kind)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_attempt(
    pool: &SqlitePool,
    ticket_id: &str,
    kind: FraudKind,
    attempt_count: Option<i64>,
    item_name: Option<&str>,
    qty: Option<i64>,
    server_name: &str,
    bar: &str,
    now: i64,
) -> RepoResult<FraudAttempt> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO fraud_attempt (ticket_id, kind, attempt_count, item_name, qty, server_name, bar, authorized, flagged_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8) RETURNING id",
    )
    .bind(ticket_id)
    .bind(kind)
    .bind(attempt_count)
    .bind(item_name)
    .bind(qty)
    .bind(server_name)
    .bind(bar)
    .bind(now)
    .fetch_one(pool)
    .await?;

    find_attempt_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to record fraud attempt".into()))
}

/// Authorize the most recent unauthorized attempt of a kind for a ticket;
/// returns the authorized attempt, or None when nothing was pending
pub async fn authorize_latest_attempt(
    pool: &SqlitePool,
    ticket_id: &str,
    kind: FraudKind,
) -> RepoResult<Option<FraudAttempt>> {
    let id = sqlx::query_scalar::<_, i64>(
        "UPDATE fraud_attempt SET authorized = 1 WHERE id = (SELECT id FROM fraud_attempt WHERE ticket_id = ?1 AND kind = ?2 AND authorized = 0 ORDER BY flagged_at DESC, id DESC LIMIT 1) RETURNING id",
    )
    .bind(ticket_id)
    .bind(kind)
    .fetch_optional(pool)
    .await?;

    match id {
        Some(id) => find_attempt_by_id(pool, id).await,
        None => Ok(None),
    }
}
