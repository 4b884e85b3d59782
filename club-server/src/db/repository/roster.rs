//! Roster Repository

use super::{RepoError, RepoResult, SqliteTx};
use shared::models::RosterEntry;
use sqlx::SqlitePool;

const ROSTER_SELECT: &str = "SELECT id, jornada_id, worker_id, worker_name, role_name, role_config_id, starts_at, ends_at, hourly_cost, total_cost, area, base_snapshot, bonus_snapshot, total_payment, is_override, override_reason, override_by, override_at, created_at FROM roster_entry";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<RosterEntry>> {
    let sql = format!("{ROSTER_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, RosterEntry>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_jornada(pool: &SqlitePool, jornada_id: i64) -> RepoResult<Vec<RosterEntry>> {
    let sql = format!("{ROSTER_SELECT} WHERE jornada_id = ? ORDER BY id");
    let rows = sqlx::query_as::<_, RosterEntry>(&sql)
        .bind(jornada_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_by_jornada_tx(
    tx: &mut SqliteTx<'_>,
    jornada_id: i64,
) -> RepoResult<Vec<RosterEntry>> {
    let sql = format!("{ROSTER_SELECT} WHERE jornada_id = ? ORDER BY id");
    let rows = sqlx::query_as::<_, RosterEntry>(&sql)
        .bind(jornada_id)
        .fetch_all(&mut **tx)
        .await?;
    Ok(rows)
}

pub async fn count_by_jornada(pool: &SqlitePool, jornada_id: i64) -> RepoResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM roster_entry WHERE jornada_id = ?",
    )
    .bind(jornada_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn exists_for_worker(
    tx: &mut SqliteTx<'_>,
    jornada_id: i64,
    worker_id: &str,
) -> RepoResult<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM roster_entry WHERE jornada_id = ? AND worker_id = ?",
    )
    .bind(jornada_id)
    .bind(worker_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(count > 0)
}

/// Insert one roster entry with its (possibly unresolved) payroll snapshot
#[allow(clippy::too_many_arguments)]
pub async fn insert(
    tx: &mut SqliteTx<'_>,
    jornada_id: i64,
    worker_id: &str,
    worker_name: &str,
    role_name: &str,
    role_config_id: Option<i64>,
    starts_at: &str,
    ends_at: &str,
    hourly_cost: f64,
    total_cost: f64,
    area: Option<&str>,
    snapshot: Option<(f64, f64, f64)>,
    now: i64,
) -> RepoResult<i64> {
    let (base, bonus, total) = match snapshot {
        Some((b, x, t)) => (Some(b), Some(x), Some(t)),
        None => (None, None, None),
    };
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO roster_entry (jornada_id, worker_id, worker_name, role_name, role_config_id, starts_at, ends_at, hourly_cost, total_cost, area, base_snapshot, bonus_snapshot, total_payment, is_override, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 0, ?14) RETURNING id",
    )
    .bind(jornada_id)
    .bind(worker_id)
    .bind(worker_name)
    .bind(role_name)
    .bind(role_config_id)
    .bind(starts_at)
    .bind(ends_at)
    .bind(hourly_cost)
    .bind(total_cost)
    .bind(area)
    .bind(base)
    .bind(bonus)
    .bind(total)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM roster_entry WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Replace the frozen total with an explicit override value
pub async fn apply_override(
    tx: &mut SqliteTx<'_>,
    id: i64,
    new_total: f64,
    reason: &str,
    author: &str,
    now: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE roster_entry SET total_payment = ?1, is_override = 1, override_reason = ?2, override_by = ?3, override_at = ?4 WHERE id = ?5",
    )
    .bind(new_total)
    .bind(reason)
    .bind(author)
    .bind(now)
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected())
}

pub async fn find_by_id_tx(tx: &mut SqliteTx<'_>, id: i64) -> RepoResult<Option<RosterEntry>> {
    let sql = format!("{ROSTER_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, RosterEntry>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row)
}

/// Fetch an entry or fail with NotFound
pub async fn get(pool: &SqlitePool, id: i64) -> RepoResult<RosterEntry> {
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Roster entry {id} not found")))
}
