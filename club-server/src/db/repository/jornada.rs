//! Jornada Repository

use super::{RepoError, RepoResult, SqliteTx};
use shared::models::Jornada;
use sqlx::SqlitePool;

const JORNADA_SELECT: &str = "SELECT id, shift_date, shift_type, party_name, scheduled_open, scheduled_close, state, technical_checklist, djs, bars, opened_at, opened_by, closed_at, closed_by, created_at, updated_at FROM jornada";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Jornada>> {
    let sql = format!("{JORNADA_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Jornada>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_id_tx(tx: &mut SqliteTx<'_>, id: i64) -> RepoResult<Option<Jornada>> {
    let sql = format!("{JORNADA_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Jornada>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row)
}

/// The single open jornada, if any (global invariant: at most one)
pub async fn find_any_open(pool: &SqlitePool) -> RepoResult<Option<Jornada>> {
    let sql = format!("{JORNADA_SELECT} WHERE state = 'open' LIMIT 1");
    let row = sqlx::query_as::<_, Jornada>(&sql).fetch_optional(pool).await?;
    Ok(row)
}

pub async fn find_open_by_date(pool: &SqlitePool, shift_date: &str) -> RepoResult<Option<Jornada>> {
    let sql = format!("{JORNADA_SELECT} WHERE shift_date = ? AND state = 'open' LIMIT 1");
    let row = sqlx::query_as::<_, Jornada>(&sql)
        .bind(shift_date)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_all(pool: &SqlitePool, limit: i32, offset: i32) -> RepoResult<Vec<Jornada>> {
    let sql = format!("{JORNADA_SELECT} ORDER BY shift_date DESC, id DESC LIMIT ? OFFSET ?");
    let rows = sqlx::query_as::<_, Jornada>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Delete non-open jornadas for a date so a fresh one can replace them.
/// Cascades to roster entries and register openings.
pub async fn delete_replaceable_by_date(tx: &mut SqliteTx<'_>, shift_date: &str) -> RepoResult<u64> {
    let rows = sqlx::query(
        "DELETE FROM jornada WHERE shift_date = ? AND state IN ('closed', 'preparing', 'reviewing')",
    )
    .bind(shift_date)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected())
}

#[allow(clippy::too_many_arguments)]
pub async fn insert(
    tx: &mut SqliteTx<'_>,
    shift_date: &str,
    shift_type: &str,
    party_name: &str,
    scheduled_open: &str,
    scheduled_close: Option<&str>,
    djs: Option<&str>,
    bars_json: &str,
    now: i64,
) -> RepoResult<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO jornada (shift_date, shift_type, party_name, scheduled_open, scheduled_close, state, djs, bars, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, 'preparing', ?6, ?7, ?8, ?8) RETURNING id",
    )
    .bind(shift_date)
    .bind(shift_type)
    .bind(party_name)
    .bind(scheduled_open)
    .bind(scheduled_close)
    .bind(djs)
    .bind(bars_json)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

/// Store the technical checklist. Moves `preparing` to `reviewing`; an
/// already reviewing/open jornada keeps its state.
pub async fn set_checklist(pool: &SqlitePool, id: i64, checklist_json: &str, now: i64) -> RepoResult<Jornada> {
    let rows = sqlx::query(
        "UPDATE jornada SET technical_checklist = ?1, state = CASE WHEN state = 'preparing' THEN 'reviewing' ELSE state END, updated_at = ?2 WHERE id = ?3 AND state != 'closed'",
    )
    .bind(checklist_json)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!(
            "Jornada {id} not found or already closed"
        )));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Jornada {id} not found")))
}

/// Transition to `open`. Zero rows means the jornada was not in an openable
/// state; the partial unique index rejects a second open jornada.
pub async fn mark_open(
    tx: &mut SqliteTx<'_>,
    id: i64,
    opened_by: &str,
    now: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE jornada SET state = 'open', opened_at = ?1, opened_by = ?2, updated_at = ?1 WHERE id = ?3 AND state IN ('preparing', 'reviewing')",
    )
    .bind(now)
    .bind(opened_by)
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected())
}

/// Transition to `closed`. Zero rows means the jornada was not open.
pub async fn mark_closed(
    tx: &mut SqliteTx<'_>,
    id: i64,
    closed_by: &str,
    close_clock: &str,
    now: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE jornada SET state = 'closed', closed_at = ?1, closed_by = ?2, scheduled_close = COALESCE(scheduled_close, ?3), updated_at = ?1 WHERE id = ?4 AND state = 'open'",
    )
    .bind(now)
    .bind(closed_by)
    .bind(close_clock)
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected())
}
