//! Register Repository
//!
//! Openings (per jornada) and the append-style close records.

use super::{RepoError, RepoResult, SqliteTx};
use shared::models::{RegisterClose, RegisterOpening};
use sqlx::SqlitePool;

const OPENING_SELECT: &str = "SELECT id, jornada_id, register_id, register_name, cashier_id, cashier_name, initial_float, opened_by, state, opened_at, created_at FROM register_opening";

const CLOSE_SELECT: &str = "SELECT id, register_id, register_name, jornada_id, cashier_id, cashier_name, closed_at, expected_cash, expected_debit, expected_credit, actual_cash, actual_debit, actual_credit, diff_cash, diff_debit, diff_credit, difference_total, total_sales, total_amount, notes, status, resolved_by, resolved_at, resolution_notes, created_at FROM register_close";

// ── Openings ─────────────────────────────────────────────────

pub async fn find_opening_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<RegisterOpening>> {
    let sql = format!("{OPENING_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, RegisterOpening>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_open_opening(
    pool: &SqlitePool,
    jornada_id: i64,
    register_id: &str,
) -> RepoResult<Option<RegisterOpening>> {
    let sql = format!(
        "{OPENING_SELECT} WHERE jornada_id = ? AND register_id = ? AND state = 'open' LIMIT 1"
    );
    let row = sqlx::query_as::<_, RegisterOpening>(&sql)
        .bind(jornada_id)
        .bind(register_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_openings_by_jornada(
    pool: &SqlitePool,
    jornada_id: i64,
) -> RepoResult<Vec<RegisterOpening>> {
    let sql = format!("{OPENING_SELECT} WHERE jornada_id = ? ORDER BY opened_at");
    let rows = sqlx::query_as::<_, RegisterOpening>(&sql)
        .bind(jornada_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_opening(
    pool: &SqlitePool,
    jornada_id: i64,
    register_id: &str,
    register_name: &str,
    cashier_id: &str,
    cashier_name: &str,
    initial_float: f64,
    opened_by: &str,
    now: i64,
) -> RepoResult<RegisterOpening> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO register_opening (jornada_id, register_id, register_name, cashier_id, cashier_name, initial_float, opened_by, state, opened_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'open', ?8, ?8) RETURNING id",
    )
    .bind(jornada_id)
    .bind(register_id)
    .bind(register_name)
    .bind(cashier_id)
    .bind(cashier_name)
    .bind(initial_float)
    .bind(opened_by)
    .bind(now)
    .fetch_one(pool)
    .await?;

    find_opening_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create register opening".into()))
}

/// Close one register's open opening (if any); returns affected rows
pub async fn close_opening(
    tx: &mut SqliteTx<'_>,
    jornada_id: i64,
    register_id: &str,
) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE register_opening SET state = 'closed' WHERE jornada_id = ? AND register_id = ? AND state = 'open'",
    )
    .bind(jornada_id)
    .bind(register_id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected())
}

/// Close every still-open opening of a jornada; used by shift close
pub async fn close_all_openings(tx: &mut SqliteTx<'_>, jornada_id: i64) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE register_opening SET state = 'closed' WHERE jornada_id = ? AND state = 'open'",
    )
    .bind(jornada_id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected())
}

// ── Close records ────────────────────────────────────────────

pub async fn find_close_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<RegisterClose>> {
    let sql = format!("{CLOSE_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, RegisterClose>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Most recent close for a register within a jornada; drives the register's
/// presentation state
pub async fn find_latest_close(
    pool: &SqlitePool,
    jornada_id: i64,
    register_id: &str,
) -> RepoResult<Option<RegisterClose>> {
    let sql = format!(
        "{CLOSE_SELECT} WHERE jornada_id = ? AND register_id = ? ORDER BY closed_at DESC, id DESC LIMIT 1"
    );
    let row = sqlx::query_as::<_, RegisterClose>(&sql)
        .bind(jornada_id)
        .bind(register_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_closes_by_jornada(
    pool: &SqlitePool,
    jornada_id: i64,
) -> RepoResult<Vec<RegisterClose>> {
    let sql = format!("{CLOSE_SELECT} WHERE jornada_id = ? ORDER BY closed_at DESC, id DESC");
    let rows = sqlx::query_as::<_, RegisterClose>(&sql)
        .bind(jornada_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Insert parameters for a close record; differences are pre-computed by
/// the reconciliation service
#[derive(Debug, Clone)]
pub struct NewRegisterClose<'a> {
    pub register_id: &'a str,
    pub register_name: &'a str,
    pub jornada_id: i64,
    pub cashier_id: &'a str,
    pub cashier_name: &'a str,
    pub closed_at: i64,
    pub expected: (f64, f64, f64),
    pub actual: (f64, f64, f64),
    pub diffs: (f64, f64, f64),
    pub difference_total: f64,
    pub total_sales: i64,
    pub total_amount: f64,
    pub notes: Option<&'a str>,
}

pub async fn insert_close(tx: &mut SqliteTx<'_>, new: NewRegisterClose<'_>) -> RepoResult<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO register_close (register_id, register_name, jornada_id, cashier_id, cashier_name, closed_at, expected_cash, expected_debit, expected_credit, actual_cash, actual_debit, actual_credit, diff_cash, diff_debit, diff_credit, difference_total, total_sales, total_amount, notes, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, 'pending', ?6) RETURNING id",
    )
    .bind(new.register_id)
    .bind(new.register_name)
    .bind(new.jornada_id)
    .bind(new.cashier_id)
    .bind(new.cashier_name)
    .bind(new.closed_at)
    .bind(new.expected.0)
    .bind(new.expected.1)
    .bind(new.expected.2)
    .bind(new.actual.0)
    .bind(new.actual.1)
    .bind(new.actual.2)
    .bind(new.diffs.0)
    .bind(new.diffs.1)
    .bind(new.diffs.2)
    .bind(new.difference_total)
    .bind(new.total_sales)
    .bind(new.total_amount)
    .bind(new.notes)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

/// `pending → balanced`; zero rows means missing or not pending
pub async fn accept_close(
    tx: &mut SqliteTx<'_>,
    id: i64,
    actor: &str,
    now: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE register_close SET status = 'balanced', resolved_by = ?1, resolved_at = ?2 WHERE id = ?3 AND status = 'pending'",
    )
    .bind(actor)
    .bind(now)
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected())
}

/// `pending → resolved` with investigation notes
pub async fn resolve_close(
    tx: &mut SqliteTx<'_>,
    id: i64,
    actor: &str,
    notes: &str,
    now: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE register_close SET status = 'resolved', resolved_by = ?1, resolved_at = ?2, resolution_notes = ?3 WHERE id = ?4 AND status = 'pending'",
    )
    .bind(actor)
    .bind(now)
    .bind(notes)
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected())
}
