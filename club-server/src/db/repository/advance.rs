//! Employee Advance Repository

use super::{RepoError, RepoResult, SqliteTx};
use shared::models::{AdvanceKind, EmployeeAdvance};
use sqlx::SqlitePool;

const ADVANCE_SELECT: &str = "SELECT id, worker_id, worker_name, kind, amount, description, advance_date, applied, applied_at, created_by, notes, created_at, updated_at FROM employee_advance";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<EmployeeAdvance>> {
    let sql = format!("{ADVANCE_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, EmployeeAdvance>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_worker(pool: &SqlitePool, worker_id: &str) -> RepoResult<Vec<EmployeeAdvance>> {
    let sql = format!("{ADVANCE_SELECT} WHERE worker_id = ? ORDER BY advance_date DESC, id DESC");
    let rows = sqlx::query_as::<_, EmployeeAdvance>(&sql)
        .bind(worker_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Sum of not-yet-applied advances for a worker
pub async fn sum_pending_tx(tx: &mut SqliteTx<'_>, worker_id: &str) -> RepoResult<f64> {
    let sum = sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(SUM(amount), 0.0) FROM employee_advance WHERE worker_id = ? AND applied = 0",
    )
    .bind(worker_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(sum)
}

#[allow(clippy::too_many_arguments)]
pub async fn insert(
    tx: &mut SqliteTx<'_>,
    worker_id: &str,
    worker_name: &str,
    kind: AdvanceKind,
    amount: f64,
    description: Option<&str>,
    advance_date: &str,
    created_by: &str,
    now: i64,
) -> RepoResult<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO employee_advance (worker_id, worker_name, kind, amount, description, advance_date, applied, created_by, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?8) RETURNING id",
    )
    .bind(worker_id)
    .bind(worker_name)
    .bind(kind)
    .bind(amount)
    .bind(description)
    .bind(advance_date)
    .bind(created_by)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

/// Consume every pending advance of a worker into a payment
pub async fn mark_all_applied(tx: &mut SqliteTx<'_>, worker_id: &str, now: i64) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE employee_advance SET applied = 1, applied_at = ?1, updated_at = ?1 WHERE worker_id = ?2 AND applied = 0",
    )
    .bind(now)
    .bind(worker_id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected())
}

/// Delete an advance that has not been applied yet
pub async fn delete_unapplied(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM employee_advance WHERE id = ? AND applied = 0")
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        // Distinguish missing from already-applied for the caller
        if find_by_id(pool, id).await?.is_some() {
            return Err(RepoError::Validation(format!(
                "Advance {id} was already applied and cannot be deleted"
            )));
        }
        return Ok(false);
    }
    Ok(true)
}
