//! Settlement Row Repository

use super::{RepoError, RepoResult, SqliteTx};
use shared::models::{EmployeeShift, Jornada, RosterEntry};
use sqlx::SqlitePool;

const ES_SELECT: &str = "SELECT id, jornada_id, worker_id, worker_name, shift_date, shift_type, role_name, base_payment, total_payment, bonus, deduction, paid, paid_at, notes, created_at, updated_at FROM employee_shift";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<EmployeeShift>> {
    let sql = format!("{ES_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, EmployeeShift>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_id_tx(tx: &mut SqliteTx<'_>, id: i64) -> RepoResult<Option<EmployeeShift>> {
    let sql = format!("{ES_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, EmployeeShift>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row)
}

pub async fn find_by_worker(pool: &SqlitePool, worker_id: &str) -> RepoResult<Vec<EmployeeShift>> {
    let sql = format!("{ES_SELECT} WHERE worker_id = ? ORDER BY shift_date DESC, id DESC");
    let rows = sqlx::query_as::<_, EmployeeShift>(&sql)
        .bind(worker_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_by_jornada(pool: &SqlitePool, jornada_id: i64) -> RepoResult<Vec<EmployeeShift>> {
    let sql = format!("{ES_SELECT} WHERE jornada_id = ? ORDER BY id");
    let rows = sqlx::query_as::<_, EmployeeShift>(&sql)
        .bind(jornada_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_unpaid_by_worker_tx(
    tx: &mut SqliteTx<'_>,
    worker_id: &str,
) -> RepoResult<Vec<EmployeeShift>> {
    let sql = format!("{ES_SELECT} WHERE worker_id = ? AND paid = 0 ORDER BY shift_date, id");
    let rows = sqlx::query_as::<_, EmployeeShift>(&sql)
        .bind(worker_id)
        .fetch_all(&mut **tx)
        .await?;
    Ok(rows)
}

/// Sum of frozen totals still owed to a worker
pub async fn sum_unpaid_tx(tx: &mut SqliteTx<'_>, worker_id: &str) -> RepoResult<f64> {
    let sum = sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(SUM(total_payment), 0.0) FROM employee_shift WHERE worker_id = ? AND paid = 0",
    )
    .bind(worker_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(sum)
}

pub async fn sum_unpaid(pool: &SqlitePool, worker_id: &str) -> RepoResult<f64> {
    let sum = sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(SUM(total_payment), 0.0) FROM employee_shift WHERE worker_id = ? AND paid = 0",
    )
    .bind(worker_id)
    .fetch_one(pool)
    .await?;
    Ok(sum)
}

/// Materialize one roster entry into a settlement row at jornada close,
/// carrying the frozen amounts forward
pub async fn insert_from_roster(
    tx: &mut SqliteTx<'_>,
    jornada: &Jornada,
    entry: &RosterEntry,
    now: i64,
) -> RepoResult<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO employee_shift (jornada_id, worker_id, worker_name, shift_date, shift_type, role_name, base_payment, total_payment, bonus, deduction, paid, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 0, 0, ?9, ?9) RETURNING id",
    )
    .bind(jornada.id)
    .bind(&entry.worker_id)
    .bind(&entry.worker_name)
    .bind(&jornada.shift_date)
    .bind(&jornada.shift_type)
    .bind(&entry.role_name)
    .bind(entry.base_snapshot)
    .bind(entry.total_payment)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

/// Claim a row as paid. The conditional write is the serialization point:
/// zero affected rows means another caller already claimed it.
pub async fn claim_paid(tx: &mut SqliteTx<'_>, id: i64, now: i64) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE employee_shift SET paid = 1, paid_at = ?1, updated_at = ?1 WHERE id = ?2 AND paid = 0",
    )
    .bind(now)
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected())
}

/// Fetch a row or fail with NotFound
pub async fn get(pool: &SqlitePool, id: i64) -> RepoResult<EmployeeShift> {
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Settlement row {id} not found")))
}
