//! Payment Ledger Repository

use super::{RepoResult, SqliteTx};
use shared::models::{EmployeePayment, PaymentType};
use sqlx::SqlitePool;

const PAYMENT_SELECT: &str = "SELECT id, worker_id, worker_name, payment_type, amount, pending_before, pending_after, settled_row_ids, description, paid_by, paid_at, created_at FROM employee_payment";

pub async fn find_by_worker(pool: &SqlitePool, worker_id: &str) -> RepoResult<Vec<EmployeePayment>> {
    let sql = format!("{PAYMENT_SELECT} WHERE worker_id = ? ORDER BY paid_at DESC, id DESC");
    let rows = sqlx::query_as::<_, EmployeePayment>(&sql)
        .bind(worker_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_by_id_tx(tx: &mut SqliteTx<'_>, id: i64) -> RepoResult<Option<EmployeePayment>> {
    let sql = format!("{PAYMENT_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, EmployeePayment>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row)
}

/// Write one ledger row summarizing a payment; part of the settlement
/// transaction so a failed batch leaves no ledger trace
#[allow(clippy::too_many_arguments)]
pub async fn insert(
    tx: &mut SqliteTx<'_>,
    worker_id: &str,
    worker_name: &str,
    payment_type: PaymentType,
    amount: f64,
    pending_before: f64,
    pending_after: f64,
    settled_row_ids_json: &str,
    description: Option<&str>,
    paid_by: &str,
    now: i64,
) -> RepoResult<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO employee_payment (worker_id, worker_name, payment_type, amount, pending_before, pending_after, settled_row_ids, description, paid_by, paid_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10) RETURNING id",
    )
    .bind(worker_id)
    .bind(worker_name)
    .bind(payment_type)
    .bind(amount)
    .bind(pending_before)
    .bind(pending_after)
    .bind(settled_row_ids_json)
    .bind(description)
    .bind(paid_by)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}
