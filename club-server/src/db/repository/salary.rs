//! Salary Configuration Repository

use super::{RepoError, RepoResult};
use shared::models::{RoleSalaryConfig, ScheduleAssignment};
use sqlx::SqlitePool;

const CONFIG_SELECT: &str = "SELECT id, role_name, base_per_shift, fixed_bonus, created_at, updated_at FROM role_salary_config";

const SCHEDULE_SELECT: &str = "SELECT id, shift_date, shift_type, worker_id, worker_name, role_name, created_at FROM schedule_assignment";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<RoleSalaryConfig>> {
    let sql = format!("{CONFIG_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, RoleSalaryConfig>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Case-insensitive lookup by role name
pub async fn find_by_role(pool: &SqlitePool, role_name: &str) -> RepoResult<Option<RoleSalaryConfig>> {
    let sql = format!("{CONFIG_SELECT} WHERE role_name = ? COLLATE NOCASE");
    let row = sqlx::query_as::<_, RoleSalaryConfig>(&sql)
        .bind(role_name)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<RoleSalaryConfig>> {
    let sql = format!("{CONFIG_SELECT} ORDER BY role_name");
    let rows = sqlx::query_as::<_, RoleSalaryConfig>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

/// Create or update the configuration for a role. Frozen roster snapshots
/// are untouched by later edits.
pub async fn upsert(
    pool: &SqlitePool,
    role_name: &str,
    base_per_shift: f64,
    fixed_bonus: f64,
) -> RepoResult<RoleSalaryConfig> {
    if base_per_shift < 0.0 || fixed_bonus < 0.0 {
        return Err(RepoError::Validation(format!(
            "Salary amounts must be non-negative (base {base_per_shift}, bonus {fixed_bonus})"
        )));
    }
    let now = shared::util::now_millis();
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO role_salary_config (role_name, base_per_shift, fixed_bonus, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4) ON CONFLICT(role_name) DO UPDATE SET base_per_shift = excluded.base_per_shift, fixed_bonus = excluded.fixed_bonus, updated_at = excluded.updated_at RETURNING id",
    )
    .bind(role_name)
    .bind(base_per_shift)
    .bind(fixed_bonus)
    .bind(now)
    .fetch_one(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to upsert salary config".into()))
}

// ── Schedule assignments ─────────────────────────────────────

pub async fn find_schedule(
    pool: &SqlitePool,
    shift_date: &str,
    shift_type: &str,
) -> RepoResult<Vec<ScheduleAssignment>> {
    let sql = format!("{SCHEDULE_SELECT} WHERE shift_date = ? AND shift_type = ? COLLATE NOCASE ORDER BY id");
    let rows = sqlx::query_as::<_, ScheduleAssignment>(&sql)
        .bind(shift_date)
        .bind(shift_type)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn insert_schedule_assignment(
    pool: &SqlitePool,
    shift_date: &str,
    shift_type: &str,
    worker_id: &str,
    worker_name: &str,
    role_name: &str,
) -> RepoResult<i64> {
    let now = shared::util::now_millis();
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO schedule_assignment (shift_date, shift_type, worker_id, worker_name, role_name, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING id",
    )
    .bind(shift_date)
    .bind(shift_type)
    .bind(worker_id)
    .bind(worker_name)
    .bind(role_name)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(id)
}
