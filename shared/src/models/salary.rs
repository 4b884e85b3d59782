//! Salary Configuration Models

use serde::{Deserialize, Serialize};

/// Per-role salary configuration
///
/// Editing these rows never touches already-frozen roster snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct RoleSalaryConfig {
    pub id: i64,
    /// Role name, unique ("BARRA", "CAJERO", ...)
    pub role_name: String,
    /// Fixed base salary per shift
    pub base_per_shift: f64,
    /// Fixed bonus added on top of the base
    pub fixed_bonus: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Pre-planned staffing for a date, copied into the roster at shift creation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ScheduleAssignment {
    pub id: i64,
    /// Operating date (YYYY-MM-DD)
    pub shift_date: String,
    /// "Noche" or "Dia"
    pub shift_type: String,
    pub worker_id: String,
    pub worker_name: String,
    pub role_name: String,
    pub created_at: i64,
}
